//! The aggregation engine: walks the latest snapshots, filters authors by
//! membership and allow-lists, and sums evaluated values into buckets.

use crate::config::ReportFilter;
use crate::evaluate::Evaluator;
use crate::identity::Identity;
use crate::membership::{Membership, ResolvedTeam};
use crate::model::{Repository, User};
use crate::store::Snapshots;
use crate::util::{day_key, parse_day, within_limit};
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::hash::Hash;

/// Ordered buckets: iteration follows first insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct Tally<K: Eq + Hash + Clone> {
    order: Vec<K>,
    values: HashMap<K, f64>,
}

impl<K: Eq + Hash + Clone> Default for Tally<K> {
    fn default() -> Self {
        Self {
            order: Vec::new(),
            values: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> Tally<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: K, value: f64) {
        match self.values.get_mut(&key) {
            Some(v) => *v += value,
            None => {
                self.order.push(key.clone());
                self.values.insert(key, value);
            }
        }
    }

    pub fn get(&self, key: &K) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, f64)> {
        self.order.iter().map(|k| (k, self.values[k]))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.order.iter()
    }

    pub fn total(&self) -> f64 {
        self.values.values().sum()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Keeps the `n` largest buckets, largest first. Equal values keep
    /// their insertion order.
    pub fn top(mut self, n: usize) -> Self {
        let values = &self.values;
        // stable sort, so ties stay in insertion order
        self.order.sort_by(|a, b| values[b].total_cmp(&values[a]));
        self.order.truncate(n);
        let kept: HashMap<K, f64> = self
            .order
            .iter()
            .map(|k| (k.clone(), self.values[k]))
            .collect();
        self.values = kept;
        self
    }

    fn apply_top(self, top: Option<usize>) -> Self {
        match top {
            Some(n) => self.top(n),
            None => self,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    /// One visit per author record, unless a `limit` forces a per-day walk.
    Total,
    /// One visit per qualifying day.
    Daily,
}

/// One accumulated contribution handed to a reducer callback.
#[derive(Debug, Clone)]
pub struct Visit<'a> {
    pub repository: &'a Repository,
    pub identity: &'a Identity,
    pub email: &'a str,
    pub name: &'a str,
    pub value: f64,
    pub date: Option<String>,
    pub message: Option<&'a str>,
}

pub struct Engine<'a> {
    repositories: &'a [Repository],
    membership: Membership<'a>,
    snapshots: &'a Snapshots,
    evaluator: Evaluator,
    now: NaiveDate,
}

impl<'a> Engine<'a> {
    pub fn new(
        repositories: &'a [Repository],
        membership: Membership<'a>,
        snapshots: &'a Snapshots,
        evaluator: Evaluator,
        now: NaiveDate,
    ) -> Self {
        Self {
            repositories,
            membership,
            snapshots,
            evaluator,
            now,
        }
    }

    pub fn users(&self) -> &'a [User] {
        self.membership.users()
    }

    pub fn membership(&self) -> &Membership<'a> {
        &self.membership
    }

    pub fn now(&self) -> NaiveDate {
        self.now
    }

    /// Repositories with a snapshot that pass the filter's allow-list, in
    /// configuration order.
    pub fn selected_repositories<'f>(
        &'f self,
        filter: &'f ReportFilter,
    ) -> impl Iterator<Item = &'a Repository> + 'f {
        self.repositories.iter().filter(move |repo| {
            self.snapshots.get(&repo.name).is_some()
                && filter
                    .repositories
                    .as_ref()
                    .map_or(true, |allowed| allowed.iter().any(|a| a == &repo.name))
        })
    }

    /// The core reduction. Every (repository, author, day) passing the
    /// filters reaches `visit` exactly once.
    pub fn reduce<F>(
        &self,
        filter: &ReportFilter,
        team: Option<&ResolvedTeam>,
        granularity: Granularity,
        mut visit: F,
    ) where
        F: FnMut(Visit<'_>),
    {
        let users = self.users();
        let others = Identity::others(filter.others_label.clone());

        for repository in self.selected_repositories(filter) {
            let Some(records) = self.snapshots.get(&repository.name) else {
                continue;
            };
            for record in records {
                if !self
                    .membership
                    .belongs(repository, team, &record.email, &record.name)
                {
                    continue;
                }

                let resolved = Identity::of(users, &record.email, &record.name);
                let identity = if allowed(filter.users.as_deref(), &resolved, &record.email, &record.name) {
                    &resolved
                } else if filter.others {
                    &others
                } else {
                    continue;
                };

                if granularity == Granularity::Total && filter.limit.is_none() {
                    visit(Visit {
                        repository,
                        identity,
                        email: &record.email,
                        name: &record.name,
                        value: self.evaluator.evaluate(record),
                        date: None,
                        message: None,
                    });
                    continue;
                }

                for (key, day) in &record.map {
                    let Some(date) = parse_day(key) else {
                        tracing::debug!(repository = %repository.name, key = %key, "skipping unparseable day key");
                        continue;
                    };
                    if !within_limit(date, self.now, filter.limit) {
                        continue;
                    }
                    visit(Visit {
                        repository,
                        identity,
                        email: &record.email,
                        name: &record.name,
                        value: self.evaluator.evaluate(day),
                        date: Some(if filter.timestamp { key.clone() } else { day_key(date) }),
                        message: day.message.as_deref(),
                    });
                }
            }
        }
    }

    pub fn sum_by_user(&self, filter: &ReportFilter) -> Tally<Identity> {
        let mut tally = Tally::new();
        self.reduce(filter, None, Granularity::Total, |v| {
            tally.add(v.identity.clone(), v.value)
        });
        tally.apply_top(filter.top)
    }

    /// Per team (allow-listed or all, in declaration order). With `others`
    /// set, authors outside every selected team land in the sentinel bucket.
    pub fn sum_by_team(&self, filter: &ReportFilter) -> Tally<String> {
        let selected: Vec<&ResolvedTeam> = self
            .membership
            .teams()
            .iter()
            .filter(|t| {
                filter
                    .teams
                    .as_ref()
                    .map_or(true, |allowed| allowed.iter().any(|a| a == &t.name))
            })
            .collect();

        let strict = ReportFilter {
            others: false,
            ..filter.clone()
        };
        let mut tally = Tally::new();
        for &team in &selected {
            self.reduce(&strict, Some(team), Granularity::Total, |v| {
                tally.add(team.name.clone(), v.value)
            });
        }

        if filter.others {
            self.reduce(&strict, None, Granularity::Total, |v| {
                let claimed = selected
                    .iter()
                    .any(|&team| self.membership.belongs(v.repository, Some(team), v.email, v.name));
                if !claimed {
                    tally.add(filter.others_label.clone(), v.value);
                }
            });
        }

        tally.apply_top(filter.top)
    }

    pub fn sum_by_repository(&self, filter: &ReportFilter) -> Tally<String> {
        let mut tally = Tally::new();
        self.reduce(filter, None, Granularity::Total, |v| {
            tally.add(v.repository.name.clone(), v.value)
        });
        tally.apply_top(filter.top)
    }

    /// Per repository, the value of each active day. `top` keeps the
    /// repositories with the largest totals.
    pub fn sum_by_repository_over_time(
        &self,
        filter: &ReportFilter,
    ) -> Vec<(String, BTreeMap<String, f64>)> {
        let mut totals = Tally::new();
        let mut series: HashMap<String, BTreeMap<String, f64>> = HashMap::new();
        self.reduce(filter, None, Granularity::Daily, |v| {
            totals.add(v.repository.name.clone(), v.value);
            if let Some(date) = v.date {
                *series
                    .entry(v.repository.name.clone())
                    .or_default()
                    .entry(date)
                    .or_insert(0.0) += v.value;
            }
        });

        let ranked = totals.apply_top(filter.top);
        let result = ranked
            .keys()
            .map(|name| (name.clone(), series.remove(name).unwrap_or_default()))
            .collect();
        result
    }

    /// Summed value of each active day within one scope.
    pub fn daily(&self, filter: &ReportFilter, team: Option<&ResolvedTeam>) -> BTreeMap<String, f64> {
        let mut days = BTreeMap::new();
        self.reduce(filter, team, Granularity::Daily, |v| {
            if let Some(date) = v.date {
                *days.entry(date).or_insert(0.0) += v.value;
            }
        });
        days
    }

    /// Repositories each registered user contributed a positive value to.
    /// The `others` fold is ignored.
    pub fn contributions(&self, filter: &ReportFilter) -> BTreeMap<String, BTreeSet<String>> {
        let filter = ReportFilter {
            others: false,
            ..filter.clone()
        };
        let mut totals: Tally<(String, String)> = Tally::new();
        self.reduce(&filter, None, Granularity::Total, |v| {
            if let Some(user) = v.identity.user_name() {
                totals.add((user.to_string(), v.repository.name.clone()), v.value);
            }
        });

        let mut by_user: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for ((user, repository), value) in totals.iter() {
            if value > 0.0 {
                by_user.entry(user.clone()).or_default().insert(repository.clone());
            }
        }
        by_user
    }
}

fn allowed(allow: Option<&[String]>, identity: &Identity, email: &str, name: &str) -> bool {
    let Some(allow) = allow else {
        return true;
    };
    let email = email.to_lowercase();
    let name = name.to_lowercase();
    let user = identity.user_name().map(str::to_lowercase);
    allow.iter().any(|entry| {
        let entry = entry.to_lowercase();
        user.as_deref() == Some(entry.as_str()) || email == entry || name == entry
    })
}
