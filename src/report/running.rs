use crate::util::{day_key, days_between, parse_day};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunningPoint {
    pub date: String,
    pub value: f64,
    /// Cumulative value up to and including this day.
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunningSeries {
    pub repository: String,
    pub points: Vec<RunningPoint>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Running {
    pub series: Vec<RunningSeries>,
    pub total: f64,
}

impl Running {
    pub fn is_empty(&self) -> bool {
        self.total == 0.0
    }
}

/// Aligns every repository's daily values on the global date range so the
/// streams can be stacked.
pub fn normalize(per_repository: &[(String, BTreeMap<String, f64>)]) -> Running {
    let parsed: Vec<(&str, BTreeMap<NaiveDate, f64>)> = per_repository
        .iter()
        .map(|(name, days)| {
            let mut by_day = BTreeMap::new();
            for (key, value) in days {
                if let Some(day) = parse_day(key) {
                    *by_day.entry(day).or_insert(0.0) += value;
                }
            }
            (name.as_str(), by_day)
        })
        .collect();

    let first = parsed.iter().filter_map(|(_, d)| d.keys().next()).min().copied();
    let last = parsed.iter().filter_map(|(_, d)| d.keys().next_back()).max().copied();

    let mut total = 0.0;
    let series = parsed
        .iter()
        .map(|(name, by_day)| {
            let mut running = 0.0;
            let points = match (first, last) {
                (Some(first), Some(last)) => days_between(first, last)
                    .map(|day| {
                        let value = by_day.get(&day).copied().unwrap_or(0.0);
                        running += value;
                        RunningPoint {
                            date: day_key(day),
                            value,
                            total: running,
                        }
                    })
                    .collect(),
                _ => Vec::new(),
            };
            total += running;
            RunningSeries {
                repository: name.to_string(),
                points,
            }
        })
        .collect();

    Running { series, total }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn days(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn series_share_the_global_range() {
        let running = normalize(&[
            ("api".to_string(), days(&[("2024-01-01", 2.0), ("2024-01-03", 3.0)])),
            ("web".to_string(), days(&[("2024-01-04", 1.0)])),
        ]);
        assert_eq!(running.total, 6.0);
        assert_eq!(running.series.len(), 2);

        let api = &running.series[0];
        assert_eq!(api.points.len(), 4);
        let totals: Vec<_> = api.points.iter().map(|p| p.total).collect();
        assert_eq!(totals, vec![2.0, 2.0, 5.0, 5.0]);

        let web = &running.series[1];
        assert_eq!(web.points[0].date, "2024-01-01");
        assert_eq!(web.points[3], RunningPoint { date: "2024-01-04".into(), value: 1.0, total: 1.0 });
    }

    #[test]
    fn repositories_without_days_are_empty() {
        let running = normalize(&[("api".to_string(), BTreeMap::new())]);
        assert!(running.is_empty());
        assert!(running.series[0].points.is_empty());
    }
}
