//! Configuration file loading.
//!
//! The configuration is read once, validated, and then passed by reference
//! into every component.

use crate::error::{GteamError, Result};
use crate::evaluate::Evaluator;
use crate::model::{Repository, Team, User};
use crate::store::repository_key;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "gteam.yml";
pub const DEFAULT_OTHERS_LABEL: &str = "*";

fn default_tmp_dir() -> PathBuf {
    std::env::temp_dir().join("gteam")
}

fn default_stats_dir() -> PathBuf {
    PathBuf::from("stats")
}

fn default_others_label() -> String {
    DEFAULT_OTHERS_LABEL.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub repositories: Vec<Repository>,
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub evaluate: Evaluator,
    #[serde(default)]
    pub only_registered: bool,
    #[serde(default)]
    pub include_merges: bool,
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: PathBuf,
    #[serde(default = "default_stats_dir", alias = "dataDir")]
    pub stats_dir: PathBuf,
    #[serde(default)]
    pub report_calendar_team: Vec<CalendarTeamReport>,
    #[serde(default)]
    pub report_calendar_user: Vec<CalendarUserReport>,
    #[serde(default)]
    pub report_donut_user: Vec<DonutReport>,
    #[serde(default)]
    pub report_map_user: Option<NetworkReport>,
    #[serde(default)]
    pub report_running_repository: Vec<RunningReport>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            repositories: Vec::new(),
            users: Vec::new(),
            teams: Vec::new(),
            evaluate: Evaluator::default(),
            only_registered: false,
            include_merges: false,
            tmp_dir: default_tmp_dir(),
            stats_dir: default_stats_dir(),
            report_calendar_team: Vec::new(),
            report_calendar_user: Vec::new(),
            report_donut_user: Vec::new(),
            report_map_user: None,
            report_running_repository: Vec::new(),
        }
    }
}

/// Options narrowing what a single report aggregates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReportFilter {
    #[serde(default)]
    pub repositories: Option<Vec<String>>,
    #[serde(default)]
    pub users: Option<Vec<String>>,
    #[serde(default)]
    pub teams: Option<Vec<String>>,
    #[serde(default)]
    pub others: bool,
    #[serde(default = "default_others_label")]
    pub others_label: String,
    #[serde(default)]
    pub limit: Option<u32>,
    #[serde(default)]
    pub top: Option<usize>,
    #[serde(default)]
    pub timestamp: bool,
}

impl Default for ReportFilter {
    fn default() -> Self {
        Self {
            repositories: None,
            users: None,
            teams: None,
            others: false,
            others_label: default_others_label(),
            limit: None,
            top: None,
            timestamp: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Margin {
    #[serde(default)]
    pub top: u32,
    #[serde(default)]
    pub right: u32,
    #[serde(default)]
    pub bottom: u32,
    #[serde(default)]
    pub left: u32,
}

/// Render settings handed to the chart renderer untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DisplayOptions {
    pub output: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<Margin>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarTeamReport {
    pub team: String,
    #[serde(default)]
    pub compare_teams: Vec<String>,
    #[serde(default)]
    pub compare_users: Vec<String>,
    #[serde(flatten)]
    pub filter: ReportFilter,
    #[serde(flatten)]
    pub display: DisplayOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarUserReport {
    /// Shorthand for a single-entry `users` allow-list.
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub compare_teams: Vec<String>,
    #[serde(default)]
    pub compare_users: Vec<String>,
    #[serde(flatten)]
    pub filter: ReportFilter,
    #[serde(flatten)]
    pub display: DisplayOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DonutReport {
    #[serde(flatten)]
    pub filter: ReportFilter,
    #[serde(flatten)]
    pub display: DisplayOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NetworkReport {
    #[serde(flatten)]
    pub filter: ReportFilter,
    #[serde(flatten)]
    pub display: DisplayOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RunningReport {
    #[serde(flatten)]
    pub filter: ReportFilter,
    #[serde(flatten)]
    pub display: DisplayOptions,
}

impl CalendarUserReport {
    /// The effective filter, with `user` folded into the `users` allow-list.
    pub fn effective_filter(&self) -> ReportFilter {
        let mut filter = self.filter.clone();
        if let Some(user) = &self.user {
            filter.users.get_or_insert_with(Vec::new).push(user.clone());
        }
        filter
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| {
        GteamError::Config(format!("Failed reading config file {}: {e}", path.display()))
    })?;

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let config = match ext.as_str() {
        "json" => parse_json_config(&content)?,
        "yaml" | "yml" | "" => parse_yaml_config(&content)?,
        other => {
            return Err(GteamError::Config(format!(
                "Unsupported config extension '.{other}' for file {}",
                path.display()
            )))
        }
    };

    config.validate()?;
    tracing::debug!(
        repositories = config.repositories.len(),
        users = config.users.len(),
        teams = config.teams.len(),
        "loaded config from {}",
        path.display()
    );
    Ok(config)
}

pub fn parse_yaml_config(content: &str) -> Result<Config> {
    let mut config: Config = serde_yaml::from_str(content)?;
    config.normalize();
    Ok(config)
}

pub fn parse_json_config(content: &str) -> Result<Config> {
    let mut config: Config = serde_json::from_str(content)?;
    config.normalize();
    Ok(config)
}

impl Config {
    fn normalize(&mut self) {
        for user in &mut self.users {
            for assoc in &mut user.associations {
                *assoc = assoc.to_lowercase();
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        unique("repository", self.repositories.iter().map(|r| r.name.as_str()))?;
        self.unique_repository_keys()?;
        unique("user", self.users.iter().map(|u| u.name.as_str()))?;
        unique("team", self.teams.iter().map(|t| t.name.as_str()))?;

        let teams: HashSet<&str> = self.teams.iter().map(|t| t.name.as_str()).collect();
        let referenced = self
            .report_calendar_team
            .iter()
            .flat_map(|r| std::iter::once(&r.team).chain(&r.compare_teams))
            .chain(self.report_calendar_user.iter().flat_map(|r| &r.compare_teams))
            .chain(self.teams.iter().flat_map(|t| &t.compare))
            .chain(self.report_filters().flat_map(|f| f.teams.iter().flatten()));
        for name in referenced {
            if !teams.contains(name.as_str()) && !self.users.iter().any(|u| &u.name == name) {
                return Err(GteamError::Config(format!("Unknown team or user '{name}' referenced")));
            }
        }
        Ok(())
    }

    /// Snapshots and clones are keyed by the sanitized name, so two names
    /// must not sanitize to the same key.
    fn unique_repository_keys(&self) -> Result<()> {
        let mut seen: HashMap<String, &str> = HashMap::new();
        for repo in &self.repositories {
            let key = repository_key(&repo.name);
            if let Some(other) = seen.insert(key.clone(), &repo.name) {
                return Err(GteamError::Config(format!(
                    "Repositories '{other}' and '{}' share the storage key '{key}'",
                    repo.name
                )));
            }
        }
        Ok(())
    }

    fn report_filters(&self) -> impl Iterator<Item = &ReportFilter> {
        self.report_calendar_team
            .iter()
            .map(|r| &r.filter)
            .chain(self.report_calendar_user.iter().map(|r| &r.filter))
            .chain(self.report_donut_user.iter().map(|r| &r.filter))
            .chain(self.report_map_user.iter().map(|r| &r.filter))
            .chain(self.report_running_repository.iter().map(|r| &r.filter))
    }
}

fn unique<'a>(kind: &str, names: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(GteamError::Config(format!("Duplicate {kind} name '{name}'")));
        }
    }
    Ok(())
}
