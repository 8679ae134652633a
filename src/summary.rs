use crate::aggregate::{Engine, Tally};
use crate::config::{Config, ReportFilter};
use crate::membership::{resolve_team_memberships, Membership};
use crate::store::StatsStore;
use crate::util::day_key;
use anyhow::Context;
use chrono::Utc;
use console::style;
use serde::Serialize;

const TABLE_ROWS: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryEntry {
    pub key: String,
    pub value: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryOutput {
    pub version: u32,
    pub now: String,
    pub by: &'static str,
    pub limit: Option<u32>,
    pub total: f64,
    pub entries: Vec<SummaryEntry>,
}

pub fn exec(config: &Config, json: bool, teams: bool, limit: Option<u32>, top: Option<usize>) -> anyhow::Result<()> {
    let store = StatsStore::new(&config.stats_dir).context("Failed to open stats directory")?;
    let snapshots = store
        .get_snapshots(&config.repositories)
        .context("Failed to read snapshots")?;

    let resolved = resolve_team_memberships(&config.teams);
    let membership = Membership::new(&config.users, &resolved, config.only_registered);
    let engine = Engine::new(
        &config.repositories,
        membership,
        &snapshots,
        config.evaluate,
        Utc::now().date_naive(),
    );

    let output = summarize(&engine, teams, limit, top);
    if json {
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        output_table(&output);
    }
    Ok(())
}

/// Totals per user (or per team) across every configured repository.
pub fn summarize(engine: &Engine<'_>, teams: bool, limit: Option<u32>, top: Option<usize>) -> SummaryOutput {
    let filter = ReportFilter {
        limit,
        top,
        ..Default::default()
    };
    let (by, entries) = if teams {
        ("team", entries(engine.sum_by_team(&filter)))
    } else {
        ("user", entries(engine.sum_by_user(&filter)))
    };
    SummaryOutput {
        version: crate::model::SCHEMA_VERSION,
        now: day_key(engine.now()),
        by,
        limit,
        total: entries.iter().map(|e| e.value).sum(),
        entries,
    }
}

fn entries<K>(tally: Tally<K>) -> Vec<SummaryEntry>
where
    K: Eq + std::hash::Hash + Clone + ToString,
{
    let mut entries: Vec<SummaryEntry> = tally
        .iter()
        .map(|(key, value)| SummaryEntry {
            key: key.to_string(),
            value,
        })
        .collect();
    entries.sort_by(|a, b| b.value.total_cmp(&a.value));
    entries
}

fn output_table(output: &SummaryOutput) {
    let header = if output.by == "team" { "Team" } else { "Author" };
    println!("{:<50} {:>12}", style(header).bold(), style("Value").bold());
    println!("{}", "─".repeat(63));
    for e in output.entries.iter().take(TABLE_ROWS) {
        println!("{:<50} {:>12}", e.key, format_value(e.value));
    }
    if output.entries.len() > TABLE_ROWS {
        println!("\n... and {} more entries", output.entries.len() - TABLE_ROWS);
    }
    println!("{:<50} {:>12}", style("Total").dim(), format_value(output.total));
}

fn format_value(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}
