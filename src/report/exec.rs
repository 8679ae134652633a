use super::output::{write_render_input, Outcome, ReportKind};
use super::{calendar, donut, network, running};
use crate::aggregate::Engine;
use crate::config::{Config, ReportFilter};
use crate::error::{GteamError, Result};
use crate::membership::{resolve_team_memberships, Membership};
use crate::store::StatsStore;
use anyhow::Context;
use chrono::{NaiveDate, Utc};
use console::style;
use std::collections::BTreeMap;

pub fn exec(config: &Config, now: Option<NaiveDate>) -> anyhow::Result<()> {
    let store = StatsStore::new(&config.stats_dir).context("Failed to open stats directory")?;
    let snapshots = store
        .get_snapshots(&config.repositories)
        .context("Failed to read snapshots")?;
    if snapshots.is_empty() {
        tracing::warn!("no snapshots found in {}, run `collect` first", store.dir().display());
    }

    let teams = resolve_team_memberships(&config.teams);
    let membership = Membership::new(&config.users, &teams, config.only_registered);
    let now = now.unwrap_or_else(|| Utc::now().date_naive());
    let engine = Engine::new(&config.repositories, membership, &snapshots, config.evaluate, now);

    let outcomes = generate_reports(config, &engine).context("Failed to generate reports")?;
    for outcome in &outcomes {
        match outcome {
            Outcome::Written(path) => println!("{} {}", style("wrote").green(), path.display()),
            Outcome::Removed(path) => println!("{} {} (empty)", style("removed").yellow(), path.display()),
            Outcome::Skipped(path) => println!("{} {} (empty)", style("skipped").dim(), path.display()),
        }
    }
    Ok(())
}

/// Runs every configured report against the engine, in configuration order.
pub fn generate_reports(config: &Config, engine: &Engine<'_>) -> Result<Vec<Outcome>> {
    let mut outcomes = Vec::new();

    for report in &config.report_calendar_team {
        let team = engine
            .membership()
            .teams()
            .get(&report.team)
            .ok_or_else(|| GteamError::Config(format!("Unknown team '{}'", report.team)))?;
        let raw = engine.daily(&report.filter, Some(team));
        let targets: Vec<&String> = report.compare_teams.iter().chain(&team.compare).collect();
        let compare = compare_values(engine, &report.filter, &targets, &report.compare_users);
        let series = calendar::normalize(&raw, &compare);
        outcomes.push(write_render_input(
            ReportKind::CalendarTeam,
            &report.display,
            &series,
            series.is_empty(),
        )?);
    }

    for report in &config.report_calendar_user {
        let filter = report.effective_filter();
        let raw = engine.daily(&filter, None);
        let targets: Vec<&String> = report.compare_teams.iter().collect();
        let compare = compare_values(engine, &filter, &targets, &report.compare_users);
        let series = calendar::normalize(&raw, &compare);
        outcomes.push(write_render_input(
            ReportKind::CalendarUser,
            &report.display,
            &series,
            series.is_empty(),
        )?);
    }

    for report in &config.report_donut_user {
        let donut = donut::normalize(&engine.sum_by_user(&report.filter));
        outcomes.push(write_render_input(
            ReportKind::DonutUser,
            &report.display,
            &donut,
            donut.is_empty(),
        )?);
    }

    if let Some(report) = &config.report_map_user {
        let network = network::normalize(engine.users(), &engine.contributions(&report.filter));
        outcomes.push(write_render_input(
            ReportKind::MapUser,
            &report.display,
            &network,
            network.is_empty(),
        )?);
    }

    for report in &config.report_running_repository {
        let running = running::normalize(&engine.sum_by_repository_over_time(&report.filter));
        outcomes.push(write_render_input(
            ReportKind::RunningRepository,
            &report.display,
            &running,
            running.is_empty(),
        )?);
    }

    Ok(outcomes)
}

/// Per-day values of each comparison target under the report's window.
/// A target names a team, or a user when no team of that name exists.
fn compare_values(
    engine: &Engine<'_>,
    filter: &ReportFilter,
    teams: &[&String],
    users: &[String],
) -> Vec<BTreeMap<String, f64>> {
    let base = ReportFilter {
        users: None,
        others: false,
        ..filter.clone()
    };

    let mut values = Vec::new();
    for name in teams {
        match engine.membership().teams().get(name) {
            Some(team) => values.push(engine.daily(&base, Some(team))),
            None => values.push(engine.daily(&single_user(&base, name), None)),
        }
    }
    for name in users {
        values.push(engine.daily(&single_user(&base, name), None));
    }
    values
}

fn single_user(base: &ReportFilter, name: &str) -> ReportFilter {
    ReportFilter {
        users: Some(vec![name.to_string()]),
        ..base.clone()
    }
}
