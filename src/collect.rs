use crate::config::Config;
use crate::error::Result;
use crate::git::GitRepo;
use crate::model::Repository;
use crate::store::{repository_key, StatsStore};
use anyhow::Context;
use console::style;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
pub struct CollectSummary {
    pub stored: Vec<PathBuf>,
    pub failed: Vec<String>,
    pub removed: Vec<PathBuf>,
}

pub fn exec(config: &Config, keep_stale: bool) -> anyhow::Result<()> {
    let store = StatsStore::new(&config.stats_dir).context("Failed to open stats directory")?;
    fs::create_dir_all(&config.tmp_dir).context("Failed to create temporary directory")?;

    let started = Instant::now();
    let mut summary = collect_all(config, &store);
    if !keep_stale {
        summary.removed = store
            .collect_garbage()
            .context("Failed to remove stale snapshots")?;
    }
    let elapsed = Duration::from_millis(started.elapsed().as_millis() as u64);

    println!(
        "{} {} repositories in {}",
        style("Collected").bold(),
        style(summary.stored.len()).cyan(),
        humantime::format_duration(elapsed)
    );
    if !summary.failed.is_empty() {
        println!(
            "{} {} ({}), rerun with --verbose for details",
            style("Skipped").yellow(),
            summary.failed.len(),
            summary.failed.join(", ")
        );
    }
    if !summary.removed.is_empty() {
        println!("{} {} stale snapshots", style("Removed").dim(), summary.removed.len());
    }
    Ok(())
}

/// Removes (or with `dry_run`, lists) snapshots superseded by a newer one.
pub fn gc(config: &Config, dry_run: bool) -> anyhow::Result<()> {
    let store = StatsStore::new(&config.stats_dir).context("Failed to open stats directory")?;
    let paths = if dry_run {
        store.stale()
    } else {
        store.collect_garbage()
    }
    .context("Failed to scan stats directory")?;

    let verb = if dry_run { "would remove" } else { "removed" };
    for path in &paths {
        println!("{} {}", style(verb).yellow(), path.display());
    }
    if paths.is_empty() {
        println!("{}", style("nothing to remove").dim());
    }
    Ok(())
}

/// Collects every configured repository in turn. A failing repository is
/// logged and skipped; its older snapshots stay in place.
pub fn collect_all(config: &Config, store: &StatsStore) -> CollectSummary {
    let mut summary = CollectSummary::default();
    for repo in &config.repositories {
        tracing::info!(repository = %repo.name, "collecting");
        match collect_repository(config, repo, store) {
            Ok(path) => summary.stored.push(path),
            Err(e) => {
                tracing::debug!(repository = %repo.name, error = %e, "collection failed, skipping");
                summary.failed.push(repo.name.clone());
            }
        }
    }
    summary
}

fn collect_repository(config: &Config, repo: &Repository, store: &StatsStore) -> Result<PathBuf> {
    let dir = config.tmp_dir.join(repository_key(&repo.name));
    let git = prepare_worktree(repo, &dir)?;
    let records = git.collect_authors(config.include_merges)?;
    store.store_snapshot(&repo.name, &records)
}

/// Reuses an existing clone when there is one, otherwise clones afresh.
fn prepare_worktree(repo: &Repository, dir: &Path) -> Result<GitRepo> {
    if GitRepo::is_git_repository(dir) {
        let mut git = GitRepo::open(dir)?;
        if let Some(branch) = &repo.branch {
            git.checkout(branch)?;
        }
        git.pull()?;
        return Ok(git);
    }

    if dir.exists() {
        fs::remove_dir_all(dir)?;
    }
    if let Some(parent) = dir.parent() {
        fs::create_dir_all(parent)?;
    }
    GitRepo::clone(&repo.url, dir, repo.branch.as_deref())
}
