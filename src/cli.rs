use crate::config::{load_config, Config, DEFAULT_CONFIG_FILE};
use crate::util::parse_day;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "gteam")]
#[command(about = "Team contribution statistics across git repositories")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE, help = "Path to configuration file (YAML or JSON)")]
    pub config: PathBuf,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Clone or update every repository and store a fresh snapshot.
    Collect {
        #[arg(long, help = "Keep superseded snapshots")]
        keep_stale: bool,
    },
    /// Write render inputs for every configured report.
    Report {
        #[arg(long, value_parser = parse_now, help = "Reference day for limit windows (YYYY-MM-DD)")]
        now: Option<NaiveDate>,
    },
    /// Remove superseded snapshots.
    Gc {
        #[arg(long, help = "List files without removing them")]
        dry_run: bool,
    },
    /// Print totals per author or team.
    Summary {
        #[arg(long, help = "Output as JSON")]
        json: bool,

        #[arg(long, help = "Group by team instead of author")]
        teams: bool,

        #[arg(long, help = "Only count the last N days")]
        limit: Option<u32>,

        #[arg(long, help = "Keep the N largest entries")]
        top: Option<usize>,
    },
}

fn parse_now(value: &str) -> std::result::Result<NaiveDate, String> {
    parse_day(value).ok_or_else(|| format!("invalid date '{value}', expected YYYY-MM-DD"))
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn execute(self) -> Result<()> {
        init_tracing(self.verbose);
        let config = self.load()?;

        match self.command {
            Commands::Collect { keep_stale } => crate::collect::exec(&config, keep_stale),
            Commands::Report { now } => crate::report::exec(&config, now),
            Commands::Gc { dry_run } => crate::collect::gc(&config, dry_run),
            Commands::Summary { json, teams, limit, top } => {
                crate::summary::exec(&config, json, teams, limit, top)
            }
        }
    }

    fn load(&self) -> Result<Config> {
        load_config(&self.config)
            .with_context(|| format!("Failed to load configuration from {}", self.config.display()))
    }
}

fn init_tracing(verbose: bool) {
    // RUST_LOG directives still apply on top of the default level
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::from_default_env().add_directive(level.into());
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}
