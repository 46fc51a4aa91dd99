//! Snapshot Updater CLI Module
//! Command-line interface for checking, downloading and diffing snapshots

pub mod formatter;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::engine::config::{ConfigError, UpdaterConfig};
use crate::engine::diff::DiffOptions;

#[derive(Parser, Debug)]
#[command(name = "snapshot-updater")]
#[command(version)]
#[command(about = "Keep a local snapshot database in sync and report what changed", long_about = None)]
pub struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subscription key (overrides the config file)
    #[arg(short, long, global = true)]
    pub key: Option<String>,

    /// Current snapshot path
    #[arg(long, global = true)]
    pub current: Option<PathBuf>,

    /// Where the downloaded snapshot is written
    #[arg(long, global = true)]
    pub next: Option<PathBuf>,

    /// Remote base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Total attempts per download
    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// Output format (json for scripting)
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare the published version with the current snapshot
    Check,

    /// Download the published snapshot if it is newer
    Download {
        /// Download even when versions match
        #[arg(long)]
        force: bool,
    },

    /// Diff the current snapshot against the downloaded one
    Diff(DiffArgs),

    /// Download if needed, then diff
    Update(DiffArgs),
}

#[derive(Args, Debug, Clone)]
pub struct DiffArgs {
    /// Sample rows listed per table and direction
    #[arg(long, default_value_t = crate::engine::diff::DEFAULT_MAX_SAMPLE_ITEMS)]
    pub max_items: usize,

    /// Row-compare tables even when their counts match
    #[arg(long)]
    pub strict: bool,

    /// Also write an HTML report here
    #[arg(long)]
    pub html: Option<PathBuf>,
}

impl DiffArgs {
    pub fn options(&self) -> DiffOptions {
        DiffOptions {
            max_sample_items: self.max_items,
            strict: self.strict,
        }
    }
}

impl Cli {
    /// Default tracing filter when `RUST_LOG` is unset
    pub fn log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Config file (if any) with command-line overrides applied
    pub fn build_config(&self) -> Result<UpdaterConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => UpdaterConfig::load(path)?,
            None => UpdaterConfig::default(),
        };

        if let Some(key) = &self.key {
            config.subscription_key = Some(key.clone());
        }
        if let Some(current) = &self.current {
            config.current_database = Some(current.clone());
        }
        if let Some(next) = &self.next {
            config.next_database = Some(next.clone());
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retry_attempts = max_retries;
        }

        config.validate()?;
        // a standalone diff has no download to produce the next snapshot
        if matches!(self.command, Commands::Diff(_)) && config.next_database.is_none() {
            return Err(ConfigError::MissingOption("nextDatabase"));
        }
        Ok(config)
    }
}
