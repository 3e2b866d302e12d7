//! Command-line interface definition.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::ClientConfig;

/// rapla-ics - Rapla schedule to filtered iCalendar
#[derive(Debug, Parser)]
#[command(name = "rapla-ics")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "RAPLA_ICS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v')]
    pub debug: bool,

    // --- Source ---
    /// Rapla schedule page URL
    #[arg(long, short, env = "RAPLA_URL")]
    pub url: Option<String>,

    // --- Output ---
    /// Where to write the filtered calendar
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    // --- Filter flags ---
    /// Time zone events are normalized into
    #[arg(long)]
    pub timezone: Option<String>,

    /// Keep events whose summary contains this keyword (can be repeated)
    #[arg(long, action = clap::ArgAction::Append)]
    pub keep: Vec<String>,

    // --- Acquisition flags ---
    /// Fail instead of scraping the page when no export is found
    #[arg(long)]
    pub no_scrape: bool,

    /// HTTP timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration.
    pub fn apply_to(&self, config: &mut ClientConfig) {
        if let Some(ref url) = self.url {
            config.source.url = Some(url.clone());
        }
        if let Some(ref output) = self.output {
            config.output.path = output.clone();
        }
        if let Some(ref timezone) = self.timezone {
            config.filter.timezone = timezone.clone();
        }
        if !self.keep.is_empty() {
            config.filter.keywords = self.keep.clone();
        }
        if self.no_scrape {
            config.acquire.scrape_fallback = false;
        }
        if let Some(timeout) = self.timeout {
            config.http.timeout_secs = timeout;
        }
    }
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download, filter and write the calendar (default)
    Run,

    /// List candidate export URLs without downloading them
    Links,

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump effective configuration
    Dump,

    /// Show configuration file path
    Path,
}
