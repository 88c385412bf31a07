//! Command-line interface parsing for the earnings cache
//!
//! This module handles parsing of CLI arguments using clap: one subcommand per
//! cache operation plus global flags that override the environment config.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use thiserror::Error;

use crate::config::CacheConfig;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The argument is not a calendar date in YYYY-MM-DD form
    #[error("Invalid date: '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),
}

/// Earnings cache - store and inspect earnings events and analyst snapshots
#[derive(Parser, Debug)]
#[command(name = "earncache")]
#[command(about = "Local cache of corporate earnings events and analyst snapshots")]
#[command(version)]
pub struct Cli {
    /// Path to the cache database (overrides EARNCACHE_DB)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Show record counts and latest update times
    Stats,

    /// List cached earnings events, oldest report date first
    ///
    /// Examples:
    ///   earncache events --symbol AAPL
    ///   earncache events --from 2024-01-01 --to 2024-01-31
    Events {
        /// Only events for this symbol
        #[arg(long)]
        symbol: Option<String>,
        /// First report date to include
        #[arg(long, value_name = "DATE", value_parser = parse_date_arg)]
        from: Option<NaiveDate>,
        /// Last report date to include
        #[arg(long, value_name = "DATE", value_parser = parse_date_arg)]
        to: Option<NaiveDate>,
    },

    /// Show the analyst snapshot for a symbol
    Snapshot { symbol: String },

    /// Show one event together with its analyst snapshot
    Detail {
        symbol: String,
        #[arg(value_parser = parse_date_arg)]
        date: NaiveDate,
    },

    /// Delete records past their retention window
    Sweep,

    /// Export all events and stats to a JSON file
    Export {
        /// Output file (defaults to cache_export_<timestamp>.json next to the database)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Import events from an export file
    Import { path: PathBuf },

    /// Fill the cache with synthetic fixture data
    Seed {
        /// Seed even if the cache already holds data
        #[arg(long)]
        force: bool,
    },

    /// Sweep expired records periodically until interrupted
    Watch {
        /// Seconds between sweeps
        #[arg(long, default_value_t = 3600, value_name = "SECS")]
        interval_secs: u64,
    },
}

/// Parses a YYYY-MM-DD date argument.
///
/// # Arguments
/// * `s` - The date string from CLI
///
/// # Returns
/// * `Ok(NaiveDate)` if the string is a valid calendar date
/// * `Err(CliError::InvalidDate)` otherwise
pub fn parse_date_arg(s: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| CliError::InvalidDate(s.to_string()))
}

impl Cli {
    /// Applies command-line overrides on top of the environment config
    pub fn apply_overrides(&self, mut config: CacheConfig) -> CacheConfig {
        if let Some(db) = &self.db {
            config.db_path = db.clone();
        }
        config
    }

    /// Log filter matching the requested verbosity
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_arg_valid() {
        assert_eq!(
            parse_date_arg("2024-01-25").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 25).unwrap()
        );
    }

    #[test]
    fn test_parse_date_arg_invalid() {
        for bad in ["2024-13-01", "2024-02-30", "25/01/2024", ""] {
            let result = parse_date_arg(bad);
            assert!(result.is_err(), "{} should be rejected", bad);
        }
        let err = parse_date_arg("tomorrow").unwrap_err();
        assert!(err.to_string().contains("Invalid date"));
        assert!(err.to_string().contains("tomorrow"));
    }

    #[test]
    fn test_cli_parse_stats() {
        let cli = Cli::parse_from(["earncache", "stats"]);
        assert_eq!(cli.command, Command::Stats);
        assert!(cli.db.is_none());
        assert!(!cli.json);
    }

    #[test]
    fn test_cli_parse_events_filters() {
        let cli = Cli::parse_from([
            "earncache", "events", "--symbol", "AAPL", "--from", "2024-01-01", "--to", "2024-01-31",
        ]);
        assert_eq!(
            cli.command,
            Command::Events {
                symbol: Some("AAPL".to_string()),
                from: NaiveDate::from_ymd_opt(2024, 1, 1),
                to: NaiveDate::from_ymd_opt(2024, 1, 31),
            }
        );
    }

    #[test]
    fn test_cli_parse_events_rejects_bad_date() {
        let result = Cli::try_parse_from(["earncache", "events", "--from", "January"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["earncache", "sweep", "--db", "/tmp/x.db", "-vv", "--json"]);
        assert_eq!(cli.db, Some(PathBuf::from("/tmp/x.db")));
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
        assert_eq!(cli.log_filter(), "trace");
    }

    #[test]
    fn test_cli_parse_detail() {
        let cli = Cli::parse_from(["earncache", "detail", "AAPL", "2024-01-25"]);
        assert_eq!(
            cli.command,
            Command::Detail {
                symbol: "AAPL".to_string(),
                date: NaiveDate::from_ymd_opt(2024, 1, 25).unwrap(),
            }
        );
    }

    #[test]
    fn test_cli_parse_watch_default_interval() {
        let cli = Cli::parse_from(["earncache", "watch"]);
        assert_eq!(cli.command, Command::Watch { interval_secs: 3600 });
    }

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["earncache"]).is_err());
    }

    #[test]
    fn test_apply_overrides_replaces_db_path() {
        let cli = Cli::parse_from(["earncache", "--db", "/tmp/override.db", "stats"]);
        let config = cli.apply_overrides(CacheConfig::default());
        assert_eq!(config.db_path, PathBuf::from("/tmp/override.db"));

        let cli = Cli::parse_from(["earncache", "stats"]);
        let default = CacheConfig::default();
        assert_eq!(cli.apply_overrides(default.clone()), default);
        assert_eq!(cli.log_filter(), "info");
    }
}
