//! Runtime configuration for the earnings cache
//!
//! Defaults come from the cache policy constants and an XDG-compliant cache
//! directory. Environment variables (optionally loaded from a `.env` file)
//! override them, and command-line flags override the environment.

use std::env;
use std::path::PathBuf;

use directories::ProjectDirs;
use thiserror::Error;

use crate::cache::{
    RetentionPolicy, EVENT_FRESHNESS_HOURS, EVENT_RETENTION_DAYS, SNAPSHOT_FRESHNESS_HOURS,
    SNAPSHOT_RETENTION_DAYS,
};

/// File name of the cache database inside the cache directory
pub const DB_FILE_NAME: &str = "earnings_cache.db";

pub const ENV_DB: &str = "EARNCACHE_DB";
pub const ENV_EVENT_RETENTION_DAYS: &str = "EARNCACHE_EVENT_RETENTION_DAYS";
pub const ENV_SNAPSHOT_RETENTION_DAYS: &str = "EARNCACHE_SNAPSHOT_RETENTION_DAYS";
pub const ENV_EVENT_FRESH_HOURS: &str = "EARNCACHE_EVENT_FRESH_HOURS";
pub const ENV_SNAPSHOT_FRESH_HOURS: &str = "EARNCACHE_SNAPSHOT_FRESH_HOURS";

/// Error types for configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value that does not parse
    #[error("Invalid value for {name}: '{value}'")]
    InvalidValue { name: &'static str, value: String },
}

/// Settings for opening and maintaining the cache
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    /// Location of the SQLite database file
    pub db_path: PathBuf,
    pub retention: RetentionPolicy,
    /// Hours after which events should be refreshed by producers
    pub event_freshness_hours: u64,
    /// Hours after which analyst snapshots should be refreshed by producers
    pub snapshot_freshness_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            retention: RetentionPolicy::default(),
            event_freshness_hours: EVENT_FRESHNESS_HOURS,
            snapshot_freshness_hours: SNAPSHOT_FRESHNESS_HOURS,
        }
    }
}

/// Returns the default database location
///
/// Uses `~/.cache/earncache/` on Linux, or the equivalent XDG path on other
/// platforms. Falls back to `data/cache/` when no home directory exists.
pub fn default_db_path() -> PathBuf {
    ProjectDirs::from("", "", "earncache")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data").join("cache"))
        .join(DB_FILE_NAME)
}

impl CacheConfig {
    /// Loads configuration from the process environment
    ///
    /// A `.env` file in the working directory is read first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds configuration from an arbitrary variable lookup
    ///
    /// Unset or blank variables keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = CacheConfig::default();

        if let Some(path) = get(ENV_DB) {
            config.db_path = PathBuf::from(path.trim());
        }
        config.retention.event_retention_days =
            parse_var(ENV_EVENT_RETENTION_DAYS, get(ENV_EVENT_RETENTION_DAYS), EVENT_RETENTION_DAYS)?;
        config.retention.snapshot_retention_days = parse_var(
            ENV_SNAPSHOT_RETENTION_DAYS,
            get(ENV_SNAPSHOT_RETENTION_DAYS),
            SNAPSHOT_RETENTION_DAYS,
        )?;
        config.event_freshness_hours =
            parse_var(ENV_EVENT_FRESH_HOURS, get(ENV_EVENT_FRESH_HOURS), EVENT_FRESHNESS_HOURS)?;
        config.snapshot_freshness_hours = parse_var(
            ENV_SNAPSHOT_FRESH_HOURS,
            get(ENV_SNAPSHOT_FRESH_HOURS),
            SNAPSHOT_FRESHNESS_HOURS,
        )?;

        Ok(config)
    }
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    raw: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
    }
}
