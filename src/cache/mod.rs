//! Cache module for storing earnings events and analyst snapshots
//!
//! This module provides a cache manager that persists records to an embedded
//! SQLite database. Writes are idempotent upserts keyed by each record's
//! identity; reads never fail loudly and return empty results instead.
//! Staleness is advisory (`is_fresh`), while the expiry sweep permanently
//! removes records past their retention window.

mod export;
mod manager;
mod policy;
mod schema;

use std::path::PathBuf;

use thiserror::Error;

pub use export::ExportDocument;
pub use manager::{CacheManager, CacheStats, EventDetail};
pub use policy::{
    is_fresh, RetentionPolicy, EVENT_FRESHNESS_HOURS, EVENT_RETENTION_DAYS,
    SNAPSHOT_FRESHNESS_HOURS, SNAPSHOT_RETENTION_DAYS,
};

/// Errors surfaced by explicitly invoked cache operations
///
/// Batch writes, sweeps and reads log their failures instead of returning
/// them; only opening the database and export/import report errors.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The storage engine rejected an operation
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Reading or writing a file failed
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file did not contain a valid export document
    #[error("Invalid export document {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
