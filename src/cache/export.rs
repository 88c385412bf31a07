//! JSON export and import of cached earnings events
//!
//! The export file is a full dump of every event plus the cache stats at the
//! time of export. Import replays the events through `put_events`, so
//! importing the same file twice leaves the cache unchanged.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::{CacheError, CacheManager, CacheStats};
use crate::data::EarningsEvent;

/// On-disk shape of a cache export
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportDocument {
    pub export_time: DateTime<Utc>,
    pub earnings_events: Vec<EarningsEvent>,
    pub cache_stats: CacheStats,
}

/// Import view of an export: records stay raw so one bad record can be
/// skipped without rejecting the file. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
struct ImportDocument {
    earnings_events: Vec<serde_json::Value>,
}

impl CacheManager {
    /// Writes every cached event and the current stats to a JSON file
    ///
    /// Without `output`, writes `cache_export_<timestamp>.json` into
    /// [`CacheManager::export_dir`]. Returns the path written.
    pub fn export_json(&self, output: Option<&Path>) -> Result<PathBuf, CacheError> {
        let path = match output {
            Some(path) => path.to_path_buf(),
            None => self.export_dir().join(format!(
                "cache_export_{}.json",
                Local::now().format("%Y%m%d_%H%M%S")
            )),
        };

        let document = ExportDocument {
            export_time: Utc::now(),
            earnings_events: self.get_events(None, None, None),
            cache_stats: self.stats(),
        };

        let json = serde_json::to_string_pretty(&document).map_err(|source| CacheError::Json {
            path: path.clone(),
            source,
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, json).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;

        info!(
            path = %path.display(),
            events = document.earnings_events.len(),
            "exported cache"
        );
        Ok(path)
    }

    /// Imports the events of an export file, returning how many were written
    ///
    /// Records that fail to decode or validate are logged and skipped. A
    /// missing file or a document without an `earnings_events` array is an
    /// error.
    pub fn import_json(&self, path: &Path) -> Result<usize, CacheError> {
        let content = fs::read_to_string(path).map_err(|source| CacheError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let document: ImportDocument =
            serde_json::from_str(&content).map_err(|source| CacheError::Json {
                path: path.to_path_buf(),
                source,
            })?;

        let total = document.earnings_events.len();
        let events: Vec<EarningsEvent> = document
            .earnings_events
            .into_iter()
            .enumerate()
            .filter_map(|(idx, raw)| match serde_json::from_value::<EarningsEvent>(raw) {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(index = idx, error = %e, "skipping undecodable earnings record");
                    None
                }
            })
            .collect();

        let written = self.put_events(&events);
        info!(path = %path.display(), written, total, "imported cache export");
        Ok(written)
    }
}
