//! Freshness and retention windows
//!
//! Freshness decides whether a caller should refresh a record; the cache never
//! acts on it. Retention decides when the sweep deletes a record.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Default window after which cached events should be refreshed
pub const EVENT_FRESHNESS_HOURS: u64 = 24;

/// Default window after which cached analyst snapshots should be refreshed
pub const SNAPSHOT_FRESHNESS_HOURS: u64 = 6;

/// Events not written for this many days are swept
pub const EVENT_RETENTION_DAYS: u32 = 30;

/// Snapshots not written for this many days are swept
pub const SNAPSHOT_RETENTION_DAYS: u32 = 7;

/// Returns whether `now - last_updated` is still inside the window
///
/// Timestamps in the future count as fresh.
pub fn is_fresh(last_updated: DateTime<Utc>, window_hours: u64, now: DateTime<Utc>) -> bool {
    let window_secs = window_hours
        .saturating_mul(3600)
        .min((i64::MAX / 1000) as u64) as i64;
    now.signed_duration_since(last_updated) < Duration::seconds(window_secs)
}

/// How long each record kind survives without being rewritten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub event_retention_days: u32,
    pub snapshot_retention_days: u32,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            event_retention_days: EVENT_RETENTION_DAYS,
            snapshot_retention_days: SNAPSHOT_RETENTION_DAYS,
        }
    }
}

fn days_before(now: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    now.checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

impl RetentionPolicy {
    /// Events last updated before this instant are expired
    ///
    /// Windows reaching past the earliest representable instant clamp to it,
    /// so nothing is expired.
    pub fn event_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        days_before(now, self.event_retention_days)
    }

    /// Snapshots last updated before this instant are expired
    pub fn snapshot_cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        days_before(now, self.snapshot_retention_days)
    }
}
