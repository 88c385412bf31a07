//! Cache manager for persisting earnings events and analyst snapshots
//!
//! Provides a `CacheManager` that owns one SQLite connection. Each record is
//! committed on its own, so a failing record never rolls back its neighbours
//! and an interrupted batch keeps whatever was already written.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Local, NaiveDate, SubsecRound, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::policy::RetentionPolicy;
use super::schema::{
    self, event_from_row, format_date, format_timestamp, parse_timestamp, snapshot_from_row,
    EVENT_COLUMNS, SNAPSHOT_COLUMNS, UPSERT_EVENT_SQL, UPSERT_SNAPSHOT_SQL,
};
use super::CacheError;
use crate::data::{normalize_symbol, AnalystSnapshot, EarningsEvent};

/// How long a writer waits for the database lock before giving up
const BUSY_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// Aggregate counts for observability
///
/// The `latest_*` fields are `None` when no record of that kind exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub event_count: usize,
    pub snapshot_count: usize,
    #[serde(default)]
    pub latest_event_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub latest_snapshot_update: Option<DateTime<Utc>>,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn latest(ts: &Option<DateTime<Utc>>) -> String {
            ts.map(|t| t.to_rfc3339()).unwrap_or_else(|| "no data".to_string())
        }
        writeln!(f, "earnings events:      {}", self.event_count)?;
        writeln!(f, "analyst snapshots:    {}", self.snapshot_count)?;
        writeln!(f, "latest event update:  {}", latest(&self.latest_event_update))?;
        write!(f, "latest analyst update: {}", latest(&self.latest_snapshot_update))
    }
}

/// An event joined with its symbol's analyst snapshot, if any
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDetail {
    pub event: EarningsEvent,
    /// `None` means no analyst coverage
    pub snapshot: Option<AnalystSnapshot>,
    /// Whether the report date is still ahead
    pub is_future: bool,
}

/// Manages reading and writing cached records in SQLite
///
/// Construct one per process (or per test) and pass it to whatever needs the
/// cache. Concurrent writers from other processes are serialized by SQLite.
#[derive(Debug)]
pub struct CacheManager {
    conn: Connection,
    /// Database file, `None` for in-memory caches
    path: Option<PathBuf>,
    retention: RetentionPolicy,
}

impl CacheManager {
    /// Opens (or creates) the cache database at `path`
    ///
    /// Creates the parent directory if needed and migrates the schema.
    ///
    /// # Arguments
    /// * `path` - Location of the SQLite database file
    /// * `retention` - Windows used by [`CacheManager::sweep_expired`]
    ///
    /// # Returns
    /// * `Ok(CacheManager)` once the database is open and migrated
    /// * `Err(CacheError)` if the directory, connection or migration fails
    pub fn open(path: impl AsRef<Path>, retention: RetentionPolicy) -> Result<Self, CacheError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(journal_mode = %mode, path = %path.display(), "opened cache database");

        Self::init(conn, Some(path.to_path_buf()), retention)
    }

    /// Opens a private in-memory cache
    ///
    /// Useful for testing; contents vanish when the manager is dropped.
    pub fn open_in_memory(retention: RetentionPolicy) -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None, retention)
    }

    fn init(
        conn: Connection,
        path: Option<PathBuf>,
        retention: RetentionPolicy,
    ) -> Result<Self, CacheError> {
        schema::migrate(&conn)?;
        info!(
            schema_version = schema::schema_version(),
            in_memory = path.is_none(),
            "cache database ready"
        );
        Ok(Self {
            conn,
            path,
            retention,
        })
    }

    /// Path of the database file, `None` for in-memory caches
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Directory default exports are written to (next to the database)
    pub fn export_dir(&self) -> PathBuf {
        self.path
            .as_deref()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Upserts a batch of events, returning how many rows were written
    ///
    /// Every record is stamped with the same `last_updated`. Malformed records
    /// and storage failures are logged and skipped without affecting the rest
    /// of the batch.
    ///
    /// # Arguments
    /// * `events` - Records to upsert, keyed by (symbol, earnings_date)
    ///
    /// # Returns
    /// The number of records actually written
    pub fn put_events(&self, events: &[EarningsEvent]) -> usize {
        self.put_events_at(events, Utc::now())
    }

    pub(crate) fn put_events_at(&self, events: &[EarningsEvent], now: DateTime<Utc>) -> usize {
        if events.is_empty() {
            return 0;
        }

        let stamped_at = now.trunc_subsecs(6);
        let mut stmt = match self.conn.prepare_cached(UPSERT_EVENT_SQL) {
            Ok(stmt) => stmt,
            Err(e) => {
                error!(error = %e, batch = events.len(), "failed to prepare event upsert");
                return 0;
            }
        };

        let mut written = 0;
        for event in events {
            if let Err(e) = event.validate() {
                warn!(symbol = %event.symbol, date = %event.earnings_date, reason = %e, "skipping malformed earnings event");
                continue;
            }

            let event = event.prepared(stamped_at);
            let result = stmt.execute(params![
                event.symbol,
                event.company_name,
                format_date(event.earnings_date),
                event.earnings_time.as_str(),
                event.quarter,
                event.fiscal_year,
                event.eps_estimate,
                event.eps_actual,
                event.revenue_estimate,
                event.revenue_actual,
                event.beat_estimate,
                format_timestamp(stamped_at),
                event.data_source.to_string(),
            ]);

            match result {
                Ok(_) => written += 1,
                Err(e) => {
                    error!(symbol = %event.symbol, date = %event.earnings_date, error = %e, "failed to cache earnings event");
                }
            }
        }

        info!(written, batch = events.len(), "cached earnings events");
        written
    }

    /// Returns events matching every given filter, oldest report date first
    ///
    /// The date range is inclusive on both ends; `None` leaves that side
    /// unbounded. Storage errors are logged and yield an empty list.
    ///
    /// # Arguments
    /// * `symbol` - Only events for this symbol (case-insensitive)
    /// * `start_date` - Earliest report date to include
    /// * `end_date` - Latest report date to include
    ///
    /// # Returns
    /// Matching events sorted by report date, then symbol
    pub fn get_events(
        &self,
        symbol: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Vec<EarningsEvent> {
        match self.query_events(symbol, start_date, end_date) {
            Ok(events) => events,
            Err(e) => {
                error!(error = %e, ?symbol, ?start_date, ?end_date, "failed to read earnings events");
                Vec::new()
            }
        }
    }

    fn query_events(
        &self,
        symbol: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> rusqlite::Result<Vec<EarningsEvent>> {
        let mut sql = format!("SELECT {} FROM earnings_events WHERE 1=1", EVENT_COLUMNS);
        let mut values: Vec<String> = Vec::new();

        if let Some(symbol) = symbol {
            values.push(normalize_symbol(symbol));
            sql.push_str(&format!(" AND symbol = ?{}", values.len()));
        }
        if let Some(start) = start_date {
            values.push(format_date(start));
            sql.push_str(&format!(" AND earnings_date >= ?{}", values.len()));
        }
        if let Some(end) = end_date {
            values.push(format_date(end));
            sql.push_str(&format!(" AND earnings_date <= ?{}", values.len()));
        }
        sql.push_str(" ORDER BY earnings_date, symbol");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(values.iter()), event_from_row)?;

        let mut events = Vec::new();
        for row in rows {
            match row {
                Ok(event) => events.push(event),
                Err(e) => warn!(error = %e, "skipping unreadable earnings row"),
            }
        }

        debug!(count = events.len(), ?symbol, ?start_date, ?end_date, "queried earnings events");
        Ok(events)
    }

    /// Upserts one analyst snapshot, replacing any existing one for the symbol
    ///
    /// # Arguments
    /// * `snapshot` - The snapshot to store
    ///
    /// # Returns
    /// * `true` if the snapshot was written
    /// * `false` if it was malformed or the write failed (logged)
    pub fn put_snapshot(&self, snapshot: &AnalystSnapshot) -> bool {
        self.put_snapshot_at(snapshot, Utc::now())
    }

    pub(crate) fn put_snapshot_at(&self, snapshot: &AnalystSnapshot, now: DateTime<Utc>) -> bool {
        if let Err(e) = snapshot.validate() {
            warn!(symbol = %snapshot.symbol, reason = %e, "skipping malformed analyst snapshot");
            return false;
        }

        let stamped_at = now.trunc_subsecs(6);
        let snapshot = snapshot.prepared(stamped_at);
        let result = self.conn.execute(
            UPSERT_SNAPSHOT_SQL,
            params![
                snapshot.symbol,
                snapshot.current_price,
                snapshot.target_mean,
                snapshot.target_high,
                snapshot.target_low,
                snapshot.recommendation.as_ref().map(|r| r.as_key()),
                snapshot.analyst_count,
                format_timestamp(stamped_at),
                snapshot.data_source.to_string(),
            ],
        );

        match result {
            Ok(_) => {
                info!(symbol = %snapshot.symbol, "cached analyst snapshot");
                true
            }
            Err(e) => {
                error!(symbol = %snapshot.symbol, error = %e, "failed to cache analyst snapshot");
                false
            }
        }
    }

    /// Looks up the snapshot for `symbol`
    ///
    /// `None` means no analyst coverage (or an unreadable row, which is logged).
    ///
    /// # Arguments
    /// * `symbol` - Ticker to look up (case-insensitive)
    pub fn get_snapshot(&self, symbol: &str) -> Option<AnalystSnapshot> {
        let symbol = normalize_symbol(symbol);
        let sql = format!(
            "SELECT {} FROM analyst_snapshots WHERE symbol = ?1",
            SNAPSHOT_COLUMNS
        );

        match self
            .conn
            .query_row(&sql, params![symbol], snapshot_from_row)
            .optional()
        {
            Ok(snapshot) => snapshot,
            Err(e) => {
                error!(%symbol, error = %e, "failed to read analyst snapshot");
                None
            }
        }
    }

    /// Joins the event on `symbol`/`date` with the symbol's snapshot
    ///
    /// # Returns
    /// * `Some(EventDetail)` with `snapshot: None` when the symbol has no coverage
    /// * `None` if no event exists for that symbol and date
    pub fn event_detail(&self, symbol: &str, date: NaiveDate) -> Option<EventDetail> {
        let event = self
            .get_events(Some(symbol), Some(date), Some(date))
            .into_iter()
            .next()?;
        let snapshot = self.get_snapshot(&event.symbol);
        let is_future = event.is_future(Local::now().date_naive());

        Some(EventDetail {
            event,
            snapshot,
            is_future,
        })
    }

    /// Deletes records past their retention window
    ///
    /// Returns the total number of rows removed across both tables. This is
    /// permanent; there is no soft delete.
    pub fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(Utc::now())
    }

    pub(crate) fn sweep_expired_at(&self, now: DateTime<Utc>) -> usize {
        let event_cutoff = format_timestamp(self.retention.event_cutoff(now));
        let snapshot_cutoff = format_timestamp(self.retention.snapshot_cutoff(now));

        let events_removed = self.delete_older_than("earnings_events", &event_cutoff);
        let snapshots_removed = self.delete_older_than("analyst_snapshots", &snapshot_cutoff);

        info!(
            events_removed,
            snapshots_removed, "swept expired cache entries"
        );
        events_removed + snapshots_removed
    }

    fn delete_older_than(&self, table: &'static str, cutoff: &str) -> usize {
        let sql = format!("DELETE FROM {} WHERE last_updated < ?1", table);
        match self.conn.execute(&sql, params![cutoff]) {
            Ok(removed) => removed,
            Err(e) => {
                error!(table, error = %e, "failed to sweep expired rows");
                0
            }
        }
    }

    /// Returns counts and latest write times; zeros on storage errors
    pub fn stats(&self) -> CacheStats {
        match self.query_stats() {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "failed to read cache stats");
                CacheStats::default()
            }
        }
    }

    fn query_stats(&self) -> rusqlite::Result<CacheStats> {
        let (event_count, latest_event): (i64, Option<String>) = self.conn.query_row(
            "SELECT COUNT(*), MAX(last_updated) FROM earnings_events",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let (snapshot_count, latest_snapshot): (i64, Option<String>) = self.conn.query_row(
            "SELECT COUNT(*), MAX(last_updated) FROM analyst_snapshots",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(CacheStats {
            event_count: event_count.max(0) as usize,
            snapshot_count: snapshot_count.max(0) as usize,
            latest_event_update: latest_event.as_deref().and_then(parse_timestamp),
            latest_snapshot_update: latest_snapshot.as_deref().and_then(parse_timestamp),
        })
    }
}
