//! SQLite schema, migrations and row mapping

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use tracing::info;

use crate::data::{AnalystSnapshot, DataSource, EarningsEvent, EarningsTime, Recommendation};

/// Schema migrations, applied in order and tracked with `PRAGMA user_version`
const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS earnings_events (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        symbol TEXT NOT NULL,
        company_name TEXT NOT NULL DEFAULT '',
        earnings_date TEXT NOT NULL,
        earnings_time TEXT NOT NULL DEFAULT 'TBD',
        quarter TEXT NOT NULL DEFAULT '',
        fiscal_year INTEGER NOT NULL,
        eps_estimate REAL,
        eps_actual REAL,
        revenue_estimate REAL,
        revenue_actual REAL,
        beat_estimate INTEGER,
        last_updated TEXT NOT NULL,
        data_source TEXT NOT NULL,
        UNIQUE(symbol, earnings_date)
    );

    CREATE TABLE IF NOT EXISTS analyst_snapshots (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        symbol TEXT NOT NULL,
        current_price REAL NOT NULL,
        target_mean REAL,
        target_high REAL,
        target_low REAL,
        recommendation TEXT,
        analyst_count INTEGER,
        last_updated TEXT NOT NULL,
        data_source TEXT NOT NULL,
        UNIQUE(symbol)
    );

    CREATE INDEX IF NOT EXISTS idx_earnings_symbol_date ON earnings_events(symbol, earnings_date);
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_earnings_date ON earnings_events(earnings_date);
    CREATE INDEX IF NOT EXISTS idx_earnings_last_updated ON earnings_events(last_updated);
    CREATE INDEX IF NOT EXISTS idx_analyst_last_updated ON analyst_snapshots(last_updated);
    "#,
];

pub(crate) const UPSERT_EVENT_SQL: &str = r#"
    INSERT OR REPLACE INTO earnings_events
    (symbol, company_name, earnings_date, earnings_time, quarter, fiscal_year,
     eps_estimate, eps_actual, revenue_estimate, revenue_actual, beat_estimate,
     last_updated, data_source)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
"#;

pub(crate) const UPSERT_SNAPSHOT_SQL: &str = r#"
    INSERT OR REPLACE INTO analyst_snapshots
    (symbol, current_price, target_mean, target_high, target_low,
     recommendation, analyst_count, last_updated, data_source)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
"#;

pub(crate) const EVENT_COLUMNS: &str = "symbol, company_name, earnings_date, earnings_time, \
     quarter, fiscal_year, eps_estimate, eps_actual, revenue_estimate, revenue_actual, \
     beat_estimate, last_updated, data_source";

pub(crate) const SNAPSHOT_COLUMNS: &str = "symbol, current_price, target_mean, target_high, \
     target_low, recommendation, analyst_count, last_updated, data_source";

/// Current schema version
pub(crate) fn schema_version() -> i64 {
    MIGRATIONS.len() as i64
}

/// Brings the database up to the latest schema version
///
/// Each migration and its version bump commit together.
pub(crate) fn migrate(conn: &Connection) -> rusqlite::Result<()> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    for (idx, sql) in MIGRATIONS.iter().enumerate().skip(current.max(0) as usize) {
        let version = idx + 1;
        conn.execute_batch(&format!(
            "BEGIN;\n{}\nPRAGMA user_version = {};\nCOMMIT;",
            sql, version
        ))?;
        info!(version, "applied cache schema migration");
    }

    Ok(())
}

/// Formats a timestamp as fixed-width RFC 3339 UTC text
///
/// Fixed width keeps lexical order equal to time order, which the sweep's
/// `last_updated < cutoff` comparison relies on.
pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

pub(crate) fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn conversion_error(idx: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, message.into())
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_timestamp(&raw).ok_or_else(|| conversion_error(idx, format!("bad timestamp '{}'", raw)))
}

/// Maps a row selected with `EVENT_COLUMNS`
pub(crate) fn event_from_row(row: &Row<'_>) -> rusqlite::Result<EarningsEvent> {
    let raw_date: String = row.get(2)?;
    let earnings_date = NaiveDate::parse_from_str(&raw_date, "%Y-%m-%d")
        .map_err(|_| conversion_error(2, format!("bad date '{}'", raw_date)))?;
    let earnings_time: String = row.get(3)?;
    let data_source: String = row.get(12)?;

    Ok(EarningsEvent {
        symbol: row.get(0)?,
        company_name: row.get(1)?,
        earnings_date,
        earnings_time: EarningsTime::parse(&earnings_time),
        quarter: row.get(4)?,
        fiscal_year: row.get(5)?,
        eps_estimate: row.get(6)?,
        eps_actual: row.get(7)?,
        revenue_estimate: row.get(8)?,
        revenue_actual: row.get(9)?,
        beat_estimate: row.get(10)?,
        last_updated: Some(timestamp_column(row, 11)?),
        data_source: DataSource::from(data_source),
    })
}

/// Maps a row selected with `SNAPSHOT_COLUMNS`
pub(crate) fn snapshot_from_row(row: &Row<'_>) -> rusqlite::Result<AnalystSnapshot> {
    let recommendation: Option<String> = row.get(5)?;
    let data_source: String = row.get(8)?;

    Ok(AnalystSnapshot {
        symbol: row.get(0)?,
        current_price: row.get(1)?,
        target_mean: row.get(2)?,
        target_high: row.get(3)?,
        target_low: row.get(4)?,
        recommendation: recommendation.map(Recommendation::from),
        analyst_count: row.get(6)?,
        last_updated: Some(timestamp_column(row, 7)?),
        data_source: DataSource::from(data_source),
    })
}
