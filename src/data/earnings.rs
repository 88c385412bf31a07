//! Earnings event records
//!
//! An earnings event is one company's scheduled (or already reported)
//! quarterly result, identified by its symbol and report date.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{ensure_finite, normalize_symbol, DataSource, RecordError};
use crate::cache::is_fresh;

/// When during the trading day a company reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EarningsTime {
    /// Before the market opens
    BeforeOpen,
    /// After the market closes
    AfterClose,
    /// While the market is open
    DuringHours,
    /// Not announced
    #[default]
    Unknown,
}

impl EarningsTime {
    /// Short code used for storage and export
    pub fn as_str(&self) -> &'static str {
        match self {
            EarningsTime::BeforeOpen => "BMO",
            EarningsTime::AfterClose => "AMC",
            EarningsTime::DuringHours => "DMH",
            EarningsTime::Unknown => "TBD",
        }
    }

    /// Parses a report-time label, case-insensitively
    ///
    /// Accepts the short codes as well as the long labels producers tend to
    /// scrape ("During Market Hours", "after close", ...). Anything
    /// unrecognized maps to `Unknown` rather than failing.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "bmo" | "before open" | "before market open" | "pre-market" | "premarket" => {
                EarningsTime::BeforeOpen
            }
            "amc" | "after close" | "after market close" | "post-market" | "postmarket" => {
                EarningsTime::AfterClose
            }
            "dmh" | "during market hours" | "during hours" | "intraday" => EarningsTime::DuringHours,
            _ => EarningsTime::Unknown,
        }
    }

    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            EarningsTime::BeforeOpen => "Before Open",
            EarningsTime::AfterClose => "After Close",
            EarningsTime::DuringHours => "During Market Hours",
            EarningsTime::Unknown => "Time TBD",
        }
    }
}

impl From<String> for EarningsTime {
    fn from(s: String) -> Self {
        EarningsTime::parse(&s)
    }
}

impl From<EarningsTime> for String {
    fn from(time: EarningsTime) -> Self {
        time.as_str().to_string()
    }
}

impl fmt::Display for EarningsTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A cached earnings event
///
/// Unique by `(symbol, earnings_date)`. `last_updated` is assigned by the
/// cache on every write and is `None` for records that have not been stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarningsEvent {
    /// Ticker symbol (e.g., "AAPL", "0700.HK")
    pub symbol: String,
    /// Company display name
    #[serde(default)]
    pub company_name: String,
    /// Report date
    pub earnings_date: NaiveDate,
    /// Report time of day
    #[serde(default)]
    pub earnings_time: EarningsTime,
    /// Free-form quarter label (e.g., "Q2 2025")
    #[serde(default)]
    pub quarter: String,
    /// Fiscal year the quarter belongs to
    pub fiscal_year: i32,
    #[serde(default)]
    pub eps_estimate: Option<f64>,
    #[serde(default)]
    pub eps_actual: Option<f64>,
    #[serde(default)]
    pub revenue_estimate: Option<f64>,
    #[serde(default)]
    pub revenue_actual: Option<f64>,
    /// Whether both EPS and revenue beat their estimates
    #[serde(default)]
    pub beat_estimate: Option<bool>,
    /// When the cache last wrote this record
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    /// Which producer generated the record
    #[serde(default)]
    pub data_source: DataSource,
}

impl EarningsEvent {
    /// Creates an event with no estimates or actuals
    pub fn new(
        symbol: impl Into<String>,
        company_name: impl Into<String>,
        earnings_date: NaiveDate,
        quarter: impl Into<String>,
        fiscal_year: i32,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            company_name: company_name.into(),
            earnings_date,
            earnings_time: EarningsTime::Unknown,
            quarter: quarter.into(),
            fiscal_year,
            eps_estimate: None,
            eps_actual: None,
            revenue_estimate: None,
            revenue_actual: None,
            beat_estimate: None,
            last_updated: None,
            data_source: DataSource::default(),
        }
    }

    pub fn with_time(mut self, earnings_time: EarningsTime) -> Self {
        self.earnings_time = earnings_time;
        self
    }

    pub fn with_eps(mut self, estimate: Option<f64>, actual: Option<f64>) -> Self {
        self.eps_estimate = estimate;
        self.eps_actual = actual;
        self
    }

    pub fn with_revenue(mut self, estimate: Option<f64>, actual: Option<f64>) -> Self {
        self.revenue_estimate = estimate;
        self.revenue_actual = actual;
        self
    }

    pub fn with_source(mut self, data_source: DataSource) -> Self {
        self.data_source = data_source;
        self
    }

    /// Computes `beat_estimate` from the estimates and actuals
    ///
    /// Returns `None` unless all four inputs are present. A beat requires
    /// actual > estimate on both EPS and revenue.
    pub fn derived_beat(&self) -> Option<bool> {
        match (
            self.eps_estimate,
            self.eps_actual,
            self.revenue_estimate,
            self.revenue_actual,
        ) {
            (Some(eps_est), Some(eps_act), Some(rev_est), Some(rev_act)) => {
                Some(eps_act > eps_est && rev_act > rev_est)
            }
            _ => None,
        }
    }

    /// Returns true once actual results have been reported
    pub fn is_reported(&self) -> bool {
        self.eps_actual.is_some() || self.revenue_actual.is_some()
    }

    /// Returns true if the report date is after `today`
    pub fn is_future(&self, today: NaiveDate) -> bool {
        self.earnings_date > today
    }

    /// Advisory staleness check against a caller-supplied window
    ///
    /// Records that were never stored are never fresh.
    pub fn is_fresh(&self, window_hours: u64) -> bool {
        self.last_updated
            .map(|ts| is_fresh(ts, window_hours, Utc::now()))
            .unwrap_or(false)
    }

    /// Checks the record is well-formed enough to store
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.symbol.trim().is_empty() {
            return Err(RecordError::EmptySymbol);
        }
        ensure_finite("eps_estimate", self.eps_estimate)?;
        ensure_finite("eps_actual", self.eps_actual)?;
        ensure_finite("revenue_estimate", self.revenue_estimate)?;
        ensure_finite("revenue_actual", self.revenue_actual)?;
        Ok(())
    }

    /// Returns the record as it will be stored: symbol normalized,
    /// `beat_estimate` derived, `last_updated` stamped
    pub(crate) fn prepared(&self, stamped_at: DateTime<Utc>) -> Self {
        let mut event = self.clone();
        event.symbol = normalize_symbol(&self.symbol);
        event.beat_estimate = self.derived_beat();
        event.last_updated = Some(stamped_at);
        event
    }
}
