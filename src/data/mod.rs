//! Core record types for the earnings cache
//!
//! This module contains the two record kinds the cache stores (earnings events
//! and analyst snapshots) together with the provenance tag and the validation
//! errors shared by both.

pub mod analyst;
pub mod earnings;

pub use analyst::{AnalystSnapshot, Recommendation};
pub use earnings::{EarningsEvent, EarningsTime};

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provenance tag recording which producer generated a record
///
/// Stored as plain text. Parsing never fails: tags that follow neither the
/// `synthetic` nor the `external:<source>` convention are kept verbatim as
/// `Other`, so records from older producers are still accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DataSource {
    /// Generated fixture data, never real market data
    Synthetic,
    /// Retrieved from a named external source
    External(String),
    /// Free-form legacy tag
    Other(String),
}

impl DataSource {
    /// Creates an external provenance tag for the given source name
    pub fn external(source: impl Into<String>) -> Self {
        DataSource::External(source.into())
    }

    /// Returns true if the record was produced by the synthetic generator
    pub fn is_synthetic(&self) -> bool {
        matches!(self, DataSource::Synthetic)
    }
}

impl Default for DataSource {
    fn default() -> Self {
        DataSource::Other("unknown".to_string())
    }
}

impl From<&str> for DataSource {
    fn from(s: &str) -> Self {
        let tag = s.trim();
        if tag == "synthetic" {
            DataSource::Synthetic
        } else if let Some(source) = tag.strip_prefix("external:") {
            DataSource::External(source.to_string())
        } else {
            DataSource::Other(tag.to_string())
        }
    }
}

impl From<String> for DataSource {
    fn from(s: String) -> Self {
        DataSource::from(s.as_str())
    }
}

impl From<DataSource> for String {
    fn from(source: DataSource) -> Self {
        source.to_string()
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Synthetic => write!(f, "synthetic"),
            DataSource::External(source) => write!(f, "external:{}", source),
            DataSource::Other(tag) => write!(f, "{}", tag),
        }
    }
}

/// Reasons a record is rejected before it reaches storage
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecordError {
    /// The symbol is empty or whitespace
    #[error("symbol is empty")]
    EmptySymbol,

    /// A numeric field holds NaN or infinity
    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },

    /// A price that must be non-negative is negative
    #[error("{field} is negative: {value}")]
    Negative { field: &'static str, value: f64 },
}

/// Normalizes a ticker symbol for storage (trimmed, upper-cased)
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_uppercase()
}

/// Checks that an optional numeric field is finite when present
pub(crate) fn ensure_finite(field: &'static str, value: Option<f64>) -> Result<(), RecordError> {
    match value {
        Some(v) if !v.is_finite() => Err(RecordError::NonFinite { field }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_parses_synthetic() {
        assert_eq!(DataSource::from("synthetic"), DataSource::Synthetic);
        assert!(DataSource::from("synthetic").is_synthetic());
    }

    #[test]
    fn test_data_source_parses_external() {
        assert_eq!(
            DataSource::from("external:sec_edgar"),
            DataSource::External("sec_edgar".to_string())
        );
    }

    #[test]
    fn test_data_source_keeps_legacy_tags_verbatim() {
        let source = DataSource::from("sec_edgar_10-q_derived");
        assert_eq!(source, DataSource::Other("sec_edgar_10-q_derived".to_string()));
        assert_eq!(source.to_string(), "sec_edgar_10-q_derived");
    }

    #[test]
    fn test_data_source_display_matches_parse() {
        for tag in ["synthetic", "external:yahoo", "manual_input"] {
            assert_eq!(DataSource::from(tag).to_string(), tag);
        }
    }

    #[test]
    fn test_data_source_serializes_as_plain_string() {
        let json = serde_json::to_string(&DataSource::external("nasdaq")).unwrap();
        assert_eq!(json, "\"external:nasdaq\"");

        let parsed: DataSource = serde_json::from_str("\"manual_input\"").unwrap();
        assert_eq!(parsed, DataSource::Other("manual_input".to_string()));
    }

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol("  aapl "), "AAPL");
        assert_eq!(normalize_symbol("0700.hk"), "0700.HK");
    }

    #[test]
    fn test_ensure_finite() {
        assert!(ensure_finite("eps_estimate", None).is_ok());
        assert!(ensure_finite("eps_estimate", Some(1.5)).is_ok());
        assert_eq!(
            ensure_finite("eps_estimate", Some(f64::NAN)),
            Err(RecordError::NonFinite { field: "eps_estimate" })
        );
    }
}
