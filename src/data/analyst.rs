//! Analyst snapshot records

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ensure_finite, normalize_symbol, DataSource, RecordError};
use crate::cache::is_fresh;

/// Consensus analyst recommendation
///
/// Known keys map to named variants; any other key is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Hold,
    Underperform,
    Sell,
    Other(String),
}

impl Recommendation {
    pub fn as_key(&self) -> &str {
        match self {
            Recommendation::StrongBuy => "strong_buy",
            Recommendation::Buy => "buy",
            Recommendation::Hold => "hold",
            Recommendation::Underperform => "underperform",
            Recommendation::Sell => "sell",
            Recommendation::Other(key) => key,
        }
    }
}

impl From<&str> for Recommendation {
    fn from(s: &str) -> Self {
        let key = s.trim().to_lowercase().replace(&[' ', '-'][..], "_");
        match key.as_str() {
            "strong_buy" => Recommendation::StrongBuy,
            "buy" | "outperform" => Recommendation::Buy,
            "hold" | "neutral" => Recommendation::Hold,
            "underperform" => Recommendation::Underperform,
            "sell" => Recommendation::Sell,
            _ => Recommendation::Other(s.trim().to_string()),
        }
    }
}

impl From<String> for Recommendation {
    fn from(s: String) -> Self {
        Recommendation::from(s.as_str())
    }
}

impl From<Recommendation> for String {
    fn from(rec: Recommendation) -> Self {
        rec.as_key().to_string()
    }
}

impl fmt::Display for Recommendation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_key())
    }
}

/// Latest analyst consensus for one symbol
///
/// At most one snapshot exists per symbol; writing a new one replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalystSnapshot {
    pub symbol: String,
    /// Last traded price
    pub current_price: f64,
    #[serde(default)]
    pub target_mean: Option<f64>,
    #[serde(default)]
    pub target_high: Option<f64>,
    #[serde(default)]
    pub target_low: Option<f64>,
    #[serde(default)]
    pub recommendation: Option<Recommendation>,
    #[serde(default)]
    pub analyst_count: Option<u32>,
    #[serde(default)]
    pub last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub data_source: DataSource,
}

impl AnalystSnapshot {
    /// Creates a snapshot with only a price
    pub fn new(symbol: impl Into<String>, current_price: f64) -> Self {
        Self {
            symbol: symbol.into(),
            current_price,
            target_mean: None,
            target_high: None,
            target_low: None,
            recommendation: None,
            analyst_count: None,
            last_updated: None,
            data_source: DataSource::default(),
        }
    }

    pub fn with_targets(mut self, low: Option<f64>, mean: Option<f64>, high: Option<f64>) -> Self {
        self.target_low = low;
        self.target_mean = mean;
        self.target_high = high;
        self
    }

    pub fn with_recommendation(mut self, recommendation: Recommendation, analyst_count: Option<u32>) -> Self {
        self.recommendation = Some(recommendation);
        self.analyst_count = analyst_count;
        self
    }

    pub fn with_source(mut self, data_source: DataSource) -> Self {
        self.data_source = data_source;
        self
    }

    /// Upside from the current price to the mean target, as a fraction
    ///
    /// `None` without a mean target or when the price is not positive.
    pub fn consensus_upside(&self) -> Option<f64> {
        let mean = self.target_mean?;
        if self.current_price > 0.0 {
            Some(mean / self.current_price - 1.0)
        } else {
            None
        }
    }

    /// Advisory staleness check against a caller-supplied window
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
        ensure_finite("current_price", Some(self.current_price))?;
        if self.current_price < 0.0 {
            return Err(RecordError::Negative {
                field: "current_price",
                value: self.current_price,
            });
        }
        ensure_finite("target_mean", self.target_mean)?;
        ensure_finite("target_high", self.target_high)?;
        ensure_finite("target_low", self.target_low)?;
        Ok(())
    }

    pub(crate) fn prepared(&self, stamped_at: DateTime<Utc>) -> Self {
        let mut snapshot = self.clone();
        snapshot.symbol = normalize_symbol(&self.symbol);
        snapshot.last_updated = Some(stamped_at);
        snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommendation_known_keys() {
        assert_eq!(Recommendation::from("buy"), Recommendation::Buy);
        assert_eq!(Recommendation::from("Strong Buy"), Recommendation::StrongBuy);
        assert_eq!(Recommendation::from("strong-buy"), Recommendation::StrongBuy);
        assert_eq!(Recommendation::from("neutral"), Recommendation::Hold);
        assert_eq!(Recommendation::from("SELL"), Recommendation::Sell);
    }

    #[test]
    fn test_recommendation_free_form_key_kept() {
        let rec = Recommendation::from("accumulate");
        assert_eq!(rec, Recommendation::Other("accumulate".to_string()));
        assert_eq!(rec.as_key(), "accumulate");
    }

    #[test]
    fn test_consensus_upside() {
        let snapshot = AnalystSnapshot::new("AAPL", 200.0).with_targets(None, Some(250.0), None);
        let upside = snapshot.consensus_upside().unwrap();
        assert!((upside - 0.25).abs() < 1e-9);

        assert!(AnalystSnapshot::new("AAPL", 200.0).consensus_upside().is_none());
        assert!(AnalystSnapshot::new("AAPL", 0.0)
            .with_targets(None, Some(10.0), None)
            .consensus_upside()
            .is_none());
    }

    #[test]
    fn test_validate_price() {
        assert!(AnalystSnapshot::new("AAPL", 230.5).validate().is_ok());
        assert_eq!(
            AnalystSnapshot::new("AAPL", f64::NAN).validate(),
            Err(RecordError::NonFinite { field: "current_price" })
        );
        assert!(matches!(
            AnalystSnapshot::new("AAPL", -1.0).validate(),
            Err(RecordError::Negative { field: "current_price", .. })
        ));
        assert_eq!(
            AnalystSnapshot::new("", 10.0).validate(),
            Err(RecordError::EmptySymbol)
        );
    }

    #[test]
    fn test_deserialize_requires_current_price() {
        let json = r#"{"symbol": "AAPL", "target_mean": 250.0}"#;
        assert!(serde_json::from_str::<AnalystSnapshot>(json).is_err());
    }

    #[test]
    fn test_deserialize_recommendation_key() {
        let json = r#"{"symbol": "AAPL", "current_price": 230.5, "recommendation": "buy"}"#;
        let snapshot: AnalystSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.recommendation, Some(Recommendation::Buy));
    }
}
