//! Trade records consumed by the pipeline.

use chrono::{DateTime, Utc};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A single executed trade.
///
/// Records are owned by the caller and only borrowed by the pipeline.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeZone, Utc};
/// use vpin_rs::types::TradeRecord;
///
/// let ts = Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap();
/// let trade = TradeRecord::new(ts, 101.25, 300.0);
/// assert_eq!(trade.notional(), 30375.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TradeRecord {
    /// Execution time.
    pub timestamp: DateTime<Utc>,

    /// Execution price.
    pub price: f64,

    /// Executed quantity, strictly positive.
    pub volume: f64,
}

impl TradeRecord {
    /// Creates a new trade record.
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, price: f64, volume: f64) -> Self {
        Self {
            timestamp,
            price,
            volume,
        }
    }

    /// Returns price times volume.
    #[must_use]
    pub fn notional(&self) -> f64 {
        self.price * self.volume
    }
}

/// A loosely typed trade row whose fields may be absent.
///
/// Ingestion layers that cannot guarantee complete rows hand these to
/// [`validate_raw_trades`](crate::validation::validate_raw_trades), which
/// rejects incomplete rows with a schema error.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawTrade {
    /// Execution time, if present.
    pub timestamp: Option<DateTime<Utc>>,

    /// Execution price, if present.
    pub price: Option<f64>,

    /// Executed quantity, if present.
    pub volume: Option<f64>,
}

impl RawTrade {
    /// Number of fields a complete row carries.
    pub const FIELD_COUNT: usize = 3;

    /// Creates a raw row from optional fields.
    #[must_use]
    pub fn new(timestamp: Option<DateTime<Utc>>, price: Option<f64>, volume: Option<f64>) -> Self {
        Self {
            timestamp,
            price,
            volume,
        }
    }

    /// Returns how many of the three fields are present.
    #[must_use]
    pub fn present_fields(&self) -> usize {
        usize::from(self.timestamp.is_some())
            + usize::from(self.price.is_some())
            + usize::from(self.volume.is_some())
    }

    /// Converts into a typed record when every field is present.
    #[must_use]
    pub fn to_record(&self) -> Option<TradeRecord> {
        Some(TradeRecord::new(self.timestamp?, self.price?, self.volume?))
    }
}

impl From<TradeRecord> for RawTrade {
    fn from(trade: TradeRecord) -> Self {
        Self::new(Some(trade.timestamp), Some(trade.price), Some(trade.volume))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 14, 30, 0).unwrap()
    }

    #[test]
    fn test_trade_record_new() {
        let trade = TradeRecord::new(ts(), 100.0, 25.0);
        assert_eq!(trade.timestamp, ts());
        assert_eq!(trade.price, 100.0);
        assert_eq!(trade.volume, 25.0);
        assert_eq!(trade.notional(), 2500.0);
    }

    #[test]
    fn test_raw_trade_present_fields() {
        assert_eq!(RawTrade::default().present_fields(), 0);
        assert_eq!(RawTrade::new(Some(ts()), None, Some(1.0)).present_fields(), 2);
        assert_eq!(
            RawTrade::new(Some(ts()), Some(10.0), Some(1.0)).present_fields(),
            RawTrade::FIELD_COUNT
        );
    }

    #[test]
    fn test_raw_trade_to_record() {
        let raw = RawTrade::new(Some(ts()), Some(10.0), Some(1.0));
        assert_eq!(raw.to_record(), Some(TradeRecord::new(ts(), 10.0, 1.0)));

        let incomplete = RawTrade::new(Some(ts()), None, Some(1.0));
        assert!(incomplete.to_record().is_none());
    }

    #[test]
    fn test_raw_trade_from_record() {
        let trade = TradeRecord::new(ts(), 99.5, 7.0);
        let raw = RawTrade::from(trade);
        assert_eq!(raw.present_fields(), 3);
        assert_eq!(raw.to_record(), Some(trade));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_trade_record_serialization() {
        let trade = TradeRecord::new(ts(), 99.5, 7.0);
        let json = serde_json::to_string(&trade).unwrap();
        let deserialized: TradeRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(trade, deserialized);
    }
}
