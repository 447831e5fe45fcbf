//! Structural and numeric checks on a trade batch.

use chrono::{DateTime, TimeDelta, Utc};

use crate::types::error::{VpinError, VpinResult};
use crate::types::trade::{RawTrade, TradeRecord};

/// Fewest records accepted for an estimate.
pub const MIN_RECORDS: usize = 10;

/// 1990-01-01T00:00:00Z as Unix seconds; anything earlier is implausible.
pub const EARLIEST_PLAUSIBLE_EPOCH_SECS: i64 = 631_152_000;

/// How far past the current time the latest trade may lie.
pub const MAX_FUTURE_DAYS: i64 = 365;

/// Shortest accepted span between first and last trade.
pub const MIN_SPAN_SECS: i64 = 60;

/// Validates a typed trade batch against the current wall clock.
///
/// # Errors
///
/// See [`validate_trades_at`].
pub fn validate_trades(trades: &[TradeRecord]) -> VpinResult<()> {
    validate_trades_at(trades, Utc::now())
}

/// Validates a typed trade batch against an explicit clock.
///
/// Checks run in a fixed order and the first failure is returned:
///
/// 1. `EmptyInput` for an empty batch
/// 2. `InsufficientData` for fewer than [`MIN_RECORDS`] records
/// 3. `SchemaError` for a non-finite price or volume (the float form of a null)
/// 4. `InvalidVolume` for a volume that is zero or negative
/// 5. `UnorderedInput` for a timestamp earlier than its predecessor
/// 6. `TimeRangeError` for implausible timestamps or a span under one minute
///
/// # Errors
///
/// Returns the first violated condition as a [`VpinError`].
pub fn validate_trades_at(trades: &[TradeRecord], now: DateTime<Utc>) -> VpinResult<()> {
    if trades.is_empty() {
        return Err(VpinError::EmptyInput(
            "trade sequence contains no records".to_string(),
        ));
    }

    check_record_count(trades.len())?;

    for (i, trade) in trades.iter().enumerate() {
        if !trade.price.is_finite() {
            return Err(VpinError::SchemaError(format!(
                "record {i} has a missing or non-finite price"
            )));
        }
        if !trade.volume.is_finite() {
            return Err(VpinError::SchemaError(format!(
                "record {i} has a missing or non-finite volume"
            )));
        }
    }

    if let Some((i, trade)) = trades.iter().enumerate().find(|(_, t)| t.volume <= 0.0) {
        return Err(VpinError::InvalidVolume(format!(
            "record {i} has non-positive volume {}",
            trade.volume
        )));
    }

    if let Some(i) = trades
        .windows(2)
        .position(|pair| pair[1].timestamp < pair[0].timestamp)
    {
        return Err(VpinError::UnorderedInput(format!(
            "record {} at {} precedes record {} at {}",
            i + 1,
            trades[i + 1].timestamp,
            i,
            trades[i].timestamp
        )));
    }

    // Ordered, so the extremes sit at the ends.
    let first = trades[0].timestamp;
    let last = trades[trades.len() - 1].timestamp;
    check_time_range(first, last, now)
}

/// Converts loosely typed rows into trade records, then validates them.
///
/// A row with fewer than three present fields is a schema violation. Apart
/// from that, the checks are those of [`validate_trades_at`].
///
/// # Errors
///
/// Returns `EmptyInput`, `SchemaError` or any error of [`validate_trades_at`].
pub fn validate_raw_trades(rows: &[RawTrade], now: DateTime<Utc>) -> VpinResult<Vec<TradeRecord>> {
    if rows.is_empty() {
        return Err(VpinError::EmptyInput(
            "trade sequence contains no records".to_string(),
        ));
    }

    let mut trades = Vec::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        match row.to_record() {
            Some(trade) => trades.push(trade),
            None => {
                return Err(VpinError::SchemaError(format!(
                    "record {i} has {} of {} required fields (timestamp, price, volume)",
                    row.present_fields(),
                    RawTrade::FIELD_COUNT
                )));
            }
        }
    }

    validate_trades_at(&trades, now)?;
    Ok(trades)
}

/// Counts records whose timestamp equals that of the preceding record.
#[must_use]
pub fn duplicate_timestamp_count(trades: &[TradeRecord]) -> usize {
    trades
        .windows(2)
        .filter(|pair| pair[0].timestamp == pair[1].timestamp)
        .count()
}

fn check_record_count(count: usize) -> VpinResult<()> {
    if count < MIN_RECORDS {
        return Err(VpinError::InsufficientData(format!(
            "{count} records supplied, at least {MIN_RECORDS} required"
        )));
    }
    Ok(())
}

fn check_time_range(
    first: DateTime<Utc>,
    last: DateTime<Utc>,
    now: DateTime<Utc>,
) -> VpinResult<()> {
    if first.timestamp() < EARLIEST_PLAUSIBLE_EPOCH_SECS {
        return Err(VpinError::TimeRangeError(format!(
            "earliest timestamp {first} is before 1990-01-01"
        )));
    }

    if last > now + TimeDelta::days(MAX_FUTURE_DAYS) {
        return Err(VpinError::TimeRangeError(format!(
            "latest timestamp {last} is more than one year in the future"
        )));
    }

    if last - first < TimeDelta::seconds(MIN_SPAN_SECS) {
        return Err(VpinError::TimeRangeError(format!(
            "trades span {}s, at least {MIN_SPAN_SECS}s required",
            (last - first).num_seconds()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn minute_trades(count: usize) -> Vec<TradeRecord> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        (0..count)
            .map(|i| {
                TradeRecord::new(
                    start + TimeDelta::minutes(i as i64),
                    100.0 + i as f64 * 0.1,
                    1000.0,
                )
            })
            .collect()
    }

    #[test]
    fn test_valid_batch() {
        assert!(validate_trades_at(&minute_trades(12), now()).is_ok());
    }

    #[test]
    fn test_empty_input() {
        assert!(matches!(
            validate_trades_at(&[], now()),
            Err(VpinError::EmptyInput(_))
        ));
    }

    #[test]
    fn test_insufficient_data() {
        let trades = minute_trades(5);
        assert!(matches!(
            validate_trades_at(&trades, now()),
            Err(VpinError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_non_finite_fields() {
        let mut trades = minute_trades(12);
        trades[4].price = f64::NAN;
        assert!(matches!(
            validate_trades_at(&trades, now()),
            Err(VpinError::SchemaError(_))
        ));

        let mut trades = minute_trades(12);
        trades[7].volume = f64::INFINITY;
        assert!(matches!(
            validate_trades_at(&trades, now()),
            Err(VpinError::SchemaError(_))
        ));
    }

    #[test]
    fn test_invalid_volume() {
        let mut trades = minute_trades(12);
        trades[3].volume = 0.0;
        assert!(matches!(
            validate_trades_at(&trades, now()),
            Err(VpinError::InvalidVolume(_))
        ));

        trades[3].volume = -5.0;
        assert!(matches!(
            validate_trades_at(&trades, now()),
            Err(VpinError::InvalidVolume(_))
        ));
    }

    #[test]
    fn test_unordered_input() {
        let mut trades = minute_trades(12);
        trades.swap(5, 6);
        assert!(matches!(
            validate_trades_at(&trades, now()),
            Err(VpinError::UnorderedInput(_))
        ));
    }

    #[test]
    fn test_equal_timestamps_are_ordered() {
        let mut trades = minute_trades(12);
        trades[6].timestamp = trades[5].timestamp;
        assert!(validate_trades_at(&trades, now()).is_ok());
        assert_eq!(duplicate_timestamp_count(&trades), 1);
    }

    #[test]
    fn test_time_range_too_old() {
        let start = Utc.with_ymd_and_hms(1989, 12, 31, 23, 0, 0).unwrap();
        let trades: Vec<_> = (0..12)
            .map(|i| TradeRecord::new(start + TimeDelta::minutes(i), 10.0, 1.0))
            .collect();
        assert!(matches!(
            validate_trades_at(&trades, now()),
            Err(VpinError::TimeRangeError(_))
        ));
    }

    #[test]
    fn test_time_range_too_far_future() {
        let start = now() + TimeDelta::days(400);
        let trades: Vec<_> = (0..12)
            .map(|i| TradeRecord::new(start + TimeDelta::minutes(i), 10.0, 1.0))
            .collect();
        assert!(matches!(
            validate_trades_at(&trades, now()),
            Err(VpinError::TimeRangeError(_))
        ));
    }

    #[test]
    fn test_time_range_span_too_short() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
        let trades: Vec<_> = (0..12)
            .map(|i| TradeRecord::new(start + TimeDelta::seconds(i * 5), 10.0, 1.0))
            .collect();
        assert!(matches!(
            validate_trades_at(&trades, now()),
            Err(VpinError::TimeRangeError(_))
        ));
    }

    #[test]
    fn test_raw_rows_missing_field() {
        let mut rows: Vec<RawTrade> = minute_trades(12).into_iter().map(RawTrade::from).collect();
        rows[2].volume = None;
        assert!(matches!(
            validate_raw_trades(&rows, now()),
            Err(VpinError::SchemaError(_))
        ));
    }

    #[test]
    fn test_raw_rows_valid() {
        let trades = minute_trades(12);
        let rows: Vec<RawTrade> = trades.iter().copied().map(RawTrade::from).collect();
        assert_eq!(validate_raw_trades(&rows, now()).unwrap(), trades);
    }

    #[test]
    fn test_raw_rows_empty() {
        assert!(matches!(
            validate_raw_trades(&[], now()),
            Err(VpinError::EmptyInput(_))
        ));
    }
}
