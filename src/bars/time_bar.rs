//! Fixed-width time bar aggregation.
//!
//! Trades are grouped into right-closed intervals `(b - w, b]` whose
//! boundaries `b` start at the first trade and step by the bar width `w`.
//! Every non-empty interval becomes one [`TimeBar`], labelled by its
//! boundary. Intervals without trades produce no bar.
//!
//! # Price change
//!
//! A bar's `price_delta` is its closing price minus the price in force when
//! the interval opened. For the first bar that is its own first trade. For
//! later bars it is the close of the previous non-empty bar. A bar whose
//! price did not move, including a single-trade first bar, has a delta of 0.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use crate::types::error::{VpinError, VpinResult};
use crate::types::trade::TradeRecord;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Aggregated trading activity over one fixed-width interval.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeBar {
    /// Boundary label of the interval.
    pub interval_start: DateTime<Utc>,

    /// Closing price minus opening reference price.
    pub price_delta: f64,

    /// Sum of trade volumes in the interval.
    pub total_volume: f64,

    /// Dense 1-based position, re-issued whenever bars are re-sorted.
    pub sequence_id: usize,
}

impl TimeBar {
    /// Creates a bar with an unassigned (zero) sequence id.
    #[must_use]
    pub fn new(interval_start: DateTime<Utc>, price_delta: f64, total_volume: f64) -> Self {
        Self {
            interval_start,
            price_delta,
            total_volume,
            sequence_id: 0,
        }
    }
}

/// Time bars plus the dispersion of their price changes.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBarSeries {
    /// Bars in interval order.
    pub bars: Vec<TimeBar>,

    /// Sample standard deviation (ddof = 1) of the bar price deltas.
    pub price_delta_std: f64,
}

impl TimeBarSeries {
    /// Sum of all bar volumes.
    #[must_use]
    pub fn total_volume(&self) -> f64 {
        self.bars.iter().map(|b| b.total_volume).sum()
    }

    /// Largest single bar volume, or zero for an empty series.
    #[must_use]
    pub fn max_bar_volume(&self) -> f64 {
        self.bars
            .iter()
            .map(|b| b.total_volume)
            .fold(0.0, f64::max)
    }
}

/// Builds fixed-width time bars from an ordered trade batch.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeDelta, TimeZone, Utc};
/// use vpin_rs::bars::TimeBarAggregator;
/// use vpin_rs::types::TradeRecord;
///
/// let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
/// let trades: Vec<_> = [100.0, 100.5, 100.2, 100.9]
///     .iter()
///     .enumerate()
///     .map(|(i, &p)| TradeRecord::new(start + TimeDelta::seconds(30 * i as i64), p, 10.0))
///     .collect();
///
/// let aggregator = TimeBarAggregator::new(60);
/// let series = aggregator.aggregate(&trades, 2).unwrap();
/// assert_eq!(series.bars.len(), 3);
/// assert!(series.price_delta_std > 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBarAggregator {
    /// Bar width.
    width: TimeDelta,
}

impl TimeBarAggregator {
    /// Creates an aggregator for bars of `timebarsize` seconds.
    #[must_use]
    pub fn new(timebarsize: u32) -> Self {
        Self {
            width: TimeDelta::seconds(i64::from(timebarsize)),
        }
    }

    /// Bar width.
    #[must_use]
    pub fn width(&self) -> TimeDelta {
        self.width
    }

    /// Groups trades into bars and computes the price-delta dispersion.
    ///
    /// Trades must already be validated: non-empty and chronologically
    /// non-decreasing.
    ///
    /// # Errors
    ///
    /// - `EmptyInput` if `trades` is empty
    /// - `TimeRangeError` if the batch span cannot be expressed in nanoseconds
    /// - `DegenerateDistribution` if the standard deviation of price deltas is
    ///   not a positive finite number
    /// - `InsufficientBars` if fewer than `samplength` bars result
    pub fn aggregate(&self, trades: &[TradeRecord], samplength: usize) -> VpinResult<TimeBarSeries> {
        let bars = self.build_bars(trades)?;

        let deltas: Vec<f64> = bars.iter().map(|b| b.price_delta).collect();
        let price_delta_std = sample_std_dev(&deltas);

        if !price_delta_std.is_finite() || price_delta_std <= 0.0 {
            return Err(VpinError::DegenerateDistribution(format!(
                "standard deviation of price changes across {} time bars is {price_delta_std}",
                bars.len()
            )));
        }

        if bars.len() < samplength {
            return Err(VpinError::InsufficientBars(format!(
                "{} time bars built, samplength requires at least {samplength}",
                bars.len()
            )));
        }

        debug!(
            bars = bars.len(),
            sdp = price_delta_std,
            "time bars aggregated"
        );

        Ok(TimeBarSeries {
            bars,
            price_delta_std,
        })
    }

    /// Builds bars in interval order with dense 1-based sequence ids.
    fn build_bars(&self, trades: &[TradeRecord]) -> VpinResult<Vec<TimeBar>> {
        let Some(first) = trades.first() else {
            return Err(VpinError::EmptyInput(
                "cannot build time bars from an empty trade sequence".to_string(),
            ));
        };
        let origin = first.timestamp;

        let mut bars: Vec<TimeBar> = Vec::new();
        let mut current: Option<(i64, BarAccumulator)> = None;
        let mut reference_price = first.price;

        for trade in trades {
            let slot = self.boundary_slot(origin, trade.timestamp)?;
            if let Some((open_slot, acc)) = current.as_mut() {
                if *open_slot == slot {
                    acc.push(trade);
                    continue;
                }
            }

            if let Some((closed_slot, acc)) = current.take() {
                bars.push(acc.finish(self.boundary(origin, closed_slot), reference_price));
                reference_price = acc.close;
            }
            current = Some((slot, BarAccumulator::open(trade)));
        }

        if let Some((closed_slot, acc)) = current {
            bars.push(acc.finish(self.boundary(origin, closed_slot), reference_price));
        }

        for (i, bar) in bars.iter_mut().enumerate() {
            bar.sequence_id = i + 1;
        }

        Ok(bars)
    }

    /// Index `k` of the first boundary `origin + k * width` at or after `timestamp`.
    fn boundary_slot(&self, origin: DateTime<Utc>, timestamp: DateTime<Utc>) -> VpinResult<i64> {
        let elapsed = (timestamp - origin).num_nanoseconds().ok_or_else(|| {
            VpinError::TimeRangeError(format!(
                "span from {origin} to {timestamp} overflows nanosecond precision"
            ))
        })?;
        let width = self.width.num_nanoseconds().unwrap_or(i64::MAX).max(1);

        // Trades are ordered, so elapsed is never negative.
        let slot = elapsed / width;
        Ok(if elapsed % width == 0 { slot } else { slot + 1 })
    }

    fn boundary(&self, origin: DateTime<Utc>, slot: i64) -> DateTime<Utc> {
        origin + TimeDelta::seconds(self.width.num_seconds() * slot)
    }
}

/// Running state of the bar under construction.
#[derive(Debug, Clone, Copy)]
struct BarAccumulator {
    close: f64,
    volume: f64,
}

impl BarAccumulator {
    fn open(trade: &TradeRecord) -> Self {
        Self {
            close: trade.price,
            volume: trade.volume,
        }
    }

    fn push(&mut self, trade: &TradeRecord) {
        self.close = trade.price;
        self.volume += trade.volume;
    }

    fn finish(&self, interval_start: DateTime<Utc>, reference_price: f64) -> TimeBar {
        TimeBar::new(interval_start, self.close - reference_price, self.volume)
    }
}

/// Sample standard deviation with Bessel's correction.
///
/// Returns NaN for fewer than two values.
#[must_use]
pub fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let sum_sq: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
    (sum_sq / (n - 1.0)).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    fn trade_at(secs: i64, price: f64, volume: f64) -> TradeRecord {
        TradeRecord::new(start() + TimeDelta::seconds(secs), price, volume)
    }

    #[test]
    fn test_right_closed_intervals() {
        let trades = vec![
            trade_at(0, 100.0, 1.0),
            trade_at(30, 101.0, 2.0),
            trade_at(60, 102.0, 3.0),
            trade_at(61, 101.5, 4.0),
            trade_at(120, 103.0, 5.0),
        ];
        let bars = TimeBarAggregator::new(60).build_bars(&trades).unwrap();

        assert_eq!(bars.len(), 3);
        // Trade exactly at the origin forms its own interval
        assert_eq!(bars[0].interval_start, start());
        assert_eq!(bars[0].total_volume, 1.0);
        assert_eq!(bars[0].price_delta, 0.0);
        // (0, 60]
        assert_eq!(bars[1].interval_start, start() + TimeDelta::seconds(60));
        assert_eq!(bars[1].total_volume, 5.0);
        assert!((bars[1].price_delta - 2.0).abs() < 1e-12);
        // (60, 120]
        assert_eq!(bars[2].interval_start, start() + TimeDelta::seconds(120));
        assert_eq!(bars[2].total_volume, 9.0);
        assert!((bars[2].price_delta - 1.0).abs() < 1e-12);
        // Volume conserved
        let total: f64 = bars.iter().map(|b| b.total_volume).sum();
        assert_eq!(total, 15.0);
    }

    #[test]
    fn test_empty_intervals_are_omitted() {
        let trades = vec![
            trade_at(0, 100.0, 1.0),
            trade_at(50, 100.5, 1.0),
            trade_at(400, 99.0, 1.0),
        ];
        let bars = TimeBarAggregator::new(60).build_bars(&trades).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[2].interval_start, start() + TimeDelta::seconds(420));
        // Delta spans the gap from the previous close
        assert!((bars[2].price_delta - (99.0 - 100.5)).abs() < 1e-12);
    }

    #[test]
    fn test_sequence_ids_dense() {
        let trades: Vec<_> = (0..6).map(|i| trade_at(i * 45, 100.0 + i as f64, 1.0)).collect();
        let bars = TimeBarAggregator::new(60).build_bars(&trades).unwrap();
        let ids: Vec<usize> = bars.iter().map(|b| b.sequence_id).collect();
        let expected: Vec<usize> = (1..=bars.len()).collect();
        assert_eq!(ids, expected);
    }

    #[test]
    fn test_aggregate_degenerate_distribution() {
        let trades: Vec<_> = (0..10).map(|i| trade_at(i * 60, 100.0, 1.0)).collect();
        let result = TimeBarAggregator::new(60).aggregate(&trades, 2);
        assert!(matches!(result, Err(VpinError::DegenerateDistribution(_))));
    }

    #[test]
    fn test_aggregate_bar_count_edges() {
        let trades: Vec<_> = (0..10).map(|i| trade_at(i, 100.0 + i as f64, 1.0)).collect();
        let result = TimeBarAggregator::new(3600).aggregate(&trades, 2);
        // First trade at the origin forms one bar, the rest another
        assert!(result.is_ok());

        let single = vec![trade_at(0, 100.0, 1.0)];
        let result = TimeBarAggregator::new(60).aggregate(&single, 1);
        assert!(matches!(result, Err(VpinError::DegenerateDistribution(_))));
    }

    #[test]
    fn test_aggregate_insufficient_bars() {
        let trades: Vec<_> = (0..4).map(|i| trade_at(i * 60, 100.0 + i as f64 * 0.5, 1.0)).collect();
        let result = TimeBarAggregator::new(60).aggregate(&trades, 10);
        assert!(matches!(result, Err(VpinError::InsufficientBars(_))));
    }

    #[test]
    fn test_aggregate_series_helpers() {
        let trades = vec![
            trade_at(0, 100.0, 1.0),
            trade_at(60, 101.0, 7.0),
            trade_at(120, 100.5, 3.0),
        ];
        let series = TimeBarAggregator::new(60).aggregate(&trades, 2).unwrap();
        assert_eq!(series.total_volume(), 11.0);
        assert_eq!(series.max_bar_volume(), 7.0);
    }

    #[test]
    fn test_sample_std_dev() {
        let std = sample_std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        // Sum of squares 32, n - 1 = 7
        assert!((std - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);

        assert!(sample_std_dev(&[1.0]).is_nan());
        assert!(sample_std_dev(&[]).is_nan());
        assert_eq!(sample_std_dev(&[3.0, 3.0, 3.0]), 0.0);
    }

    #[test]
    fn test_sub_second_timestamps() {
        let trades = vec![
            TradeRecord::new(start(), 100.0, 1.0),
            TradeRecord::new(start() + TimeDelta::microseconds(1), 100.1, 1.0),
            TradeRecord::new(start() + TimeDelta::seconds(1), 100.2, 1.0),
        ];
        let bars = TimeBarAggregator::new(1).build_bars(&trades).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[1].total_volume, 2.0);
    }
}
