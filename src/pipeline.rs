//! End-to-end VPIN estimation.
//!
//! Stages run strictly in order, each consuming the full output of the one
//! before:
//!
//! ```text
//! validate -> time bars -> volume buckets -> flow classification -> VPIN
//! ```
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeDelta, TimeZone, Utc};
//! use vpin_rs::pipeline::compute_vpin;
//! use vpin_rs::types::TradeRecord;
//!
//! let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
//! let prices = [100.0, 100.1, 100.05, 100.15, 100.2, 100.1, 100.25, 100.3, 100.2, 100.35, 100.4];
//! let volumes = [1000.0, 1500.0, 1200.0, 1800.0, 1600.0, 1400.0, 1700.0, 1900.0, 1300.0, 2000.0, 1100.0];
//! let trades: Vec<TradeRecord> = prices
//!     .iter()
//!     .zip(volumes.iter())
//!     .enumerate()
//!     .map(|(i, (&p, &v))| TradeRecord::new(start + TimeDelta::minutes(i as i64), p, v))
//!     .collect();
//!
//! let (daily, buckets) = compute_vpin(60, 5, 3, &trades).unwrap();
//!
//! let classified: f64 = buckets.iter().map(|b| b.buy_volume + b.sell_volume).sum();
//! assert!((classified - volumes.iter().sum::<f64>()).abs() < 1e-10);
//! assert!(buckets.iter().filter_map(|b| b.vpin).all(|v| (0.0..=1.0).contains(&v)));
//! assert_eq!(daily.len(), 1);
//! ```

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::analytics::{
    DailyVpin, Diagnostic, Diagnostics, ToxicityLevel, VolumeBucket, VpinAggregator, VpinStats,
};
use crate::bars::TimeBarAggregator;
use crate::bucketing::VolumeBucketer;
use crate::classification::FlowClassifier;
use crate::types::error::VpinResult;
use crate::types::trade::{RawTrade, TradeRecord};
use crate::validation::{
    VpinConfig, duplicate_timestamp_count, validate_raw_trades, validate_trades_at,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Computes bucket-level and daily VPIN for a batch of trades.
///
/// # Arguments
///
/// * `timebarsize` - Time bar width in seconds, in `(0, 3600]`
/// * `buckets` - Volume buckets per day, in `[5, 1000]`
/// * `samplength` - Rolling window length, in `[2, buckets)`
/// * `trades` - Chronologically ordered trades
///
/// # Returns
///
/// Daily mean VPIN ordered by day, and volume buckets ordered by index.
///
/// # Errors
///
/// Returns the first [`VpinError`](crate::types::VpinError) raised by
/// parameter validation, dataset validation or any pipeline stage.
pub fn compute_vpin(
    timebarsize: i64,
    buckets: i64,
    samplength: i64,
    trades: &[TradeRecord],
) -> VpinResult<(Vec<DailyVpin>, Vec<VolumeBucket>)> {
    let config = VpinConfig::new(timebarsize, buckets, samplength)?;
    let estimate = VpinEstimator::new(config).estimate(trades)?;
    Ok((estimate.daily, estimate.buckets))
}

/// Same as [`compute_vpin`] for rows whose fields may be missing.
///
/// # Errors
///
/// Returns `SchemaError` for any incomplete row, plus every error of
/// [`compute_vpin`].
pub fn compute_vpin_raw(
    timebarsize: i64,
    buckets: i64,
    samplength: i64,
    rows: &[RawTrade],
) -> VpinResult<(Vec<DailyVpin>, Vec<VolumeBucket>)> {
    let config = VpinConfig::new(timebarsize, buckets, samplength)?;
    let now = Utc::now();
    let trades = validate_raw_trades(rows, now)?;
    let estimate = VpinEstimator::new(config).estimate_at(&trades, now)?;
    Ok((estimate.daily, estimate.buckets))
}

/// Values resolved while estimating.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EstimateParameters {
    /// Time bar width in seconds.
    pub timebarsize: u32,

    /// Target buckets per day.
    pub buckets: u32,

    /// Rolling window length.
    pub samplength: u32,

    /// Derived volume per bucket (VBS).
    pub bucket_size: f64,

    /// Distinct calendar days in the batch.
    pub trading_days: usize,

    /// Standard deviation of time bar price changes.
    pub price_delta_std: f64,

    /// Number of time bars built.
    pub time_bar_count: usize,
}

/// Full result of a VPIN estimation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VpinEstimate {
    /// Parameters and derived quantities.
    pub parameters: EstimateParameters,

    /// Volume buckets ordered by index, with rolling VPIN.
    pub buckets: Vec<VolumeBucket>,

    /// Daily mean VPIN ordered by day.
    pub daily: Vec<DailyVpin>,

    /// Non-fatal conditions encountered.
    pub diagnostics: Vec<Diagnostic>,
}

impl VpinEstimate {
    /// Defined VPIN values in bucket order.
    #[must_use]
    pub fn vpin_values(&self) -> Vec<f64> {
        self.buckets.iter().filter_map(|b| b.vpin).collect()
    }

    /// VPIN of the last bucket that has one.
    #[must_use]
    pub fn latest_vpin(&self) -> Option<f64> {
        self.buckets.iter().rev().find_map(|b| b.vpin)
    }

    /// Summary statistics of the defined VPIN values.
    #[must_use]
    pub fn stats(&self) -> Option<VpinStats> {
        VpinStats::from_values(&self.vpin_values())
    }

    /// Toxicity level of the latest VPIN.
    #[must_use]
    pub fn toxicity_level(&self) -> Option<ToxicityLevel> {
        self.latest_vpin().map(ToxicityLevel::from_vpin)
    }

    /// Total classified volume across buckets.
    #[must_use]
    pub fn total_volume(&self) -> f64 {
        self.buckets.iter().map(VolumeBucket::total_volume).sum()
    }

    /// Daily mean VPIN for `day`, if any.
    #[must_use]
    pub fn vpin_on(&self, day: NaiveDate) -> Option<f64> {
        self.daily
            .iter()
            .find(|d| d.day == day)
            .map(|d| d.mean_vpin)
    }
}

impl fmt::Display for VpinEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = &self.parameters;
        writeln!(
            f,
            "VPIN estimate: timebarsize={}s buckets={} samplength={}",
            p.timebarsize, p.buckets, p.samplength
        )?;
        writeln!(
            f,
            "  vbs={:.4} days={} time bars={} sdp={:.6}",
            p.bucket_size, p.trading_days, p.time_bar_count, p.price_delta_std
        )?;
        writeln!(f, "  volume buckets: {}", self.buckets.len())?;
        if let Some(stats) = self.stats() {
            writeln!(
                f,
                "  vpin: mean={:.4} min={:.4} max={:.4} sd={:.4}",
                stats.mean, stats.min, stats.max, stats.std_dev
            )?;
        }
        for day in &self.daily {
            writeln!(f, "  {}: {:.4}", day.day, day.mean_vpin)?;
        }
        for diagnostic in &self.diagnostics {
            writeln!(f, "  warning: {diagnostic}")?;
        }
        Ok(())
    }
}

/// Runs the VPIN pipeline for a fixed configuration.
///
/// # Example
///
/// ```rust
/// use vpin_rs::pipeline::VpinEstimator;
/// use vpin_rs::validation::VpinConfig;
///
/// let estimator = VpinEstimator::new(VpinConfig::new(60, 50, 10).unwrap());
/// assert_eq!(estimator.config().samplength(), 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct VpinEstimator {
    config: VpinConfig,
}

impl VpinEstimator {
    /// Creates an estimator.
    #[must_use]
    pub fn new(config: VpinConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &VpinConfig {
        &self.config
    }

    /// Estimates VPIN, checking timestamps against the current time.
    ///
    /// # Errors
    ///
    /// See [`estimate_at`](Self::estimate_at).
    pub fn estimate(&self, trades: &[TradeRecord]) -> VpinResult<VpinEstimate> {
        self.estimate_at(trades, Utc::now())
    }

    /// Estimates VPIN, checking timestamps against `now`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by dataset validation, time bar
    /// aggregation, bucketing, classification or aggregation.
    pub fn estimate_at(
        &self,
        trades: &[TradeRecord],
        now: DateTime<Utc>,
    ) -> VpinResult<VpinEstimate> {
        validate_trades_at(trades, now)?;

        let samplength = self.config.samplength() as usize;
        let mut diagnostics = Diagnostics::new();
        diagnostics.check_window_ratio(self.config.samplength(), self.config.buckets());
        diagnostics.check_duplicates(duplicate_timestamp_count(trades));

        let series = TimeBarAggregator::new(self.config.timebarsize()).aggregate(trades, samplength)?;

        let trading_days = trading_days(trades);
        let bucket_size = VolumeBucketer::bucket_size_for(
            series.total_volume(),
            trading_days,
            self.config.buckets(),
        );
        let bucketer = VolumeBucketer::new(bucket_size)?;
        diagnostics.check_bucket_size(
            bucket_size,
            bucketer.split_threshold(),
            series.max_bar_volume(),
        );
        let bucketed = bucketer.bucketize(&series.bars);

        let classified = FlowClassifier::new(series.price_delta_std)?.classify(&bucketed);

        let (daily, buckets, out_of_range) =
            VpinAggregator::new(samplength, bucket_size)?.aggregate(&classified)?;
        diagnostics.extend(out_of_range);

        debug!(
            trades = trades.len(),
            buckets = buckets.len(),
            days = daily.len(),
            warnings = diagnostics.len(),
            "VPIN estimate complete"
        );

        Ok(VpinEstimate {
            parameters: EstimateParameters {
                timebarsize: self.config.timebarsize(),
                buckets: self.config.buckets(),
                samplength: self.config.samplength(),
                bucket_size,
                trading_days,
                price_delta_std: series.price_delta_std,
                time_bar_count: series.bars.len(),
            },
            buckets,
            daily,
            diagnostics: diagnostics.into_vec(),
        })
    }
}

/// Distinct UTC calendar days among trade timestamps.
fn trading_days(trades: &[TradeRecord]) -> usize {
    trades
        .iter()
        .map(|t| t.timestamp.date_naive())
        .collect::<BTreeSet<_>>()
        .len()
}
