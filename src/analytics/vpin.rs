//! VPIN (Volume-Synchronized Probability of Informed Trading) aggregation.
//!
//! This module turns classified bar volume into volume buckets, computes the
//! rolling VPIN over those buckets, and averages it per calendar day. VPIN was
//! introduced by Easley, López de Prado, and O'Hara in their 2012 paper "Flow
//! Toxicity and Liquidity in a High-Frequency World".
//!
//! # Algorithm
//!
//! 1. Sum classified buy and sell volume per bucket
//! 2. Take the absolute order imbalance of each bucket
//! 3. Accumulate imbalances in bucket order
//! 4. Difference the cumulative sums over a window of `L` buckets
//!
//! # Formula
//!
//! For bucket `τ`:
//! ```text
//! OI_τ = |V_buy - V_sell|
//! ```
//!
//! For the bucket at position `i ≥ L`:
//! ```text
//! VPIN_i = (Σ_{τ=i-L+1..i} OI_τ) / (L * VBS)
//! ```
//!
//! The first `L - 1` buckets have no VPIN.
//!
//! # Interpretation
//!
//! - VPIN range: [0, 1]
//! - Higher values indicate more toxic (informed) flow
//! - Typical alert threshold: 0.7
//!
//! # References
//!
//! Easley, D., López de Prado, M. M., & O'Hara, M. (2012).
//! "Flow Toxicity and Liquidity in a High-Frequency World."
//! The Review of Financial Studies, 25(5), 1457-1493.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use tracing::debug;

use crate::analytics::diagnostics::Diagnostic;
use crate::bars::sample_std_dev;
use crate::classification::ClassifiedBar;
use crate::types::error::{VpinError, VpinResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A completed volume bucket.
///
/// Each bucket holds roughly one bucket size of trading volume, with
/// classified buy and sell volume tracked separately.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VolumeBucket {
    /// 1-based bucket position.
    pub bucket_index: usize,

    /// Earliest interval contributing to the bucket.
    pub start_time: DateTime<Utc>,

    /// Latest interval contributing to the bucket.
    pub end_time: DateTime<Utc>,

    /// Classified buy volume.
    pub buy_volume: f64,

    /// Classified sell volume.
    pub sell_volume: f64,

    /// Absolute order imbalance: |buy - sell|.
    pub imbalance: f64,

    /// Rolling VPIN, undefined until the window is full.
    pub vpin: Option<f64>,
}

impl VolumeBucket {
    /// Creates a bucket with no VPIN yet.
    #[must_use]
    pub fn new(
        bucket_index: usize,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        buy_volume: f64,
        sell_volume: f64,
    ) -> Self {
        Self {
            bucket_index,
            start_time,
            end_time,
            buy_volume,
            sell_volume,
            imbalance: (buy_volume - sell_volume).abs(),
            vpin: None,
        }
    }

    /// Total volume in this bucket (buy + sell).
    #[must_use]
    pub fn total_volume(&self) -> f64 {
        self.buy_volume + self.sell_volume
    }

    /// Returns the signed imbalance share (positive = buy pressure).
    #[must_use]
    pub fn signed_imbalance(&self) -> f64 {
        let total = self.total_volume();
        if total > 0.0 {
            (self.buy_volume - self.sell_volume) / total
        } else {
            0.0
        }
    }

    /// Time between the first and last contributing interval.
    #[must_use]
    pub fn duration(&self) -> TimeDelta {
        self.end_time - self.start_time
    }

    /// Returns the buy/sell ratio, or None if no sells.
    #[must_use]
    pub fn buy_sell_ratio(&self) -> Option<f64> {
        if self.sell_volume > 0.0 {
            Some(self.buy_volume / self.sell_volume)
        } else {
            None
        }
    }

    /// Calendar day (UTC) the bucket starts on.
    #[must_use]
    pub fn day(&self) -> NaiveDate {
        self.start_time.date_naive()
    }
}

/// Mean VPIN for one calendar day.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DailyVpin {
    /// Calendar day (UTC) of the bucket start times.
    pub day: NaiveDate,

    /// Mean of the defined bucket VPIN values on that day.
    pub mean_vpin: f64,

    /// Number of buckets averaged.
    pub bucket_count: usize,
}

/// Coarse toxicity classification of a VPIN value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ToxicityLevel {
    /// VPIN below 0.3.
    Low,
    /// VPIN in [0.3, 0.5).
    Moderate,
    /// VPIN in [0.5, 0.7).
    Elevated,
    /// VPIN of 0.7 or more.
    High,
}

impl ToxicityLevel {
    /// Classifies a VPIN value.
    #[must_use]
    pub fn from_vpin(vpin: f64) -> Self {
        match vpin {
            v if v < 0.3 => Self::Low,
            v if v < 0.5 => Self::Moderate,
            v if v < 0.7 => Self::Elevated,
            _ => Self::High,
        }
    }

    /// Lowercase label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::Elevated => "elevated",
            Self::High => "high",
        }
    }
}

impl fmt::Display for ToxicityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary statistics over defined VPIN values.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VpinStats {
    /// Number of defined values.
    pub count: usize,

    /// Mean VPIN.
    pub mean: f64,

    /// Minimum VPIN.
    pub min: f64,

    /// Maximum VPIN.
    pub max: f64,

    /// Sample standard deviation, zero for a single value.
    pub std_dev: f64,
}

impl VpinStats {
    /// Computes statistics over the given values, or None if empty.
    #[must_use]
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let std_dev = if count > 1 { sample_std_dev(values) } else { 0.0 };

        Some(Self {
            count,
            mean,
            min,
            max,
            std_dev,
        })
    }
}

/// Aggregates classified bars into buckets and computes rolling VPIN.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeDelta, TimeZone, Utc};
/// use vpin_rs::analytics::VpinAggregator;
/// use vpin_rs::classification::ClassifiedBar;
///
/// let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
/// let bars: Vec<ClassifiedBar> = (1..=4)
///     .map(|i| ClassifiedBar {
///         interval_start: start + TimeDelta::minutes(i as i64),
///         bucket_index: i,
///         volume: 100.0,
///         buy_probability: 0.75,
///         buy_volume: 75.0,
///         sell_volume: 25.0,
///     })
///     .collect();
///
/// let aggregator = VpinAggregator::new(2, 100.0).unwrap();
/// let (daily, buckets, _) = aggregator.aggregate(&bars).unwrap();
///
/// assert!(buckets[0].vpin.is_none());
/// assert!((buckets[1].vpin.unwrap() - 0.5).abs() < 1e-12);
/// assert_eq!(daily.len(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VpinAggregator {
    /// Rolling window length in buckets.
    samplength: usize,

    /// Target volume per bucket.
    bucket_size: f64,
}

impl VpinAggregator {
    /// Creates an aggregator.
    ///
    /// # Errors
    ///
    /// Returns `VpinError::InvalidParameter` if `samplength` is zero, or
    /// `VpinError::DegenerateDistribution` if `bucket_size` is not positive
    /// and finite.
    pub fn new(samplength: usize, bucket_size: f64) -> VpinResult<Self> {
        if samplength == 0 {
            return Err(VpinError::InvalidParameter(
                "samplength must be greater than 0".to_string(),
            ));
        }

        if !bucket_size.is_finite() || bucket_size <= 0.0 {
            return Err(VpinError::DegenerateDistribution(format!(
                "volume bucket size must be positive and finite, got {bucket_size}"
            )));
        }

        Ok(Self {
            samplength,
            bucket_size,
        })
    }

    /// Rolling window length.
    #[must_use]
    pub fn samplength(&self) -> usize {
        self.samplength
    }

    /// Target volume per bucket.
    #[must_use]
    pub fn bucket_size(&self) -> f64 {
        self.bucket_size
    }

    /// Builds buckets, fills in rolling VPIN and averages it per day.
    ///
    /// Returns the daily means, the buckets in index order, and a diagnostic
    /// for every VPIN outside `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns `VpinError::InsufficientBuckets` if fewer buckets than
    /// `samplength` result.
    pub fn aggregate(
        &self,
        bars: &[ClassifiedBar],
    ) -> VpinResult<(Vec<DailyVpin>, Vec<VolumeBucket>, Vec<Diagnostic>)> {
        let mut buckets = self.build_buckets(bars)?;
        let diagnostics = self.apply_rolling_vpin(&mut buckets);
        let daily = daily_vpin(&buckets);

        debug!(
            buckets = buckets.len(),
            days = daily.len(),
            out_of_range = diagnostics.len(),
            "VPIN aggregated"
        );

        Ok((daily, buckets, diagnostics))
    }

    /// Sums classified volume per bucket index.
    ///
    /// # Errors
    ///
    /// Returns `VpinError::InsufficientBuckets` if fewer buckets than
    /// `samplength` result.
    pub fn build_buckets(&self, bars: &[ClassifiedBar]) -> VpinResult<Vec<VolumeBucket>> {
        let mut grouped: BTreeMap<usize, VolumeBucket> = BTreeMap::new();

        for bar in bars {
            grouped
                .entry(bar.bucket_index)
                .and_modify(|bucket| {
                    bucket.buy_volume += bar.buy_volume;
                    bucket.sell_volume += bar.sell_volume;
                    bucket.start_time = bucket.start_time.min(bar.interval_start);
                    bucket.end_time = bucket.end_time.max(bar.interval_start);
                })
                .or_insert_with(|| {
                    VolumeBucket::new(
                        bar.bucket_index,
                        bar.interval_start,
                        bar.interval_start,
                        bar.buy_volume,
                        bar.sell_volume,
                    )
                });
        }

        let buckets: Vec<VolumeBucket> = grouped
            .into_values()
            .map(|mut bucket| {
                bucket.imbalance = (bucket.buy_volume - bucket.sell_volume).abs();
                bucket
            })
            .collect();

        if buckets.len() < self.samplength {
            return Err(VpinError::InsufficientBuckets(format!(
                "{} volume buckets built, samplength requires at least {}",
                buckets.len(),
                self.samplength
            )));
        }

        Ok(buckets)
    }

    /// Writes rolling VPIN into buckets ordered by index.
    ///
    /// Values outside `[0, 1]` are kept and reported as diagnostics.
    pub fn apply_rolling_vpin(&self, buckets: &mut [VolumeBucket]) -> Vec<Diagnostic> {
        let imbalances: Vec<f64> = buckets.iter().map(|b| b.imbalance).collect();
        let series = rolling_vpin(&imbalances, self.samplength, self.bucket_size);

        let mut diagnostics = Vec::new();
        for (bucket, vpin) in buckets.iter_mut().zip(series) {
            if let Some(value) = vpin {
                if !(0.0..=1.0).contains(&value) {
                    diagnostics.push(Diagnostic::VpinOutOfRange {
                        bucket_index: bucket.bucket_index,
                        value,
                    });
                }
            }
            bucket.vpin = vpin;
        }
        diagnostics
    }
}

/// Rolling VPIN over a sequence of bucket imbalances.
///
/// Position `i` (0-based) is undefined while `i + 1 < samplength`. After that
/// it is the difference of cumulative imbalances over the last `samplength`
/// buckets, divided by `samplength * bucket_size`. One pass, no per-window
/// re-summation.
#[must_use]
pub fn rolling_vpin(imbalances: &[f64], samplength: usize, bucket_size: f64) -> Vec<Option<f64>> {
    let window_volume = samplength as f64 * bucket_size;

    // cumoi[k] is the sum of the first k imbalances.
    let mut cumoi = Vec::with_capacity(imbalances.len() + 1);
    cumoi.push(0.0);

    imbalances
        .iter()
        .enumerate()
        .map(|(i, &oi)| {
            let running = cumoi[i] + oi;
            cumoi.push(running);
            let position = i + 1;
            if samplength == 0 || position < samplength {
                None
            } else {
                Some((running - cumoi[position - samplength]) / window_volume)
            }
        })
        .collect()
}

/// Mean defined VPIN per calendar day of bucket start, ordered by day.
///
/// Days without any defined VPIN are left out.
#[must_use]
pub fn daily_vpin(buckets: &[VolumeBucket]) -> Vec<DailyVpin> {
    let mut by_day: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();

    for bucket in buckets {
        if let Some(vpin) = bucket.vpin {
            let entry = by_day.entry(bucket.day()).or_insert((0.0, 0));
            entry.0 += vpin;
            entry.1 += 1;
        }
    }

    by_day
        .into_iter()
        .map(|(day, (sum, count))| DailyVpin {
            day,
            mean_vpin: sum / count as f64,
            bucket_count: count,
        })
        .collect()
}
