//! Volume bucket construction.
//!
//! Buckets hold a fixed target volume (the VBS) rather than a fixed span of
//! time. Building them from time bars takes three steps:
//!
//! 1. **Split**: bars heavier than `(1 - 1/f) * vbs` keep only their volume
//!    modulo that threshold and spawn `f * floor(volume / threshold)` slices
//!    of `threshold / f` each, where `f` is the split factor
//! 2. **Assign**: bars are ordered by interval, given dense sequence ids and
//!    placed in bucket `1 + floor(runvol / vbs)` by cumulative volume
//! 3. **Reallocate**: the first bar of every bucket past the first keeps only
//!    the volume that falls inside its bucket; the rest moves to a duplicate
//!    bar in the preceding bucket
//!
//! Every step returns a new sequence and preserves total volume.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::bars::TimeBar;
use crate::types::error::{VpinError, VpinResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Number of slices a threshold's worth of volume is cut into.
pub const SPLIT_FACTOR: u32 = 10;

/// A time bar, or part of one, assigned to a volume bucket.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BucketedBar {
    /// Interval label inherited from the source bar.
    pub interval_start: DateTime<Utc>,

    /// Price change inherited from the source bar.
    pub price_delta: f64,

    /// Volume attributed to `bucket_index`.
    pub volume: f64,

    /// 1-based volume bucket.
    pub bucket_index: usize,

    /// Sequence id issued at assignment; duplicates share their source's id.
    pub sequence_id: usize,

    /// Cumulative volume through this bar at assignment.
    pub running_volume: f64,

    /// Share of the bar's volume that lies inside its own bucket.
    pub excess: f64,
}

/// Assigns time bars to volume buckets of a fixed size.
///
/// # Example
///
/// ```rust
/// use chrono::{TimeDelta, TimeZone, Utc};
/// use vpin_rs::bars::TimeBar;
/// use vpin_rs::bucketing::VolumeBucketer;
///
/// let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
/// let bars: Vec<TimeBar> = (0..6)
///     .map(|i| TimeBar::new(start + TimeDelta::minutes(i), 0.1, 40.0))
///     .collect();
///
/// let bucketer = VolumeBucketer::new(100.0).unwrap();
/// let bucketed = bucketer.bucketize(&bars);
///
/// let total: f64 = bucketed.iter().map(|b| b.volume).sum();
/// assert!((total - 240.0).abs() < 1e-9);
/// assert_eq!(bucketed.last().unwrap().bucket_index, 3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeBucketer {
    /// Target volume per bucket.
    bucket_size: f64,

    /// Slices per threshold's worth of volume when splitting large bars.
    split_factor: u32,
}

impl VolumeBucketer {
    /// Creates a bucketer for the given bucket size.
    ///
    /// # Errors
    ///
    /// Returns `VpinError::DegenerateDistribution` if `bucket_size` is not a
    /// positive finite number.
    pub fn new(bucket_size: f64) -> VpinResult<Self> {
        Self::with_split_factor(bucket_size, SPLIT_FACTOR)
    }

    /// Creates a bucketer with a non-default split factor.
    pub(crate) fn with_split_factor(bucket_size: f64, split_factor: u32) -> VpinResult<Self> {
        if !bucket_size.is_finite() || bucket_size <= 0.0 {
            return Err(VpinError::DegenerateDistribution(format!(
                "volume bucket size must be positive and finite, got {bucket_size}"
            )));
        }

        Ok(Self {
            bucket_size,
            split_factor: split_factor.max(2),
        })
    }

    /// Derives the bucket size from average daily volume.
    ///
    /// `vbs = (total_volume / trading_days) / buckets`
    #[must_use]
    pub fn bucket_size_for(total_volume: f64, trading_days: usize, buckets: u32) -> f64 {
        (total_volume / trading_days as f64) / f64::from(buckets)
    }

    /// Target volume per bucket.
    #[must_use]
    pub fn bucket_size(&self) -> f64 {
        self.bucket_size
    }

    /// Slices per threshold's worth of volume.
    #[must_use]
    pub fn split_factor(&self) -> u32 {
        self.split_factor
    }

    /// Volume above which a bar is split.
    #[must_use]
    pub fn split_threshold(&self) -> f64 {
        (1.0 - 1.0 / f64::from(self.split_factor)) * self.bucket_size
    }

    /// Runs the split, assignment and reallocation steps.
    #[must_use]
    pub fn bucketize(&self, bars: &[TimeBar]) -> Vec<BucketedBar> {
        let split = self.split_large_bars(bars);
        let assigned = self.assign_buckets(split);
        let bucketed = self.reallocate_boundaries(assigned);

        debug!(
            input_bars = bars.len(),
            bucketed_bars = bucketed.len(),
            buckets = bucketed.last().map_or(0, |b| b.bucket_index),
            vbs = self.bucket_size,
            "volume buckets assigned"
        );

        bucketed
    }

    /// Splits bars heavier than the threshold into uniform slices.
    ///
    /// The source bar keeps its volume modulo the threshold. Spawned slices
    /// are appended after all source bars and share the source's interval and
    /// price change.
    #[must_use]
    pub fn split_large_bars(&self, bars: &[TimeBar]) -> Vec<TimeBar> {
        let threshold = self.split_threshold();
        let slice_volume = threshold / f64::from(self.split_factor);

        let mut out: Vec<TimeBar> = Vec::with_capacity(bars.len());
        let mut spawned: Vec<TimeBar> = Vec::new();

        for bar in bars {
            if bar.total_volume > threshold {
                let whole = (bar.total_volume / threshold).floor() as usize;
                let slices = whole * self.split_factor as usize;

                out.push(TimeBar {
                    total_volume: bar.total_volume % threshold,
                    ..*bar
                });
                spawned.extend(std::iter::repeat_n(
                    TimeBar {
                        total_volume: slice_volume,
                        ..*bar
                    },
                    slices,
                ));
            } else {
                out.push(*bar);
            }
        }

        out.extend(spawned);
        out
    }

    /// Orders bars by interval and assigns bucket indices by cumulative volume.
    ///
    /// Sequence ids are re-issued densely from 1 in the sorted order.
    #[must_use]
    pub fn assign_buckets(&self, mut bars: Vec<TimeBar>) -> Vec<BucketedBar> {
        bars.sort_by_key(|b| b.interval_start);

        let mut running_volume = 0.0;
        bars.iter()
            .enumerate()
            .map(|(i, bar)| {
                running_volume += bar.total_volume;
                let bucket_index = 1 + (running_volume / self.bucket_size).floor() as usize;
                let excess = running_volume - (bucket_index - 1) as f64 * self.bucket_size;
                BucketedBar {
                    interval_start: bar.interval_start,
                    price_delta: bar.price_delta,
                    volume: bar.total_volume,
                    bucket_index,
                    sequence_id: i + 1,
                    running_volume,
                    excess,
                }
            })
            .collect()
    }

    /// Moves the part of each bucket's first bar that completes the previous
    /// bucket onto a duplicate bar in that bucket.
    ///
    /// Input must be in sequence-id order, as produced by
    /// [`assign_buckets`](Self::assign_buckets). Output is ordered by
    /// `(interval_start, bucket_index)`.
    #[must_use]
    pub fn reallocate_boundaries(&self, bars: Vec<BucketedBar>) -> Vec<BucketedBar> {
        // Arena of positions: first bar per bucket, keyed by sequence order.
        let mut first_of_bucket: Vec<usize> = Vec::new();
        let mut last_bucket = 0;
        for (pos, bar) in bars.iter().enumerate() {
            if bar.bucket_index != last_bucket {
                first_of_bucket.push(pos);
                last_bucket = bar.bucket_index;
            }
        }

        let mut out = bars;
        let mut carried: Vec<BucketedBar> = Vec::with_capacity(first_of_bucket.len());
        for pos in first_of_bucket {
            let bar = &mut out[pos];
            if bar.bucket_index <= 1 {
                continue;
            }

            let kept = bar.excess.min(bar.volume);
            carried.push(BucketedBar {
                volume: bar.volume - kept,
                bucket_index: bar.bucket_index - 1,
                ..*bar
            });
            bar.volume = kept;
        }

        out.extend(carried);
        out.sort_by_key(|b| (b.interval_start, b.bucket_index));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeDelta, TimeZone};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
    }

    fn bars_from(volumes: &[f64]) -> Vec<TimeBar> {
        volumes
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                let mut bar = TimeBar::new(start() + TimeDelta::minutes(i as i64), 0.05, v);
                bar.sequence_id = i + 1;
                bar
            })
            .collect()
    }

    fn total(bars: &[BucketedBar]) -> f64 {
        bars.iter().map(|b| b.volume).sum()
    }

    #[test]
    fn test_bucketer_rejects_bad_size() {
        assert!(VolumeBucketer::new(0.0).is_err());
        assert!(VolumeBucketer::new(-1.0).is_err());
        assert!(VolumeBucketer::new(f64::NAN).is_err());
        assert!(VolumeBucketer::new(f64::INFINITY).is_err());
    }

    #[test]
    fn test_bucket_size_for() {
        assert_eq!(VolumeBucketer::bucket_size_for(17500.0, 1, 5), 3500.0);
        assert_eq!(VolumeBucketer::bucket_size_for(20000.0, 2, 50), 200.0);
    }

    #[test]
    fn test_split_threshold() {
        let bucketer = VolumeBucketer::new(1000.0).unwrap();
        assert!((bucketer.split_threshold() - 900.0).abs() < 1e-9);
        assert_eq!(bucketer.split_factor(), SPLIT_FACTOR);
    }

    #[test]
    fn test_split_large_bars() {
        let bucketer = VolumeBucketer::new(1000.0).unwrap();
        // threshold 900: 2000 -> residual 200 + 20 slices of 90
        let bars = bars_from(&[100.0, 2000.0, 300.0]);
        let split = bucketer.split_large_bars(&bars);

        assert_eq!(split.len(), 3 + 20);
        assert!((split[1].total_volume - 200.0).abs() < 1e-9);
        assert!(
            split[3..]
                .iter()
                .all(|b| (b.total_volume - 90.0).abs() < 1e-9 && b.interval_start == bars[1].interval_start)
        );

        let sum: f64 = split.iter().map(|b| b.total_volume).sum();
        assert!((sum - 2400.0).abs() < 1e-9);
    }

    #[test]
    fn test_split_leaves_threshold_bar_alone() {
        let bucketer = VolumeBucketer::new(1000.0).unwrap();
        let bars = bars_from(&[900.0]);
        assert_eq!(bucketer.split_large_bars(&bars), bars);
    }

    #[test]
    fn test_split_very_large_bar() {
        let bucketer = VolumeBucketer::new(100.0).unwrap();
        // threshold 90: 10_000 -> 111 whole thresholds, 1110 slices of 9, residual 10
        let bars = bars_from(&[10_000.0]);
        let split = bucketer.split_large_bars(&bars);
        assert_eq!(split.len(), 1 + 1110);
        let sum: f64 = split.iter().map(|b| b.total_volume).sum();
        assert!((sum - 10_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_assign_buckets() {
        let bucketer = VolumeBucketer::new(3500.0).unwrap();
        let bars = bars_from(&[1000.0, 1500.0, 1200.0, 1800.0]);
        let assigned = bucketer.assign_buckets(bars);

        let indices: Vec<usize> = assigned.iter().map(|b| b.bucket_index).collect();
        assert_eq!(indices, vec![1, 1, 2, 2]);

        let ids: Vec<usize> = assigned.iter().map(|b| b.sequence_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4]);

        assert!((assigned[2].running_volume - 3700.0).abs() < 1e-9);
        assert!((assigned[2].excess - 200.0).abs() < 1e-9);
    }

    #[test]
    fn test_assign_sorts_spawned_slices_into_place() {
        let bucketer = VolumeBucketer::new(100.0).unwrap();
        let bars = bars_from(&[10.0, 200.0, 10.0]);
        let split = bucketer.split_large_bars(&bars);
        let assigned = bucketer.assign_buckets(split);

        let starts: Vec<_> = assigned.iter().map(|b| b.interval_start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
        assert_eq!(assigned.last().unwrap().interval_start, bars[2].interval_start);
    }

    #[test]
    fn test_reallocate_boundaries() {
        let bucketer = VolumeBucketer::new(3500.0).unwrap();
        let bars = bars_from(&[1000.0, 1500.0, 1200.0, 1800.0]);
        let bucketed = bucketer.reallocate_boundaries(bucketer.assign_buckets(bars));

        assert_eq!(bucketed.len(), 5);

        let bucket_one: f64 = bucketed
            .iter()
            .filter(|b| b.bucket_index == 1)
            .map(|b| b.volume)
            .sum();
        assert!((bucket_one - 3500.0).abs() < 1e-9);

        // Crossing bar split 1000 / 200 across buckets 1 and 2
        let crossing: Vec<&BucketedBar> = bucketed.iter().filter(|b| b.sequence_id == 3).collect();
        assert_eq!(crossing.len(), 2);
        assert_eq!(crossing[0].bucket_index, 1);
        assert!((crossing[0].volume - 1000.0).abs() < 1e-9);
        assert_eq!(crossing[1].bucket_index, 2);
        assert!((crossing[1].volume - 200.0).abs() < 1e-9);

        assert!((total(&bucketed) - 5500.0).abs() < 1e-9);
    }

    #[test]
    fn test_reallocate_exact_boundary_moves_whole_bar() {
        let bucketer = VolumeBucketer::new(100.0).unwrap();
        let bars = bars_from(&[50.0, 50.0, 30.0]);
        let bucketed = bucketer.reallocate_boundaries(bucketer.assign_buckets(bars));

        // Second bar lands exactly on the boundary: all of it belongs to bucket 1
        let second: Vec<&BucketedBar> = bucketed.iter().filter(|b| b.sequence_id == 2).collect();
        assert_eq!(second.len(), 2);
        assert_eq!(second[0].bucket_index, 1);
        assert_eq!(second[0].volume, 50.0);
        assert_eq!(second[1].bucket_index, 2);
        assert_eq!(second[1].volume, 0.0);

        assert!((total(&bucketed) - 130.0).abs() < 1e-9);
    }

    #[test]
    fn test_bucketize_conserves_volume_and_orders_buckets() {
        let bucketer = VolumeBucketer::new(250.0).unwrap();
        let volumes = [120.0, 80.0, 900.0, 40.0, 60.0, 310.0, 5.0, 75.0];
        let bars = bars_from(&volumes);
        let bucketed = bucketer.bucketize(&bars);

        let expected: f64 = volumes.iter().sum();
        assert!((total(&bucketed) - expected).abs() < 1e-9);

        for pair in bucketed.windows(2) {
            assert!(pair[0].interval_start <= pair[1].interval_start);
            assert!(pair[0].bucket_index <= pair[1].bucket_index);
        }
        assert_eq!(bucketed[0].bucket_index, 1);
    }

    #[test]
    fn test_custom_split_factor() {
        let bucketer = VolumeBucketer::with_split_factor(100.0, 4).unwrap();
        // threshold 75, slices of 18.75: 160 -> residual 10, 8 slices
        let split = bucketer.split_large_bars(&bars_from(&[160.0]));
        assert_eq!(split.len(), 9);
        assert!((split[0].total_volume - 10.0).abs() < 1e-9);
        assert!((split[1].total_volume - 18.75).abs() < 1e-9);
    }
}
