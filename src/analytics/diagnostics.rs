//! Non-fatal diagnostics raised alongside a completed estimate.

use std::fmt;

use tracing::warn;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Rolling window to daily bucket ratio above which a warning is raised.
pub const LARGE_WINDOW_RATIO: f64 = 0.5;

/// A condition worth flagging that does not invalidate the estimate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Diagnostic {
    /// The heaviest time bar exceeds the split threshold, so bars get sliced.
    SmallBucketSize {
        /// Target volume per bucket.
        bucket_size: f64,
        /// Bar volume above which a bar is split.
        split_threshold: f64,
        /// Volume of the heaviest time bar.
        largest_bar_volume: f64,
    },

    /// The rolling window covers a large share of a day's buckets.
    LargeWindowRatio {
        /// Rolling window length.
        samplength: u32,
        /// Daily bucket count.
        buckets: u32,
    },

    /// A bucket VPIN fell outside `[0, 1]` or is not finite.
    VpinOutOfRange {
        /// Bucket carrying the value.
        bucket_index: usize,
        /// The offending VPIN.
        value: f64,
    },

    /// Some trades share a timestamp with their predecessor.
    DuplicateTimestamps {
        /// Number of repeated timestamps.
        count: usize,
    },
}

impl Diagnostic {
    /// Logs the diagnostic at warn level.
    pub fn emit(&self) {
        match self {
            Self::SmallBucketSize {
                bucket_size,
                split_threshold,
                largest_bar_volume,
            } => warn!(
                bucket_size = *bucket_size,
                split_threshold = *split_threshold,
                largest_bar_volume = *largest_bar_volume,
                "VPIN: small volume bucket size"
            ),
            Self::LargeWindowRatio {
                samplength,
                buckets,
            } => warn!(
                samplength = *samplength,
                buckets = *buckets,
                "VPIN: large sample length relative to bucket count"
            ),
            Self::VpinOutOfRange {
                bucket_index,
                value,
            } => warn!(
                bucket_index = *bucket_index,
                value = *value,
                "VPIN: value outside [0, 1]"
            ),
            Self::DuplicateTimestamps { count } => {
                warn!(count = *count, "VPIN: duplicate trade timestamps")
            }
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SmallBucketSize {
                bucket_size,
                split_threshold,
                largest_bar_volume,
            } => write!(
                f,
                "largest time bar volume {largest_bar_volume} exceeds the split threshold {split_threshold} of bucket size {bucket_size}; large bars were split"
            ),
            Self::LargeWindowRatio {
                samplength,
                buckets,
            } => write!(
                f,
                "samplength {samplength} exceeds half of the {buckets} daily buckets"
            ),
            Self::VpinOutOfRange {
                bucket_index,
                value,
            } => write!(f, "bucket {bucket_index} has VPIN {value} outside [0, 1]"),
            Self::DuplicateTimestamps { count } => {
                write!(f, "{count} trades share a timestamp with the previous trade")
            }
        }
    }
}

/// Collects diagnostics, logging each as it arrives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs and records a diagnostic.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        diagnostic.emit();
        self.items.push(diagnostic);
    }

    /// Flags a heaviest bar that the bucketer will split.
    ///
    /// `split_threshold` is the bucketer's own cutoff, so the warning fires
    /// exactly when a split happens.
    pub fn check_bucket_size(
        &mut self,
        bucket_size: f64,
        split_threshold: f64,
        largest_bar_volume: f64,
    ) {
        if largest_bar_volume > split_threshold {
            self.push(Diagnostic::SmallBucketSize {
                bucket_size,
                split_threshold,
                largest_bar_volume,
            });
        }
    }

    /// Flags a rolling window longer than [`LARGE_WINDOW_RATIO`] of a day.
    pub fn check_window_ratio(&mut self, samplength: u32, buckets: u32) {
        if f64::from(samplength) / f64::from(buckets) > LARGE_WINDOW_RATIO {
            self.push(Diagnostic::LargeWindowRatio {
                samplength,
                buckets,
            });
        }
    }

    /// Flags repeated trade timestamps.
    pub fn check_duplicates(&mut self, count: usize) {
        if count > 0 {
            self.push(Diagnostic::DuplicateTimestamps { count });
        }
    }

    /// Number of diagnostics recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Recorded diagnostics in arrival order.
    #[must_use]
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    /// Consumes the collection.
    #[must_use]
    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<I: IntoIterator<Item = Diagnostic>>(&mut self, iter: I) {
        for diagnostic in iter {
            self.push(diagnostic);
        }
    }
}
