//! Control parameters for VPIN estimation.

use crate::types::error::{VpinError, VpinResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Longest accepted time bar, in seconds.
pub const MAX_TIMEBAR_SECONDS: i64 = 3600;

/// Fewest volume buckets per day.
pub const MIN_BUCKETS: i64 = 5;

/// Most volume buckets per day.
pub const MAX_BUCKETS: i64 = 1000;

/// Shortest rolling window, in buckets.
pub const MIN_SAMPLENGTH: i64 = 2;

/// Validated VPIN control parameters.
///
/// # Example
///
/// ```rust
/// use vpin_rs::validation::VpinConfig;
///
/// let config = VpinConfig::new(
///     60, // timebarsize: one-minute time bars
///     50, // buckets: 50 volume buckets per day
///     10, // samplength: 10-bucket rolling window
/// ).unwrap();
/// assert_eq!(config.buckets(), 50);
///
/// // The rolling window must be shorter than the bucket count
/// assert!(VpinConfig::new(60, 50, 50).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(try_from = "UncheckedVpinConfig")
)]
pub struct VpinConfig {
    /// Time bar width in seconds.
    timebarsize: u32,

    /// Target number of volume buckets per trading day.
    buckets: u32,

    /// Number of buckets in the rolling VPIN window.
    samplength: u32,
}

/// Wire form of [`VpinConfig`], checked by [`VpinConfig::new`] on the way in.
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct UncheckedVpinConfig {
    timebarsize: i64,
    buckets: i64,
    samplength: i64,
}

#[cfg(feature = "serde")]
impl TryFrom<UncheckedVpinConfig> for VpinConfig {
    type Error = VpinError;

    fn try_from(raw: UncheckedVpinConfig) -> VpinResult<Self> {
        Self::new(raw.timebarsize, raw.buckets, raw.samplength)
    }
}

impl VpinConfig {
    /// Creates a new `VpinConfig` with validation.
    ///
    /// # Arguments
    ///
    /// * `timebarsize` - Time bar width in seconds, in `(0, 3600]`
    /// * `buckets` - Volume buckets per day, in `[5, 1000]`
    /// * `samplength` - Rolling window length, in `[2, buckets)`
    ///
    /// # Errors
    ///
    /// Returns `VpinError::InvalidParameter` if any value is out of range.
    pub fn new(timebarsize: i64, buckets: i64, samplength: i64) -> VpinResult<Self> {
        if timebarsize <= 0 {
            return Err(VpinError::InvalidParameter(format!(
                "timebarsize must be positive, got {timebarsize}"
            )));
        }

        if timebarsize > MAX_TIMEBAR_SECONDS {
            return Err(VpinError::InvalidParameter(format!(
                "timebarsize must not exceed {MAX_TIMEBAR_SECONDS} seconds, got {timebarsize}"
            )));
        }

        if buckets <= 0 {
            return Err(VpinError::InvalidParameter(format!(
                "buckets must be positive, got {buckets}"
            )));
        }

        if !(MIN_BUCKETS..=MAX_BUCKETS).contains(&buckets) {
            return Err(VpinError::InvalidParameter(format!(
                "buckets must be between {MIN_BUCKETS} and {MAX_BUCKETS}, got {buckets}"
            )));
        }

        if samplength <= 0 {
            return Err(VpinError::InvalidParameter(format!(
                "samplength must be positive, got {samplength}"
            )));
        }

        if samplength < MIN_SAMPLENGTH {
            return Err(VpinError::InvalidParameter(format!(
                "samplength must be at least {MIN_SAMPLENGTH}, got {samplength}"
            )));
        }

        if samplength >= buckets {
            return Err(VpinError::InvalidParameter(format!(
                "samplength ({samplength}) must be smaller than buckets ({buckets})"
            )));
        }

        // Bounds above guarantee every value fits in u32.
        Ok(Self {
            timebarsize: timebarsize as u32,
            buckets: buckets as u32,
            samplength: samplength as u32,
        })
    }

    /// Time bar width in seconds.
    #[must_use]
    pub fn timebarsize(&self) -> u32 {
        self.timebarsize
    }

    /// Target number of volume buckets per day.
    #[must_use]
    pub fn buckets(&self) -> u32 {
        self.buckets
    }

    /// Rolling window length in buckets.
    #[must_use]
    pub fn samplength(&self) -> u32 {
        self.samplength
    }

    /// Ratio of the rolling window to the daily bucket count.
    #[must_use]
    pub fn window_ratio(&self) -> f64 {
        f64::from(self.samplength) / f64::from(self.buckets)
    }
}

impl Default for VpinConfig {
    /// One-minute bars, 50 buckets per day, 10-bucket window.
    fn default() -> Self {
        Self {
            timebarsize: 60,
            buckets: 50,
            samplength: 10,
        }
    }
}
