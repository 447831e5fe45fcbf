//! Bulk volume classification.
//!
//! Each bar's volume is split between buyers and sellers by the standard
//! normal CDF of its standardized price change:
//!
//! ```text
//! buy_prob  = Φ(Δp / σ_Δp)
//! sell_prob = 1 - buy_prob
//! ```

use chrono::{DateTime, Utc};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::bucketing::BucketedBar;
use crate::types::error::{VpinError, VpinResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A bucketed bar with its volume split into buy and sell sides.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClassifiedBar {
    /// Interval label of the source bar.
    pub interval_start: DateTime<Utc>,

    /// Volume bucket the bar belongs to.
    pub bucket_index: usize,

    /// Volume attributed to the bucket.
    pub volume: f64,

    /// Probability that the volume was buyer-initiated.
    pub buy_probability: f64,

    /// `volume * buy_probability`.
    pub buy_volume: f64,

    /// `volume * (1 - buy_probability)`.
    pub sell_volume: f64,
}

/// Classifies bar volume into buy and sell flow.
#[derive(Debug, Clone)]
pub struct FlowClassifier {
    /// Standard deviation of bar price changes.
    price_delta_std: f64,

    standard_normal: Normal,
}

impl FlowClassifier {
    /// Creates a classifier scaled by the price-change standard deviation.
    ///
    /// # Errors
    ///
    /// Returns `VpinError::DegenerateDistribution` if `price_delta_std` is
    /// not a positive finite number.
    pub fn new(price_delta_std: f64) -> VpinResult<Self> {
        if !price_delta_std.is_finite() || price_delta_std <= 0.0 {
            return Err(VpinError::DegenerateDistribution(format!(
                "price change standard deviation must be positive and finite, got {price_delta_std}"
            )));
        }

        let standard_normal = Normal::new(0.0, 1.0)
            .map_err(|e| VpinError::DegenerateDistribution(e.to_string()))?;

        Ok(Self {
            price_delta_std,
            standard_normal,
        })
    }

    /// Standard deviation used to standardize price changes.
    #[must_use]
    pub fn price_delta_std(&self) -> f64 {
        self.price_delta_std
    }

    /// Probability that volume moving the price by `price_delta` was bought.
    #[must_use]
    pub fn buy_probability(&self, price_delta: f64) -> f64 {
        self.standard_normal.cdf(price_delta / self.price_delta_std)
    }

    /// Splits a single bar's volume into buy and sell flow.
    #[must_use]
    pub fn classify_bar(&self, bar: &BucketedBar) -> ClassifiedBar {
        let buy_probability = self.buy_probability(bar.price_delta);
        ClassifiedBar {
            interval_start: bar.interval_start,
            bucket_index: bar.bucket_index,
            volume: bar.volume,
            buy_probability,
            buy_volume: bar.volume * buy_probability,
            sell_volume: bar.volume * (1.0 - buy_probability),
        }
    }

    /// Classifies every bar carrying volume, preserving order.
    ///
    /// Bars left without volume by the splitting and reallocation arithmetic
    /// are dropped.
    #[must_use]
    pub fn classify(&self, bars: &[BucketedBar]) -> Vec<ClassifiedBar> {
        bars.iter()
            .filter(|bar| bar.volume > 0.0)
            .map(|bar| self.classify_bar(bar))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn bar(price_delta: f64, volume: f64, bucket_index: usize) -> BucketedBar {
        BucketedBar {
            interval_start: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            price_delta,
            volume,
            bucket_index,
            sequence_id: 1,
            running_volume: volume,
            excess: volume,
        }
    }

    #[test]
    fn test_classifier_rejects_bad_std() {
        assert!(FlowClassifier::new(0.0).is_err());
        assert!(FlowClassifier::new(-0.5).is_err());
        assert!(FlowClassifier::new(f64::NAN).is_err());
    }

    #[test]
    fn test_buy_probability() {
        let classifier = FlowClassifier::new(0.1).unwrap();

        assert!((classifier.buy_probability(0.0) - 0.5).abs() < 1e-12);
        // One standard deviation up
        assert!((classifier.buy_probability(0.1) - 0.841_344_746).abs() < 1e-6);
        // Symmetric
        let up = classifier.buy_probability(0.25);
        let down = classifier.buy_probability(-0.25);
        assert!((up + down - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_classify_bar_conserves_volume() {
        let classifier = FlowClassifier::new(0.05).unwrap();
        let classified = classifier.classify_bar(&bar(0.03, 1200.0, 2));

        assert_eq!(classified.bucket_index, 2);
        assert!(classified.buy_volume > classified.sell_volume);
        assert!((classified.buy_volume + classified.sell_volume - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn test_classify_drops_zero_volume() {
        let classifier = FlowClassifier::new(0.05).unwrap();
        let bars = vec![bar(0.01, 100.0, 1), bar(0.02, 0.0, 2), bar(-0.01, 50.0, 2)];
        let classified = classifier.classify(&bars);

        assert_eq!(classified.len(), 2);
        assert_eq!(classified[0].volume, 100.0);
        assert_eq!(classified[1].volume, 50.0);
        assert!(classified[1].sell_volume > classified[1].buy_volume);
    }
}
