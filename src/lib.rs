//! # vpin-rs
//!
//! A Rust library computing the Volume-Synchronized Probability of Informed
//! Trading (VPIN) from tick-level trade records.
//!
//! VPIN estimates order-flow toxicity. It samples trading activity in
//! equal-volume buckets instead of equal-time intervals, classifies each
//! unit of volume as buyer- or seller-initiated from price changes, and
//! measures the rolling imbalance between buy and sell volume.
//!
//! ## Pipeline
//!
//! | Stage | Module | Output |
//! |---|---|---|
//! | Validation | [`validation`] | checked parameters and trades |
//! | Time bars | [`bars`] | per-interval price change and volume |
//! | Volume buckets | [`bucketing`] | bars assigned to equal-volume buckets |
//! | Classification | [`classification`] | buy/sell volume per bar |
//! | Aggregation | [`analytics`] | bucket VPIN and daily means |
//!
//! Each call processes one complete, chronologically ordered batch. Nothing
//! is persisted or shared between calls.
//!
//! ## Example
//!
//! ```rust
//! use chrono::{TimeDelta, TimeZone, Utc};
//! use vpin_rs::prelude::*;
//!
//! let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap();
//! let trades: Vec<TradeRecord> = (0..120)
//!     .map(|i| {
//!         let price = 100.0 + ((i * 13) % 7) as f64 * 0.05;
//!         TradeRecord::new(start + TimeDelta::minutes(i), price, 500.0 + (i % 5) as f64 * 100.0)
//!     })
//!     .collect();
//!
//! let config = VpinConfig::new(60, 20, 5).unwrap();
//! let estimate = VpinEstimator::new(config).estimate(&trades).unwrap();
//!
//! for day in &estimate.daily {
//!     println!("{}: VPIN {:.4}", day.day, day.mean_vpin);
//! }
//! ```
//!
//! ## Logging
//!
//! The crate logs through [`tracing`]: stage progress at debug level, and
//! every [`Diagnostic`](analytics::Diagnostic) at warn level. Install a
//! subscriber in the application to see them.
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` for configuration, records and results

/// VPIN aggregation, statistics and diagnostics.
pub mod analytics;

/// Fixed-width time bars.
pub mod bars;

/// Volume bucket construction.
pub mod bucketing;

/// Buy/sell volume classification.
pub mod classification;

/// End-to-end estimation entry points.
pub mod pipeline;

/// Trade records and errors.
pub mod types;

/// Parameter and dataset validation.
pub mod validation;

pub use pipeline::{compute_vpin, compute_vpin_raw};

/// Commonly used types.
pub mod prelude {
    pub use crate::analytics::{DailyVpin, Diagnostic, ToxicityLevel, VolumeBucket, VpinStats};
    pub use crate::pipeline::{
        EstimateParameters, VpinEstimate, VpinEstimator, compute_vpin, compute_vpin_raw,
    };
    pub use crate::types::{RawTrade, TradeRecord, VpinError, VpinResult};
    pub use crate::validation::VpinConfig;
}
