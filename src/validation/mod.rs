//! Input validation for the VPIN pipeline.
//!
//! Two kinds of checks run before any computation:
//!
//! - **Parameters**: `VpinConfig` enforces the ranges of the time bar width,
//!   the daily bucket count and the rolling window length
//! - **Dataset**: the trade batch must be non-empty, complete, positive in
//!   volume, chronologically ordered and within a plausible time range
//!
//! # Example
//!
//! ```rust
//! use vpin_rs::validation::VpinConfig;
//! use vpin_rs::types::VpinError;
//!
//! assert!(VpinConfig::new(60, 50, 10).is_ok());
//! assert!(matches!(
//!     VpinConfig::new(60, 4, 2),
//!     Err(VpinError::InvalidParameter(_))
//! ));
//! ```

mod dataset;
mod params;

pub use dataset::{
    MIN_RECORDS, duplicate_timestamp_count, validate_raw_trades, validate_trades,
    validate_trades_at,
};
pub use params::{MAX_BUCKETS, MAX_TIMEBAR_SECONDS, MIN_BUCKETS, MIN_SAMPLENGTH, VpinConfig};
