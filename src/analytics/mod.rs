//! VPIN aggregation and estimate diagnostics.
//!
//! # Overview
//!
//! The analytics module includes:
//!
//! - **VpinAggregator**: sums classified volume per bucket and computes the
//!   rolling VPIN over a fixed window of buckets
//! - **VolumeBucket** / **DailyVpin**: bucket-level and daily results
//! - **VpinStats** / **ToxicityLevel**: summaries of the VPIN series
//! - **Diagnostic**: non-fatal warnings raised during estimation
//!
//! # Example
//!
//! ```rust
//! use vpin_rs::analytics::{ToxicityLevel, rolling_vpin};
//!
//! let vpin = rolling_vpin(&[40.0, 60.0, 20.0], 2, 100.0);
//! assert_eq!(vpin[0], None);
//! assert_eq!(vpin[1], Some(0.5));
//! assert_eq!(ToxicityLevel::from_vpin(0.5), ToxicityLevel::Elevated);
//! ```

/// Non-fatal diagnostics.
pub mod diagnostics;

/// Volume bucket aggregation and rolling VPIN.
pub mod vpin;

pub use diagnostics::{Diagnostic, Diagnostics, LARGE_WINDOW_RATIO};
pub use vpin::{
    DailyVpin, ToxicityLevel, VolumeBucket, VpinAggregator, VpinStats, daily_vpin, rolling_vpin,
};
