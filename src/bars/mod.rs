//! Fixed-width time bars built from raw trades.
//!
//! A time bar summarizes every trade in one interval by its net price change
//! and total volume. The dispersion of those price changes later scales the
//! buy/sell classification.

mod time_bar;

pub use time_bar::{TimeBar, TimeBarAggregator, TimeBarSeries, sample_std_dev};
