//! Volume buckets: equal-volume partitions of trading activity.
//!
//! # Overview
//!
//! VPIN samples the market in volume time. This module turns time bars into
//! bucket-assigned bars:
//!
//! - **Bucket size**: average daily volume divided by the daily bucket count
//! - **Splitting**: heavy bars are sliced so no bar spans several buckets
//! - **Reallocation**: bars straddling a boundary are divided between the two
//!   buckets they touch

mod bucketer;

pub use bucketer::{BucketedBar, SPLIT_FACTOR, VolumeBucketer};
