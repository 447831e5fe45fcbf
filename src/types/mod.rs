//! Core types shared across the pipeline: trade records and errors.

/// Error taxonomy and result alias.
pub mod error;

/// Trade record types.
pub mod trade;

pub use error::{VpinError, VpinResult};
pub use trade::{RawTrade, TradeRecord};
