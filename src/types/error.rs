//! Error types for the VPIN pipeline.

use thiserror::Error;

/// Errors raised while validating input or computing VPIN.
///
/// Every variant is fatal for the invocation that raised it: the pipeline
/// never returns partial results. Non-fatal conditions are reported as
/// [`Diagnostic`](crate::analytics::Diagnostic) values instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VpinError {
    /// A control parameter is outside its accepted range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The trade sequence contains no records.
    #[error("Empty input: {0}")]
    EmptyInput(String),

    /// A record lacks one of the timestamp, price or volume fields.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Too few records to build a meaningful estimate.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// A trade volume is zero or negative.
    #[error("Invalid volume: {0}")]
    InvalidVolume(String),

    /// Timestamps are not in non-decreasing order.
    #[error("Unordered input: {0}")]
    UnorderedInput(String),

    /// Timestamps fall outside the plausible range or span too little time.
    #[error("Time range error: {0}")]
    TimeRangeError(String),

    /// Price changes have no usable dispersion.
    #[error("Degenerate distribution: {0}")]
    DegenerateDistribution(String),

    /// Fewer time bars than the rolling window length.
    #[error("Insufficient time bars: {0}")]
    InsufficientBars(String),

    /// Fewer volume buckets than the rolling window length.
    #[error("Insufficient volume buckets: {0}")]
    InsufficientBuckets(String),
}

/// Result type alias for VPIN operations.
pub type VpinResult<T> = Result<T, VpinError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = VpinError::InvalidParameter("buckets must be at least 5".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid parameter: buckets must be at least 5"
        );

        let err = VpinError::InsufficientBuckets("3 buckets, need 4".to_string());
        assert_eq!(
            err.to_string(),
            "Insufficient volume buckets: 3 buckets, need 4"
        );
    }

    #[test]
    fn test_error_equality() {
        let a = VpinError::EmptyInput("no trades".to_string());
        let b = VpinError::EmptyInput("no trades".to_string());
        assert_eq!(a, b);
        assert_ne!(a, VpinError::SchemaError("no trades".to_string()));
    }
}
