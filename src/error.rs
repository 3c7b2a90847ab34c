//! Error type shared by metric construction and the registry.
//!
//! Only construction and registration can fail. Once a metric exists, its
//! mutation and read paths are total and carry no error type.
//!
//! # Example
//!
//! ```rust
//! use fenestra::error::MetricError;
//! use fenestra::metrics::counter::Counter;
//!
//! let err = Counter::new("", None).unwrap_err();
//! assert!(matches!(err, MetricError::EmptyName));
//! ```

use thiserror::Error;

/// Error returned when a metric cannot be created or registered.
#[derive(Debug, Error)]
pub enum MetricError {
    /// The metric name was empty.
    #[error("metric name must not be empty")]
    EmptyName,

    /// A history window of zero length was requested.
    #[error("history window must be positive")]
    NonPositiveWindow,

    /// A history sink was configured to retain no samples.
    #[error("history capacity must be positive")]
    ZeroCapacity,

    /// A metric with the same name is already registered.
    #[error("metric '{0}' is already registered")]
    Duplicate(String),

    /// No metric with this name is registered.
    #[error("metric '{0}' is not registered")]
    NotFound(String),

    /// Error serializing a snapshot.
    #[cfg(feature = "json")]
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for metric construction and registry operations.
pub type Result<T> = std::result::Result<T, MetricError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            MetricError::EmptyName.to_string(),
            "metric name must not be empty"
        );
        assert_eq!(
            MetricError::NonPositiveWindow.to_string(),
            "history window must be positive"
        );
        assert_eq!(
            MetricError::Duplicate("requests".into()).to_string(),
            "metric 'requests' is already registered"
        );
        assert_eq!(
            MetricError::NotFound("requests".into()).to_string(),
            "metric 'requests' is not registered"
        );
    }
}
