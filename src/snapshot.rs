//! Point-in-time values of a set of metrics.
//!
//! [`Registry::snapshot`](crate::registry::Registry::snapshot) produces a
//! [`MetricsSnapshot`]. With the `serde` feature the types are
//! serializable; with the `json` feature [`MetricsSnapshot::to_json`]
//! renders the flat `{"name": value}` object usually served by a metrics
//! endpoint.
//!
//! # Examples
//!
//! ```rust
//! use fenestra::snapshot::{MetricSnapshot, MetricsSnapshot};
//!
//! let snapshot = MetricsSnapshot::new(vec![
//!     MetricSnapshot::new("requests", 1000.0),
//!     MetricSnapshot::new("errors", 5.0),
//! ]);
//!
//! assert_eq!(snapshot.get("errors").unwrap().value, 5.0);
//! ```

use crate::metrics::Metric;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The value of a single metric.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricSnapshot {
    /// The name of the metric.
    pub name: String,
    /// The value of the metric.
    pub value: f64,
}

impl MetricSnapshot {
    /// Creates a new metric snapshot.
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Reads `metric` and captures its current value.
    pub async fn capture(metric: &dyn Metric) -> Self {
        let value = metric.value().await;
        Self::new(metric.name(), value)
    }
}

/// The values of a collection of metrics at one point in time.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MetricsSnapshot {
    /// Optional timestamp in milliseconds since Unix epoch.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none", default))]
    pub timestamp_ms: Option<u64>,
    /// The metric snapshots.
    pub metrics: Vec<MetricSnapshot>,
}

impl MetricsSnapshot {
    /// Creates a new snapshot with the given metrics.
    pub fn new(metrics: Vec<MetricSnapshot>) -> Self {
        Self {
            timestamp_ms: None,
            metrics,
        }
    }

    /// Creates a new snapshot with metrics and a timestamp.
    pub fn with_timestamp(metrics: Vec<MetricSnapshot>, timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms: Some(timestamp_ms),
            metrics,
        }
    }

    /// Finds a metric by name.
    pub fn get(&self, name: &str) -> Option<&MetricSnapshot> {
        self.metrics.iter().find(|m| m.name == name)
    }

    /// Returns the number of metrics.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Returns `true` if the snapshot holds no metric.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Renders the metrics as a flat JSON object mapping name to value.
    ///
    /// The timestamp is not included.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fenestra::snapshot::{MetricSnapshot, MetricsSnapshot};
    ///
    /// let snapshot = MetricsSnapshot::new(vec![
    ///     MetricSnapshot::new("errors", 5.0),
    ///     MetricSnapshot::new("requests", 1000.0),
    /// ]);
    ///
    /// let json = snapshot.to_json(false).unwrap();
    /// assert_eq!(json, r#"{"errors":5.0,"requests":1000.0}"#);
    /// ```
    #[cfg(feature = "json")]
    pub fn to_json(&self, pretty: bool) -> crate::error::Result<String> {
        let object: serde_json::Map<String, serde_json::Value> = self
            .metrics
            .iter()
            .map(|m| (m.name.clone(), serde_json::Value::from(m.value)))
            .collect();

        let json = if pretty {
            serde_json::to_string_pretty(&object)?
        } else {
            serde_json::to_string(&object)?
        };
        Ok(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::counter::Counter;

    #[test]
    fn test_metric_snapshot_new() {
        let snapshot = MetricSnapshot::new("test", 42.0);
        assert_eq!(snapshot.name, "test");
        assert_eq!(snapshot.value, 42.0);
    }

    #[tokio::test]
    async fn test_metric_snapshot_capture() {
        let counter = Counter::new("requests", None).unwrap();
        counter.add(100);

        let snapshot = MetricSnapshot::capture(&counter).await;
        assert_eq!(snapshot, MetricSnapshot::new("requests", 100.0));
    }

    #[test]
    fn test_metrics_snapshot_new() {
        let snapshot = MetricsSnapshot::new(vec![
            MetricSnapshot::new("a", 1.0),
            MetricSnapshot::new("b", 2.0),
        ]);

        assert_eq!(snapshot.len(), 2);
        assert!(!snapshot.is_empty());
        assert!(snapshot.timestamp_ms.is_none());
    }

    #[test]
    fn test_metrics_snapshot_with_timestamp() {
        let snapshot =
            MetricsSnapshot::with_timestamp(vec![MetricSnapshot::new("test", 1.0)], 1234567890);

        assert_eq!(snapshot.timestamp_ms, Some(1234567890));
    }

    #[test]
    fn test_metrics_snapshot_get() {
        let snapshot = MetricsSnapshot::new(vec![
            MetricSnapshot::new("foo", 1.0),
            MetricSnapshot::new("bar", 2.0),
        ]);

        assert!(snapshot.get("foo").is_some());
        assert!(snapshot.get("bar").is_some());
        assert!(snapshot.get("baz").is_none());
    }

    #[test]
    fn test_default_is_empty() {
        let snapshot = MetricsSnapshot::default();
        assert!(snapshot.is_empty());
        assert!(snapshot.timestamp_ms.is_none());
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_serialize_metrics_snapshot() {
        let snapshot =
            MetricsSnapshot::with_timestamp(vec![MetricSnapshot::new("a", 1.0)], 1234567890);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(
            json,
            r#"{"timestamp_ms":1234567890,"metrics":[{"name":"a","value":1.0}]}"#
        );
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_serialize_without_timestamp() {
        let snapshot = MetricsSnapshot::new(vec![]);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert_eq!(json, r#"{"metrics":[]}"#);
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_deserialize_metrics_snapshot() {
        let json = r#"{"metrics":[{"name":"a","value":-3}]}"#;
        let snapshot: MetricsSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.timestamp_ms, None);
        assert_eq!(snapshot.get("a").unwrap().value, -3.0);
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_to_json_pretty() {
        let snapshot = MetricsSnapshot::new(vec![MetricSnapshot::new("requests", 3.0)]);
        let json = snapshot.to_json(true).unwrap();
        assert_eq!(json, "{\n  \"requests\": 3.0\n}");
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_to_json_non_finite_is_null() {
        let snapshot = MetricsSnapshot::new(vec![MetricSnapshot::new("nan", f64::NAN)]);
        assert_eq!(snapshot.to_json(false).unwrap(), r#"{"nan":null}"#);
    }
}
