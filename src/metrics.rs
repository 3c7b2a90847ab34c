//! Core metric types and the capability shared by every metric kind.
//!
//! A metric is built by composition:
//!
//! ```text
//!   ┌──────────────────────────── Counter (handle, Clone) ─┐
//!   │  Arc ──► ┌───────────────────────────────────────┐   │
//!   │          │ Identity   name, window   (immutable) │   │
//!   │          │ cell       CachePadded<AtomicI64>     │   │
//!   │          │ history    Arc<dyn HistorySink>       │   │
//!   │          └───────────────────────────────────────┘   │
//!   └──────────────────────────────────────────────────────┘
//! ```
//!
//! Every kind implements [`Metric`], so a [`Registry`](crate::registry::Registry)
//! can hold counters and gauges side by side and read them uniformly.
//!
//! # Available Metric Types
//!
//! | Type | Kind | Description |
//! |------|------|-------------|
//! | [`Counter`](counter::Counter) | [`MetricKind::Counter`] | Atomic signed integer, incremented/decremented/reset |
//! | [`PushGauge`](gauge::PushGauge) | [`MetricKind::Gauge`] | Integer value set or adjusted by the caller |
//! | [`PullGauge`](gauge::PullGauge) | [`MetricKind::Gauge`] | Value computed on demand by a callback |

pub mod counter;
pub mod gauge;

use std::fmt::{self, Debug, Display};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use futures_util::future::BoxFuture;

use crate::error::{MetricError, Result};
use crate::history::{Discard, HistorySink, Sample, TimeSeries};

/// The kind of a metric, used by consumers that treat kinds differently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MetricKind {
    /// An integer that is incremented, decremented and reset.
    Counter,
    /// A value that can be set to anything at any time.
    Gauge,
}

impl Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Counter => f.write_str("counter"),
            MetricKind::Gauge => f.write_str("gauge"),
        }
    }
}

/// The immutable identity of a metric: its unique name and optional
/// history window.
///
/// # Examples
///
/// ```rust
/// use fenestra::metrics::Identity;
/// use std::time::Duration;
///
/// let id = Identity::new("requests", Some(Duration::from_secs(60))).unwrap();
/// assert_eq!(id.name(), "requests");
/// assert_eq!(id.window(), Some(Duration::from_secs(60)));
///
/// assert!(Identity::new("", None).is_err());
/// assert!(Identity::new("requests", Some(Duration::ZERO)).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    name: Arc<str>,
    window: Option<Duration>,
}

impl Identity {
    /// Validates and creates an identity.
    ///
    /// The name must be non-empty and the window, if given, positive.
    /// Uniqueness of the name is checked by the registry, not here.
    pub fn new(name: impl Into<Arc<str>>, window: Option<Duration>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(MetricError::EmptyName);
        }
        if window.is_some_and(|w| w.is_zero()) {
            return Err(MetricError::NonPositiveWindow);
        }
        Ok(Self { name, window })
    }

    /// Returns the metric name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the history window, if any.
    #[inline]
    pub fn window(&self) -> Option<Duration> {
        self.window
    }

    /// Returns a shared handle to the name.
    #[inline]
    pub fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Builds the default sink for this identity: a [`TimeSeries`] over the
    /// window when there is one, [`Discard`] otherwise.
    pub(crate) fn default_history(&self) -> Result<Arc<dyn HistorySink>> {
        Ok(match self.window {
            Some(window) => Arc::new(TimeSeries::with_window(window)?),
            None => Arc::new(Discard),
        })
    }
}

/// Pushes `value` to `history`, stamped with the current wall-clock time.
#[inline]
pub(crate) fn push_now(history: &dyn HistorySink, value: f64) {
    history.push(value, SystemTime::now());
}

/// The capability every metric exposes to its readers.
///
/// # Examples
///
/// ```rust
/// use fenestra::metrics::{Metric, MetricKind};
/// use fenestra::metrics::counter::Counter;
/// use futures_util::FutureExt;
///
/// let counter = Counter::new("requests", None).unwrap();
/// counter.add(5);
///
/// let metric: &dyn Metric = &counter;
/// assert_eq!(metric.name(), "requests");
/// assert_eq!(metric.kind(), MetricKind::Counter);
///
/// // A counter's value is ready as soon as it is requested.
/// assert_eq!(metric.value().now_or_never(), Some(5.0));
/// ```
pub trait Metric: Debug + Send + Sync {
    /// Returns the unique name of the metric.
    fn name(&self) -> &str;

    /// Returns the history window, if one was configured.
    fn window(&self) -> Option<Duration>;

    /// Returns the kind of the metric.
    fn kind(&self) -> MetricKind;

    /// Requests the current value.
    ///
    /// The returned future never fails. Metrics backed by a local cell
    /// complete it immediately; others may resolve it later.
    fn value(&self) -> BoxFuture<'static, f64>;

    /// Returns the retained history, oldest first, or `None` if the metric
    /// keeps none.
    fn history(&self) -> Option<Vec<Sample>>;
}

impl Display for dyn Metric + '_ {
    /// Formats the metric as `name(kind)`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.kind())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::Mutex;

    /// A sink that records every push, for asserting order and count.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingSink {
        pushes: Mutex<Vec<Sample>>,
    }

    impl RecordingSink {
        pub(crate) fn values(&self) -> Vec<f64> {
            self.pushes.lock().unwrap().iter().map(|s| s.value).collect()
        }

        pub(crate) fn len(&self) -> usize {
            self.pushes.lock().unwrap().len()
        }
    }

    impl HistorySink for RecordingSink {
        fn push(&self, value: f64, at: SystemTime) {
            self.pushes.lock().unwrap().push(Sample::new(value, at));
        }

        fn samples(&self) -> Option<Vec<Sample>> {
            Some(self.pushes.lock().unwrap().clone())
        }
    }
}
