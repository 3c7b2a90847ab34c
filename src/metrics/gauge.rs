//! Gauges: metrics whose value may be set to anything at any time.
//!
//! - [`PushGauge`] holds an atomic integer that callers set or adjust; every
//!   change is pushed to history, like a [`Counter`](super::counter::Counter).
//! - [`PullGauge`] holds no value. Each read calls a user callback that
//!   produces the value asynchronously; the value is pushed to history when
//!   the read completes.

use std::fmt::{self, Debug};
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_utils::CachePadded;
use futures_util::future::{self, BoxFuture, FutureExt};

use crate::error::Result;
use crate::history::{HistorySink, Sample};
use crate::metrics::{push_now, Identity, Metric, MetricKind};

/// A gauge whose integer value is set or adjusted by the caller.
///
/// Like [`Counter`](super::counter::Counter), a `PushGauge` is a shared
/// handle: clones update the same value.
///
/// # Examples
///
/// ```rust
/// use fenestra::metrics::gauge::PushGauge;
///
/// let connections = PushGauge::new("active_connections", None).unwrap();
/// connections.increment();
/// connections.increment();
/// connections.decrement();
/// assert_eq!(connections.get(), 1);
///
/// connections.set(42);
/// assert_eq!(connections.get(), 42);
/// ```
#[derive(Clone)]
pub struct PushGauge {
    inner: Arc<PushShared>,
}

struct PushShared {
    identity: Identity,
    cell: CachePadded<AtomicI64>,
    history: Arc<dyn HistorySink>,
}

impl PushGauge {
    /// Creates a gauge named `name`, initialized to zero.
    ///
    /// The initial zero is pushed to history.
    pub fn new(name: impl Into<Arc<str>>, window: Option<Duration>) -> Result<Self> {
        let identity = Identity::new(name, window)?;
        let history = identity.default_history()?;
        Ok(Self::from_parts(identity, history))
    }

    /// Creates a gauge that pushes its values to `history`.
    pub fn with_history(
        name: impl Into<Arc<str>>,
        window: Option<Duration>,
        history: Arc<dyn HistorySink>,
    ) -> Result<Self> {
        let identity = Identity::new(name, window)?;
        Ok(Self::from_parts(identity, history))
    }

    fn from_parts(identity: Identity, history: Arc<dyn HistorySink>) -> Self {
        let gauge = PushGauge {
            inner: Arc::new(PushShared {
                identity,
                cell: CachePadded::new(AtomicI64::new(0)),
                history,
            }),
        };
        gauge.push(0);
        gauge
    }

    /// Returns the current value.
    #[inline]
    pub fn get(&self) -> i64 {
        self.inner.cell.load(Ordering::Relaxed)
    }

    /// Replaces the value.
    #[inline]
    pub fn set(&self, value: i64) -> &Self {
        self.inner.cell.store(value, Ordering::Relaxed);
        self.push(value);
        self
    }

    /// Adds `delta` (which may be negative), wrapping on overflow.
    #[inline]
    pub fn add(&self, delta: i64) -> &Self {
        let previous = self.inner.cell.fetch_add(delta, Ordering::Relaxed);
        self.push(previous.wrapping_add(delta));
        self
    }

    /// Subtracts `delta`.
    #[inline]
    pub fn sub(&self, delta: i64) -> &Self {
        self.add(delta.wrapping_neg())
    }

    /// Adds one.
    #[inline]
    pub fn increment(&self) -> &Self {
        self.add(1)
    }

    /// Subtracts one.
    #[inline]
    pub fn decrement(&self) -> &Self {
        self.add(-1)
    }

    #[inline]
    fn push(&self, value: i64) {
        push_now(self.inner.history.as_ref(), value as f64);
    }
}

impl Metric for PushGauge {
    fn name(&self) -> &str {
        self.inner.identity.name()
    }

    fn window(&self) -> Option<Duration> {
        self.inner.identity.window()
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Gauge
    }

    fn value(&self) -> BoxFuture<'static, f64> {
        future::ready(self.get() as f64).boxed()
    }

    fn history(&self) -> Option<Vec<Sample>> {
        self.inner.history.samples()
    }
}

impl Debug for PushGauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{ {} }}", self.inner.identity.name(), self.get())
    }
}

type Pull = dyn Fn() -> BoxFuture<'static, f64> + Send + Sync;

/// A gauge whose value is produced on demand by a callback.
///
/// Nothing is pushed at construction; each completed read pushes the value
/// it produced.
///
/// # Examples
///
/// ```rust
/// use fenestra::metrics::gauge::PullGauge;
/// use fenestra::metrics::Metric;
/// use futures_util::FutureExt;
///
/// let queue_depth = PullGauge::new("queue_depth", None, || async { 17.0 }).unwrap();
/// assert_eq!(queue_depth.value().now_or_never(), Some(17.0));
/// ```
#[derive(Clone)]
pub struct PullGauge {
    identity: Identity,
    pull: Arc<Pull>,
    history: Arc<dyn HistorySink>,
}

impl PullGauge {
    /// Creates a gauge that reads its value from `pull`.
    pub fn new<F, Fut>(
        name: impl Into<Arc<str>>,
        window: Option<Duration>,
        pull: F,
    ) -> Result<Self>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = f64> + Send + 'static,
    {
        let identity = Identity::new(name, window)?;
        let history = identity.default_history()?;
        Ok(Self::from_parts(identity, history, pull))
    }

    /// Creates a gauge that reads its value from `pull` and pushes it to
    /// `history`.
    pub fn with_history<F, Fut>(
        name: impl Into<Arc<str>>,
        window: Option<Duration>,
        history: Arc<dyn HistorySink>,
        pull: F,
    ) -> Result<Self>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = f64> + Send + 'static,
    {
        let identity = Identity::new(name, window)?;
        Ok(Self::from_parts(identity, history, pull))
    }

    fn from_parts<F, Fut>(identity: Identity, history: Arc<dyn HistorySink>, pull: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = f64> + Send + 'static,
    {
        PullGauge {
            identity,
            pull: Arc::new(move || pull().boxed()),
            history,
        }
    }
}

impl Metric for PullGauge {
    fn name(&self) -> &str {
        self.identity.name()
    }

    fn window(&self) -> Option<Duration> {
        self.identity.window()
    }

    fn kind(&self) -> MetricKind {
        MetricKind::Gauge
    }

    fn value(&self) -> BoxFuture<'static, f64> {
        let history = Arc::clone(&self.history);
        (self.pull)()
            .map(move |value| {
                push_now(history.as_ref(), value);
                value
            })
            .boxed()
    }

    fn history(&self) -> Option<Vec<Sample>> {
        self.history.samples()
    }
}

impl Debug for PullGauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{ pull }}", self.identity.name())
    }
}
