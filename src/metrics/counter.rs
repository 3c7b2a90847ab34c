//! Lock-free signed counter that records every value it takes.
//!
//! This module provides [`Counter`], a handle over a single shared atomic
//! cell. Cloning a `Counter` yields another view of the same cell, so a
//! counter can be handed to any number of threads or components (and to a
//! [`Registry`](crate::registry::Registry)) while all of them observe and
//! mutate one logical value.
//!
//! Every mutation forwards the resulting value to the counter's
//! [`HistorySink`] before returning.

use std::fmt::{self, Debug};
use std::ops::{AddAssign, SubAssign};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_utils::CachePadded;
use futures_util::future::{self, BoxFuture, FutureExt};

use crate::error::Result;
use crate::history::{HistorySink, Sample};
use crate::metrics::{push_now, Identity, Metric, MetricKind};

/// A lock-free signed 64-bit counter with time-windowed history.
///
/// # Sharing
///
/// `Counter` is a reference-counted handle. `clone()` never copies the
/// value: both handles mutate the same cell, which is released when the
/// last handle is dropped.
///
/// # Overflow
///
/// Additions wrap around using two's complement arithmetic; no overflow is
/// reported.
///
/// # Examples
///
/// Basic usage:
///
/// ```rust
/// use fenestra::metrics::counter::Counter;
///
/// let requests = Counter::new("requests", None).unwrap();
/// requests.add(5);
/// requests.add(-2);
/// assert_eq!(requests.get(), 3);
///
/// requests.reset();
/// assert_eq!(requests.get(), 0);
/// ```
///
/// Shared across threads:
///
/// ```rust
/// use fenestra::metrics::counter::Counter;
/// use std::thread;
///
/// let counter = Counter::new("jobs", None).unwrap();
/// let mut handles = vec![];
///
/// for _ in 0..4 {
///     let c = counter.clone();
///     handles.push(thread::spawn(move || {
///         for _ in 0..1000 {
///             c.increment();
///         }
///     }));
/// }
///
/// for h in handles {
///     h.join().unwrap();
/// }
///
/// assert_eq!(counter.get(), 4000);
/// ```
#[derive(Clone)]
pub struct Counter {
    inner: Arc<Shared>,
}

struct Shared {
    identity: Identity,
    cell: CachePadded<AtomicI64>,
    history: Arc<dyn HistorySink>,
}

/// The value of a counter at one instant, detached from the counter.
///
/// Returned by [`Counter::post_increment`]. Later mutations of the counter
/// do not affect it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CounterReading {
    name: Arc<str>,
    value: i64,
}

impl CounterReading {
    /// Returns the name of the counter this reading was taken from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the recorded value.
    pub fn get(&self) -> i64 {
        self.value
    }

    /// Returns the recorded value as a float.
    pub fn value(&self) -> f64 {
        self.value as f64
    }
}

impl Counter {
    /// Creates a counter named `name`, initialized to zero.
    ///
    /// When `window` is given, the counter keeps a
    /// [`TimeSeries`](crate::history::TimeSeries) of its values over that
    /// window; otherwise values are discarded after being pushed.
    ///
    /// The initial zero is pushed immediately, so a new counter always has
    /// one sample.
    ///
    /// # Errors
    ///
    /// Fails if `name` is empty or `window` is zero.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fenestra::metrics::counter::Counter;
    /// use fenestra::metrics::Metric;
    /// use std::time::Duration;
    ///
    /// let counter = Counter::new("requests", Some(Duration::from_secs(60))).unwrap();
    /// assert_eq!(counter.get(), 0);
    /// assert_eq!(counter.history().unwrap().len(), 1);
    /// ```
    pub fn new(name: impl Into<Arc<str>>, window: Option<Duration>) -> Result<Self> {
        let identity = Identity::new(name, window)?;
        let history = identity.default_history()?;
        Ok(Self::from_parts(identity, history))
    }

    /// Creates a counter that pushes its values to `history`.
    ///
    /// `window` is kept as part of the counter's identity; interpreting it
    /// is left to `history`.
    ///
    /// # Errors
    ///
    /// Fails if `name` is empty or `window` is zero.
    pub fn with_history(
        name: impl Into<Arc<str>>,
        window: Option<Duration>,
        history: Arc<dyn HistorySink>,
    ) -> Result<Self> {
        let identity = Identity::new(name, window)?;
        Ok(Self::from_parts(identity, history))
    }

    fn from_parts(identity: Identity, history: Arc<dyn HistorySink>) -> Self {
        let counter = Counter {
            inner: Arc::new(Shared {
                identity,
                cell: CachePadded::new(AtomicI64::new(0)),
                history,
            }),
        };
        counter.push(0);
        counter
    }

    /// Returns the counter name.
    #[inline]
    pub fn name(&self) -> &str {
        self.inner.identity.name()
    }

    /// Returns the current value.
    ///
    /// Concurrent mutations may land between this read and its use.
    #[inline]
    pub fn get(&self) -> i64 {
        self.inner.cell.load(Ordering::Relaxed)
    }

    /// Adds one to the counter and returns the same handle.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fenestra::metrics::counter::Counter;
    ///
    /// let counter = Counter::new("hits", None).unwrap();
    /// assert_eq!(counter.increment().get(), 1);
    /// ```
    #[inline]
    pub fn increment(&self) -> &Self {
        self.add(1)
    }

    /// Adds one to the counter and returns its value from before the
    /// increment.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fenestra::metrics::counter::Counter;
    ///
    /// let counter = Counter::new("hits", None).unwrap();
    /// counter.add(7);
    ///
    /// let before = counter.post_increment();
    /// assert_eq!(before.get(), 7);
    /// assert_eq!(counter.get(), 8);
    /// ```
    #[inline]
    pub fn post_increment(&self) -> CounterReading {
        let previous = self.fetch_add(1);
        CounterReading {
            name: self.inner.identity.shared_name(),
            value: previous,
        }
    }

    /// Adds `delta` (which may be negative) and returns the same handle.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use fenestra::metrics::counter::Counter;
    ///
    /// let counter = Counter::new("balance", None).unwrap();
    /// counter.add(10).add(-15);
    /// assert_eq!(counter.get(), -5);
    /// ```
    #[inline]
    pub fn add(&self, delta: i64) -> &Self {
        self.fetch_add(delta);
        self
    }

    /// Subtracts `delta` and returns the same handle.
    #[inline]
    pub fn sub(&self, delta: i64) -> &Self {
        self.add(delta.wrapping_neg())
    }

    /// Sets the counter to zero, whatever its previous value.
    #[inline]
    pub fn reset(&self) {
        self.inner.cell.fetch_and(0, Ordering::Relaxed);
        self.push(0);
    }

    /// Applies `delta` and pushes the new value; returns the old one.
    #[inline]
    fn fetch_add(&self, delta: i64) -> i64 {
        let previous = self.inner.cell.fetch_add(delta, Ordering::Relaxed);
        self.push(previous.wrapping_add(delta));
        previous
    }

    #[inline]
    fn push(&self, value: i64) {
        push_now(self.inner.history.as_ref(), value as f64);
    }

    /// Returns `true` if both handles refer to the same cell.
    pub fn same_as(&self, other: &Counter) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl AddAssign<i64> for Counter {
    #[inline]
    fn add_assign(&mut self, delta: i64) {
        self.add(delta);
    }
}

impl SubAssign<i64> for Counter {
    #[inline]
    fn sub_assign(&mut self, delta: i64) {
        self.sub(delta);
    }
}

impl Metric for Counter {
    #[inline]
    fn name(&self) -> &str {
        self.inner.identity.name()
    }

    #[inline]
    fn window(&self) -> Option<Duration> {
        self.inner.identity.window()
    }

    /// Returns [`MetricKind::Counter`].
    #[inline]
    fn kind(&self) -> MetricKind {
        MetricKind::Counter
    }

    /// Returns a future that is already complete with the current value.
    fn value(&self) -> BoxFuture<'static, f64> {
        future::ready(self.get() as f64).boxed()
    }

    fn history(&self) -> Option<Vec<Sample>> {
        self.inner.history.samples()
    }
}

impl Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{ {} }}", self.name(), self.get())
    }
}
