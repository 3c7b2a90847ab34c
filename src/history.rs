//! History sinks that retain the recent values of a metric.
//!
//! Every metric forwards each new value to a [`HistorySink`] together with
//! the wall-clock time at which it was observed. The sink decides what to
//! keep:
//!
//! - [`TimeSeries`] keeps a bounded window of samples, thinning out older
//!   samples once its capacity is reached.
//! - [`Discard`] drops everything. Metrics built without a window use it.
//!
//! ```text
//!   add(5) ──► cell ──► push(5.0, now) ──► TimeSeries
//!                                          ┌──────────────────────────┐
//!                                          │ [t0:0] [t1:5] [t2:3] ... │
//!                                          └──────────────────────────┘
//!                                           ◄──────── window ────────►
//! ```
//!
//! # Retention
//!
//! A [`TimeSeries`] applies two bounds after every push:
//!
//! 1. **Window**: samples older than `newest.at - window` are dropped.
//! 2. **Capacity**: when more than `capacity` samples remain, every other
//!    sample in the older half of the series is dropped in one pass. Old
//!    history thins out instead of disappearing, and the pass frees about a
//!    quarter of the capacity, so the pushes that follow are plain appends.
//!    The oldest and the newest samples are never dropped by thinning.

use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MetricError, Result};

/// Window used by [`HistoryConfig::default`].
pub const DEFAULT_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Capacity used by [`HistoryConfig::default`].
pub const DEFAULT_CAPACITY: usize = 1000;

/// A value observed at a point in time.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sample {
    /// The observed value.
    pub value: f64,
    /// Wall-clock time of the observation.
    pub at: SystemTime,
}

impl Sample {
    /// Creates a new sample.
    pub const fn new(value: f64, at: SystemTime) -> Self {
        Self { value, at }
    }
}

/// Receives every value a metric takes.
///
/// `push` is called synchronously on the thread that mutated the metric,
/// so implementations must be cheap and must never block indefinitely.
pub trait HistorySink: Debug + Send + Sync {
    /// Records `value` as observed at `at`.
    fn push(&self, value: f64, at: SystemTime);

    /// Returns the retained samples, oldest first.
    ///
    /// Sinks that retain nothing return `None`.
    fn samples(&self) -> Option<Vec<Sample>> {
        None
    }
}

/// A sink that drops every sample.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl HistorySink for Discard {
    #[inline]
    fn push(&self, _value: f64, _at: SystemTime) {}
}

/// Retention settings for a [`TimeSeries`].
///
/// # Examples
///
/// ```rust
/// use fenestra::history::{HistoryConfig, TimeSeries};
/// use std::time::Duration;
///
/// let config = HistoryConfig::default()
///     .with_window(Duration::from_secs(60))
///     .with_capacity(120);
///
/// let series = TimeSeries::from_config(&config).unwrap();
/// assert_eq!(series.window(), Duration::from_secs(60));
/// assert_eq!(series.capacity(), 120);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HistoryConfig {
    /// How far back samples are kept, relative to the newest sample.
    pub window: Duration,
    /// Maximum number of samples kept.
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl HistoryConfig {
    /// Sets the retention window.
    pub const fn with_window(self, window: Duration) -> Self {
        Self { window, ..self }
    }

    /// Sets the maximum number of samples.
    pub const fn with_capacity(self, capacity: usize) -> Self {
        Self { capacity, ..self }
    }

    /// Checks that both bounds are positive.
    pub fn validate(&self) -> Result<()> {
        if self.window.is_zero() {
            return Err(MetricError::NonPositiveWindow);
        }
        if self.capacity == 0 {
            return Err(MetricError::ZeroCapacity);
        }
        Ok(())
    }
}

/// A bounded, time-windowed series of samples.
///
/// Samples are kept sorted by timestamp. A push carrying a timestamp older
/// than the newest sample (the wall clock stepped back, or a concurrent
/// mutator stamped its value later) is inserted at its sorted position.
///
/// # Cost
///
/// A push appends under a short lock. When the series overflows, the
/// thinning pass is linear in `capacity`, once per roughly `capacity / 4`
/// pushes.
///
/// # Concurrent writers
///
/// Values are stamped after the metric's atomic update. When two threads
/// update the same metric at once, the later update may carry the earlier
/// timestamp, so [`latest`](TimeSeries::latest) is not guaranteed to equal
/// the metric's current value, even after every writer has finished.
///
/// # Examples
///
/// ```rust
/// use fenestra::history::{HistorySink, TimeSeries};
/// use std::time::{Duration, SystemTime};
///
/// let series = TimeSeries::new(Duration::from_secs(10), 100).unwrap();
/// let t0 = SystemTime::UNIX_EPOCH;
///
/// series.push(1.0, t0);
/// series.push(2.0, t0 + Duration::from_secs(5));
/// series.push(3.0, t0 + Duration::from_secs(12));
///
/// // The first sample fell out of the 10s window.
/// let values: Vec<f64> = series.samples().unwrap().iter().map(|s| s.value).collect();
/// assert_eq!(values, vec![2.0, 3.0]);
/// ```
pub struct TimeSeries {
    window: Duration,
    capacity: usize,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    samples: VecDeque<Sample>,
}

impl TimeSeries {
    /// Creates an empty series with the given bounds.
    ///
    /// Fails if `window` is zero or `capacity` is zero.
    pub fn new(window: Duration, capacity: usize) -> Result<Self> {
        Self::from_config(&HistoryConfig { window, capacity })
    }

    /// Creates an empty series from a [`HistoryConfig`].
    pub fn from_config(config: &HistoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            window: config.window,
            capacity: config.capacity,
            state: Mutex::new(State::default()),
        })
    }

    /// Creates a series with the given window and [`DEFAULT_CAPACITY`].
    pub fn with_window(window: Duration) -> Result<Self> {
        Self::new(window, DEFAULT_CAPACITY)
    }

    /// Returns the retention window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Returns the maximum number of retained samples.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of retained samples.
    pub fn len(&self) -> usize {
        self.lock().samples.len()
    }

    /// Returns `true` if no sample is retained.
    pub fn is_empty(&self) -> bool {
        self.lock().samples.is_empty()
    }

    /// Returns the newest sample.
    pub fn latest(&self) -> Option<Sample> {
        self.lock().samples.back().copied()
    }

    // Nothing panics while the lock is held, but a poisoned series is still
    // consistent, so keep serving it.
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl State {
    fn insert(&mut self, sample: Sample) {
        match self.samples.back() {
            Some(newest) if sample.at < newest.at => {
                let index = self.samples.partition_point(|s| s.at <= sample.at);
                self.samples.insert(index, sample);
            }
            _ => self.samples.push_back(sample),
        }
    }

    fn truncate(&mut self, window: Duration) {
        let Some(horizon) = self
            .samples
            .back()
            .and_then(|newest| newest.at.checked_sub(window))
        else {
            return;
        };

        let expired = self.samples.partition_point(|s| s.at < horizon);
        self.samples.drain(..expired);
    }

    fn sparsify(&mut self, capacity: usize) {
        while self.samples.len() > capacity {
            let len = self.samples.len();
            if len <= 2 {
                self.samples.pop_front();
                continue;
            }

            // Odd indices below `end`; `end <= len - 1` keeps the newest.
            let end = (len / 2).max(2).min(len - 1);
            let mut index = 0;
            self.samples.retain(|_| {
                let keep = index >= end || index % 2 == 0;
                index += 1;
                keep
            });
        }
    }
}

impl HistorySink for TimeSeries {
    fn push(&self, value: f64, at: SystemTime) {
        let mut state = self.lock();
        state.insert(Sample::new(value, at));
        state.truncate(self.window);
        state.sparsify(self.capacity);
    }

    fn samples(&self) -> Option<Vec<Sample>> {
        Some(self.lock().samples.iter().copied().collect())
    }
}

impl Debug for TimeSeries {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("TimeSeries")
            .field("window", &self.window)
            .field("capacity", &self.capacity)
            .field("len", &state.samples.len())
            .field("latest", &state.samples.back().map(|s| s.value))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn values(series: &TimeSeries) -> Vec<f64> {
        series
            .samples()
            .unwrap()
            .iter()
            .map(|s| s.value)
            .collect()
    }

    #[test]
    fn test_new_is_empty() {
        let series = TimeSeries::new(Duration::from_secs(1), 10).unwrap();
        assert!(series.is_empty());
        assert_eq!(series.len(), 0);
        assert!(series.latest().is_none());
        assert_eq!(series.samples(), Some(vec![]));
    }

    #[test]
    fn test_rejects_zero_window() {
        let err = TimeSeries::new(Duration::ZERO, 10).unwrap_err();
        assert!(matches!(err, MetricError::NonPositiveWindow));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let err = TimeSeries::new(Duration::from_secs(1), 0).unwrap_err();
        assert!(matches!(err, MetricError::ZeroCapacity));
    }

    #[test]
    fn test_default_config() {
        let config = HistoryConfig::default();
        assert_eq!(config.window, DEFAULT_WINDOW);
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_with_window_uses_default_capacity() {
        let series = TimeSeries::with_window(Duration::from_secs(30)).unwrap();
        assert_eq!(series.window(), Duration::from_secs(30));
        assert_eq!(series.capacity(), DEFAULT_CAPACITY);
    }

    #[test]
    fn test_push_keeps_order() {
        let series = TimeSeries::new(Duration::from_secs(60), 10).unwrap();
        series.push(0.0, at(1));
        series.push(5.0, at(2));
        series.push(3.0, at(3));
        assert_eq!(values(&series), vec![0.0, 5.0, 3.0]);
        assert_eq!(series.latest(), Some(Sample::new(3.0, at(3))));
    }

    #[test]
    fn test_same_timestamp_keeps_both() {
        let series = TimeSeries::new(Duration::from_secs(60), 10).unwrap();
        series.push(1.0, at(1));
        series.push(2.0, at(1));
        assert_eq!(values(&series), vec![1.0, 2.0]);
    }

    #[test]
    fn test_out_of_order_insert() {
        let series = TimeSeries::new(Duration::from_secs(60), 10).unwrap();
        series.push(1.0, at(10));
        series.push(3.0, at(30));
        series.push(2.0, at(20));
        assert_eq!(values(&series), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.latest().unwrap().value, 3.0);
    }

    #[test]
    fn test_latest_follows_timestamp_not_push_order() {
        let series = TimeSeries::new(Duration::from_secs(60), 10).unwrap();
        // A writer that updated last but read the clock first.
        series.push(2.0, at(2));
        series.push(3.0, at(1));
        assert_eq!(series.latest().unwrap().value, 2.0);
    }

    #[test]
    fn test_truncate_to_window() {
        let series = TimeSeries::new(Duration::from_secs(10), 100).unwrap();
        for secs in 0..=20 {
            series.push(secs as f64, at(secs));
        }
        // Horizon is 20 - 10 = 10; the sample at exactly 10 stays.
        assert_eq!(
            values(&series),
            (10..=20).map(|s| s as f64).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_window_longer_than_epoch_offset() {
        let series = TimeSeries::new(Duration::from_secs(3600), 10).unwrap();
        series.push(1.0, at(1));
        series.push(2.0, at(2));
        assert_eq!(series.len(), 2);
    }

    #[test]
    fn test_sparsify_thins_older_half() {
        let series = TimeSeries::new(Duration::from_secs(3600), 8).unwrap();
        for secs in 0..=8 {
            series.push(secs as f64, at(secs));
        }
        assert_eq!(values(&series), vec![0.0, 2.0, 4.0, 5.0, 6.0, 7.0, 8.0]);

        // Room was freed for one more append without thinning.
        series.push(9.0, at(9));
        assert_eq!(series.len(), 8);

        series.push(10.0, at(10));
        assert_eq!(values(&series), vec![0.0, 4.0, 6.0, 7.0, 8.0, 9.0, 10.0]);
    }

    #[test]
    fn test_sparsify_frees_room_in_batches() {
        let series = TimeSeries::new(Duration::from_secs(3600), 1000).unwrap();
        for secs in 0..=1000 {
            series.push(secs as f64, at(secs));
        }
        // One pass drops the odd indices below 500.
        assert_eq!(series.len(), 751);

        for secs in 1001..1250 {
            series.push(secs as f64, at(secs));
        }
        assert_eq!(series.len(), 1000);
        assert_eq!(series.samples().unwrap()[0].value, 0.0);
        assert_eq!(series.latest().unwrap().value, 1249.0);
    }

    #[test]
    fn test_sparsify_never_drops_newest() {
        let series = TimeSeries::new(Duration::from_secs(3600), 3).unwrap();
        for secs in 0..100 {
            series.push(secs as f64, at(secs));
            assert_eq!(series.latest().unwrap().value, secs as f64);
            assert!(series.len() <= 3);
        }
        assert_eq!(series.samples().unwrap()[0].value, 0.0);
    }

    #[test]
    fn test_capacity_one_keeps_newest() {
        let series = TimeSeries::new(Duration::from_secs(3600), 1).unwrap();
        series.push(1.0, at(1));
        series.push(2.0, at(2));
        series.push(3.0, at(3));
        assert_eq!(values(&series), vec![3.0]);
    }

    #[test]
    fn test_discard() {
        let sink = Discard;
        sink.push(1.0, SystemTime::now());
        assert!(sink.samples().is_none());
    }

    #[test]
    fn test_concurrent_pushes() {
        let series = Arc::new(TimeSeries::new(Duration::from_secs(3600), 10_000).unwrap());
        let mut handles = vec![];

        for _ in 0..4 {
            let series = Arc::clone(&series);
            handles.push(thread::spawn(move || {
                for _ in 0..250 {
                    series.push(1.0, SystemTime::now());
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(series.len(), 1000);
        let samples = series.samples().unwrap();
        assert!(samples.windows(2).all(|w| w[0].at <= w[1].at));
    }

    #[test]
    fn test_debug() {
        let series = TimeSeries::new(Duration::from_secs(5), 10).unwrap();
        series.push(42.0, at(1));
        let debug_str = format!("{:?}", series);
        assert!(debug_str.starts_with("TimeSeries"));
        assert!(debug_str.contains("42"));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_deserialize_config_with_defaults() {
        let json = r#"{"capacity":50}"#;
        let config: HistoryConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.capacity, 50);
        assert_eq!(config.window, DEFAULT_WINDOW);
    }
}
