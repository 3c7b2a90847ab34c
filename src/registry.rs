//! Name-keyed collection of live metrics.
//!
//! A [`Registry`] owns a shared handle to every metric added to it, so a
//! metric stays alive (and keeps recording history) until it is removed,
//! even if the component that created it drops its own handles.
//!
//! Names are unique within a registry. The process-wide instance is
//! returned by [`global`].
//!
//! # Examples
//!
//! ```rust
//! use fenestra::metrics::counter::Counter;
//! use fenestra::registry::Registry;
//!
//! let registry = Registry::new();
//! let requests = Counter::new("requests", None).unwrap();
//!
//! registry.add(requests.clone()).unwrap();
//! requests.add(3);
//!
//! // A second metric with the same name is rejected.
//! assert!(registry.add(Counter::new("requests", None).unwrap()).is_err());
//!
//! // Counters answer immediately, so the snapshot is ready on first poll.
//! use futures_util::FutureExt;
//! let snapshot = registry.snapshot().now_or_never().unwrap();
//! assert_eq!(snapshot.get("requests").unwrap().value, 3.0);
//! ```

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::join_all;
use once_cell::sync::Lazy;
use tracing::{debug, warn};

use crate::error::{MetricError, Result};
use crate::history::Sample;
use crate::metrics::Metric;
use crate::snapshot::{MetricSnapshot, MetricsSnapshot};

static GLOBAL: Lazy<Registry> = Lazy::new(Registry::new);

/// Returns the process-wide registry.
pub fn global() -> &'static Registry {
    &GLOBAL
}

/// A concurrent map from metric name to metric.
#[derive(Debug, Default)]
pub struct Registry {
    metrics: DashMap<String, Arc<dyn Metric>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `metric` under its own name.
    ///
    /// Metrics are usually shared handles (e.g. a cloned
    /// [`Counter`](crate::metrics::counter::Counter)), so the caller keeps
    /// updating the same value the registry reads.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::Duplicate`] if the name is already taken.
    pub fn add<M>(&self, metric: M) -> Result<()>
    where
        M: Metric + 'static,
    {
        self.add_shared(Arc::new(metric))
    }

    /// Adds an already shared metric.
    pub fn add_shared(&self, metric: Arc<dyn Metric>) -> Result<()> {
        match self.metrics.entry(metric.name().to_owned()) {
            Entry::Occupied(entry) => {
                warn!(metric = %entry.key(), "rejected duplicate metric");
                Err(MetricError::Duplicate(entry.key().clone()))
            }
            Entry::Vacant(entry) => {
                debug!(
                    metric = %entry.key(),
                    kind = %metric.kind(),
                    window = ?metric.window(),
                    "metric registered"
                );
                entry.insert(metric);
                Ok(())
            }
        }
    }

    /// Removes and returns the metric named `name`.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::NotFound`] if no such metric is registered.
    pub fn remove(&self, name: &str) -> Result<Arc<dyn Metric>> {
        match self.metrics.remove(name) {
            Some((_, metric)) => {
                debug!(metric = %name, "metric removed");
                Ok(metric)
            }
            None => Err(MetricError::NotFound(name.to_owned())),
        }
    }

    /// Returns the metric named `name`.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Metric>> {
        self.metrics.get(name).map(|m| Arc::clone(m.value()))
    }

    /// Returns `true` if a metric named `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    /// Returns the registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.metrics.iter().map(|m| m.key().clone()).collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of registered metrics.
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Returns `true` if no metric is registered.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// Returns the retained history of the metric named `name`.
    ///
    /// `None` if the metric is unknown or keeps no history.
    pub fn history(&self, name: &str) -> Option<Vec<Sample>> {
        self.get(name).and_then(|m| m.history())
    }

    /// Reads every registered metric and returns their values, sorted by
    /// name and stamped with the current time.
    ///
    /// All reads are issued before any is awaited, so slow
    /// [`PullGauge`](crate::metrics::gauge::PullGauge) callbacks run
    /// concurrently. Metrics added or removed while the snapshot is taken
    /// may or may not be included.
    pub async fn snapshot(&self) -> MetricsSnapshot {
        // Shard guards must be released before any read starts: a pull
        // callback may add or remove metrics on this registry.
        let mut entries: Vec<(String, Arc<dyn Metric>)> = self
            .metrics
            .iter()
            .map(|entry| (entry.key().clone(), Arc::clone(entry.value())))
            .collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(&b.0));

        let (names, reads): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .map(|(name, metric)| (name, metric.value()))
            .unzip();
        let values = join_all(reads).await;

        let metrics = names
            .into_iter()
            .zip(values)
            .map(|(name, value)| MetricSnapshot::new(name, value))
            .collect();

        MetricsSnapshot::with_timestamp(metrics, now_ms())
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
