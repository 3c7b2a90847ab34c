//! # Fenestra - Lock-Free Metrics with Time-Windowed History
//!
//! A Rust library providing thread-safe counters and gauges that remember
//! what values they took. Every update is applied with a single atomic
//! instruction and then handed to a history sink, which keeps a bounded
//! window of recent samples for later inspection.
//!
//! ## Design Principles
//!
//! 1. **Shared Handles**: A [`Counter`](metrics::counter::Counter) is a
//!    reference-counted handle over one atomic cell. Cloning it hands out
//!    another view of the same value, never a copy.
//!
//! 2. **Lock-Free Updates**: `add`, `increment` and `reset` are a single
//!    `fetch_add` / `fetch_and` on an `AtomicI64`. The cell is wrapped in
//!    [`crossbeam_utils::CachePadded`] so it does not share a cache line
//!    with its neighbours.
//!
//! 3. **Push on Mutate**: After updating the cell, the new value is pushed
//!    to the metric's [`HistorySink`](history::HistorySink), stamped with
//!    the wall-clock time. The sink is injected at construction, so tests
//!    and embedders can substitute their own.
//!
//! 4. **Composition over Inheritance**: Every metric kind composes an
//!    immutable [`Identity`](metrics::Identity) (name and window) with its
//!    value and its sink, and exposes itself through the
//!    [`Metric`](metrics::Metric) trait.
//!
//! ```text
//!   caller ──add(5)──► Counter ──fetch_add──► AtomicI64
//!                         │
//!                         └──push(5.0, now)──► HistorySink (TimeSeries)
//! ```
//!
//! ## Available Metric Types
//!
//! | Type | Description | Use Case |
//! |------|-------------|----------|
//! | [`Counter`](metrics::counter::Counter) | Signed counter, incremented, decremented, reset | Request totals, error counts |
//! | [`PushGauge`](metrics::gauge::PushGauge) | Integer set or adjusted by the caller | Active connections, queue length |
//! | [`PullGauge`](metrics::gauge::PullGauge) | Value produced on demand by a callback | Memory usage, external readings |
//!
//! ## Quick Start
//!
//! ```rust
//! use fenestra::metrics::counter::Counter;
//! use fenestra::metrics::Metric;
//! use std::time::Duration;
//!
//! // Keep one minute of history.
//! let requests = Counter::new("requests", Some(Duration::from_secs(60))).unwrap();
//!
//! requests.increment();
//! requests.add(5);
//! requests.sub(2);
//! assert_eq!(requests.get(), 4);
//!
//! // One sample for construction, one per update.
//! assert_eq!(requests.history().unwrap().len(), 4);
//! ```
//!
//! ## Registry
//!
//! ```rust
//! use fenestra::metrics::counter::Counter;
//! use fenestra::registry;
//!
//! let errors = Counter::new("errors", None).unwrap();
//! registry::global().add(errors.clone()).unwrap();
//!
//! errors.increment();
//! assert!(registry::global().contains("errors"));
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `serde` | Derives `Serialize`/`Deserialize` for snapshots, samples and [`HistoryConfig`](history::HistoryConfig) |
//! | `json` | Enables [`MetricsSnapshot::to_json`](snapshot::MetricsSnapshot::to_json) (default) |

pub mod error;
pub mod history;
pub mod metrics;
pub mod registry;
pub mod snapshot;

pub use error::{MetricError, Result};
pub use metrics::counter::Counter;
pub use metrics::{Metric, MetricKind};
