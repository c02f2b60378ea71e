//! appwatch-metrics — per-instance metrics for watched applications.
//!
//! Each live instance of an application owns one [`MetricSet`]. The
//! [`InstanceLedger`] keeps the set of live indices in step with the
//! declared instance count and registers or unregisters metric sets with
//! the shared [`MetricsRegistry`] as the application scales.
//!
//! # Architecture
//!
//! ```text
//! InstanceLedger
//!   ├── reconcile(count) → registers [live, count) / unregisters [count, live)
//!   ├── get(index) → &MetricSet
//!   └── clear() → unregisters everything (watcher shutdown)
//!
//! MetricSet (one composite prometheus Collector per instance)
//!   └── cpu_percentage, memory_bytes, disk_bytes, *_quota gauges
//!
//! Exposition
//!   └── render_text() → text/plain for /metrics endpoint
//! ```

pub mod exposition;
pub mod ledger;
pub mod metric_set;
pub mod registry;

pub use exposition::{TEXT_CONTENT_TYPE, render_text};
pub use ledger::{DEFAULT_MAX_INSTANCES, InstanceLedger, Reconciled};
pub use metric_set::{InstanceMetric, MetricSet};
pub use registry::{MetricsRegistry, SharedRegistry};
