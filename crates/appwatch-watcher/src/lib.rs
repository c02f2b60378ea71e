//! appwatch-watcher — per-application instance metric watchers.
//!
//! An [`AppWatcher`] runs one background task per application. The task
//! owns the application's [`InstanceLedger`](appwatch_metrics::InstanceLedger)
//! and is the only place it is mutated; everything else talks to it over
//! channels.
//!
//! # Architecture
//!
//! ```text
//! WatcherPool
//!   ├── sync(inventory) → start / update / close watchers
//!   └── route_container_metric() → owning watcher
//!
//! AppWatcher (Created → Running → Closing → Closed)
//!   ├── start() → initial reconcile, spawn loop
//!   ├── update_application() ─┐
//!   ├── container_metrics() ──┼─→ select! loop → processor → ledger
//!   └── close() ──────────────┘     (shutdown polled first)
//! ```
//!
//! # Ordering
//!
//! Application updates apply in delivery order, container metrics apply in
//! delivery order, and nothing orders the two streams against each other.
//! A metric for an index the ledger does not know yet is dropped.

pub mod pool;
pub mod processor;
pub mod watcher;

#[cfg(test)]
mod testing;

pub use pool::{Delivery, SyncSummary, WatcherPool};
pub use watcher::{AppWatcher, WatcherConfig, WatcherState};
