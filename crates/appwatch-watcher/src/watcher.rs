//! Application watcher — one background task per watched application.
//!
//! The task owns the application's instance ledger. Application updates,
//! container metrics and the shutdown signal reach it over channels, so
//! the ledger itself needs no lock.
//!
//! Lifecycle policy:
//! - `start()` reconciles from zero to the declared instance count before
//!   the loop is spawned, so a `close()` issued right after `start()`
//!   always sees the initial registrations. Updates queued before
//!   `start()` are applied after that initial reconciliation.
//! - `start()` outside a tokio runtime registers nothing and leaves the
//!   watcher `Created`.
//! - A second `start()` is a no-op, as is `start()` after `close()`.
//! - `close()` before `start()` goes straight to `Closed` and registers
//!   nothing.
//! - Dropping a watcher without closing it still stops the loop and
//!   unregisters its metrics.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use appwatch_metrics::{DEFAULT_MAX_INSTANCES, InstanceLedger, SharedRegistry};
use appwatch_types::{ApplicationDescriptor, ContainerMetricEvent, InstanceIndex};

use crate::processor;

/// Default capacity of the container metric channel.
pub const DEFAULT_METRIC_BUFFER: usize = 1024;

/// Lifecycle state of a watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Created,
    Running,
    Closing,
    Closed,
}

/// Tunables for a watcher.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Capacity of the container metric channel.
    pub metric_buffer: usize,
    /// Instance counts above this are rejected as invalid.
    pub max_instances: InstanceIndex,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            metric_buffer: DEFAULT_METRIC_BUFFER,
            max_instances: DEFAULT_MAX_INSTANCES,
        }
    }
}

/// Receiving ends handed to the loop task on start.
struct Inbox {
    updates: mpsc::UnboundedReceiver<ApplicationDescriptor>,
    metrics: mpsc::Receiver<ContainerMetricEvent>,
    shutdown: watch::Receiver<bool>,
}

/// Keeps one application's per-instance metrics registered while it scales.
pub struct AppWatcher {
    /// Identity captured at construction.
    app: ApplicationDescriptor,
    registry: SharedRegistry,
    max_instances: InstanceIndex,
    updates_tx: mpsc::UnboundedSender<ApplicationDescriptor>,
    metrics_tx: mpsc::Sender<ContainerMetricEvent>,
    shutdown_tx: watch::Sender<bool>,
    state: Arc<watch::Sender<WatcherState>>,
    /// Present until the loop is started (or the watcher closed unstarted).
    inbox: Mutex<Option<Inbox>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl AppWatcher {
    /// Create a watcher in the `Created` state. Nothing is registered yet.
    pub fn new(
        app: ApplicationDescriptor,
        registry: SharedRegistry,
        config: &WatcherConfig,
    ) -> Self {
        let (updates_tx, updates) = mpsc::unbounded_channel();
        let (metrics_tx, metrics) = mpsc::channel(config.metric_buffer.max(1));
        let (shutdown_tx, shutdown) = watch::channel(false);
        let (state, _) = watch::channel(WatcherState::Created);

        Self {
            app,
            registry,
            max_instances: config.max_instances,
            updates_tx,
            metrics_tx,
            shutdown_tx,
            state: Arc::new(state),
            inbox: Mutex::new(Some(Inbox {
                updates,
                metrics,
                shutdown,
            })),
            handle: Mutex::new(None),
        }
    }

    pub fn application_name(&self) -> &str {
        &self.app.name
    }

    pub fn application_id(&self) -> &str {
        &self.app.id
    }

    pub fn state(&self) -> WatcherState {
        *self.state.borrow()
    }

    /// Subscribe to lifecycle transitions.
    pub fn state_changes(&self) -> watch::Receiver<WatcherState> {
        self.state.subscribe()
    }

    /// Register metrics for the declared instances and spawn the loop.
    ///
    /// Must be called from within a tokio runtime; otherwise it logs an
    /// error and leaves the watcher `Created`. Calling it again, or after
    /// `close()`, does nothing.
    pub fn start(&self) {
        let Ok(runtime) = Handle::try_current() else {
            error!(app = %self.app.name, "watcher started outside a tokio runtime");
            return;
        };

        let mut slot = self.inbox.lock();
        let Some(inbox) = slot.take() else {
            warn!(app = %self.app.name, state = ?self.state(), "watcher already started or closed");
            return;
        };

        if *self.shutdown_tx.borrow() {
            self.state.send_replace(WatcherState::Closed);
            debug!(app = %self.app.name, "watcher closed before start");
            return;
        }

        let mut ledger = InstanceLedger::new(&self.app, self.registry.clone())
            .with_max_instances(self.max_instances);
        if let Err(e) = ledger.reconcile(self.app.instances) {
            warn!(app = %self.app.name, error = %e, "initial reconciliation failed");
        }
        info!(
            app = %self.app.name,
            instances = ledger.live_count(),
            "watcher started"
        );

        self.state.send_replace(WatcherState::Running);
        let handle = runtime.spawn(run_loop(ledger, inbox, self.state.clone()));
        *self.handle.lock() = Some(handle);
    }

    /// Queue a replacement descriptor. A no-op once the watcher is closed.
    pub fn update_application(&self, app: ApplicationDescriptor) {
        if self.updates_tx.send(app).is_err() {
            debug!(app = %self.app.name, "watcher closed, dropping application update");
        }
    }

    /// Sender for the platform's container metric stream.
    ///
    /// Sends fail once the watcher has closed.
    pub fn container_metrics(&self) -> mpsc::Sender<ContainerMetricEvent> {
        self.metrics_tx.clone()
    }

    /// Deliver a container metric without waiting for buffer space.
    ///
    /// Returns `false` if the event was dropped because the buffer is full
    /// or the watcher is closed.
    pub fn try_send_container_metric(&self, event: ContainerMetricEvent) -> bool {
        match self.metrics_tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(app = %self.app.name, "metric buffer full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Stop the loop and wait until every metric is unregistered.
    ///
    /// Idempotent and safe to call concurrently.
    pub async fn close(&self) {
        self.shutdown_tx.send_replace(true);

        let never_started = self.inbox.lock().take().is_some();
        if never_started {
            self.state.send_replace(WatcherState::Closed);
            debug!(app = %self.app.name, "watcher closed before start");
            return;
        }

        let handle = self.handle.lock().take();
        match handle {
            Some(handle) => {
                if let Err(e) = handle.await {
                    error!(app = %self.app.name, error = %e, "watcher loop terminated abnormally");
                    self.state.send_replace(WatcherState::Closed);
                }
            }
            None => {
                let mut state = self.state.subscribe();
                let _ = state.wait_for(|s| *s == WatcherState::Closed).await;
            }
        }
    }
}

/// The watcher loop. Shutdown is polled first so a busy metric stream
/// cannot delay closing.
async fn run_loop(
    mut ledger: InstanceLedger,
    mut inbox: Inbox,
    state: Arc<watch::Sender<WatcherState>>,
) {
    let app = ledger.application().name.clone();

    loop {
        tokio::select! {
            biased;
            _ = inbox.shutdown.changed() => break,
            Some(update) = inbox.updates.recv() => {
                if let Err(e) = processor::apply_application_update(&mut ledger, &update) {
                    warn!(%app, error = %e, "application update rejected");
                }
            }
            Some(event) = inbox.metrics.recv() => {
                processor::apply_container_metric(&ledger, &event);
            }
        }
    }

    state.send_replace(WatcherState::Closing);
    let released = ledger.clear();
    state.send_replace(WatcherState::Closed);
    info!(%app, released, "watcher closed");
}
