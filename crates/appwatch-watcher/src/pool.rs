//! Watcher pool — one watcher per application in the inventory.
//!
//! The inventory collaborator hands the pool its full application list;
//! the pool starts watchers for new applications, forwards descriptors to
//! existing ones, and closes watchers for applications that disappeared.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use appwatch_metrics::SharedRegistry;
use appwatch_types::{ApplicationDescriptor, ApplicationId, ContainerMetricEvent};

use crate::watcher::{AppWatcher, WatcherConfig};

/// Outcome of a [`WatcherPool::sync`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncSummary {
    pub started: usize,
    pub updated: usize,
    pub stopped: usize,
}

/// Outcome of routing a container metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Queued on the owning watcher.
    Delivered,
    /// No watcher for the event's application.
    UnknownApplication,
    /// The watcher's buffer was full or it was closing.
    Dropped,
}

/// Manages the watchers for every application in the inventory.
pub struct WatcherPool {
    registry: SharedRegistry,
    config: WatcherConfig,
    /// Active watchers: application id → watcher.
    watchers: RwLock<HashMap<ApplicationId, Arc<AppWatcher>>>,
}

impl WatcherPool {
    pub fn new(registry: SharedRegistry, config: WatcherConfig) -> Self {
        Self {
            registry,
            config,
            watchers: RwLock::new(HashMap::new()),
        }
    }

    /// Reconcile the running watchers with a full inventory listing.
    pub async fn sync(&self, apps: Vec<ApplicationDescriptor>) -> SyncSummary {
        let mut summary = SyncSummary::default();
        let mut watchers = self.watchers.write().await;

        let desired: HashSet<&str> = apps.iter().map(|a| a.id.as_str()).collect();
        let gone: Vec<ApplicationId> = watchers
            .keys()
            .filter(|id| !desired.contains(id.as_str()))
            .cloned()
            .collect();

        for id in gone {
            if let Some(watcher) = watchers.remove(&id) {
                watcher.close().await;
                info!(app = %watcher.application_name(), "stopped watching application");
                summary.stopped += 1;
            }
        }

        for app in apps {
            match watchers.get(&app.id) {
                Some(watcher) => {
                    watcher.update_application(app);
                    summary.updated += 1;
                }
                None => {
                    let watcher = AppWatcher::new(app.clone(), self.registry.clone(), &self.config);
                    watcher.start();
                    watchers.insert(app.id, Arc::new(watcher));
                    summary.started += 1;
                }
            }
        }

        debug!(
            started = summary.started,
            updated = summary.updated,
            stopped = summary.stopped,
            "watcher pool synced"
        );
        summary
    }

    /// Forward a container metric to the watcher of its application.
    pub async fn route_container_metric(&self, event: ContainerMetricEvent) -> Delivery {
        let watchers = self.watchers.read().await;
        let Some(watcher) = watchers.get(&event.application_id) else {
            return Delivery::UnknownApplication;
        };
        if watcher.try_send_container_metric(event) {
            Delivery::Delivered
        } else {
            Delivery::Dropped
        }
    }

    pub fn config(&self) -> &WatcherConfig {
        &self.config
    }

    pub async fn get(&self, id: &str) -> Option<Arc<AppWatcher>> {
        self.watchers.read().await.get(id).cloned()
    }

    pub async fn contains(&self, id: &str) -> bool {
        self.watchers.read().await.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.watchers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.watchers.read().await.is_empty()
    }

    /// Names of watched applications, sorted.
    pub async fn watched(&self) -> Vec<String> {
        let watchers = self.watchers.read().await;
        let mut names: Vec<String> = watchers
            .values()
            .map(|w| w.application_name().to_string())
            .collect();
        names.sort();
        names
    }

    /// Close every watcher (for graceful shutdown).
    pub async fn close_all(&self) {
        let mut watchers = self.watchers.write().await;
        for (id, watcher) in watchers.drain() {
            watcher.close().await;
            debug!(app_id = %id, "watcher closed");
        }
        info!("all watchers closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::{FakeRegistry, eventually, test_app};
    use crate::watcher::WatcherState;

    fn other_app(instances: i64) -> ApplicationDescriptor {
        ApplicationDescriptor::new(
            "55555555-5555-5555-5555-555555555555",
            "bar",
            instances,
            "/v2/spaces/456",
        )
    }

    fn test_pool() -> (WatcherPool, Arc<FakeRegistry>) {
        let registry = Arc::new(FakeRegistry::default());
        (WatcherPool::new(registry.clone(), WatcherConfig::default()), registry)
    }

    #[tokio::test]
    async fn sync_starts_watchers_for_new_apps() {
        let (pool, registry) = test_pool();

        let summary = pool.sync(vec![test_app(1), other_app(2)]).await;
        assert_eq!(summary, SyncSummary { started: 2, updated: 0, stopped: 0 });
        assert_eq!(pool.watched().await, vec!["bar", "foo"]);
        assert_eq!(registry.register_calls(), 3);

        pool.close_all().await;
        assert!(pool.is_empty().await);
        assert_eq!(registry.live(), 0);
    }

    #[tokio::test]
    async fn sync_updates_existing_watchers() {
        let (pool, registry) = test_pool();
        pool.sync(vec![test_app(1)]).await;

        let summary = pool.sync(vec![test_app(3)]).await;
        assert_eq!(summary, SyncSummary { started: 0, updated: 1, stopped: 0 });
        eventually(|| registry.live() == 3).await;

        pool.close_all().await;
    }

    #[tokio::test]
    async fn sync_closes_removed_apps() {
        let (pool, registry) = test_pool();
        pool.sync(vec![test_app(1), other_app(2)]).await;
        let removed = pool.get(&other_app(0).id).await.unwrap();

        let summary = pool.sync(vec![test_app(1)]).await;
        assert_eq!(summary, SyncSummary { started: 0, updated: 1, stopped: 1 });
        assert_eq!(removed.state(), WatcherState::Closed);
        assert!(!pool.contains(&other_app(0).id).await);
        assert_eq!(registry.live(), 1);

        pool.close_all().await;
    }

    #[tokio::test]
    async fn route_to_known_and_unknown_apps() {
        let (pool, _registry) = test_pool();
        pool.sync(vec![test_app(1)]).await;

        let event = ContainerMetricEvent::cpu(test_app(1).id, 0, 10.0);
        assert_eq!(pool.route_container_metric(event).await, Delivery::Delivered);

        let stray = ContainerMetricEvent::cpu("no-such-app", 0, 10.0);
        assert_eq!(pool.route_container_metric(stray).await, Delivery::UnknownApplication);

        pool.close_all().await;
    }

    #[tokio::test]
    async fn route_drops_when_buffer_full() {
        let registry = Arc::new(FakeRegistry::default());
        let config = WatcherConfig {
            metric_buffer: 1,
            ..WatcherConfig::default()
        };
        let pool = WatcherPool::new(registry.clone(), config.clone());
        // Unstarted watchers never drain their buffer.
        let watcher = AppWatcher::new(test_app(1), registry, &config);
        pool.watchers.write().await.insert(test_app(1).id, Arc::new(watcher));

        let event = ContainerMetricEvent::cpu(test_app(1).id, 0, 1.0);
        assert_eq!(pool.route_container_metric(event.clone()).await, Delivery::Delivered);
        assert_eq!(pool.route_container_metric(event).await, Delivery::Dropped);

        pool.close_all().await;
    }

    #[tokio::test]
    async fn sync_with_oversized_count_registers_nothing() {
        let registry = Arc::new(FakeRegistry::default());
        let config = WatcherConfig {
            max_instances: 3,
            ..WatcherConfig::default()
        };
        let pool = WatcherPool::new(registry.clone(), config);
        assert_eq!(pool.config().max_instances, 3);

        pool.sync(vec![test_app(i64::from(u32::MAX))]).await;
        assert!(pool.contains(&test_app(0).id).await);
        assert_eq!(registry.register_calls(), 0);

        pool.close_all().await;
    }
}
