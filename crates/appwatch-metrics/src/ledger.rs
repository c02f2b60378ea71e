//! Instance ledger — maps live instance indices to their metric sets.
//!
//! Indices are dense: an application declaring `n` instances has exactly
//! the indices `0..n` live. Reconciliation only ever registers indices at
//! or above the tracked live count and only unregisters indices below it,
//! so a set is never registered twice and never unregistered twice.

use std::collections::HashMap;

use tracing::{debug, warn};

use appwatch_types::{ApplicationDescriptor, InstanceIndex, WatchError, WatchResult};

use crate::metric_set::MetricSet;
use crate::registry::SharedRegistry;

/// Highest instance count a ledger accepts unless configured otherwise.
pub const DEFAULT_MAX_INSTANCES: InstanceIndex = 1000;

/// Indices touched by a single reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub added: Vec<InstanceIndex>,
    pub removed: Vec<InstanceIndex>,
}

impl Reconciled {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Live metric sets for one application.
pub struct InstanceLedger {
    /// Identity used for metric labels; fixed at construction.
    app: ApplicationDescriptor,
    registry: SharedRegistry,
    sets: HashMap<InstanceIndex, MetricSet>,
    /// Number of live indices; the live set is always `0..live`.
    live: InstanceIndex,
    max_instances: InstanceIndex,
}

impl InstanceLedger {
    /// Create an empty ledger. Nothing is registered until `reconcile`.
    pub fn new(app: &ApplicationDescriptor, registry: SharedRegistry) -> Self {
        Self {
            app: app.clone(),
            registry,
            sets: HashMap::new(),
            live: 0,
            max_instances: DEFAULT_MAX_INSTANCES,
        }
    }

    /// Cap the instance count `reconcile` accepts.
    pub fn with_max_instances(mut self, max_instances: InstanceIndex) -> Self {
        self.max_instances = max_instances;
        self
    }

    pub fn application(&self) -> &ApplicationDescriptor {
        &self.app
    }

    /// Bring the live index set into agreement with `instances`.
    ///
    /// Negative counts and counts above the ceiling are rejected and the
    /// ledger is left unchanged.
    pub fn reconcile(&mut self, instances: i64) -> WatchResult<Reconciled> {
        let target = InstanceIndex::try_from(instances)
            .ok()
            .filter(|n| *n <= self.max_instances)
            .ok_or_else(|| WatchError::InvalidInstanceCount {
                application: self.app.name.clone(),
                count: instances,
            })?;

        let mut result = Reconciled::default();

        while self.live < target {
            let index = self.live;
            let set = MetricSet::new(&self.app, index)?;
            self.registry.must_register(set.collector());
            self.sets.insert(index, set);
            self.live = index + 1;
            result.added.push(index);
        }

        while self.live > target {
            let index = self.live - 1;
            self.release(index);
            self.live = index;
            result.removed.push(index);
        }

        if !result.is_noop() {
            debug!(
                app = %self.app.name,
                live = self.live,
                added = result.added.len(),
                removed = result.removed.len(),
                "instances reconciled"
            );
        }
        Ok(result)
    }

    /// Unregister and drop every live set. Returns how many were released.
    pub fn clear(&mut self) -> usize {
        let released = self.live as usize;
        while self.live > 0 {
            self.live -= 1;
            self.release(self.live);
        }
        released
    }

    pub fn get(&self, index: InstanceIndex) -> Option<&MetricSet> {
        self.sets.get(&index)
    }

    pub fn live_count(&self) -> InstanceIndex {
        self.live
    }

    pub fn max_instances(&self) -> InstanceIndex {
        self.max_instances
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }

    /// Live indices in ascending order.
    pub fn indices(&self) -> Vec<InstanceIndex> {
        let mut indices: Vec<_> = self.sets.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    fn release(&mut self, index: InstanceIndex) {
        match self.sets.remove(&index) {
            Some(set) => {
                if !self.registry.unregister(set.collector()) {
                    warn!(app = %self.app.name, index, "metric set was not registered");
                }
            }
            None => warn!(app = %self.app.name, index, "live index missing from ledger"),
        }
    }
}
