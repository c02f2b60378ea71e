//! Test doubles shared by the watcher and pool tests.

use std::collections::HashSet;

use parking_lot::Mutex;
use prometheus::core::Collector;

use appwatch_metrics::MetricsRegistry;
use appwatch_types::ApplicationDescriptor;

pub(crate) const APP_ID: &str = "33333333-3333-3333-3333-333333333333";

pub(crate) fn test_app(instances: i64) -> ApplicationDescriptor {
    ApplicationDescriptor::new(APP_ID, "foo", instances, "/v2/spaces/123")
}

/// Counts registry calls and tracks live identities so duplicate
/// registrations and double unregistrations fail the test.
#[derive(Default)]
pub(crate) struct FakeRegistry {
    inner: Mutex<FakeState>,
}

#[derive(Default)]
struct FakeState {
    register_calls: usize,
    unregister_calls: usize,
    live: HashSet<Vec<u64>>,
}

fn identity(collector: &dyn Collector) -> Vec<u64> {
    collector.desc().iter().map(|d| d.id).collect()
}

impl FakeRegistry {
    pub(crate) fn register_calls(&self) -> usize {
        self.inner.lock().register_calls
    }

    pub(crate) fn unregister_calls(&self) -> usize {
        self.inner.lock().unregister_calls
    }

    pub(crate) fn live(&self) -> usize {
        self.inner.lock().live.len()
    }
}

impl MetricsRegistry for FakeRegistry {
    fn must_register(&self, collector: Box<dyn Collector>) {
        let mut state = self.inner.lock();
        state.register_calls += 1;
        assert!(
            state.live.insert(identity(collector.as_ref())),
            "duplicate registration"
        );
    }

    fn unregister(&self, collector: Box<dyn Collector>) -> bool {
        let mut state = self.inner.lock();
        state.unregister_calls += 1;
        let found = state.live.remove(&identity(collector.as_ref()));
        assert!(found, "unregistered a collector that was not registered");
        found
    }
}

/// Poll `cond` until it holds, failing the test after two seconds.
pub(crate) async fn eventually(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("condition not met within 2s");
}
