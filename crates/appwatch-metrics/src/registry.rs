//! The registry seam between watchers and the metrics backend.
//!
//! Watchers never touch a global registry; they receive a
//! [`SharedRegistry`] at construction so tests can substitute a counting
//! fake.

use std::sync::Arc;

use prometheus::Registry;
use prometheus::core::Collector;

/// A registry that accepts and forfeits ownership of collectors.
///
/// Implementations must tolerate concurrent calls from many watcher tasks.
pub trait MetricsRegistry: Send + Sync {
    /// Register a collector.
    ///
    /// # Panics
    ///
    /// Panics if a collector with the same identity is already registered.
    /// Callers must guarantee this never happens.
    fn must_register(&self, collector: Box<dyn Collector>);

    /// Unregister a collector, returning whether it was found.
    fn unregister(&self, collector: Box<dyn Collector>) -> bool;
}

/// Registry handle shared by every watcher in the process.
pub type SharedRegistry = Arc<dyn MetricsRegistry>;

impl MetricsRegistry for Registry {
    fn must_register(&self, collector: Box<dyn Collector>) {
        if let Err(e) = self.register(collector) {
            panic!("metrics registration violated registry contract: {e}");
        }
    }

    fn unregister(&self, collector: Box<dyn Collector>) -> bool {
        Registry::unregister(self, collector).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::{Gauge, Opts};

    fn gauge(name: &str) -> Gauge {
        Gauge::with_opts(Opts::new(name, "test gauge")).unwrap()
    }

    #[test]
    fn register_then_unregister() {
        let registry = Registry::new();
        let g = gauge("test_gauge");

        registry.must_register(Box::new(g.clone()));
        assert_eq!(registry.gather().len(), 1);

        assert!(MetricsRegistry::unregister(&registry, Box::new(g.clone())));
        assert!(registry.gather().is_empty());

        // Second unregister finds nothing.
        assert!(!MetricsRegistry::unregister(&registry, Box::new(g)));
    }

    #[test]
    #[should_panic(expected = "registry contract")]
    fn duplicate_registration_panics() {
        let registry = Registry::new();
        let g = gauge("dup_gauge");
        registry.must_register(Box::new(g.clone()));
        registry.must_register(Box::new(g));
    }
}
