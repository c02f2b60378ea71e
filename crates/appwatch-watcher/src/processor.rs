//! Event processor — folds incoming events into an instance ledger.

use tracing::{trace, warn};

use appwatch_metrics::{InstanceLedger, Reconciled};
use appwatch_types::{ApplicationDescriptor, ContainerMetricEvent, WatchResult};

/// Apply a container metric to the matching instance.
///
/// Events for indices the ledger does not hold are dropped; they are the
/// expected result of metrics racing ahead of a scale-up. Returns whether
/// the event matched a live instance.
pub fn apply_container_metric(ledger: &InstanceLedger, event: &ContainerMetricEvent) -> bool {
    let Some(set) = event.index().and_then(|index| ledger.get(index)) else {
        trace!(
            app = %ledger.application().name,
            index = event.instance_index,
            "dropping metric for unknown instance"
        );
        return false;
    };
    set.apply(event);
    true
}

/// Reconcile the ledger against a replacement descriptor.
///
/// Descriptors for a different application are ignored.
pub fn apply_application_update(
    ledger: &mut InstanceLedger,
    app: &ApplicationDescriptor,
) -> WatchResult<Reconciled> {
    if app.id != ledger.application().id {
        warn!(
            watched = %ledger.application().id,
            received = %app.id,
            "ignoring update for a different application"
        );
        return Ok(Reconciled::default());
    }
    ledger.reconcile(app.instances)
}
