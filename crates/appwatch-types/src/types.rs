//! Domain types exchanged between the inventory, the platform event
//! stream, and the watchers.

use serde::{Deserialize, Serialize};

/// Opaque application identifier (platform guid).
pub type ApplicationId = String;

/// Dense, zero-based index of a running instance.
pub type InstanceIndex = u32;

// ── Application ───────────────────────────────────────────────────

/// Snapshot of an application as reported by the inventory.
///
/// Descriptors are never patched; a newer descriptor replaces the old one
/// wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationDescriptor {
    pub id: ApplicationId,
    pub name: String,
    /// Declared instance count. Signed so that malformed values survive
    /// decoding and can be rejected during reconciliation.
    pub instances: i64,
    /// Owning namespace (space).
    #[serde(default)]
    pub namespace: String,
}

impl ApplicationDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        instances: i64,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            instances,
            namespace: namespace.into(),
        }
    }

    /// Copy of this descriptor with a different declared instance count.
    pub fn with_instances(&self, instances: i64) -> Self {
        Self {
            instances,
            ..self.clone()
        }
    }
}

/// An application update is a full replacement descriptor.
pub type ApplicationUpdateEvent = ApplicationDescriptor;

// ── Container metrics ─────────────────────────────────────────────

/// Per-instance resource reading delivered by the platform event stream.
///
/// Absent readings leave the corresponding gauge unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ContainerMetricEvent {
    #[serde(default)]
    pub application_id: ApplicationId,
    /// Signed as delivered on the wire; negative indices never match.
    pub instance_index: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_bytes_quota: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disk_bytes_quota: Option<u64>,
}

impl ContainerMetricEvent {
    /// Event carrying only a CPU reading.
    pub fn cpu(
        application_id: impl Into<String>,
        instance_index: i32,
        cpu_percentage: f64,
    ) -> Self {
        Self {
            application_id: application_id.into(),
            instance_index,
            cpu_percentage: Some(cpu_percentage),
            ..Default::default()
        }
    }

    /// The instance index, if it can name a live instance at all.
    pub fn index(&self) -> Option<InstanceIndex> {
        InstanceIndex::try_from(self.instance_index).ok()
    }
}
