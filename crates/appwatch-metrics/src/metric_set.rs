//! Per-instance gauge set.
//!
//! A `MetricSet` is created when its instance index becomes live and is
//! registered as a single composite collector, so one registry call covers
//! every gauge of the instance.

use std::collections::HashMap;
use std::fmt;

use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{Gauge, Opts};

use appwatch_types::{
    ApplicationDescriptor, ContainerMetricEvent, InstanceIndex, WatchError, WatchResult,
};

/// A named gauge within a [`MetricSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceMetric {
    CpuPercentage,
    MemoryBytes,
    DiskBytes,
    MemoryBytesQuota,
    DiskBytesQuota,
}

impl InstanceMetric {
    pub const ALL: [InstanceMetric; 5] = [
        InstanceMetric::CpuPercentage,
        InstanceMetric::MemoryBytes,
        InstanceMetric::DiskBytes,
        InstanceMetric::MemoryBytesQuota,
        InstanceMetric::DiskBytesQuota,
    ];

    /// Exposed metric name.
    pub fn name(self) -> &'static str {
        match self {
            InstanceMetric::CpuPercentage => "appwatch_instance_cpu_percentage",
            InstanceMetric::MemoryBytes => "appwatch_instance_memory_bytes",
            InstanceMetric::DiskBytes => "appwatch_instance_disk_bytes",
            InstanceMetric::MemoryBytesQuota => "appwatch_instance_memory_bytes_quota",
            InstanceMetric::DiskBytesQuota => "appwatch_instance_disk_bytes_quota",
        }
    }

    fn help(self) -> &'static str {
        match self {
            InstanceMetric::CpuPercentage => "CPU usage of the instance in percent.",
            InstanceMetric::MemoryBytes => "Memory used by the instance in bytes.",
            InstanceMetric::DiskBytes => "Disk used by the instance in bytes.",
            InstanceMetric::MemoryBytesQuota => "Memory quota of the instance in bytes.",
            InstanceMetric::DiskBytesQuota => "Disk quota of the instance in bytes.",
        }
    }
}

/// The gauges for exactly one instance of one application.
#[derive(Clone)]
pub struct MetricSet {
    index: InstanceIndex,
    cpu_percentage: Gauge,
    memory_bytes: Gauge,
    disk_bytes: Gauge,
    memory_bytes_quota: Gauge,
    disk_bytes_quota: Gauge,
}

impl MetricSet {
    /// Allocate the gauges for `index`. Nothing is registered.
    pub fn new(app: &ApplicationDescriptor, index: InstanceIndex) -> WatchResult<Self> {
        let labels = instance_labels(app, index);
        let gauge = |metric: InstanceMetric| -> WatchResult<Gauge> {
            let opts = Opts::new(metric.name(), metric.help()).const_labels(labels.clone());
            Gauge::with_opts(opts).map_err(|e| WatchError::Metric {
                name: metric.name().to_string(),
                reason: e.to_string(),
            })
        };

        Ok(Self {
            index,
            cpu_percentage: gauge(InstanceMetric::CpuPercentage)?,
            memory_bytes: gauge(InstanceMetric::MemoryBytes)?,
            disk_bytes: gauge(InstanceMetric::DiskBytes)?,
            memory_bytes_quota: gauge(InstanceMetric::MemoryBytesQuota)?,
            disk_bytes_quota: gauge(InstanceMetric::DiskBytesQuota)?,
        })
    }

    pub fn index(&self) -> InstanceIndex {
        self.index
    }

    pub fn set(&self, metric: InstanceMetric, value: f64) {
        self.gauge(metric).set(value);
    }

    pub fn get(&self, metric: InstanceMetric) -> f64 {
        self.gauge(metric).get()
    }

    /// Apply every reading present in `event`. Returns how many gauges changed.
    pub fn apply(&self, event: &ContainerMetricEvent) -> usize {
        let readings = [
            (InstanceMetric::CpuPercentage, event.cpu_percentage),
            (InstanceMetric::MemoryBytes, event.memory_bytes.map(|v| v as f64)),
            (InstanceMetric::DiskBytes, event.disk_bytes.map(|v| v as f64)),
            (InstanceMetric::MemoryBytesQuota, event.memory_bytes_quota.map(|v| v as f64)),
            (InstanceMetric::DiskBytesQuota, event.disk_bytes_quota.map(|v| v as f64)),
        ];

        let mut applied = 0;
        for (metric, value) in readings {
            if let Some(value) = value {
                self.set(metric, value);
                applied += 1;
            }
        }
        applied
    }

    /// Registry-facing handle. Clones share the underlying gauges.
    pub fn collector(&self) -> Box<dyn Collector> {
        Box::new(self.clone())
    }

    fn gauge(&self, metric: InstanceMetric) -> &Gauge {
        match metric {
            InstanceMetric::CpuPercentage => &self.cpu_percentage,
            InstanceMetric::MemoryBytes => &self.memory_bytes,
            InstanceMetric::DiskBytes => &self.disk_bytes,
            InstanceMetric::MemoryBytesQuota => &self.memory_bytes_quota,
            InstanceMetric::DiskBytesQuota => &self.disk_bytes_quota,
        }
    }

    fn gauges(&self) -> [&Gauge; 5] {
        [
            &self.cpu_percentage,
            &self.memory_bytes,
            &self.disk_bytes,
            &self.memory_bytes_quota,
            &self.disk_bytes_quota,
        ]
    }
}

impl Collector for MetricSet {
    fn desc(&self) -> Vec<&Desc> {
        self.gauges().into_iter().flat_map(|g| g.desc()).collect()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.gauges().into_iter().flat_map(|g| g.collect()).collect()
    }
}

impl fmt::Debug for MetricSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricSet")
            .field("index", &self.index)
            .field("cpu_percentage", &self.cpu_percentage.get())
            .field("memory_bytes", &self.memory_bytes.get())
            .finish_non_exhaustive()
    }
}

fn instance_labels(app: &ApplicationDescriptor, index: InstanceIndex) -> HashMap<String, String> {
    HashMap::from([
        ("application_id".to_string(), app.id.clone()),
        ("application_name".to_string(), app.name.clone()),
        ("namespace".to_string(), app.namespace.clone()),
        ("instance_index".to_string(), index.to_string()),
    ])
}
