//! appwatch.toml configuration.

use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, bail};
use serde::Deserialize;

use appwatch_types::ApplicationDescriptor;
use appwatch_watcher::WatcherConfig;
use appwatch_watcher::watcher::DEFAULT_METRIC_BUFFER;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
    #[serde(default = "default_metric_buffer")]
    pub metric_buffer: usize,
    /// Highest instance count accepted for any application.
    #[serde(default = "default_max_instances")]
    pub max_instances: u32,
    /// Initial application inventory.
    #[serde(default)]
    pub apps: Vec<ApplicationDescriptor>,
}

fn default_listen() -> String {
    "0.0.0.0:9110".to_string()
}

fn default_metric_buffer() -> usize {
    DEFAULT_METRIC_BUFFER
}

fn default_max_instances() -> u32 {
    WatcherConfig::default().max_instances
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let config: DaemonConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.listen_addr()?;
        if self.metric_buffer == 0 {
            bail!("metric_buffer must be greater than zero");
        }
        if self.max_instances == 0 {
            bail!("max_instances must be greater than zero");
        }

        let mut seen = HashSet::new();
        for app in &self.apps {
            if app.id.is_empty() {
                bail!("application {:?} has an empty id", app.name);
            }
            if app.instances < 0 || app.instances > i64::from(self.max_instances) {
                bail!(
                    "application {} declares {} instances (allowed 0..={})",
                    app.name,
                    app.instances,
                    self.max_instances
                );
            }
            if !seen.insert(app.id.as_str()) {
                bail!("duplicate application id {}", app.id);
            }
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listen
            .parse()
            .with_context(|| format!("listen must be a socket address, got {:?}", self.listen))
    }

    pub fn watcher_config(&self) -> WatcherConfig {
        WatcherConfig {
            metric_buffer: self.metric_buffer,
            max_instances: self.max_instances,
        }
    }
}
