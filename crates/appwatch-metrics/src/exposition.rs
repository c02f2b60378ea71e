//! Prometheus text exposition.
//!
//! Renders everything registered in a `prometheus::Registry` for scraping
//! by a Prometheus server or compatible agent.

use prometheus::{Encoder, Registry, TextEncoder};

use appwatch_types::{WatchError, WatchResult};

/// Content type of [`render_text`] output.
pub const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4";

/// Render all metric families in `registry` in the text format.
pub fn render_text(registry: &Registry) -> WatchResult<String> {
    let families = registry.gather();
    let mut buf = Vec::new();
    TextEncoder::new()
        .encode(&families, &mut buf)
        .map_err(|e| WatchError::Exposition(e.to_string()))?;
    String::from_utf8(buf).map_err(|e| WatchError::Exposition(e.to_string()))
}
