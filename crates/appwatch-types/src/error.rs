//! Error types for appwatch.

use thiserror::Error;

/// Result type alias for watcher and ledger operations.
pub type WatchResult<T> = Result<T, WatchError>;

/// Errors that can occur while tracking application instances.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("invalid instance count {count} for application {application}")]
    InvalidInstanceCount { application: String, count: i64 },

    #[error("failed to build metric {name}: {reason}")]
    Metric { name: String, reason: String },

    #[error("exposition error: {0}")]
    Exposition(String),
}
