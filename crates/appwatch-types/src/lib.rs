//! appwatch-types — shared domain types for appwatch.
//!
//! Application descriptors come from the inventory collaborator, container
//! metric events come from the platform event stream. Both are plain
//! serializable values; all behaviour lives in `appwatch-metrics` and
//! `appwatch-watcher`.

pub mod error;
pub mod types;

pub use error::{WatchError, WatchResult};
pub use types::*;
