//! appwatch-api — HTTP surface for appwatch.
//!
//! Feeds the watcher pool from the outside world and exposes the shared
//! registry for scraping.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/api/v1/apps` | List watched applications |
//! | PUT | `/api/v1/apps` | Replace the application inventory |
//! | POST | `/api/v1/apps/{id}/container-metrics` | Deliver a container metric |
//! | GET | `/healthz` | Liveness |
//! | GET | `/metrics` | Prometheus exposition |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use prometheus::Registry;

use appwatch_watcher::WatcherPool;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub pool: Arc<WatcherPool>,
    pub registry: Registry,
}

/// Build the complete API router.
pub fn build_router(pool: Arc<WatcherPool>, registry: Registry) -> Router {
    let state = ApiState { pool, registry };

    let api_routes = Router::new()
        .route("/apps", get(handlers::list_apps).put(handlers::sync_apps))
        .route("/apps/{id}/container-metrics", post(handlers::deliver_container_metric))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::prometheus_metrics).with_state(state))
}
