//! REST API handlers.
//!
//! Each handler talks to the `WatcherPool` and returns JSON responses.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::{debug, warn};

use appwatch_metrics::{TEXT_CONTENT_TYPE, render_text};
use appwatch_types::{ApplicationDescriptor, ContainerMetricEvent};
use appwatch_watcher::Delivery;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

// ── Applications ───────────────────────────────────────────────

/// GET /api/v1/apps
pub async fn list_apps(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.pool.watched().await)
}

/// PUT /api/v1/apps
pub async fn sync_apps(
    State(state): State<ApiState>,
    Json(apps): Json<Vec<ApplicationDescriptor>>,
) -> impl IntoResponse {
    if let Some(app) = apps.iter().find(|a| a.id.is_empty()) {
        return error_response(
            &format!("application {:?} has an empty id", app.name),
            StatusCode::BAD_REQUEST,
        )
        .into_response();
    }

    let max_instances = i64::from(state.pool.config().max_instances);
    if let Some(app) = apps
        .iter()
        .find(|a| a.instances < 0 || a.instances > max_instances)
    {
        return error_response(
            &format!(
                "application {:?} declares {} instances (allowed 0..={})",
                app.name, app.instances, max_instances
            ),
            StatusCode::BAD_REQUEST,
        )
        .into_response();
    }

    let summary = state.pool.sync(apps).await;
    ApiResponse::ok(serde_json::json!({
        "started": summary.started,
        "updated": summary.updated,
        "stopped": summary.stopped,
    }))
    .into_response()
}

// ── Container metrics ──────────────────────────────────────────

/// POST /api/v1/apps/{id}/container-metrics
pub async fn deliver_container_metric(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Json(mut event): Json<ContainerMetricEvent>,
) -> impl IntoResponse {
    event.application_id = id;
    match state.pool.route_container_metric(event).await {
        Delivery::Delivered => (StatusCode::ACCEPTED, ApiResponse::ok("accepted")).into_response(),
        Delivery::UnknownApplication => {
            debug!("container metric for unwatched application");
            error_response("application not watched", StatusCode::NOT_FOUND).into_response()
        }
        Delivery::Dropped => {
            error_response("watcher busy, event dropped", StatusCode::SERVICE_UNAVAILABLE)
                .into_response()
        }
    }
}

// ── Health ─────────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}

// ── Prometheus ─────────────────────────────────────────────────

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    match render_text(&state.registry) {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", TEXT_CONTENT_TYPE)],
            body,
        )
            .into_response(),
        Err(e) => {
            warn!(error = %e, "metrics exposition failed");
            error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response()
        }
    }
}
