//! Health, readiness and metrics endpoints
//!
//! GET /health   - liveness probe with uptime and registry size
//! GET /ready    - readiness probe
//! GET /metrics  - Prometheus text exposition

use axum::{
    Json,
    extract::State,
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;

use crate::error::GatewayError;
use crate::state::AppState;

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let registered = state.registry.count();
    tracing::debug!(registered, "Health check requested");
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "uptime": state.uptime_secs(),
            "registeredServices": registered,
        })),
    )
}

/// GET /ready
///
/// Ready once at least one service can receive traffic.
pub async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let active = state
        .registry
        .list_all()
        .iter()
        .filter(|r| r.is_active())
        .count();
    let status = if active > 0 {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(json!({
            "status": if active > 0 { "ready" } else { "not_ready" },
            "activeServices": active,
        })),
    )
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, GatewayError> {
    state.metrics.set_registered_services(state.registry.count());
    let body = state
        .metrics
        .render()
        .map_err(|e| GatewayError::Internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        body,
    ))
}

/// Build the health router sub-tree
pub fn health_router() -> axum::Router<Arc<AppState>> {
    use axum::routing::get;
    axum::Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
}
