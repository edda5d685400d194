//! Registry inspection and management endpoints
//!
//! GET    /services                      - list all registered services
//! GET    /services/{service}            - one service, looked up by name
//! DELETE /services/{service}            - remove a service, by id
//! POST   /services/{service}/deactivate - withdraw a service from dispatch, by id

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::state::AppState;

fn parse_id(raw: &str) -> GatewayResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| GatewayError::ServiceNotFound(raw.to_string()))
}

/// GET /services
pub async fn list_services(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let services = state.registry.list_all();
    Json(json!({
        "success": true,
        "total": services.len(),
        "services": services,
    }))
}

/// GET /services/{name}
pub async fn get_service(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> GatewayResult<impl IntoResponse> {
    let record = state
        .registry
        .get_by_name(&name)
        .ok_or(GatewayError::ServiceNotFound(name))?;
    Ok(Json(json!({ "success": true, "service": record })))
}

/// DELETE /services/{id}
///
/// Idempotent: deleting an unknown id answers `deleted: false`.
pub async fn delete_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = Uuid::parse_str(&id).is_ok_and(|id| state.registry.delete(&id));
    state.metrics.set_registered_services(state.registry.count());
    Json(json!({ "success": true, "deleted": deleted }))
}

/// POST /services/{id}/deactivate
pub async fn deactivate_service(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> GatewayResult<impl IntoResponse> {
    let record = state.registry.deactivate(&parse_id(&id)?)?;
    Ok(Json(json!({ "success": true, "service": record })))
}

/// Build the services router sub-tree
pub fn services_router() -> axum::Router<Arc<AppState>> {
    use axum::routing::{get, post};
    axum::Router::new()
        .route("/services", get(list_services))
        .route("/services/{service}", get(get_service).delete(delete_service))
        .route("/services/{service}/deactivate", post(deactivate_service))
}
