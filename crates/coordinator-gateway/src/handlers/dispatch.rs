//! Dispatch endpoint
//!
//! POST /api/fill-content-metrics/  - route, forward and reconcile one request
//! POST /api/fill-content-metrics   - same, without the trailing slash

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use coordinator_kernel::dispatch::DISPATCH_PATH;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use crate::metrics::OUTCOME_SUCCESS;
use crate::state::AppState;

/// POST /api/fill-content-metrics/
///
/// The body is read raw so that malformed JSON is reported through the same
/// structured validation error as a structurally invalid request.
pub async fn fill_content_metrics(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let started = Instant::now();
    let value: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    match state.dispatcher.dispatch_value(&value).await {
        Ok(outcome) => {
            state
                .metrics
                .observe_dispatch(OUTCOME_SUCCESS, started.elapsed().as_secs_f64());
            (StatusCode::OK, Json(outcome.into_body())).into_response()
        }
        Err(err) => {
            state
                .metrics
                .observe_dispatch(err.outcome(), started.elapsed().as_secs_f64());
            err.into_response()
        }
    }
}

/// Build the dispatch router sub-tree
pub fn dispatch_router() -> axum::Router<Arc<AppState>> {
    use axum::routing::post;
    axum::Router::new()
        .route(DISPATCH_PATH, post(fill_content_metrics))
        .route(DISPATCH_PATH.trim_end_matches('/'), post(fill_content_metrics))
}
