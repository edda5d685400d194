//! Axum-based HTTP gateway server.
//!
//! [`GatewayServer`] wires the registry, the dispatcher and the handler
//! sub-trees into a running axum service.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/fill-content-metrics/` | Route, forward and reconcile a request. |
//! | `GET` / `POST` | `/register` | Describe / register a service. |
//! | `POST` | `/register/{id}/migration` | Complete a staged registration. |
//! | `DELETE` | `/register/services` | Remove every service. |
//! | `GET` | `/services`, `/services/{name}` | Inspect the registry. |
//! | `DELETE` | `/services/{id}` | Remove one service. |
//! | `POST` | `/services/{id}/deactivate` | Withdraw a service from dispatch. |
//! | `GET` | `/health`, `/ready`, `/metrics` | Probes and Prometheus metrics. |

use crate::handlers::{dispatch_router, health_router, register_router, services_router};
use crate::settings::GatewaySettings;
use crate::state::AppState;
use axum::{Json, Router, http::StatusCode, response::IntoResponse};
use coordinator_kernel::DecisionEngine;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Assemble the full router over shared state.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(dispatch_router())
        .merge(register_router())
        .merge(services_router())
        .merge(health_router())
        .fallback(route_not_found)
        .with_state(state)
}

async fn route_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "success": false, "message": "Route not found" })),
    )
}

/// High-level gateway server.
pub struct GatewayServer {
    settings: GatewaySettings,
    state: Arc<AppState>,
}

impl GatewayServer {
    /// Build the server with an in-memory registry and the given engine.
    pub fn new(
        settings: GatewaySettings,
        engine: Arc<dyn DecisionEngine>,
    ) -> Result<Self, prometheus::Error> {
        let state = Arc::new(AppState::from_settings(&settings, engine)?);
        Ok(Self { settings, state })
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    pub fn build_app(&self) -> Router {
        build_router(self.state())
    }

    /// Bind to the configured address and serve until Ctrl-C.
    pub async fn start(self) -> std::io::Result<()> {
        let app = self.build_app();
        let addr = self.settings.bind_address();
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(
            addr = %addr,
            engine = ?self.settings.decision,
            threshold = self.settings.routing.acceptance_threshold,
            "Coordinator gateway listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received, draining connections");
}
