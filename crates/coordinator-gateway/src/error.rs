//! Gateway error types

use crate::forward::ForwardError;
use crate::routing::ResolveError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use coordinator_kernel::{InvalidRequest, RegistryError, ServiceStatus};
use serde_json::{Map, Value, json};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch failures
// ─────────────────────────────────────────────────────────────────────────────

/// Terminal failure of one dispatch.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("{0}")]
    Validation(#[from] InvalidRequest),

    #[error("Failed to route request: AI routing service unavailable")]
    ResolverUnavailable {
        requester: String,
        query: String,
        #[source]
        source: ResolveError,
    },

    #[error("No suitable microservice found for this request")]
    NoMatch {
        requester: String,
        query: String,
        available_services: usize,
    },

    #[error("Target service '{target}' not found in registry")]
    NotRegistered { requester: String, target: String },

    #[error("Target service '{target}' is not active (status: {status})")]
    NotActive {
        requester: String,
        target: String,
        status: ServiceStatus,
    },

    #[error("Failed to communicate with target service '{target}'")]
    Forwarding {
        requester: String,
        target: String,
        #[source]
        source: ForwardError,
    },

    #[error("gateway is at capacity ({limit} requests in flight)")]
    Saturated { limit: usize },
}

impl DispatchError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::Validation(_) => StatusCode::BAD_REQUEST,
            DispatchError::ResolverUnavailable { .. } => StatusCode::BAD_GATEWAY,
            DispatchError::NoMatch { .. } => StatusCode::NOT_FOUND,
            DispatchError::NotRegistered { .. } => StatusCode::NOT_FOUND,
            DispatchError::NotActive { .. } => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::Forwarding { .. } => StatusCode::BAD_GATEWAY,
            DispatchError::Saturated { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Metrics label for the outcome.
    pub fn outcome(&self) -> &'static str {
        match self {
            DispatchError::Validation(_) => "validation_failed",
            DispatchError::ResolverUnavailable { .. } => "resolver_unavailable",
            DispatchError::NoMatch { .. } => "no_match",
            DispatchError::NotRegistered { .. } => "not_registered",
            DispatchError::NotActive { .. } => "not_active",
            DispatchError::Forwarding { .. } => "forwarding_failed",
            DispatchError::Saturated { .. } => "saturated",
        }
    }

    /// JSON body: `{ success: false, message, ...diagnostics }`.
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        body.insert("success".into(), json!(false));
        body.insert("message".into(), json!(self.to_string()));

        match self {
            DispatchError::Validation(_) => {}
            DispatchError::ResolverUnavailable {
                requester,
                query,
                source,
            } => {
                body.insert("error".into(), json!(source.to_string()));
                body.insert("requester".into(), json!(requester));
                body.insert("query".into(), json!(query));
            }
            DispatchError::NoMatch {
                requester,
                query,
                available_services,
            } => {
                body.insert("query".into(), json!(query));
                body.insert("requester".into(), json!(requester));
                body.insert("available_services".into(), json!(available_services));
            }
            DispatchError::NotRegistered { requester, .. } => {
                body.insert("requester".into(), json!(requester));
            }
            DispatchError::NotActive {
                requester, status, ..
            } => {
                body.insert("requester".into(), json!(requester));
                body.insert("status".into(), json!(status));
            }
            DispatchError::Forwarding {
                requester,
                target,
                source,
            } => {
                body.insert("error".into(), json!(source.to_string()));
                body.insert("requester".into(), json!(requester));
                body.insert("routed_to".into(), json!(target));
            }
            DispatchError::Saturated { limit } => {
                body.insert("limit".into(), json!(limit));
            }
        }
        Value::Object(body)
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_body())).into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Management surface failures
// ─────────────────────────────────────────────────────────────────────────────

/// Errors from the registration and service-management endpoints.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("service '{0}' not found")]
    ServiceNotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            GatewayError::Registry(RegistryError::DuplicateName(_)) => {
                (StatusCode::CONFLICT, "SERVICE_ALREADY_EXISTS")
            }
            GatewayError::Registry(RegistryError::NotFound(_)) | GatewayError::ServiceNotFound(_) => {
                (StatusCode::NOT_FOUND, "SERVICE_NOT_FOUND")
            }
            GatewayError::Registry(RegistryError::InvalidState { .. }) => {
                (StatusCode::CONFLICT, "INVALID_STATE")
            }
            GatewayError::Registry(RegistryError::InvalidRegistration(_))
            | GatewayError::Validation(_)
            | GatewayError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "INVALID_REQUEST"),
            GatewayError::Registry(_) | GatewayError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        };

        let mut body = json!({
            "success": false,
            "code": code,
            "message": self.to_string(),
        });
        if let GatewayError::Validation(errors) = &self {
            body["errors"] = json!(errors);
        }

        (status, Json(body)).into_response()
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn dispatch_status_classes() {
        let cases = [
            (DispatchError::Validation(InvalidRequest::MissingRequester), 400),
            (
                DispatchError::NoMatch {
                    requester: "r".into(),
                    query: "q".into(),
                    available_services: 0,
                },
                404,
            ),
            (
                DispatchError::NotRegistered {
                    requester: "r".into(),
                    target: "t".into(),
                },
                404,
            ),
            (
                DispatchError::NotActive {
                    requester: "r".into(),
                    target: "t".into(),
                    status: ServiceStatus::PendingMigration,
                },
                503,
            ),
            (DispatchError::Saturated { limit: 4 }, 503),
        ];
        for (err, status) in cases {
            assert_eq!(err.status_code().as_u16(), status, "{err}");
        }
    }

    #[test]
    fn not_active_body_carries_status() {
        let err = DispatchError::NotActive {
            requester: "ui".into(),
            target: "exercises".into(),
            status: ServiceStatus::PendingMigration,
        };
        let body = err.to_body();
        assert_eq!(body["success"], json!(false));
        assert_eq!(
            body["message"],
            json!("Target service 'exercises' is not active (status: pending_migration)")
        );
        assert_eq!(body["status"], json!("pending_migration"));
        assert_eq!(body["requester"], json!("ui"));
    }

    #[test]
    fn validation_message_is_the_field_error() {
        let body = DispatchError::from(InvalidRequest::InvalidTemplate).to_body();
        assert_eq!(
            body["message"],
            json!("Missing or invalid required field: response (must be an object)")
        );
    }

    #[test]
    fn registry_errors_map_to_http_classes() {
        let cases = [
            (GatewayError::from(RegistryError::DuplicateName("a".into())), StatusCode::CONFLICT),
            (GatewayError::from(RegistryError::NotFound(Uuid::nil())), StatusCode::NOT_FOUND),
            (
                GatewayError::from(RegistryError::InvalidRegistration("x".into())),
                StatusCode::BAD_REQUEST,
            ),
            (GatewayError::Validation(vec!["v".into()]), StatusCode::BAD_REQUEST),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
