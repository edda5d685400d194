//! Service registration endpoints
//!
//! GET    /register                  - describe the registration endpoint
//! POST   /register                  - register a service (simplified or staged format)
//! POST   /register/{id}/migration   - complete a staged registration
//! DELETE /register/services         - remove every registered service
//!
//! Two body formats are accepted on `POST /register`:
//!
//! ```text
//! simplified: { "name", "url", "grpc" }                      → active immediately
//! staged:     { "serviceName", "version", "endpoint",
//!               "healthCheck"?, "migrationFile"?, "metadata"? } → pending_migration
//! ```
//!
//! Both may also carry `description` and `capabilities`, which are kept in
//! the record's metadata as routing hints.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use coordinator_kernel::{RegistrationMode, ServiceRegistration, ServiceStatus};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{GatewayError, GatewayResult};
use crate::state::AppState;

/// Version assigned to simplified registrations.
pub const SIMPLIFIED_VERSION: &str = "1.0.0";

/// Health path assigned to simplified registrations.
pub const SIMPLIFIED_HEALTH_CHECK: &str = "/health";

// ─────────────────────────────────────────────────────────────────────────────
// Body parsing
// ─────────────────────────────────────────────────────────────────────────────

/// A parsed `POST /register` body.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationBody {
    pub registration: ServiceRegistration,
    pub mode: RegistrationMode,
    /// Inline migration artifact (staged format only).
    pub migration_file: Option<Value>,
}

impl RegistrationBody {
    /// Pick the format and validate its fields.
    pub fn parse(body: &Value) -> GatewayResult<Self> {
        let fields = body
            .as_object()
            .ok_or_else(|| GatewayError::InvalidRequest("request body must be a JSON object".into()))?;

        if is_present(fields.get("name")) && is_present(fields.get("url")) && fields.contains_key("grpc") {
            Self::parse_simplified(fields)
        } else {
            Self::parse_staged(fields)
        }
    }

    fn parse_simplified(fields: &Map<String, Value>) -> GatewayResult<Self> {
        let name = non_empty_str(fields, "name").ok_or_else(|| {
            GatewayError::InvalidRequest("name is required and must be a non-empty string".into())
        })?;
        let url = non_empty_str(fields, "url").ok_or_else(|| {
            GatewayError::InvalidRequest("url is required and must be a non-empty string".into())
        })?;
        if reqwest::Url::parse(url).is_err() {
            return Err(GatewayError::InvalidRequest("url must be a valid URL".into()));
        }
        let grpc = fields
            .get("grpc")
            .and_then(Value::as_u64)
            .filter(|port| (1..=65535).contains(port))
            .ok_or_else(|| {
                GatewayError::InvalidRequest("grpc must be a valid port number (1-65535)".into())
            })?;

        let mut registration = ServiceRegistration::new(name, SIMPLIFIED_VERSION, url)
            .with_health_check(SIMPLIFIED_HEALTH_CHECK)
            .with_metadata("grpc_port", json!(grpc));
        copy_routing_hints(fields, &mut registration.metadata);

        Ok(Self {
            registration,
            mode: RegistrationMode::Simplified,
            migration_file: None,
        })
    }

    fn parse_staged(fields: &Map<String, Value>) -> GatewayResult<Self> {
        let mut errors = Vec::new();

        let name = non_empty_str(fields, "serviceName");
        if name.is_none() {
            errors.push("serviceName is required and must be a non-empty string".to_string());
        }
        let version = non_empty_str(fields, "version");
        if version.is_none() {
            errors.push("version is required and must be a non-empty string".to_string());
        }
        let endpoint = non_empty_str(fields, "endpoint");
        match endpoint {
            None => errors.push("endpoint is required and must be a non-empty string".to_string()),
            Some(endpoint) if reqwest::Url::parse(endpoint).is_err() => {
                errors.push("endpoint must be a valid URL".to_string())
            }
            Some(_) => {}
        }

        let (Some(name), Some(version), Some(endpoint)) = (name, version, endpoint) else {
            return Err(GatewayError::Validation(errors));
        };
        if !errors.is_empty() {
            return Err(GatewayError::Validation(errors));
        }

        let mut registration = ServiceRegistration::new(name, version, endpoint);
        if let Some(path) = non_empty_str(fields, "healthCheck") {
            registration = registration.with_health_check(path);
        }
        if let Some(Value::Object(metadata)) = fields.get("metadata") {
            registration.metadata.extend(metadata.clone());
        }
        copy_routing_hints(fields, &mut registration.metadata);

        Ok(Self {
            registration,
            mode: RegistrationMode::Staged,
            migration_file: fields.get("migrationFile").filter(|v| is_present(Some(*v))).cloned(),
        })
    }
}

fn parse_json(body: &[u8]) -> GatewayResult<Value> {
    serde_json::from_slice(body)
        .map_err(|e| GatewayError::InvalidRequest(format!("request body must be valid JSON: {e}")))
}

fn copy_routing_hints(fields: &Map<String, Value>, metadata: &mut Map<String, Value>) {
    for key in ["description", "capabilities"] {
        if let Some(value) = fields.get(key).filter(|v| !v.is_null()) {
            metadata.insert(key.to_string(), value.clone());
        }
    }
}

fn non_empty_str<'a>(fields: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    fields
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// JSON truthiness as seen by loosely typed callers.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(_) => true,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET /register
pub async fn describe() -> impl IntoResponse {
    Json(json!({
        "message": "Service registration endpoint",
        "method": "POST",
        "description": "Use POST /register to register a microservice",
    }))
}

/// POST /register
pub async fn register_service(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> GatewayResult<impl IntoResponse> {
    let result = parse_json(&body)
        .and_then(|body| RegistrationBody::parse(&body))
        .and_then(|parsed| {
            let record = state.registry.register(parsed.registration, parsed.mode)?;
            match parsed.migration_file {
                Some(artifact) => Ok(state.registry.complete_migration(&record.id, artifact)?),
                None => Ok(record),
            }
        });

    let record = match result {
        Ok(record) => record,
        Err(e) => {
            state.metrics.registration_failed();
            tracing::warn!(error = %e, "Service registration failed");
            return Err(e);
        }
    };
    state.metrics.registration_succeeded(state.registry.count());

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Service registered successfully",
            "serviceId": record.id,
            "status": record.status,
        })),
    ))
}

/// POST /register/{id}/migration
pub async fn upload_migration(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Bytes,
) -> GatewayResult<impl IntoResponse> {
    let artifact = parse_json(&body)?
        .get("migrationFile")
        .filter(|v| is_present(Some(*v)))
        .cloned()
        .ok_or_else(|| GatewayError::InvalidRequest("Migration file is required".into()))?;
    let id = Uuid::parse_str(&id).map_err(|_| GatewayError::ServiceNotFound(id.clone()))?;

    let record = state.registry.complete_migration(&id, artifact)?;
    Ok(Json(json!({
        "success": true,
        "message": "Migration file uploaded successfully",
        "serviceId": record.id,
        "status": ServiceStatus::Active,
    })))
}

/// DELETE /register/services
pub async fn delete_all_services(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let deleted = state.registry.delete_all();
    state.metrics.set_registered_services(state.registry.count());
    Json(json!({
        "success": true,
        "deleted": deleted,
        "message": format!("Deleted {deleted} services"),
    }))
}

/// Build the registration router sub-tree
pub fn register_router() -> axum::Router<Arc<AppState>> {
    use axum::routing::{delete, get, post};
    axum::Router::new()
        .route("/register", get(describe).post(register_service))
        .route("/register/services", delete(delete_all_services))
        .route("/register/{id}/migration", post(upload_migration))
}
