//! Downstream service records and the registry store contract.
//!
//! A [`ServiceRecord`] is the registry's view of one downstream microservice.
//! Records are created from a [`ServiceRegistration`] and persisted through
//! the [`ServiceStore`] trait, whose implementations (in-memory, external
//! document store, …) live outside the kernel.

use super::error::RegistryError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Lifecycle status
// ─────────────────────────────────────────────────────────────────────────────

/// Lifecycle state of a registered service.
///
/// ```text
///   register (staged) ──► PendingMigration ──complete_migration──► Active
///   register (simplified) ───────────────────────────────────────► Active
/// ```
///
/// Only [`ServiceStatus::Active`] records may receive dispatched traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    /// Registered, waiting for its migration artifact.
    PendingMigration,
    /// Eligible for dispatch.
    Active,
    /// Known but withdrawn from dispatch.
    Inactive,
}

impl ServiceStatus {
    /// Wire representation, e.g. `pending_migration`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::PendingMigration => "pending_migration",
            ServiceStatus::Active => "active",
            ServiceStatus::Inactive => "inactive",
        }
    }

    /// Whether a record in this state may receive forwarded requests.
    pub fn is_dispatchable(&self) -> bool {
        matches!(self, ServiceStatus::Active)
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which registration path created a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationMode {
    /// Two-stage path: the record starts in `pending_migration`.
    Staged,
    /// One-stage path: the record starts `active`.
    Simplified,
}

impl RegistrationMode {
    /// Status assigned to a freshly registered record.
    pub fn initial_status(&self) -> ServiceStatus {
        match self {
            RegistrationMode::Staged => ServiceStatus::PendingMigration,
            RegistrationMode::Simplified => ServiceStatus::Active,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration request
// ─────────────────────────────────────────────────────────────────────────────

/// Caller-supplied fields of a new registration.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceRegistration {
    /// Unique human-readable name used for routing.
    pub name: String,
    /// Free-form version string.
    pub version: String,
    /// Base URL used to build forward URLs.
    pub endpoint: String,
    /// Optional health-probe path, consumed by external probes only.
    pub health_check_path: Option<String>,
    /// Service-specific routing hints, passed through untouched.
    pub metadata: Map<String, Value>,
}

impl ServiceRegistration {
    /// Construct a registration with no health check and empty metadata.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            endpoint: endpoint.into(),
            health_check_path: None,
            metadata: Map::new(),
        }
    }

    /// Builder: set the health-check path.
    pub fn with_health_check(mut self, path: impl Into<String>) -> Self {
        self.health_check_path = Some(path.into());
        self
    }

    /// Builder: attach one metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Field checks applied before a record is created.
    ///
    /// Name and endpoint are trimmed; the endpoint must be an `http://` or
    /// `https://` URL.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if self.name.trim().is_empty() {
            return Err(RegistryError::InvalidRegistration(
                "name is required and must be a non-empty string".to_string(),
            ));
        }
        if self.version.trim().is_empty() {
            return Err(RegistryError::InvalidRegistration(
                "version is required and must be a non-empty string".to_string(),
            ));
        }
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(RegistryError::InvalidRegistration(
                "endpoint is required and must be a non-empty string".to_string(),
            ));
        }
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(RegistryError::InvalidRegistration(format!(
                "endpoint '{endpoint}' must start with http:// or https://"
            )));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ServiceRecord
// ─────────────────────────────────────────────────────────────────────────────

/// A downstream service known to the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceRecord {
    /// Opaque id assigned at registration; immutable.
    pub id: Uuid,
    /// Unique routing key.
    #[serde(rename = "serviceName")]
    pub name: String,
    pub version: String,
    pub endpoint: String,
    #[serde(rename = "healthCheck", skip_serializing_if = "Option::is_none")]
    pub health_check_path: Option<String>,
    pub status: ServiceStatus,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Artifact supplied when the migration stage completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub migration_artifact: Option<Value>,
    pub registered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceRecord {
    /// Build a fresh record from a validated registration.
    pub fn from_registration(
        registration: ServiceRegistration,
        status: ServiceStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: registration.name.trim().to_string(),
            version: registration.version.trim().to_string(),
            endpoint: registration.endpoint.trim().trim_end_matches('/').to_string(),
            health_check_path: registration.health_check_path,
            status,
            metadata: registration.metadata,
            migration_artifact: None,
            registered_at: now,
            updated_at: now,
        }
    }

    /// Shorthand for `status.is_dispatchable()`.
    pub fn is_active(&self) -> bool {
        self.status.is_dispatchable()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ServiceStore trait
// ─────────────────────────────────────────────────────────────────────────────

/// Store seam behind the service registry.
///
/// Implementations own the concurrency discipline: operations on distinct
/// records must not interfere, and [`modify`](ServiceStore::modify) calls on
/// the same record must be serialized.  Reads return snapshots (clones).
pub trait ServiceStore: Send + Sync {
    /// Insert a record, failing with [`RegistryError::DuplicateName`] if a
    /// record with the same name exists.  The check and the insert are atomic.
    fn insert(&self, record: ServiceRecord) -> Result<(), RegistryError>;

    /// Look up a record by id.
    fn get(&self, id: &Uuid) -> Option<ServiceRecord>;

    /// Look up a record by its unique name.
    fn find_by_name(&self, name: &str) -> Option<ServiceRecord>;

    /// Apply `apply` to the record under its lock and return the updated
    /// snapshot.  If `apply` fails the record is left as it was observed.
    fn modify(
        &self,
        id: &Uuid,
        apply: &mut dyn FnMut(&mut ServiceRecord) -> Result<(), RegistryError>,
    ) -> Result<ServiceRecord, RegistryError>;

    /// Remove a record, returning it if it existed.
    fn remove(&self, id: &Uuid) -> Option<ServiceRecord>;

    /// Snapshot of all records.  Order is not significant.
    fn list(&self) -> Vec<ServiceRecord>;

    /// Number of stored records.
    fn len(&self) -> usize;

    /// Whether the store holds no records.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every record, returning how many were removed.
    fn clear(&self) -> usize;
}
