//! Service registry.
//!
//! [`ServiceRegistry`] owns the lifecycle of downstream service records on
//! top of any [`ServiceStore`].  Each record moves through:
//!
//! ```text
//!   register(Staged)     ──► PendingMigration ──complete_migration──► Active
//!   register(Simplified) ──────────────────────────────────────────► Active
//!   deactivate           ──► Inactive
//! ```

mod store;

pub use store::InMemoryServiceStore;

use chrono::Utc;
use coordinator_kernel::{
    RegistrationMode, RegistryError, ServiceRecord, ServiceRegistration, ServiceStatus,
    ServiceStore,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Lifecycle operations over a shared [`ServiceStore`].
#[derive(Clone)]
pub struct ServiceRegistry {
    store: Arc<dyn ServiceStore>,
}

impl ServiceRegistry {
    pub fn new(store: Arc<dyn ServiceStore>) -> Self {
        Self { store }
    }

    /// Registry backed by an [`InMemoryServiceStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryServiceStore::new()))
    }

    /// Validate and store a new registration.
    ///
    /// Staged registrations start in `pending_migration`, simplified ones
    /// start `active`.  Fails on a duplicate name or an invalid endpoint.
    pub fn register(
        &self,
        registration: ServiceRegistration,
        mode: RegistrationMode,
    ) -> Result<ServiceRecord, RegistryError> {
        registration.validate()?;
        reqwest::Url::parse(registration.endpoint.trim()).map_err(|e| {
            RegistryError::InvalidRegistration(format!(
                "endpoint '{}' is not a valid URL: {e}",
                registration.endpoint.trim()
            ))
        })?;

        let record = ServiceRecord::from_registration(registration, mode.initial_status(), Utc::now());
        self.store.insert(record.clone())?;

        info!(
            service = %record.name,
            id = %record.id,
            status = %record.status,
            endpoint = %record.endpoint,
            "Service registered"
        );
        Ok(record)
    }

    /// Attach the migration artifact and move a pending record to `active`.
    pub fn complete_migration(
        &self,
        id: &Uuid,
        artifact: Value,
    ) -> Result<ServiceRecord, RegistryError> {
        let mut artifact = Some(artifact);
        let record = self.store.modify(id, &mut |record| {
            if record.status != ServiceStatus::PendingMigration {
                return Err(RegistryError::InvalidState {
                    name: record.name.clone(),
                    status: record.status.to_string(),
                    expected: ServiceStatus::PendingMigration.to_string(),
                });
            }
            record.migration_artifact = artifact.take();
            record.status = ServiceStatus::Active;
            record.updated_at = Utc::now();
            Ok(())
        })?;

        info!(service = %record.name, id = %record.id, "Migration completed, service active");
        Ok(record)
    }

    /// Withdraw a record from dispatch without deleting it.
    pub fn deactivate(&self, id: &Uuid) -> Result<ServiceRecord, RegistryError> {
        let record = self.store.modify(id, &mut |record| {
            if record.status == ServiceStatus::Inactive {
                return Err(RegistryError::InvalidState {
                    name: record.name.clone(),
                    status: record.status.to_string(),
                    expected: format!(
                        "{} or {}",
                        ServiceStatus::Active,
                        ServiceStatus::PendingMigration
                    ),
                });
            }
            record.status = ServiceStatus::Inactive;
            record.updated_at = Utc::now();
            Ok(())
        })?;

        info!(service = %record.name, id = %record.id, "Service deactivated");
        Ok(record)
    }

    pub fn get(&self, id: &Uuid) -> Option<ServiceRecord> {
        self.store.get(id)
    }

    pub fn get_by_name(&self, name: &str) -> Option<ServiceRecord> {
        self.store.find_by_name(name)
    }

    /// Snapshot of every record, sorted by registration time.
    pub fn list_all(&self) -> Vec<ServiceRecord> {
        let mut records = self.store.list();
        records.sort_by(|a, b| a.registered_at.cmp(&b.registered_at).then_with(|| a.name.cmp(&b.name)));
        records
    }

    pub fn count(&self) -> usize {
        self.store.len()
    }

    /// Remove one record.  Returns `false` if it did not exist.
    pub fn delete(&self, id: &Uuid) -> bool {
        match self.store.remove(id) {
            Some(record) => {
                info!(service = %record.name, id = %id, "Service deleted");
                true
            }
            None => {
                debug!(id = %id, "Delete requested for unknown service");
                false
            }
        }
    }

    /// Remove every record and return how many were removed.
    pub fn delete_all(&self) -> usize {
        let removed = self.store.clear();
        info!(removed, "All services deleted");
        removed
    }
}
