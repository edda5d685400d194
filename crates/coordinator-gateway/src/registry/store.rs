//! In-memory [`ServiceStore`] implementation.

use coordinator_kernel::{RegistryError, ServiceRecord, ServiceStore};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

/// [`ServiceStore`] backed by two sharded maps: records by id and ids by name.
///
/// Each record lives in its own map slot, so operations on distinct records
/// only contend when they hash to the same shard, and `modify` on the same
/// record is serialized by the slot's write lock.  Lock order is always
/// `names` → `records`; no path acquires them the other way round.
///
/// Suitable for single-node deployments.  Durable stores belong in separate
/// implementations of the trait.
#[derive(Default)]
pub struct InMemoryServiceStore {
    records: DashMap<Uuid, ServiceRecord>,
    names: DashMap<String, Uuid>,
}

impl InMemoryServiceStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ServiceStore for InMemoryServiceStore {
    fn insert(&self, record: ServiceRecord) -> Result<(), RegistryError> {
        match self.names.entry(record.name.clone()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateName(record.name)),
            Entry::Vacant(slot) => {
                let id = record.id;
                self.records.insert(id, record);
                slot.insert(id);
                Ok(())
            }
        }
    }

    fn get(&self, id: &Uuid) -> Option<ServiceRecord> {
        self.records.get(id).map(|r| r.value().clone())
    }

    fn find_by_name(&self, name: &str) -> Option<ServiceRecord> {
        let id = *self.names.get(name)?;
        self.get(&id)
    }

    fn modify(
        &self,
        id: &Uuid,
        apply: &mut dyn FnMut(&mut ServiceRecord) -> Result<(), RegistryError>,
    ) -> Result<ServiceRecord, RegistryError> {
        let mut slot = self
            .records
            .get_mut(id)
            .ok_or(RegistryError::NotFound(*id))?;

        // Work on a copy so a failed transition leaves the record untouched.
        let mut draft = slot.value().clone();
        apply(&mut draft)?;
        *slot.value_mut() = draft;
        Ok(slot.value().clone())
    }

    fn remove(&self, id: &Uuid) -> Option<ServiceRecord> {
        let (_, record) = self.records.remove(id)?;
        self.names.remove_if(&record.name, |_, owner| owner == id);
        Some(record)
    }

    fn list(&self) -> Vec<ServiceRecord> {
        self.records.iter().map(|r| r.value().clone()).collect()
    }

    fn len(&self) -> usize {
        self.records.len()
    }

    fn clear(&self) -> usize {
        let ids: Vec<Uuid> = self.records.iter().map(|r| *r.key()).collect();
        ids.iter().filter(|id| self.remove(id).is_some()).count()
    }
}
