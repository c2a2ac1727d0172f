use crate::domain::models::Record;
use crate::infrastructure::collection_store::{CollectionStore, StorageKey};
use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::error::InfraError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// In-memory copy of one feature's collection, written back in full on every
/// change. The service owns its key exclusively.
pub struct CollectionService<T> {
    key: StorageKey,
    store: CollectionStore,
    log: Arc<CommandLog>,
    items: Vec<T>,
}

impl<T> CollectionService<T>
where
    T: Record + Clone + Serialize + DeserializeOwned,
{
    /// Loads the collection. Absent or unreadable data starts empty.
    pub fn mount(key: StorageKey, store: CollectionStore, log: Arc<CommandLog>) -> Self {
        let mut service = Self {
            key,
            store,
            log,
            items: Vec::new(),
        };
        service.reload();
        service
    }

    pub fn reload(&mut self) {
        self.items = load_or_default(&self.store, &self.log, self.key);
    }

    pub fn key(&self) -> StorageKey {
        self.key
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn find(&self, id: &str) -> Option<&T> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.find(id).is_some()
    }

    /// Persists `next` and adopts it as the displayed copy. The displayed
    /// copy advances even when the save fails; the error goes back to the
    /// caller, which logs it.
    pub fn commit(&mut self, next: Vec<T>) -> Result<(), InfraError> {
        let saved = self.store.save(self.key, &next);
        self.items = next;
        saved
    }

    pub fn append(&mut self, item: T) -> Result<(), InfraError> {
        let mut next = self.items.clone();
        next.push(item);
        self.commit(next)
    }

    /// Applies `change` to the item with `id`. Unknown ids are a no-op and
    /// do not touch storage.
    pub fn update<F>(&mut self, id: &str, change: F) -> Result<Option<T>, InfraError>
    where
        F: FnOnce(&mut T),
    {
        let Some(index) = self.items.iter().position(|item| item.id() == id) else {
            return Ok(None);
        };
        let mut next = self.items.clone();
        change(&mut next[index]);
        let updated = next[index].clone();
        self.commit(next)?;
        Ok(Some(updated))
    }

    /// Replaces the item with the same id, or appends when it is new.
    pub fn upsert(&mut self, item: T) -> Result<(), InfraError> {
        let mut next = self.items.clone();
        match next.iter().position(|candidate| candidate.id() == item.id()) {
            Some(index) => next[index] = item,
            None => next.push(item),
        }
        self.commit(next)
    }

    /// Removes exactly the item with `id`. Returns false, without writing,
    /// when no such item exists.
    pub fn remove(&mut self, id: &str) -> Result<bool, InfraError> {
        if !self.contains(id) {
            return Ok(false);
        }
        let next = self
            .items
            .iter()
            .filter(|item| item.id() != id)
            .cloned()
            .collect::<Vec<_>>();
        self.commit(next)?;
        Ok(true)
    }
}

/// Reads `key`, treating "never written" and "unreadable" alike as the
/// default value. Failures are logged.
pub fn load_or_default<T>(store: &CollectionStore, log: &CommandLog, key: StorageKey) -> T
where
    T: DeserializeOwned + Default,
{
    match store.load::<T>(key) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(error) => {
            log.error(&format!("load_{}", key.as_str()), &error.to_string());
            T::default()
        }
    }
}
