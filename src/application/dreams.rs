use crate::application::clock::{Clock, IdGenerator};
use crate::application::collections::CollectionService;
use crate::domain::models::{Dream, DREAM_CATEGORIES};
use crate::infrastructure::collection_store::{CollectionStore, StorageKey};
use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::error::InfraError;
use serde::Serialize;
use std::sync::Arc;

const DATE_FORMAT: &str = "%-d/%-m/%Y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DreamProgress {
    pub completed: usize,
    pub total: usize,
}

pub struct DreamService {
    collection: CollectionService<Dream>,
    ids: Arc<IdGenerator>,
    clock: Clock,
}

impl DreamService {
    pub fn mount(
        store: CollectionStore,
        log: Arc<CommandLog>,
        ids: Arc<IdGenerator>,
        clock: Clock,
    ) -> Self {
        let collection = CollectionService::<Dream>::mount(StorageKey::Dreams, store, log);
        for dream in collection.items() {
            ids.observe(&dream.id);
        }
        Self {
            collection,
            ids,
            clock,
        }
    }

    pub fn categories() -> &'static [&'static str] {
        &DREAM_CATEGORIES
    }

    /// Re-reads the collection from the store.
    pub fn reload(&mut self) {
        self.collection.reload();
    }

    pub fn dreams(&self) -> &[Dream] {
        self.collection.items()
    }

    /// Adds a goal. A missing or blank category falls back to the first one.
    pub fn add(
        &mut self,
        title: &str,
        description: &str,
        category: Option<&str>,
    ) -> Result<Dream, InfraError> {
        if title.trim().is_empty() || description.trim().is_empty() {
            return Err(InfraError::InvalidConfig(
                "title and description must not be empty".to_string(),
            ));
        }
        let category = category
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DREAM_CATEGORIES[0]);
        let dream = Dream {
            id: self.ids.next_id(),
            title: title.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            date: self.clock.local_now().format(DATE_FORMAT).to_string(),
            completed: false,
        };
        self.collection.append(dream.clone())?;
        Ok(dream)
    }

    pub fn toggle(&mut self, id: &str) -> Result<Option<Dream>, InfraError> {
        self.collection
            .update(id, |dream| dream.completed = !dream.completed)
    }

    pub fn delete(&mut self, id: &str) -> Result<bool, InfraError> {
        self.collection.remove(id)
    }

    pub fn progress(&self) -> DreamProgress {
        DreamProgress {
            completed: self.dreams().iter().filter(|dream| dream.completed).count(),
            total: self.dreams().len(),
        }
    }
}
