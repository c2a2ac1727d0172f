use crate::application::clock::{Clock, IdGenerator};
use crate::application::collections::CollectionService;
use crate::domain::models::{contains_ignore_case, Todo};
use crate::infrastructure::collection_store::{CollectionStore, StorageKey};
use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::error::InfraError;
use serde::Serialize;
use std::sync::Arc;

const TIMESTAMP_FORMAT: &str = "%m/%d/%Y, %I:%M %p";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TodoSections {
    pub active: Vec<Todo>,
    pub completed: Vec<Todo>,
}

pub struct TodoService {
    collection: CollectionService<Todo>,
    ids: Arc<IdGenerator>,
    clock: Clock,
}

impl TodoService {
    pub fn mount(
        store: CollectionStore,
        log: Arc<CommandLog>,
        ids: Arc<IdGenerator>,
        clock: Clock,
    ) -> Self {
        let collection = CollectionService::<Todo>::mount(StorageKey::Todos, store, log);
        for todo in collection.items() {
            ids.observe(&todo.id);
        }
        Self {
            collection,
            ids,
            clock,
        }
    }

    /// Re-reads the collection from the store.
    pub fn reload(&mut self) {
        self.collection.reload();
    }

    pub fn todos(&self) -> &[Todo] {
        self.collection.items()
    }

    pub fn add(&mut self, text: &str, deadline: Option<&str>) -> Result<Todo, InfraError> {
        if text.trim().is_empty() {
            return Err(InfraError::InvalidConfig(
                "text must not be empty".to_string(),
            ));
        }
        let todo = Todo {
            id: self.ids.next_id(),
            text: text.to_string(),
            completed: false,
            timestamp: self.clock.local_now().format(TIMESTAMP_FORMAT).to_string(),
            deadline: deadline
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToOwned::to_owned),
        };
        self.collection.append(todo.clone())?;
        Ok(todo)
    }

    pub fn toggle(&mut self, id: &str) -> Result<Option<Todo>, InfraError> {
        self.collection
            .update(id, |todo| todo.completed = !todo.completed)
    }

    pub fn delete(&mut self, id: &str) -> Result<bool, InfraError> {
        self.collection.remove(id)
    }

    pub fn search(&self, query: &str) -> Vec<Todo> {
        self.todos()
            .iter()
            .filter(|todo| contains_ignore_case(&todo.text, query))
            .cloned()
            .collect()
    }

    /// Filtered list split into open and done items, each in stored order.
    pub fn sections(&self, query: &str) -> TodoSections {
        let (completed, active): (Vec<_>, Vec<_>) = self
            .search(query)
            .into_iter()
            .partition(|todo| todo.completed);
        TodoSections { active, completed }
    }
}
