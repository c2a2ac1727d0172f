use crate::application::clock::IdGenerator;
use crate::application::collections::load_or_default;
use crate::domain::models::{Theme, User};
use crate::infrastructure::collection_store::{CollectionStore, StorageKey};
use crate::infrastructure::command_log::CommandLog;
use crate::infrastructure::error::InfraError;
use serde::Serialize;
use std::sync::Arc;

/// Process-wide preferences, loaded at start and saved at stop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AppSettings {
    pub theme: Theme,
    pub user: Option<User>,
}

pub struct SettingsService {
    store: CollectionStore,
    ids: Arc<IdGenerator>,
    current: AppSettings,
}

impl SettingsService {
    pub fn load(store: CollectionStore, log: Arc<CommandLog>, ids: Arc<IdGenerator>) -> Self {
        let theme = load_or_default::<Theme>(&store, &log, StorageKey::Theme);
        let user = load_or_default::<Option<User>>(&store, &log, StorageKey::User)
            .filter(|user| user.validate().is_ok());
        Self {
            store,
            ids,
            current: AppSettings { theme, user },
        }
    }

    pub fn current(&self) -> &AppSettings {
        &self.current
    }

    /// Writes both keys; an absent user removes the `user` key.
    pub fn save(&self) -> Result<(), InfraError> {
        self.store.save(StorageKey::Theme, &self.current.theme)?;
        match &self.current.user {
            Some(user) => self.store.save(StorageKey::User, user),
            None => self.store.remove(StorageKey::User),
        }
    }

    pub fn toggle_theme(&mut self) -> Result<Theme, InfraError> {
        self.current.theme = self.current.theme.toggled();
        self.store.save(StorageKey::Theme, &self.current.theme)?;
        Ok(self.current.theme)
    }

    /// Local sign-in: the display name is the part of the address before `@`.
    pub fn login(&mut self, email: &str) -> Result<User, InfraError> {
        let email = email.trim();
        let name = email.split('@').next().unwrap_or_default().trim();
        if name.is_empty() || !email.contains('@') {
            return Err(InfraError::InvalidConfig(format!(
                "invalid email address: '{email}'"
            )));
        }
        let user = User {
            id: self.ids.next_id(),
            name: name.to_string(),
            email: email.to_string(),
        };
        self.store.save(StorageKey::User, &user)?;
        self.current.user = Some(user.clone());
        Ok(user)
    }

    pub fn logout(&mut self) -> Result<(), InfraError> {
        self.store.remove(StorageKey::User)?;
        self.current.user = None;
        Ok(())
    }

    /// In-memory state after a full store wipe.
    pub fn forget(&mut self) {
        self.current = AppSettings::default();
    }
}
