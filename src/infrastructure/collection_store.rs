use crate::infrastructure::error::InfraError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Stable keys for the collections each feature owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Todos,
    Notes,
    Dreams,
    TimerStats,
    Theme,
    User,
}

impl StorageKey {
    pub const ALL: [StorageKey; 6] = [
        Self::Todos,
        Self::Notes,
        Self::Dreams,
        Self::TimerStats,
        Self::Theme,
        Self::User,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Todos => "todos",
            Self::Notes => "notes",
            Self::Dreams => "dreams",
            Self::TimerStats => "timer-stats",
            Self::Theme => "theme",
            Self::User => "user",
        }
    }
}

impl AsRef<str> for StorageKey {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// Raw key/value access over one namespace. Values are JSON text.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError>;
    fn set(&self, key: &str, value: &str) -> Result<(), InfraError>;
    fn remove(&self, key: &str) -> Result<(), InfraError>;
    fn clear(&self) -> Result<(), InfraError>;
    fn keys(&self) -> Result<Vec<String>, InfraError>;
}

/// Typed access to whole collections. Every save overwrites the full value.
#[derive(Clone)]
pub struct CollectionStore {
    backend: Arc<dyn KeyValueStore>,
}

impl CollectionStore {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    pub fn save<T>(&self, key: impl AsRef<str>, value: &T) -> Result<(), InfraError>
    where
        T: Serialize + ?Sized,
    {
        let encoded = serde_json::to_string(value)?;
        self.backend.set(key.as_ref(), &encoded)
    }

    pub fn load<T>(&self, key: impl AsRef<str>) -> Result<Option<T>, InfraError>
    where
        T: DeserializeOwned,
    {
        let key = key.as_ref();
        let Some(raw) = self.backend.get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|error| InfraError::Deserialization {
                key: key.to_string(),
                message: error.to_string(),
            })
    }

    pub fn remove(&self, key: impl AsRef<str>) -> Result<(), InfraError> {
        self.backend.remove(key.as_ref())
    }

    pub fn clear_all(&self) -> Result<(), InfraError> {
        self.backend.clear()
    }

    pub fn keys(&self) -> Result<Vec<String>, InfraError> {
        self.backend.keys()
    }
}

type SharedEntries = Arc<Mutex<BTreeMap<(String, String), String>>>;

/// Process-local backend. Namespaces created with [`Self::with_namespace`]
/// share one map, which lets tests observe cross-namespace isolation.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    namespace: String,
    entries: SharedEntries,
    fail_writes: AtomicBool,
}

impl InMemoryKeyValueStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: SharedEntries::default(),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn with_namespace(&self, namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: Arc::clone(&self.entries),
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Makes every mutating call fail with an I/O error until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Writes raw text, bypassing serialization. Used to simulate corruption.
    pub fn put_raw(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let mut entries = self.lock()?;
        entries.insert((self.namespace.clone(), key.to_string()), value.to_string());
        Ok(())
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, BTreeMap<(String, String), String>>, InfraError> {
        self.entries
            .lock()
            .map_err(|error| InfraError::InvalidConfig(format!("store lock poisoned: {error}")))
    }

    fn check_writable(&self) -> Result<(), InfraError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(InfraError::Io(std::io::Error::other(
                "storage medium unavailable",
            )));
        }
        Ok(())
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let entries = self.lock()?;
        Ok(entries
            .get(&(self.namespace.clone(), key.to_string()))
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        self.check_writable()?;
        self.put_raw(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), InfraError> {
        self.check_writable()?;
        let mut entries = self.lock()?;
        entries.remove(&(self.namespace.clone(), key.to_string()));
        Ok(())
    }

    fn clear(&self) -> Result<(), InfraError> {
        self.check_writable()?;
        let mut entries = self.lock()?;
        entries.retain(|(namespace, _), _| namespace != &self.namespace);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, InfraError> {
        let entries = self.lock()?;
        Ok(entries
            .keys()
            .filter(|(namespace, _)| namespace == &self.namespace)
            .map(|(_, key)| key.clone())
            .collect())
    }
}
