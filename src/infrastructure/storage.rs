use crate::infrastructure::collection_store::KeyValueStore;
use crate::infrastructure::error::InfraError;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};

const SCHEMA_SQL: &str = include_str!("../../sql/schema.sql");

pub fn initialize_database(path: &Path) -> Result<(), InfraError> {
    let connection = Connection::open(path)?;
    connection.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// SQLite-backed key/value store. Opens one connection per operation.
#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    db_path: PathBuf,
    namespace: String,
}

impl SqliteKeyValueStore {
    pub fn new(db_path: impl AsRef<Path>, namespace: impl Into<String>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            namespace: namespace.into(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

impl KeyValueStore for SqliteKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let connection = self.connect()?;
        let value = connection
            .query_row(
                "SELECT value FROM kv_store WHERE namespace = ?1 AND key = ?2",
                params![self.namespace, key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO kv_store (namespace, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(namespace, key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![self.namespace, key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "DELETE FROM kv_store WHERE namespace = ?1 AND key = ?2",
            params![self.namespace, key],
        )?;
        Ok(())
    }

    fn clear(&self) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "DELETE FROM kv_store WHERE namespace = ?1",
            params![self.namespace],
        )?;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, InfraError> {
        let connection = self.connect()?;
        let mut statement =
            connection.prepare("SELECT key FROM kv_store WHERE namespace = ?1 ORDER BY key")?;
        let keys = statement
            .query_map(params![self.namespace], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::collection_store::{CollectionStore, StorageKey};
    use std::fs;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_DB: AtomicUsize = AtomicUsize::new(0);

    struct TempDatabase {
        dir: PathBuf,
        path: PathBuf,
    }

    impl TempDatabase {
        fn new() -> Self {
            let sequence = NEXT_TEMP_DB.fetch_add(1, Ordering::Relaxed);
            let dir = std::env::temp_dir().join(format!(
                "studymate-storage-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&dir).expect("create temp dir");
            let path = dir.join("store.sqlite");
            initialize_database(&path).expect("initialize database");
            Self { dir, path }
        }

        fn store(&self, namespace: &str) -> CollectionStore {
            CollectionStore::new(Arc::new(SqliteKeyValueStore::new(&self.path, namespace)))
        }
    }

    impl Drop for TempDatabase {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.dir);
        }
    }

    #[test]
    fn save_overwrites_and_load_returns_latest() {
        let database = TempDatabase::new();
        let store = database.store("studymate");

        store.save(StorageKey::Theme, "light").expect("save light");
        store.save(StorageKey::Theme, "dark").expect("save dark");

        let theme: Option<String> = store.load(StorageKey::Theme).expect("load");
        assert_eq!(theme.as_deref(), Some("dark"));
    }

    #[test]
    fn missing_key_loads_as_none() {
        let database = TempDatabase::new();
        let store = database.store("studymate");
        let value: Option<Vec<String>> = store.load(StorageKey::Notes).expect("load");
        assert!(value.is_none());
    }

    #[test]
    fn remove_and_clear_respect_namespace() {
        let database = TempDatabase::new();
        let store = database.store("studymate");
        let other = database.store("someone-else");

        store.save(StorageKey::Todos, &vec!["a", "b"]).expect("save todos");
        store.save(StorageKey::User, "ada").expect("save user");
        other.save(StorageKey::Todos, &vec!["z"]).expect("save other");

        store.remove(StorageKey::User).expect("remove");
        store.remove(StorageKey::User).expect("remove twice");
        assert_eq!(store.keys().expect("keys"), vec!["todos".to_string()]);

        store.clear_all().expect("clear");
        assert!(store.keys().expect("keys").is_empty());
        let kept: Option<Vec<String>> = other.load(StorageKey::Todos).expect("load other");
        assert_eq!(kept, Some(vec!["z".to_string()]));
    }

    #[test]
    fn unopenable_database_reports_storage_error() {
        let database = TempDatabase::new();
        let missing = database.dir.join("no-such-dir").join("store.sqlite");
        let store = CollectionStore::new(Arc::new(SqliteKeyValueStore::new(missing, "studymate")));
        let error = store
            .save(StorageKey::Todos, &Vec::<String>::new())
            .expect_err("save should fail");
        assert!(error.is_storage_io());
    }
}
