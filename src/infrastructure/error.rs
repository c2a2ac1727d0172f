use thiserror::Error;

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("stored value for '{key}' is unreadable: {message}")]
    Deserialization { key: String, message: String },
    #[error("Invalid config: {0}")]
    InvalidConfig(String),
    #[error("alarm failed: {0}")]
    Alarm(String),
}

impl InfraError {
    /// True for failures of the storage medium itself, as opposed to bad data.
    pub fn is_storage_io(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Sqlite(_))
    }
}
