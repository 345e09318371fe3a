use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unsupported schema version {version} under key {key}")]
    UnsupportedVersion { key: String, version: u32 },
}

pub type Result<T> = std::result::Result<T, StorageError>;
