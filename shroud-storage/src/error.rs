use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// A typed preference lookup found no value under the key.
    #[error("preference not found: {key}")]
    NotFound { key: String },

    /// A preference exists but holds a different scalar type.
    #[error("preference {key} holds a {found} value, expected {expected}")]
    TypeMismatch {
        key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("write error: {reason}")]
    WriteError { reason: String },

    #[error("read error: {reason}")]
    ReadError { reason: String },

    #[error("sqlite error: {reason}")]
    SqliteError { reason: String },

    #[error("serialization error: {reason}")]
    SerializationError { reason: String },

    #[error("deserialization error: {reason}")]
    DeserializationError { reason: String },

    /// The batch was not applied; none of its operations are visible.
    #[error("batch commit failed: {reason}")]
    BatchError { reason: String },
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::SqliteError {
            reason: err.to_string(),
        }
    }
}
