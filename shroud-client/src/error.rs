use shroud_bootstrap::error::BootstrapError;
use thiserror::Error;

/// Errors that can occur in the client.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("config error: {reason}")]
    ConfigError { reason: String },

    #[error("bootstrap error: {0}")]
    BootstrapError(#[from] BootstrapError),

    #[error("storage error: {0}")]
    StorageError(#[from] shroud_storage::error::StorageError),

    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
}

impl ClientError {
    /// Process exit status for this error. A failed seeding commit exits with
    /// EX_TEMPFAIL (75) since the next start retries it.
    pub fn exit_code(&self) -> i32 {
        match self {
            ClientError::BootstrapError(e) if !e.is_fatal() => 75,
            _ => 1,
        }
    }
}
