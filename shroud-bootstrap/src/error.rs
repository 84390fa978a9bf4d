use shroud_storage::error::StorageError;
use thiserror::Error;

/// Failure reported by a [`DefaultsSource`](crate::defaults::DefaultsSource) query.
#[derive(Debug, Clone, Error)]
#[error("{reason}")]
pub struct SourceError {
    pub reason: String,
}

impl SourceError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while bootstrapping or reading relay configuration.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The defaults source could not provide the relay endpoint.
    #[error("relay defaults unavailable: {reason}")]
    DefaultsUnavailable { reason: String },

    /// A port from the defaults source does not fit in 0..=65535.
    #[error("{field} {value} is out of range (expected 0..=65535)")]
    PortOutOfRange { field: &'static str, value: i64 },

    /// The seeding batch did not commit. The first-run flag is untouched, so
    /// the next start seeds again.
    #[error("failed to commit relay defaults: {0}")]
    StoreCommitFailure(#[source] StorageError),

    /// Reading from the preference store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Relay configuration was requested before seeding ever committed.
    #[error("relay configuration has not been initialized")]
    NotInitialized,

    /// A persisted relay field is missing or has the wrong shape.
    #[error("corrupt relay record {key}: {reason}")]
    CorruptRecord { key: &'static str, reason: String },
}

impl BootstrapError {
    /// Whether startup must abort. A failed commit is recoverable on the next
    /// start; everything else leaves the client without relay coordinates.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, BootstrapError::StoreCommitFailure(_))
    }
}

impl From<SourceError> for BootstrapError {
    fn from(err: SourceError) -> Self {
        BootstrapError::DefaultsUnavailable { reason: err.reason }
    }
}
