use std::sync::Arc;

use shroud_storage::memory::MemoryStore;
use shroud_storage::prefs::Preferences;
use shroud_storage::sqlite::SqliteStore;
use shroud_storage::traits::BatchWriter;

use crate::config::ClientConfig;
use crate::error::ClientError;

/// Database file name inside the data directory.
pub const DB_FILE_NAME: &str = "prefs.db";

/// Create a storage backend from the client configuration.
pub fn create_store(config: &ClientConfig) -> Result<Arc<dyn BatchWriter>, ClientError> {
    match config.storage.db_type.as_str() {
        "memory" => Ok(Arc::new(MemoryStore::new())),
        "sqlite" => {
            let data_dir = std::path::Path::new(&config.storage.data_dir);
            std::fs::create_dir_all(data_dir)?;
            let db_path = data_dir.join(DB_FILE_NAME);
            tracing::debug!(path = %db_path.display(), "opening preference database");
            Ok(Arc::new(SqliteStore::open(&db_path)?))
        }
        other => Err(ClientError::ConfigError {
            reason: format!(
                "unknown storage backend '{}', expected 'memory' or 'sqlite'",
                other
            ),
        }),
    }
}

/// Open the preference store selected by the configuration.
pub fn open_preferences(config: &ClientConfig) -> Result<Preferences, ClientError> {
    Ok(Preferences::new(create_store(config)?))
}
