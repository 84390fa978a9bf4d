use serde::{Deserialize, Serialize};
use std::path::Path;

use shroud_bootstrap::defaults::{DefaultsSource, EmbeddedDefaults, FileDefaults};

use crate::error::ClientError;

/// File name written by `shroud init`.
pub const CONFIG_FILE_NAME: &str = "shroud.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub storage: StorageConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Storage backend: "memory" or "sqlite"
    pub db_type: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// TOML file with a `[relay]` table. When unset, the relay coordinates
    /// compiled into the client are used.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig {
                data_dir: dirs::home_dir()
                    .map(|h| h.join(".shroud").join("data").to_string_lossy().into_owned())
                    .unwrap_or_else(|| "./shroud-data".to_string()),
                db_type: "sqlite".to_string(),
            },
            defaults: DefaultsConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, ClientError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ClientError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path, e),
        })?;
        toml::from_str(&contents).map_err(|e| ClientError::ConfigError {
            reason: format!("failed to parse config file '{}': {}", path, e),
        })
    }

    /// Load the file if it exists, otherwise fall back to the defaults.
    /// A client started without a config file must still come up.
    pub fn load_or_default(path: &str) -> Result<Self, ClientError> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Write a default configuration file into the given directory.
    pub fn init(dir: &str) -> Result<std::path::PathBuf, ClientError> {
        let dir_path = Path::new(dir);
        if !dir_path.exists() {
            std::fs::create_dir_all(dir_path)?;
        }

        let toml_str =
            toml::to_string_pretty(&ClientConfig::default()).map_err(|e| ClientError::ConfigError {
                reason: format!("failed to serialize default config: {}", e),
            })?;

        let config_path = dir_path.join(CONFIG_FILE_NAME);
        std::fs::write(&config_path, toml_str)?;
        Ok(config_path)
    }

    /// The defaults source this configuration selects.
    pub fn defaults_source(&self) -> Box<dyn DefaultsSource> {
        match self.defaults.path {
            Some(ref path) => Box::new(FileDefaults::open(path)),
            None => Box::new(EmbeddedDefaults),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shroud_bootstrap::defaults::{DEFAULT_RELAY_ADDRESS, DEFAULT_RELAY_PORT};

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.storage.db_type, "sqlite");
        assert!(config.defaults.path.is_none());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_init_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("nested");
        let written = ClientConfig::init(dir.to_str().unwrap()).unwrap();
        assert_eq!(written, dir.join(CONFIG_FILE_NAME));

        let config = ClientConfig::load(written.to_str().unwrap()).unwrap();
        assert_eq!(config.storage.db_type, "sqlite");
    }

    #[test]
    fn test_defaults_table_is_optional() {
        let config: ClientConfig = toml::from_str(
            "[storage]\ndata_dir = \"/tmp/x\"\ndb_type = \"memory\"\n\n[logging]\nlevel = \"debug\"\n",
        )
        .unwrap();
        assert!(config.defaults.path.is_none());
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_nonexistent_file() {
        let result = ClientConfig::load("/nonexistent/path/shroud.toml");
        assert!(matches!(result, Err(ClientError::ConfigError { .. })));
    }

    #[test]
    fn test_load_or_default_without_file() {
        let config = ClientConfig::load_or_default("/nonexistent/path/shroud.toml").unwrap();
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_malformed_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[storage\n").unwrap();
        let err = ClientConfig::load_or_default(path.to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn test_embedded_source_when_no_path() {
        let source = ClientConfig::default().defaults_source();
        assert_eq!(source.relay_address().unwrap(), DEFAULT_RELAY_ADDRESS);
        assert_eq!(source.relay_port().unwrap(), DEFAULT_RELAY_PORT);
    }

    #[test]
    fn test_file_source_when_path_set() {
        let mut config = ClientConfig::default();
        config.defaults.path = Some("/nonexistent/relay.toml".to_string());
        assert!(config.defaults_source().relay_address().is_err());
    }
}
