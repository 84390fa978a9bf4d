//! Sources of factory relay coordinates.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::SourceError;

/// Relay address shipped with the client.
pub const DEFAULT_RELAY_ADDRESS: &str = "127.0.0.1";

/// Relay port shipped with the client.
pub const DEFAULT_RELAY_PORT: i64 = 7000;

/// Relay SOCKS port shipped with the client.
pub const DEFAULT_RELAY_SOCKS_PORT: i64 = 8090;

/// Provider of the factory relay endpoint.
///
/// Ports come back as `i64`; narrowing to a real port is the caller's job.
/// Any query may fail.
pub trait DefaultsSource: Send + Sync {
    fn relay_address(&self) -> Result<String, SourceError>;
    fn relay_port(&self) -> Result<i64, SourceError>;
    fn relay_socks_port(&self) -> Result<i64, SourceError>;
}

impl<D: DefaultsSource + ?Sized> DefaultsSource for Box<D> {
    fn relay_address(&self) -> Result<String, SourceError> {
        (**self).relay_address()
    }

    fn relay_port(&self) -> Result<i64, SourceError> {
        (**self).relay_port()
    }

    fn relay_socks_port(&self) -> Result<i64, SourceError> {
        (**self).relay_socks_port()
    }
}

/// The compiled-in relay coordinates.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmbeddedDefaults;

impl DefaultsSource for EmbeddedDefaults {
    fn relay_address(&self) -> Result<String, SourceError> {
        Ok(DEFAULT_RELAY_ADDRESS.to_string())
    }

    fn relay_port(&self) -> Result<i64, SourceError> {
        Ok(DEFAULT_RELAY_PORT)
    }

    fn relay_socks_port(&self) -> Result<i64, SourceError> {
        Ok(DEFAULT_RELAY_SOCKS_PORT)
    }
}

/// Fixed values supplied by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticDefaults {
    pub address: String,
    pub port: i64,
    pub socks_port: i64,
}

impl StaticDefaults {
    pub fn new(address: impl Into<String>, port: i64, socks_port: i64) -> Self {
        Self {
            address: address.into(),
            port,
            socks_port,
        }
    }
}

impl DefaultsSource for StaticDefaults {
    fn relay_address(&self) -> Result<String, SourceError> {
        Ok(self.address.clone())
    }

    fn relay_port(&self) -> Result<i64, SourceError> {
        Ok(self.port)
    }

    fn relay_socks_port(&self) -> Result<i64, SourceError> {
        Ok(self.socks_port)
    }
}

#[derive(Debug, Clone, Deserialize)]
struct DefaultsFile {
    relay: RelaySection,
}

#[derive(Debug, Clone, Deserialize)]
struct RelaySection {
    address: String,
    port: i64,
    socks_port: i64,
}

/// Relay defaults read from a TOML file:
///
/// ```toml
/// [relay]
/// address = "relay.example.org"
/// port = 443
/// socks_port = 8080
/// ```
///
/// The file is read once, at construction. If it is missing or malformed,
/// every query returns the load error.
#[derive(Debug, Clone)]
pub struct FileDefaults {
    path: PathBuf,
    loaded: Result<RelaySection, SourceError>,
}

impl FileDefaults {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let loaded = Self::load(&path);
        if let Err(ref e) = loaded {
            tracing::warn!(path = %path.display(), error = %e, "relay defaults file unusable");
        }
        Self { path, loaded }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(path: &Path) -> Result<RelaySection, SourceError> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            SourceError::new(format!(
                "failed to read defaults file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let file: DefaultsFile = toml::from_str(&contents).map_err(|e| {
            SourceError::new(format!(
                "failed to parse defaults file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(file.relay)
    }

    fn section(&self) -> Result<&RelaySection, SourceError> {
        self.loaded.as_ref().map_err(|e| e.clone())
    }
}

impl DefaultsSource for FileDefaults {
    fn relay_address(&self) -> Result<String, SourceError> {
        Ok(self.section()?.address.clone())
    }

    fn relay_port(&self) -> Result<i64, SourceError> {
        Ok(self.section()?.port)
    }

    fn relay_socks_port(&self) -> Result<i64, SourceError> {
        Ok(self.section()?.socks_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults() {
        let src = EmbeddedDefaults;
        assert_eq!(src.relay_address().unwrap(), DEFAULT_RELAY_ADDRESS);
        assert_eq!(src.relay_port().unwrap(), DEFAULT_RELAY_PORT);
        assert_eq!(src.relay_socks_port().unwrap(), DEFAULT_RELAY_SOCKS_PORT);
    }

    #[test]
    fn test_file_defaults_reads_relay_table() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("relay.toml");
        std::fs::write(
            &path,
            "[relay]\naddress = \"relay.example.org\"\nport = 443\nsocks_port = 8080\n",
        )
        .unwrap();

        let src = FileDefaults::open(&path);
        assert_eq!(src.path(), path.as_path());
        assert_eq!(src.relay_address().unwrap(), "relay.example.org");
        assert_eq!(src.relay_port().unwrap(), 443);
        assert_eq!(src.relay_socks_port().unwrap(), 8080);
    }

    #[test]
    fn test_file_defaults_keeps_wide_values() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("relay.toml");
        std::fs::write(
            &path,
            "[relay]\naddress = \"r\"\nport = 4294967296\nsocks_port = -5\n",
        )
        .unwrap();

        let src = FileDefaults::open(&path);
        assert_eq!(src.relay_port().unwrap(), 4_294_967_296);
        assert_eq!(src.relay_socks_port().unwrap(), -5);
    }

    #[test]
    fn test_file_defaults_missing_file_fails_every_query() {
        let src = FileDefaults::open("/nonexistent/shroud/relay.toml");
        assert!(src.relay_address().is_err());
        assert!(src.relay_port().is_err());
        let err = src.relay_socks_port().unwrap_err();
        assert!(err.reason.contains("failed to read defaults file"));
    }

    #[test]
    fn test_file_defaults_malformed_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("relay.toml");
        std::fs::write(&path, "[relay]\naddress = \"r\"\n").unwrap();

        let err = FileDefaults::open(&path).relay_port().unwrap_err();
        assert!(err.reason.contains("failed to parse defaults file"));
    }

    #[test]
    fn test_boxed_source() {
        let src: Box<dyn DefaultsSource> = Box::new(StaticDefaults::new("relay", 1, 2));
        assert_eq!(src.relay_address().unwrap(), "relay");
        assert_eq!(src.relay_socks_port().unwrap(), 2);
    }
}
