use shroud_storage::error::StorageError;
use shroud_storage::prefs::{PrefBatch, Preferences};

use crate::defaults::DefaultsSource;
use crate::endpoint::RelayEndpoint;
use crate::error::BootstrapError;
use crate::keys::{self, EndpointKeys, DEFAULT_GROUP, MUTABLE_GROUP};

/// What a call to [`ConfigBootstrapper::ensure_initialized`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapOutcome {
    /// First run: defaults were read and the store was seeded with them.
    Seeded(RelayEndpoint),
    /// The store was already seeded; nothing was written.
    AlreadyInitialized,
}

/// Seeds relay defaults into the preference store exactly once.
///
/// Safe to call on every process start. The store and the defaults source are
/// injected; the bootstrapper holds no global state. Any number of
/// bootstrappers, in one process or several, may share a store: the seed batch
/// is committed only if the first-run flag is still pending when the store
/// takes its write lock.
pub struct ConfigBootstrapper<D> {
    defaults: D,
    prefs: Preferences,
}

impl<D: DefaultsSource> ConfigBootstrapper<D> {
    pub fn new(defaults: D, prefs: Preferences) -> Self {
        Self { defaults, prefs }
    }

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    /// Seed the default and working relay groups if this is the first run.
    ///
    /// On first run the six relay fields and the cleared first-run flag are
    /// committed in one atomic batch. If that commit fails the flag is left as
    /// it was, so the next call seeds again. When the flag is already cleared
    /// the defaults source is not queried and nothing is written. If another
    /// seeder commits between the flag read and this commit, the batch is
    /// dropped and the call reports `AlreadyInitialized`.
    pub fn ensure_initialized(&self) -> Result<BootstrapOutcome, BootstrapError> {
        if !self.first_init_pending()? {
            tracing::debug!("relay configuration already initialized, skipping seed");
            return Ok(BootstrapOutcome::AlreadyInitialized);
        }

        let endpoint = self.read_defaults()?;

        let mut batch = self.prefs.begin_batch();
        stage_group(&mut batch, DEFAULT_GROUP, &endpoint)?;
        stage_group(&mut batch, MUTABLE_GROUP, &endpoint)?;
        batch.put(keys::FIRST_INIT, false)?;
        let applied = batch.commit_unless(keys::FIRST_INIT, false).map_err(|e| {
            tracing::warn!(error = %e, "relay defaults not committed, will retry on next start");
            BootstrapError::StoreCommitFailure(e)
        })?;
        if !applied {
            tracing::debug!("relay configuration seeded concurrently, keeping stored values");
            return Ok(BootstrapOutcome::AlreadyInitialized);
        }

        tracing::info!(
            address = %endpoint.address,
            port = endpoint.port,
            socks_port = endpoint.socks_port,
            "seeded relay configuration defaults"
        );
        Ok(BootstrapOutcome::Seeded(endpoint))
    }

    /// Whether seeding has committed in this store.
    pub fn is_initialized(&self) -> Result<bool, BootstrapError> {
        Ok(!self.first_init_pending()?)
    }

    /// The working relay endpoint, as possibly edited by the user.
    pub fn current_endpoint(&self) -> Result<RelayEndpoint, BootstrapError> {
        self.read_group(MUTABLE_GROUP)
    }

    /// The factory relay endpoint recorded on first run.
    pub fn default_endpoint(&self) -> Result<RelayEndpoint, BootstrapError> {
        self.read_group(DEFAULT_GROUP)
    }

    /// Overwrite the working relay fields with the recorded defaults.
    ///
    /// The default group and the first-run flag are never touched.
    pub fn reset_to_defaults(&self) -> Result<RelayEndpoint, BootstrapError> {
        let endpoint = self.read_group(DEFAULT_GROUP)?;
        let mut batch = self.prefs.begin_batch();
        stage_group(&mut batch, MUTABLE_GROUP, &endpoint)?;
        batch
            .commit()
            .map_err(BootstrapError::StoreCommitFailure)?;

        tracing::info!(endpoint = %endpoint, "relay configuration reset to defaults");
        Ok(endpoint)
    }

    fn first_init_pending(&self) -> Result<bool, BootstrapError> {
        Ok(self
            .prefs
            .get_bool(keys::FIRST_INIT)?
            .unwrap_or(keys::FIRST_INIT_WHEN_ABSENT))
    }

    fn read_defaults(&self) -> Result<RelayEndpoint, BootstrapError> {
        let address = self.defaults.relay_address()?;
        let port = self.defaults.relay_port()?;
        let socks_port = self.defaults.relay_socks_port()?;
        RelayEndpoint::from_raw(
            address,
            port,
            socks_port,
            DEFAULT_GROUP.port,
            DEFAULT_GROUP.socks_port,
        )
    }

    fn read_group(&self, group: EndpointKeys) -> Result<RelayEndpoint, BootstrapError> {
        if !self.is_initialized()? {
            return Err(BootstrapError::NotInitialized);
        }

        let address = self
            .prefs
            .get_string(group.address)
            .map_err(|e| corrupt(group.address, e))?
            .ok_or_else(|| missing(group.address))?;

        Ok(RelayEndpoint {
            address,
            port: self.read_port(group.port)?,
            socks_port: self.read_port(group.socks_port)?,
        })
    }

    fn read_port(&self, key: &'static str) -> Result<u16, BootstrapError> {
        let raw = self
            .prefs
            .get_int(key)
            .map_err(|e| corrupt(key, e))?
            .ok_or_else(|| missing(key))?;
        u16::try_from(raw).map_err(|_| BootstrapError::CorruptRecord {
            key,
            reason: format!("stored port {} is out of range", raw),
        })
    }
}

fn stage_group(
    batch: &mut PrefBatch<'_>,
    group: EndpointKeys,
    endpoint: &RelayEndpoint,
) -> Result<(), StorageError> {
    batch.put(group.address, endpoint.address.as_str())?;
    batch.put(group.port, i32::from(endpoint.port))?;
    batch.put(group.socks_port, i32::from(endpoint.socks_port))?;
    Ok(())
}

fn corrupt(key: &'static str, err: StorageError) -> BootstrapError {
    match err {
        StorageError::TypeMismatch { .. } | StorageError::DeserializationError { .. } => {
            BootstrapError::CorruptRecord {
                key,
                reason: err.to_string(),
            }
        }
        other => BootstrapError::Storage(other),
    }
}

fn missing(key: &'static str) -> BootstrapError {
    BootstrapError::CorruptRecord {
        key,
        reason: "value is missing".to_string(),
    }
}
