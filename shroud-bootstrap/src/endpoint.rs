use std::fmt;

use crate::error::BootstrapError;

/// Network location of the relay and its auxiliary SOCKS port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayEndpoint {
    pub address: String,
    pub port: u16,
    pub socks_port: u16,
}

impl RelayEndpoint {
    /// Build an endpoint from raw source values, validating each field.
    ///
    /// `port_field` and `socks_field` name the fields in any
    /// [`BootstrapError::PortOutOfRange`] that is returned.
    pub fn from_raw(
        address: String,
        port: i64,
        socks_port: i64,
        port_field: &'static str,
        socks_field: &'static str,
    ) -> Result<Self, BootstrapError> {
        if address.trim().is_empty() {
            return Err(BootstrapError::DefaultsUnavailable {
                reason: "relay address is empty".to_string(),
            });
        }
        Ok(Self {
            address,
            port: coerce_port(port_field, port)?,
            socks_port: coerce_port(socks_field, socks_port)?,
        })
    }
}

impl fmt::Display for RelayEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{} (socks {})", self.address, self.port, self.socks_port)
    }
}

/// Narrow a wide port value to `u16`.
///
/// The accepted range is the network port range `0..=65535`. Negative values
/// and values above 65535 are rejected, not truncated.
pub fn coerce_port(field: &'static str, value: i64) -> Result<u16, BootstrapError> {
    u16::try_from(value).map_err(|_| BootstrapError::PortOutOfRange { field, value })
}
