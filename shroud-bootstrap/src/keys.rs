//! Fixed preference key layout.
//!
//! Every relay field is stored twice: `*_default` holds the factory value and
//! is written once; the unsuffixed key holds the working value that other
//! components may edit.

// ─── First-run Flag ──────────────────────────────────────────────────────────

/// Boolean flag; `false` once default seeding has committed.
pub const FIRST_INIT: &str = "first_init_done";

/// Value assumed for [`FIRST_INIT`] when the key is absent. A fresh store always
/// triggers seeding.
pub const FIRST_INIT_WHEN_ABSENT: bool = true;

// ─── Default Group ───────────────────────────────────────────────────────────

pub const RELAY_ADDRESS_DEFAULT: &str = "relay_address_default";
pub const RELAY_PORT_DEFAULT: &str = "relay_port_default";
pub const RELAY_SOCKS_PORT_DEFAULT: &str = "relay_socks_port_default";

// ─── Mutable Group ───────────────────────────────────────────────────────────

pub const RELAY_ADDRESS: &str = "relay_address";
pub const RELAY_PORT: &str = "relay_port";
pub const RELAY_SOCKS_PORT: &str = "relay_socks_port";

/// Keys of one persisted endpoint group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointKeys {
    pub address: &'static str,
    pub port: &'static str,
    pub socks_port: &'static str,
}

/// Factory values, written once.
pub const DEFAULT_GROUP: EndpointKeys = EndpointKeys {
    address: RELAY_ADDRESS_DEFAULT,
    port: RELAY_PORT_DEFAULT,
    socks_port: RELAY_SOCKS_PORT_DEFAULT,
};

/// Working values, seeded from the defaults.
pub const MUTABLE_GROUP: EndpointKeys = EndpointKeys {
    address: RELAY_ADDRESS,
    port: RELAY_PORT,
    socks_port: RELAY_SOCKS_PORT,
};
