//! Relay configuration bootstrap for the Shroud client.
//!
//! On the first start against a fresh preference store, [`ConfigBootstrapper`]
//! reads the relay endpoint from a [`DefaultsSource`], persists it once as the
//! factory defaults, and seeds the user-editable working values with the same
//! endpoint. Every later start finds the first-run flag cleared and writes
//! nothing.
//!
//! [`ConfigBootstrapper`]: bootstrapper::ConfigBootstrapper
//! [`DefaultsSource`]: defaults::DefaultsSource

pub mod bootstrapper;
pub mod defaults;
pub mod endpoint;
pub mod error;
pub mod keys;
