//! Storage abstraction for the Shroud client.
//!
//! Provides a [`KvStore`](traits::KvStore) trait with memory and SQLite
//! backends, plus a typed preference layer ([`prefs::Preferences`]) that maps
//! string keys to boolean, integer, and string values with atomic batch
//! commits.

pub mod error;
pub mod memory;
pub mod prefs;
pub mod sqlite;
pub mod traits;
