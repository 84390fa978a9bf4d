//! Typed preferences over a [`BatchWriter`].
//!
//! Each preference is a string key mapped to one scalar [`PrefValue`]. Keys
//! live under [`PREF_PREFIX`] in the backing store, so preferences can share
//! a database with other data. Values are borsh-encoded.
//!
//! Writes go through [`PrefBatch`]: stage any number of puts, then
//! [`PrefBatch::commit`] applies them in one atomic `write_batch`. A batch
//! that is dropped without committing writes nothing.
//! [`PrefBatch::commit_unless`] additionally re-checks one preference inside
//! the store's write lock, for writes that must happen at most once.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use borsh::{BorshDeserialize, BorshSerialize};

use crate::error::StorageError;
use crate::traits::{BatchWriter, KvWrite, SkipIf};

/// Key prefix for every preference in the backing store.
pub const PREF_PREFIX: &[u8] = b"pref:";

/// A typed scalar preference value.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum PrefValue {
    Bool(bool),
    Int(i32),
    Str(String),
}

impl PrefValue {
    /// Name of the scalar type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PrefValue::Bool(_) => "bool",
            PrefValue::Int(_) => "int",
            PrefValue::Str(_) => "string",
        }
    }
}

impl fmt::Display for PrefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefValue::Bool(b) => write!(f, "{}", b),
            PrefValue::Int(i) => write!(f, "{}", i),
            PrefValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for PrefValue {
    fn from(v: bool) -> Self {
        PrefValue::Bool(v)
    }
}

impl From<i32> for PrefValue {
    fn from(v: i32) -> Self {
        PrefValue::Int(v)
    }
}

impl From<&str> for PrefValue {
    fn from(v: &str) -> Self {
        PrefValue::Str(v.to_string())
    }
}

impl From<String> for PrefValue {
    fn from(v: String) -> Self {
        PrefValue::Str(v)
    }
}

/// Preference store handle. Cheap to clone; clones share the backing store.
#[derive(Clone)]
pub struct Preferences {
    store: Arc<dyn BatchWriter>,
}

impl Preferences {
    pub fn new(store: Arc<dyn BatchWriter>) -> Self {
        Self { store }
    }

    /// Read a preference. `None` if the key has never been written.
    pub fn get(&self, key: &str) -> Result<Option<PrefValue>, StorageError> {
        match self.store.get(&pref_key(key))? {
            Some(bytes) => decode_value(key, &bytes).map(Some),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &str) -> Result<bool, StorageError> {
        self.store.exists(&pref_key(key))
    }

    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, StorageError> {
        match self.get(key)? {
            None => Ok(None),
            Some(PrefValue::Bool(b)) => Ok(Some(b)),
            Some(other) => Err(mismatch(key, "bool", &other)),
        }
    }

    pub fn get_int(&self, key: &str) -> Result<Option<i32>, StorageError> {
        match self.get(key)? {
            None => Ok(None),
            Some(PrefValue::Int(i)) => Ok(Some(i)),
            Some(other) => Err(mismatch(key, "int", &other)),
        }
    }

    pub fn get_string(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.get(key)? {
            None => Ok(None),
            Some(PrefValue::Str(s)) => Ok(Some(s)),
            Some(other) => Err(mismatch(key, "string", &other)),
        }
    }

    /// Every stored preference, ordered by key.
    pub fn snapshot(&self) -> Result<BTreeMap<String, PrefValue>, StorageError> {
        let mut out = BTreeMap::new();
        for (raw_key, bytes) in self.store.prefix_scan(PREF_PREFIX)? {
            let key = String::from_utf8(raw_key[PREF_PREFIX.len()..].to_vec()).map_err(|e| {
                StorageError::DeserializationError {
                    reason: format!("non-utf8 preference key: {}", e),
                }
            })?;
            let value = decode_value(&key, &bytes)?;
            out.insert(key, value);
        }
        Ok(out)
    }

    /// Start a new write batch. Nothing is written until `commit`.
    pub fn begin_batch(&self) -> PrefBatch<'_> {
        PrefBatch {
            prefs: self,
            writes: Vec::new(),
        }
    }
}

/// A set of staged preference writes applied atomically on `commit`.
pub struct PrefBatch<'a> {
    prefs: &'a Preferences,
    writes: Vec<KvWrite>,
}

impl PrefBatch<'_> {
    /// Stage a write. A later put to the same key in the batch wins.
    pub fn put(&mut self, key: &str, value: impl Into<PrefValue>) -> Result<(), StorageError> {
        self.writes.push(KvWrite {
            key: pref_key(key),
            value: encode_value(&value.into())?,
        });
        Ok(())
    }

    /// Number of staged writes.
    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// Apply every staged write in one atomic batch.
    pub fn commit(self) -> Result<(), StorageError> {
        let count = self.writes.len();
        self.prefs.store.write_batch(self.writes)?;
        tracing::debug!(writes = count, "preference batch committed");
        Ok(())
    }

    /// Apply the batch unless preference `key` already holds `value`.
    ///
    /// The check and the writes happen under one store lock or transaction,
    /// so of several writers racing on the same guard only the first applies.
    /// Returns `false` if the batch was skipped.
    pub fn commit_unless(
        self,
        key: &str,
        value: impl Into<PrefValue>,
    ) -> Result<bool, StorageError> {
        let guard = SkipIf {
            key: pref_key(key),
            value: encode_value(&value.into())?,
        };
        let count = self.writes.len();
        let applied = self.prefs.store.write_batch_unless(&guard, self.writes)?;
        tracing::debug!(writes = count, applied, guard = key, "guarded preference batch");
        Ok(applied)
    }
}

fn pref_key(key: &str) -> Vec<u8> {
    let mut k = Vec::with_capacity(PREF_PREFIX.len() + key.len());
    k.extend_from_slice(PREF_PREFIX);
    k.extend_from_slice(key.as_bytes());
    k
}

fn encode_value(value: &PrefValue) -> Result<Vec<u8>, StorageError> {
    borsh::to_vec(value).map_err(|e| StorageError::SerializationError {
        reason: e.to_string(),
    })
}

fn decode_value(key: &str, bytes: &[u8]) -> Result<PrefValue, StorageError> {
    PrefValue::try_from_slice(bytes).map_err(|e| StorageError::DeserializationError {
        reason: format!("preference {}: {}", key, e),
    })
}

fn mismatch(key: &str, expected: &'static str, found: &PrefValue) -> StorageError {
    StorageError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: found.type_name(),
    }
}
