use crate::error::StorageError;

/// Result type for prefix scan operations: a list of key-value byte pairs.
pub type KvPairs = Vec<(Vec<u8>, Vec<u8>)>;

/// A single staged write inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvWrite {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Condition checked by [`BatchWriter::write_batch_unless`]: the batch is
/// skipped when `key` currently holds exactly `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipIf {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Read side of a key-value store.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;
    fn exists(&self, key: &[u8]) -> Result<bool, StorageError>;
    fn prefix_scan(&self, prefix: &[u8]) -> Result<KvPairs, StorageError>;
}

/// Atomic batch writer. Stores are written only through batches.
pub trait BatchWriter: KvStore {
    /// All-or-nothing: either every write becomes durable or the store is left
    /// exactly as it was before the call.
    fn write_batch(&self, writes: Vec<KvWrite>) -> Result<(), StorageError>;

    /// Like `write_batch`, but the guard is read under the same lock or
    /// transaction that applies the writes, so concurrent writers sharing the
    /// store cannot both pass it. Returns `false` if the batch was skipped.
    fn write_batch_unless(&self, guard: &SkipIf, writes: Vec<KvWrite>)
        -> Result<bool, StorageError>;
}
