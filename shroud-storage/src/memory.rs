use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use crate::error::StorageError;
use crate::traits::{BatchWriter, KvPairs, KvStore, KvWrite, SkipIf};

type Map = BTreeMap<Vec<u8>, Vec<u8>>;

/// In-memory key-value store backed by a BTreeMap.
///
/// Nothing survives the process; used for ephemeral clients and tests.
pub struct MemoryStore {
    data: RwLock<Map>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            data: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of keys currently held. Readable even after a writer panicked.
    pub fn len(&self) -> usize {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Map>, StorageError> {
        self.data.read().map_err(|e| StorageError::ReadError {
            reason: e.to_string(),
        })
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Map>, StorageError> {
        self.data.write().map_err(|e| StorageError::BatchError {
            reason: e.to_string(),
        })
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.read()?.get(key).cloned())
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.read()?.contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<KvPairs, StorageError> {
        Ok(self
            .read()?
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}

impl BatchWriter for MemoryStore {
    fn write_batch(&self, writes: Vec<KvWrite>) -> Result<(), StorageError> {
        let mut data = self.write()?;
        data.extend(writes.into_iter().map(|w| (w.key, w.value)));
        Ok(())
    }

    fn write_batch_unless(
        &self,
        guard: &SkipIf,
        writes: Vec<KvWrite>,
    ) -> Result<bool, StorageError> {
        let mut data = self.write()?;
        if data.get(&guard.key) == Some(&guard.value) {
            return Ok(false);
        }
        data.extend(writes.into_iter().map(|w| (w.key, w.value)));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn write(key: &[u8], value: &[u8]) -> KvWrite {
        KvWrite {
            key: key.to_vec(),
            value: value.to_vec(),
        }
    }

    #[test]
    fn test_batch_then_read() {
        let store = MemoryStore::new();
        store
            .write_batch(vec![
                write(b"pref:relay_address", b"relay.example.org"),
                write(b"pref:relay_port", b"443"),
            ])
            .unwrap();

        assert_eq!(
            store.get(b"pref:relay_address").unwrap(),
            Some(b"relay.example.org".to_vec())
        );
        assert!(store.exists(b"pref:relay_port").unwrap());
        assert!(!store.exists(b"pref:relay_socks_port").unwrap());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_later_write_wins() {
        let store = MemoryStore::new();
        store
            .write_batch(vec![
                write(b"pref:relay_port", b"443"),
                write(b"pref:relay_port", b"9999"),
            ])
            .unwrap();
        assert_eq!(store.get(b"pref:relay_port").unwrap(), Some(b"9999".to_vec()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_prefix_scan_is_ordered_and_bounded() {
        let store = MemoryStore::new();
        store
            .write_batch(vec![
                write(b"pref:b", b"2"),
                write(b"pref:a", b"1"),
                write(b"other:c", b"3"),
            ])
            .unwrap();

        let results = store.prefix_scan(b"pref:").unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, b"pref:a".to_vec());
        assert_eq!(results[1].0, b"pref:b".to_vec());
        assert!(store.prefix_scan(b"missing:").unwrap().is_empty());
    }

    #[test]
    fn test_write_batch_unless() {
        let store = MemoryStore::new();
        let guard = SkipIf {
            key: b"flag".to_vec(),
            value: vec![0],
        };

        assert!(store
            .write_batch_unless(&guard, vec![write(b"flag", &[0]), write(b"a", b"1")])
            .unwrap());
        assert!(!store
            .write_batch_unless(&guard, vec![write(b"a", b"2")])
            .unwrap());
        assert_eq!(store.get(b"a").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn test_len_survives_poisoned_lock() {
        let store = Arc::new(MemoryStore::new());
        store.write_batch(vec![write(b"pref:k", b"v")]).unwrap();

        let poisoner = Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.data.write().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(store.data.is_poisoned());
        assert_eq!(store.len(), 1);
        assert!(!store.is_empty());
        assert!(store.get(b"pref:k").is_err());
    }

    #[test]
    fn test_empty_store() {
        let store = MemoryStore::default();
        assert!(store.is_empty());
        assert_eq!(store.get(b"nothing").unwrap(), None);
    }
}
