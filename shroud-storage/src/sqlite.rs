use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::error::StorageError;
use crate::traits::{BatchWriter, KvPairs, KvStore, KvWrite, SkipIf};

/// How long a writer waits for another connection's write lock on the same
/// database file before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite-backed preference store: one `kv` table of BLOB keys and values.
///
/// Every batch runs in a `BEGIN IMMEDIATE` transaction, which takes the
/// database write lock up front. Two processes opening the same file therefore
/// apply their batches one after the other.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) the store at `path`.
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        // FULL sync: a committed preference batch must survive power loss.
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=FULL;")?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (key BLOB PRIMARY KEY, value BLOB NOT NULL)",
            [],
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|e| StorageError::ReadError {
            reason: e.to_string(),
        })
    }

    /// Run `body` inside an immediate transaction. The transaction commits
    /// only if `body` returns `Ok(true)`; anything else rolls it back.
    fn with_write_tx<F>(&self, body: F) -> Result<bool, StorageError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<bool, StorageError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(batch_error)?;
        if !body(&tx)? {
            return Ok(false);
        }
        tx.commit().map_err(batch_error)?;
        Ok(true)
    }
}

fn insert_all(tx: &Transaction<'_>, writes: Vec<KvWrite>) -> Result<(), StorageError> {
    let mut stmt = tx
        .prepare_cached("INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)")
        .map_err(batch_error)?;
    for w in writes {
        stmt.execute(params![w.key, w.value]).map_err(batch_error)?;
    }
    Ok(())
}

fn batch_error(e: rusqlite::Error) -> StorageError {
    StorageError::BatchError {
        reason: e.to_string(),
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let conn = self.lock()?;
        Ok(conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    fn exists(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<KvPairs, StorageError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare_cached("SELECT key, value FROM kv WHERE key >= ?1 ORDER BY key")?;
        let rows = stmt.query_map(params![prefix], |row| {
            Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?))
        })?;

        // Keys are ordered, so the first key without the prefix ends the scan.
        let mut results: KvPairs = Vec::new();
        for row in rows {
            let (key, value) = row?;
            if !key.starts_with(prefix) {
                break;
            }
            results.push((key, value));
        }
        Ok(results)
    }
}

impl BatchWriter for SqliteStore {
    fn write_batch(&self, writes: Vec<KvWrite>) -> Result<(), StorageError> {
        self.with_write_tx(|tx| {
            insert_all(tx, writes)?;
            Ok(true)
        })?;
        Ok(())
    }

    fn write_batch_unless(
        &self,
        guard: &SkipIf,
        writes: Vec<KvWrite>,
    ) -> Result<bool, StorageError> {
        self.with_write_tx(|tx| {
            let current: Option<Vec<u8>> = tx
                .query_row(
                    "SELECT value FROM kv WHERE key = ?1",
                    params![guard.key],
                    |row| row.get(0),
                )
                .optional()
                .map_err(batch_error)?;
            if current.as_deref() == Some(guard.value.as_slice()) {
                return Ok(false);
            }
            insert_all(tx, writes)?;
            Ok(true)
        })
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

    fn temp_store() -> (tempfile::TempDir, SqliteStore) {
        let tmp = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&tmp.path().join("prefs.db")).unwrap();
        (tmp, store)
    }

    #[test]
    fn test_batch_then_read() {
        let (_tmp, store) = temp_store();
        store
            .write_batch(vec![write(b"pref:relay_address", b"relay.example.org")])
            .unwrap();
        assert_eq!(
            store.get(b"pref:relay_address").unwrap(),
            Some(b"relay.example.org".to_vec())
        );
        assert!(store.exists(b"pref:relay_address").unwrap());
        assert!(!store.exists(b"pref:relay_port").unwrap());
    }

    #[test]
    fn test_prefix_scan() {
        let (_tmp, store) = temp_store();
        store
            .write_batch(vec![
                write(b"pref:b", b"2"),
                write(b"pref:a", b"1"),
                write(b"preg", b"3"),
                write(&[0xFF, 0x01], b"tail"),
            ])
            .unwrap();

        let results = store.prefix_scan(b"pref:").unwrap();
        assert_eq!(
            results,
            vec![
                (b"pref:a".to_vec(), b"1".to_vec()),
                (b"pref:b".to_vec(), b"2".to_vec()),
            ]
        );
        assert_eq!(store.prefix_scan(&[0xFF]).unwrap().len(), 1);
        assert_eq!(store.prefix_scan(b"").unwrap().len(), 4);
    }

    #[test]
    fn test_failed_write_rolls_back_whole_batch() {
        let (_tmp, store) = temp_store();
        store
            .lock()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER reject_bad BEFORE INSERT ON kv WHEN NEW.key = CAST('bad' AS BLOB)
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .unwrap();

        let err = store
            .write_batch(vec![write(b"pref:relay_port", b"443"), write(b"bad", b"x")])
            .unwrap_err();
        assert!(matches!(err, StorageError::BatchError { .. }));
        assert_eq!(store.get(b"pref:relay_port").unwrap(), None);
        assert!(store.prefix_scan(b"").unwrap().is_empty());
    }

    #[test]
    fn test_batch_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("prefs.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .write_batch(vec![write(b"pref:first_init_done", &[0])])
                .unwrap();
        }
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.get(b"pref:first_init_done").unwrap(), Some(vec![0]));
    }

    #[test]
    fn test_guarded_batch_applies_once_across_connections() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("prefs.db");
        drop(SqliteStore::open(&path).unwrap());
        let guard = Arc::new(SkipIf {
            key: b"flag".to_vec(),
            value: vec![0],
        });

        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let path = path.clone();
                let guard = Arc::clone(&guard);
                std::thread::spawn(move || {
                    let store = SqliteStore::open(&path).unwrap();
                    let writes = vec![write(b"flag", &[0]), write(b"winner", &[i])];
                    store.write_batch_unless(&guard, writes).unwrap()
                })
            })
            .collect();
        let applied = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|applied| *applied)
            .count();

        assert_eq!(applied, 1);
        let store = SqliteStore::open(&path).unwrap();
        assert!(store.get(b"winner").unwrap().is_some());
    }
}
