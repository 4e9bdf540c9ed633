//! The key-value abstraction and its adapters.

use parking_lot::RwLock;
use std::collections::BTreeMap;

/// A minimal ordered key-value store.
///
/// Writes become visible to readers immediately; `flush` makes them
/// durable. The engine on top batches durability via commit thresholds.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>>;
    fn put(&self, key: Vec<u8>, value: Vec<u8>);
    fn delete(&self, key: &[u8]);

    /// All entries whose key starts with `prefix`, in ascending key order.
    fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)>;

    /// Make previous writes durable.
    fn flush(&self);
}

/// In-memory adapter over a BTreeMap. The default for tests and for nodes
/// that replay from genesis.
#[derive(Default)]
pub struct InMemoryKv {
    inner: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}

impl KvStore for InMemoryKv {
    fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
        self.inner.read().get(key).cloned()
    }

    fn put(&self, key: Vec<u8>, value: Vec<u8>) {
        self.inner.write().insert(key, value);
    }

    fn delete(&self, key: &[u8]) {
        self.inner.write().remove(key);
    }

    fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.inner
            .read()
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn flush(&self) {}
}

/// RocksDB adapter, enabled with the `rocksdb` feature.
#[cfg(feature = "rocksdb")]
pub mod rocks {
    use super::KvStore;
    use std::path::Path;
    use tracing::error;

    pub struct RocksKv {
        db: rocksdb::DB,
    }

    impl RocksKv {
        pub fn open(path: &Path) -> Result<Self, crate::StorageError> {
            let mut opts = rocksdb::Options::default();
            opts.create_if_missing(true);
            let db = rocksdb::DB::open(&opts, path).map_err(|e| crate::StorageError::Backend {
                reason: e.to_string(),
            })?;
            Ok(Self { db })
        }

        fn crit(&self, op: &str, err: rocksdb::Error) -> ! {
            error!(op, %err, "storage backend failure");
            panic!("storage backend failure during {op}: {err}");
        }
    }

    impl KvStore for RocksKv {
        fn get(&self, key: &[u8]) -> Option<Vec<u8>> {
            match self.db.get(key) {
                Ok(v) => v,
                Err(e) => self.crit("get", e),
            }
        }

        fn put(&self, key: Vec<u8>, value: Vec<u8>) {
            if let Err(e) = self.db.put(&key, &value) {
                self.crit("put", e);
            }
        }

        fn delete(&self, key: &[u8]) {
            if let Err(e) = self.db.delete(key) {
                self.crit("delete", e);
            }
        }

        fn iter_prefix(&self, prefix: &[u8]) -> Vec<(Vec<u8>, Vec<u8>)> {
            let mode = rocksdb::IteratorMode::From(prefix, rocksdb::Direction::Forward);
            let mut out = Vec::new();
            for item in self.db.iterator(mode) {
                match item {
                    Ok((k, v)) if k.starts_with(prefix) => out.push((k.to_vec(), v.to_vec())),
                    Ok(_) => break,
                    Err(e) => self.crit("iter", e),
                }
            }
            out
        }

        fn flush(&self) {
            if let Err(e) = self.db.flush() {
                self.crit("flush", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_delete() {
        let kv = InMemoryKv::new();
        kv.put(b"a".to_vec(), b"1".to_vec());
        assert_eq!(kv.get(b"a"), Some(b"1".to_vec()));
        kv.delete(b"a");
        assert_eq!(kv.get(b"a"), None);
    }

    #[test]
    fn test_iter_prefix_is_bounded() {
        let kv = InMemoryKv::new();
        kv.put(b"aa1".to_vec(), b"x".to_vec());
        kv.put(b"aa2".to_vec(), b"y".to_vec());
        kv.put(b"ab1".to_vec(), b"z".to_vec());
        let hits = kv.iter_prefix(b"aa");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, b"aa1".to_vec());
        assert_eq!(hits[1].0, b"aa2".to_vec());
    }
}
