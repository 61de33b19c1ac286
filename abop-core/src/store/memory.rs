//! In-memory [`Store`] for tests and fixtures (§12 test tooling).

use super::{BatchOp, Store, StoreResult};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<BTreeMap<String, Vec<u8>>>,
    counters: Mutex<BTreeMap<String, i64>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.data.lock().expect("store lock poisoned").get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.data
            .lock()
            .expect("store lock poisoned")
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.data.lock().expect("store lock poisoned").remove(key);
        Ok(())
    }

    fn scan_prefix(&self, prefix: &str) -> StoreResult<Vec<(String, Vec<u8>)>> {
        Ok(self
            .data
            .lock()
            .expect("store lock poisoned")
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn batch(&self, ops: Vec<BatchOp>) -> StoreResult<()> {
        let mut data = self.data.lock().expect("store lock poisoned");
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    data.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn increment(&self, counter: &str) -> StoreResult<i64> {
        let mut counters = self.counters.lock().expect("counter lock poisoned");
        let entry = counters.entry(counter.to_string()).or_insert(0);
        *entry += 1;
        Ok(*entry)
    }

    fn wipe(&self) -> StoreResult<()> {
        self.data.lock().expect("store lock poisoned").clear();
        self.counters.lock().expect("counter lock poisoned").clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let store = MemoryStore::new();
        store.put("book:1", b"hello").unwrap();
        assert_eq!(store.get("book:1").unwrap(), Some(b"hello".to_vec()));
        assert_eq!(store.get("book:missing").unwrap(), None);
    }

    #[test]
    fn scan_prefix_is_sorted_and_excludes_other_prefixes() {
        let store = MemoryStore::new();
        store.put("book:2", b"b").unwrap();
        store.put("book:1", b"a").unwrap();
        store.put("author:1", b"x").unwrap();

        let results = store.scan_prefix("book:").unwrap();
        assert_eq!(
            results,
            vec![
                ("book:1".to_string(), b"a".to_vec()),
                ("book:2".to_string(), b"b".to_vec()),
            ]
        );
    }

    #[test]
    fn increment_is_monotonic_per_counter() {
        let store = MemoryStore::new();
        assert_eq!(store.increment("op_log:op-1").unwrap(), 1);
        assert_eq!(store.increment("op_log:op-1").unwrap(), 2);
        assert_eq!(store.increment("op_log:op-2").unwrap(), 1);
    }

    #[test]
    fn batch_applies_all_ops_together() {
        let store = MemoryStore::new();
        store.put("book:1", b"a").unwrap();
        store
            .batch(vec![
                BatchOp::put("book:2", b"b".to_vec()),
                BatchOp::delete("book:1"),
            ])
            .unwrap();

        assert_eq!(store.get("book:1").unwrap(), None);
        assert_eq!(store.get("book:2").unwrap(), Some(b"b".to_vec()));
    }

    #[test]
    fn wipe_clears_data_and_counters() {
        let store = MemoryStore::new();
        store.put("book:1", b"a").unwrap();
        store.increment("seq").unwrap();
        store.wipe().unwrap();

        assert_eq!(store.get("book:1").unwrap(), None);
        assert_eq!(store.increment("seq").unwrap(), 1);
    }
}
