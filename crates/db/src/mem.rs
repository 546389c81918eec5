use std::collections::BTreeMap;

use parking_lot::RwLock;

use crate::{errors::DbResult, kv::KvStore};

/// In-memory [`KvStore`] used by tests. Not durable.
#[derive(Debug, Default)]
pub struct MemKvStore {
    map: RwLock<BTreeMap<String, String>>,
}

impl MemKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemKvStore {
    fn get(&self, key: &str) -> DbResult<Option<String>> {
        Ok(self.map.read().get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> DbResult<()> {
        self.map.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> DbResult<()> {
        self.map.write().remove(key);
        Ok(())
    }

    fn contains(&self, key: &str) -> DbResult<bool> {
        Ok(self.map.read().contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::KvStoreExt;

    #[test]
    fn basic_ops() {
        let store = MemKvStore::new();
        assert_eq!(store.get("a").unwrap(), None);
        assert!(!store.contains("a").unwrap());

        store.put("a", "1").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("1"));
        assert!(store.contains("a").unwrap());

        store.put("a", "2").unwrap();
        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));

        store.delete("a").unwrap();
        assert_eq!(store.get("a").unwrap(), None);
    }

    #[test]
    fn json_round_trip() {
        let store = MemKvStore::new();
        store.put_json("n", &42u64).unwrap();
        assert_eq!(store.get_json::<u64>("n").unwrap(), Some(42));
        assert_eq!(store.get_json::<u64>("absent").unwrap(), None);
    }
}
