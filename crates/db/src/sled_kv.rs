use crate::{
    errors::{DbError, DbResult},
    kv::KvStore,
};

/// Sled-backed [`KvStore`]. One tree holds the whole bridge state.
#[derive(Debug, Clone)]
pub struct SledKvStore {
    tree: sled::Tree,
}

impl SledKvStore {
    pub fn new(tree: sled::Tree) -> Self {
        Self { tree }
    }
}

impl KvStore for SledKvStore {
    fn get(&self, key: &str) -> DbResult<Option<String>> {
        match self.tree.get(key)? {
            Some(raw) => String::from_utf8(raw.to_vec())
                .map(Some)
                .map_err(|_| DbError::NotUtf8(key.to_string())),
            None => Ok(None),
        }
    }

    fn put(&self, key: &str, value: &str) -> DbResult<()> {
        self.tree.insert(key, value.as_bytes())?;
        Ok(())
    }

    fn delete(&self, key: &str) -> DbResult<()> {
        self.tree.remove(key)?;
        Ok(())
    }

    fn contains(&self, key: &str) -> DbResult<bool> {
        Ok(self.tree.contains_key(key)?)
    }
}
