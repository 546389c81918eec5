use serde::{de::DeserializeOwned, Serialize};

use crate::errors::{DbError, DbResult};

/// Ordered text key→value map with point lookups. Production
/// implementations must be durable across process restarts.
///
/// The store itself enforces nothing beyond key/value storage; append-only
/// log ordering and flag monotonicity are conventions upheld by every write
/// path in the storage layer.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> DbResult<Option<String>>;

    fn put(&self, key: &str, value: &str) -> DbResult<()>;

    fn delete(&self, key: &str) -> DbResult<()>;

    fn contains(&self, key: &str) -> DbResult<bool>;
}

/// JSON convenience layer over [`KvStore`].
pub trait KvStoreExt: KvStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        match self.get(key)? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|source| DbError::Codec {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        }
    }

    fn put_json<T: Serialize>(&self, key: &str, value: &T) -> DbResult<()> {
        let raw = serde_json::to_string(value).map_err(|source| DbError::Codec {
            key: key.to_string(),
            source,
        })?;
        self.put(key, &raw)
    }
}

impl<S: KvStore + ?Sized> KvStoreExt for S {}
