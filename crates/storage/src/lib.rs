//! Durable bridge state layered over the persistent store.
//!
//! [`BridgeStorage`] owns the store key layout and upholds the conventions
//! the raw store cannot: the ledger log is append-only with first-writer-wins
//! indices, cursors only move forward, and the processed flag on a log entry
//! flips false→true exactly once.

mod cursor;
mod keys;
mod log;

use std::sync::Arc;

use tapbridge_db::KvStore;

/// Handle to all durable bridge state. Cheap to clone.
#[derive(Clone)]
pub struct BridgeStorage {
    kv: Arc<dyn KvStore>,
}

impl std::fmt::Debug for BridgeStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeStorage").finish_non_exhaustive()
    }
}

impl BridgeStorage {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    pub(crate) fn kv(&self) -> &dyn KvStore {
        self.kv.as_ref()
    }

    /// Raw point lookup for the operator surface.
    pub fn raw_get(&self, key: &str) -> tapbridge_db::DbResult<Option<String>> {
        self.kv.get(key)
    }
}
