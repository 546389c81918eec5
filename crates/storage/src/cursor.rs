//! Cursors, flags and diagnostics.

use tapbridge_db::{DbResult, KvStoreExt};

use crate::{keys, BridgeStorage};

impl BridgeStorage {
    /// Last fully-processed bitcoin block, if ingestion has started.
    pub fn block_cursor(&self) -> DbResult<Option<u64>> {
        self.kv().get_json(keys::BLOCK_CURSOR)
    }

    /// Advances the processed-block cursor. Must only be called after all
    /// work for `height` is durably recorded.
    pub fn set_block_cursor(&self, height: u64) -> DbResult<()> {
        self.kv().put_json(keys::BLOCK_CURSOR, &height)
    }

    /// Next unprocessed log index for the queue processor.
    pub fn queue_cursor(&self) -> DbResult<u64> {
        Ok(self.kv().get_json(keys::QUEUE_CURSOR)?.unwrap_or(0))
    }

    pub fn set_queue_cursor(&self, index: u64) -> DbResult<()> {
        self.kv().put_json(keys::QUEUE_CURSOR, &index)
    }

    /// Single-flight guard: nonzero while a queue batch has settlement
    /// calls outstanding.
    pub fn queue_depth(&self) -> DbResult<u64> {
        Ok(self.kv().get_json(keys::QUEUE_DEPTH)?.unwrap_or(0))
    }

    pub fn set_queue_depth(&self, depth: u64) -> DbResult<()> {
        self.kv().put_json(keys::QUEUE_DEPTH, &depth)
    }

    pub fn set_busy(&self, busy: bool) -> DbResult<()> {
        self.kv().put_json(keys::BUSY, &busy)
    }

    pub fn set_eth_busy(&self, busy: bool) -> DbResult<()> {
        self.kv().put_json(keys::ETH_BUSY, &busy)
    }

    /// Back-pressure signal surfaced to callers; true if either side has a
    /// backlog.
    pub fn is_busy(&self) -> DbResult<bool> {
        let busy: bool = self.kv().get_json(keys::BUSY)?.unwrap_or(false);
        let eth_busy: bool = self.kv().get_json(keys::ETH_BUSY)?.unwrap_or(false);
        Ok(busy || eth_busy)
    }

    pub fn eth_block_cursor(&self) -> DbResult<Option<u64>> {
        self.kv().get_json(keys::ETH_BLOCK_CURSOR)
    }

    pub fn set_eth_block_cursor(&self, height: u64) -> DbResult<()> {
        self.kv().put_json(keys::ETH_BLOCK_CURSOR, &height)
    }

    /// Bitcoin cursor position the ethereum tracker last caught up to.
    pub fn eth_last_bitcoin_block(&self) -> DbResult<Option<u64>> {
        self.kv().get_json(keys::ETH_LAST_BITCOIN_BLOCK)
    }

    pub fn set_eth_last_bitcoin_block(&self, height: u64) -> DbResult<()> {
        self.kv().put_json(keys::ETH_LAST_BITCOIN_BLOCK, &height)
    }

    // Diagnostics readable by operators; failures are recorded here instead
    // of propagating out of the workers.

    pub fn record_debug(&self, message: &str) -> DbResult<()> {
        self.kv().put(keys::DEBUG, message)
    }

    pub fn record_eth_debug(&self, message: &str) -> DbResult<()> {
        self.kv().put(keys::ETH_DEBUG, message)
    }

    pub fn record_queue_debug(&self, message: &str) -> DbResult<()> {
        self.kv().put(keys::QUEUE_DEBUG, message)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tapbridge_db::MemKvStore;

    use super::*;

    fn setup_storage() -> BridgeStorage {
        BridgeStorage::new(Arc::new(MemKvStore::new()))
    }

    #[test]
    fn cursors_default_and_advance() {
        let storage = setup_storage();
        assert_eq!(storage.block_cursor().unwrap(), None);
        storage.set_block_cursor(100).unwrap();
        assert_eq!(storage.block_cursor().unwrap(), Some(100));

        assert_eq!(storage.queue_cursor().unwrap(), 0);
        storage.set_queue_cursor(7).unwrap();
        assert_eq!(storage.queue_cursor().unwrap(), 7);
    }

    #[test]
    fn busy_is_or_of_both_sides() {
        let storage = setup_storage();
        assert!(!storage.is_busy().unwrap());
        storage.set_eth_busy(true).unwrap();
        assert!(storage.is_busy().unwrap());
        storage.set_eth_busy(false).unwrap();
        storage.set_busy(true).unwrap();
        assert!(storage.is_busy().unwrap());
    }

    #[test]
    fn diagnostics_are_readable_raw() {
        let storage = setup_storage();
        storage.record_debug("boom").unwrap();
        assert_eq!(storage.raw_get("debug").unwrap().as_deref(), Some("boom"));
    }
}
