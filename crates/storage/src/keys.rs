//! Store key layout.
//!
//! The key names are part of the bridge's persisted state and must stay
//! stable across upgrades; clients also read some of them directly.

pub(crate) const LOG_COUNT: &str = "log_n";
pub(crate) const BLOCK_CURSOR: &str = "currentBlock";
pub(crate) const ETH_BLOCK_CURSOR: &str = "currentEthBlock";
pub(crate) const ETH_LAST_BITCOIN_BLOCK: &str = "ethLastBitcoinBlock";
pub(crate) const QUEUE_CURSOR: &str = "queue_next_log";
pub(crate) const QUEUE_DEPTH: &str = "queue";
pub(crate) const BUSY: &str = "busy";
pub(crate) const ETH_BUSY: &str = "eth_busy";
pub(crate) const DEBUG: &str = "debug";
pub(crate) const ETH_DEBUG: &str = "eth_debug";
pub(crate) const QUEUE_DEBUG: &str = "queue_debug";
pub(crate) const UTXO_SET: &str = "curr_utxos";
pub(crate) const UTXO_TOTAL: &str = "curr_utxos_value";

pub(crate) fn log_key(index: u64) -> String {
    format!("log_{index}")
}

/// Deposit-reference index: `txid:vout` → log index.
pub(crate) fn utxo_ref_key(outpoint: &str) -> String {
    format!("ref_vo_{outpoint}")
}

/// Content-hash index: sha256 of the entry as appended → log index.
pub(crate) fn hash_ref_key(hash_hex: &str) -> String {
    format!("ref_h_{hash_hex}")
}

/// Consumed-deposit mark; presence means the deposit produced its entry.
pub(crate) fn consumed_utxo_key(outpoint: &str) -> String {
    format!("vo_{outpoint}")
}

/// Per-block interpreter idempotency mark.
pub(crate) fn block_mark_key(height: u64) -> String {
    format!("bp_processmint_{height}")
}

/// Cached ticker metadata from the oracle's deployment endpoint.
pub(crate) fn ticker_key(tick: &str) -> String {
    format!("d_{tick}")
}

/// Inventory position index: `txid:vout` → position in the ordered set.
pub(crate) fn utxo_index_key(outpoint: &str) -> String {
    format!("curr_utxos_index_{outpoint}")
}
