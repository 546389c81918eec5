//! Ledger-log operations and secondary indices.

use sha2::{Digest, Sha256};
use tapbridge_db::{DbResult, KvStoreExt};
use tapbridge_primitives::{LogEntry, SettlementReceipt, UtxoEntry};

use crate::{keys, BridgeStorage};

impl BridgeStorage {
    /// Number of entries in the ledger log. Indices `0..log_count` are
    /// populated and immutable once written.
    pub fn log_count(&self) -> DbResult<u64> {
        Ok(self.kv().get_json(keys::LOG_COUNT)?.unwrap_or(0))
    }

    /// Appends a log entry at the next index, recording its content-hash
    /// reference. First-writer-wins: if the slot is somehow occupied the
    /// append is refused and `None` is returned.
    pub fn append_log(&self, entry: &LogEntry) -> DbResult<Option<u64>> {
        let index = self.log_count()?;
        let key = keys::log_key(index);
        if self.kv().contains(&key)? {
            return Ok(None);
        }

        let raw = serde_json::to_string(entry).map_err(|source| tapbridge_db::DbError::Codec {
            key: key.clone(),
            source,
        })?;
        let hash = hex::encode(Sha256::digest(raw.as_bytes()));

        self.kv().put(&key, &raw)?;
        self.kv().put_json(keys::LOG_COUNT, &(index + 1))?;

        let href = keys::hash_ref_key(&hash);
        if !self.kv().contains(&href)? {
            self.kv().put_json(&href, &index)?;
        }

        Ok(Some(index))
    }

    /// Records the deposit-reference index for an appended entry,
    /// first-writer-wins.
    pub fn add_utxo_ref(&self, outpoint: &str, index: u64) -> DbResult<()> {
        let key = keys::utxo_ref_key(outpoint);
        if !self.kv().contains(&key)? {
            self.kv().put_json(&key, &index)?;
        }
        Ok(())
    }

    pub fn log(&self, index: u64) -> DbResult<Option<LogEntry>> {
        self.kv().get_json(&keys::log_key(index))
    }

    /// Reads up to `max` entries starting at `offset`.
    pub fn logs(&self, offset: u64, max: u64) -> DbResult<Vec<LogEntry>> {
        let count = self.log_count()?;
        let end = offset.saturating_add(max).min(count);
        let mut out = Vec::new();
        for index in offset..end {
            if let Some(entry) = self.log(index)? {
                out.push(entry);
            }
        }
        Ok(out)
    }

    /// Looks an entry up through the deposit-reference index.
    pub fn log_by_utxo(&self, outpoint: &str) -> DbResult<Option<(u64, LogEntry)>> {
        let Some(index) = self.kv().get_json::<u64>(&keys::utxo_ref_key(outpoint))? else {
            return Ok(None);
        };
        Ok(self.log(index)?.map(|entry| (index, entry)))
    }

    /// Looks an entry up through the content-hash index.
    pub fn log_by_hash(&self, hash_hex: &str) -> DbResult<Option<(u64, LogEntry)>> {
        let Some(index) = self.kv().get_json::<u64>(&keys::hash_ref_key(hash_hex))? else {
            return Ok(None);
        };
        Ok(self.log(index)?.map(|entry| (index, entry)))
    }

    /// Marks an entry processed and records its settlement receipt. Returns
    /// `false` without writing if the entry is already processed (or
    /// absent), keeping the flag monotone and the receipt write-once.
    pub fn set_processed(&self, index: u64, receipt: SettlementReceipt) -> DbResult<bool> {
        let Some(mut entry) = self.log(index)? else {
            return Ok(false);
        };
        if entry.processed {
            return Ok(false);
        }
        entry.processed = true;
        entry.result = Some(receipt);
        self.kv().put_json(&keys::log_key(index), &entry)?;
        Ok(true)
    }

    /// Whether the deposit at `outpoint` already produced a log entry.
    pub fn is_utxo_consumed(&self, outpoint: &str) -> DbResult<bool> {
        self.kv().contains(&keys::consumed_utxo_key(outpoint))
    }

    pub fn mark_utxo_consumed(&self, outpoint: &str) -> DbResult<()> {
        self.kv().put(&keys::consumed_utxo_key(outpoint), "")
    }

    /// Per-block interpreter idempotency mark.
    pub fn is_block_processed(&self, height: u64) -> DbResult<bool> {
        self.kv().contains(&keys::block_mark_key(height))
    }

    pub fn mark_block_processed(&self, height: u64) -> DbResult<()> {
        self.kv().put(&keys::block_mark_key(height), "")
    }

    /// Cached decimals for a deployed ticker, if we have seen it.
    pub fn ticker_decimals(&self, tick: &str) -> DbResult<Option<u8>> {
        self.kv().get_json(&keys::ticker_key(tick))
    }

    pub fn put_ticker_decimals(&self, tick: &str, decimals: u8) -> DbResult<()> {
        self.kv().put_json(&keys::ticker_key(tick), &decimals)
    }

    // Raw persistence for the UTXO inventory. The ordering/cap/accounting
    // rules live in the btcio inventory on top of these.

    pub fn utxo_set(&self) -> DbResult<Vec<UtxoEntry>> {
        Ok(self.kv().get_json(keys::UTXO_SET)?.unwrap_or_default())
    }

    pub fn put_utxo_set(&self, set: &[UtxoEntry]) -> DbResult<()> {
        self.kv().put_json(keys::UTXO_SET, &set)
    }

    pub fn utxo_total(&self) -> DbResult<u64> {
        Ok(self.kv().get_json(keys::UTXO_TOTAL)?.unwrap_or(0))
    }

    pub fn put_utxo_total(&self, total: u64) -> DbResult<()> {
        self.kv().put_json(keys::UTXO_TOTAL, &total)
    }

    pub fn utxo_position(&self, outpoint: &str) -> DbResult<Option<u64>> {
        self.kv().get_json(&keys::utxo_index_key(outpoint))
    }

    pub fn put_utxo_position(&self, outpoint: &str, position: u64) -> DbResult<()> {
        self.kv().put_json(&keys::utxo_index_key(outpoint), &position)
    }

    pub fn clear_utxo_position(&self, outpoint: &str) -> DbResult<()> {
        self.kv().delete(&keys::utxo_index_key(outpoint))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tapbridge_db::MemKvStore;
    use tapbridge_primitives::{LogEntry, LogEntryKind, SettlementReceipt};

    use super::*;

    fn setup_storage() -> BridgeStorage {
        BridgeStorage::new(Arc::new(MemKvStore::new()))
    }

    fn refund_entry(outpoint: &str) -> LogEntry {
        LogEntry {
            kind: LogEntryKind::RefundSettlement,
            address: "bcrt1q6u6qyya3sryhh42lahtnz2m7zuufe7dlt8j0j5".to_string(),
            amount_sats: 49000,
            fee_sats: 1000,
            block_height: 100,
            utxo: outpoint.to_string(),
            inscription_id: "abc123i0".to_string(),
            processed: false,
            result: None,
        }
    }

    #[test]
    fn append_assigns_sequential_indices() {
        let storage = setup_storage();
        assert_eq!(storage.log_count().unwrap(), 0);

        let a = storage.append_log(&refund_entry("aa:0")).unwrap();
        let b = storage.append_log(&refund_entry("bb:0")).unwrap();
        assert_eq!(a, Some(0));
        assert_eq!(b, Some(1));
        assert_eq!(storage.log_count().unwrap(), 2);
        assert_eq!(storage.log(0).unwrap().unwrap().utxo, "aa:0");
        assert_eq!(storage.log(1).unwrap().unwrap().utxo, "bb:0");
        assert_eq!(storage.log(2).unwrap(), None);
    }

    #[test]
    fn utxo_ref_is_first_writer_wins() {
        let storage = setup_storage();
        storage.append_log(&refund_entry("aa:0")).unwrap();
        storage.append_log(&refund_entry("bb:0")).unwrap();

        storage.add_utxo_ref("aa:0", 0).unwrap();
        storage.add_utxo_ref("aa:0", 1).unwrap();

        let (index, entry) = storage.log_by_utxo("aa:0").unwrap().unwrap();
        assert_eq!(index, 0);
        assert_eq!(entry.utxo, "aa:0");
        assert_eq!(storage.log_by_utxo("cc:0").unwrap(), None);
    }

    #[test]
    fn hash_ref_resolves_appended_entry() {
        let storage = setup_storage();
        let entry = refund_entry("aa:0");
        storage.append_log(&entry).unwrap();

        let raw = serde_json::to_string(&entry).unwrap();
        let hash = hex::encode(sha2::Sha256::digest(raw.as_bytes()));
        let (index, found) = storage.log_by_hash(&hash).unwrap().unwrap();
        assert_eq!(index, 0);
        assert_eq!(found, entry);
    }

    #[test]
    fn processed_flag_is_monotone() {
        let storage = setup_storage();
        storage.append_log(&refund_entry("aa:0")).unwrap();

        let receipt = SettlementReceipt {
            redeem: None,
            tx: Some("beef".to_string()),
        };
        assert!(storage.set_processed(0, receipt.clone()).unwrap());
        let entry = storage.log(0).unwrap().unwrap();
        assert!(entry.processed);
        assert_eq!(entry.result, Some(receipt));

        // second completion attempt is refused and does not clobber
        let other = SettlementReceipt {
            redeem: Some("other".to_string()),
            tx: None,
        };
        assert!(!storage.set_processed(0, other).unwrap());
        let entry = storage.log(0).unwrap().unwrap();
        assert_eq!(entry.result.unwrap().tx.as_deref(), Some("beef"));

        // absent index
        assert!(!storage.set_processed(9, SettlementReceipt::default()).unwrap());
    }

    #[test]
    fn logs_range_is_bounded() {
        let storage = setup_storage();
        for i in 0..5 {
            storage.append_log(&refund_entry(&format!("aa:{i}"))).unwrap();
        }
        assert_eq!(storage.logs(1, 2).unwrap().len(), 2);
        assert_eq!(storage.logs(3, 10).unwrap().len(), 2);
        assert_eq!(storage.logs(9, 10).unwrap().len(), 0);
    }

    #[test]
    fn consumed_and_block_marks() {
        let storage = setup_storage();
        assert!(!storage.is_utxo_consumed("aa:0").unwrap());
        storage.mark_utxo_consumed("aa:0").unwrap();
        assert!(storage.is_utxo_consumed("aa:0").unwrap());

        assert!(!storage.is_block_processed(100).unwrap());
        storage.mark_block_processed(100).unwrap();
        assert!(storage.is_block_processed(100).unwrap());
    }
}
