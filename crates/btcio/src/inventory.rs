//! Persistent inventory of the bridge's spendable outputs.
//!
//! The inventory keeps at most [`UTXO_INVENTORY_CAP`] entries sorted by
//! value, highest first, with a running total and a per-outpoint position
//! index. All three views are rewritten together so that after every
//! mutation the total equals the sum of retained entries and the index
//! covers exactly the retained outpoints.

use bitcoin::Txid;
use tapbridge_db::DbResult;
use tapbridge_primitives::{outpoint_key, UtxoEntry, UTXO_INVENTORY_CAP};
use tapbridge_storage::BridgeStorage;
use tracing::debug;

/// Value-ordered, capped view over the stored UTXO set.
#[derive(Debug, Clone)]
pub struct UtxoInventory {
    storage: BridgeStorage,
}

impl UtxoInventory {
    pub fn new(storage: BridgeStorage) -> Self {
        Self { storage }
    }

    /// Current entries, highest value first.
    pub fn entries(&self) -> DbResult<Vec<UtxoEntry>> {
        self.storage.utxo_set()
    }

    /// Sum of retained entry values, in satoshis.
    pub fn total_value(&self) -> DbResult<u64> {
        self.storage.utxo_total()
    }

    pub fn contains(&self, txid: &Txid, vout: u32) -> DbResult<bool> {
        Ok(self
            .storage
            .utxo_position(&outpoint_key(txid, vout))?
            .is_some())
    }

    /// Inserts a freshly-observed output. If the cap is exceeded the
    /// lowest-value entries are dropped and their value leaves the total.
    pub fn add(&self, entry: UtxoEntry) -> DbResult<()> {
        let mut set = self.storage.utxo_set()?;
        let mut total = self.storage.utxo_total()?;

        total = total.saturating_add(entry.value);
        set.push(entry);
        set.sort_by(|a, b| b.value.cmp(&a.value));

        while set.len() > UTXO_INVENTORY_CAP {
            // sorted descending, so the tail is always the cheapest
            let dropped = set.pop().expect("len checked above");
            total = total.saturating_sub(dropped.value);
            self.storage.clear_utxo_position(&dropped.outpoint_key())?;
            debug!(outpoint = %dropped.outpoint_key(), value = dropped.value, "dropped from inventory");
        }

        self.rewrite(&set, total)
    }

    /// Removes an output by outpoint, returning it if present.
    pub fn remove(&self, txid: &Txid, vout: u32) -> DbResult<Option<UtxoEntry>> {
        let key = outpoint_key(txid, vout);
        let Some(position) = self.storage.utxo_position(&key)? else {
            return Ok(None);
        };

        let mut set = self.storage.utxo_set()?;
        let position = position as usize;
        if position >= set.len() || set[position].outpoint_key() != key {
            // index out of step with the set; drop the stale entry
            self.storage.clear_utxo_position(&key)?;
            return Ok(None);
        }

        let removed = set.remove(position);
        let total = self
            .storage
            .utxo_total()?
            .saturating_sub(removed.value);
        self.storage.clear_utxo_position(&key)?;
        self.rewrite(&set, total)?;
        Ok(Some(removed))
    }

    /// Persists the set and total and rebuilds the position index for every
    /// retained entry.
    fn rewrite(&self, set: &[UtxoEntry], total: u64) -> DbResult<()> {
        self.storage.put_utxo_set(set)?;
        self.storage.put_utxo_total(total)?;
        for (position, entry) in set.iter().enumerate() {
            self.storage
                .put_utxo_position(&entry.outpoint_key(), position as u64)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tapbridge_db::MemKvStore;

    use super::*;

    fn setup() -> UtxoInventory {
        UtxoInventory::new(BridgeStorage::new(Arc::new(MemKvStore::new())))
    }

    fn txid(tag: u8) -> Txid {
        use bitcoin::hashes::Hash;
        Txid::from_byte_array([tag; 32])
    }

    fn sum(inv: &UtxoInventory) -> u64 {
        inv.entries().unwrap().iter().map(|e| e.value).sum()
    }

    #[test]
    fn add_keeps_descending_order_and_total() {
        let inv = setup();
        inv.add(UtxoEntry::new(txid(1), 0, 500)).unwrap();
        inv.add(UtxoEntry::new(txid(2), 0, 2000)).unwrap();
        inv.add(UtxoEntry::new(txid(3), 0, 1000)).unwrap();

        let values: Vec<u64> = inv.entries().unwrap().iter().map(|e| e.value).collect();
        assert_eq!(values, vec![2000, 1000, 500]);
        assert_eq!(inv.total_value().unwrap(), 3500);
        assert_eq!(inv.total_value().unwrap(), sum(&inv));
        assert!(inv.contains(&txid(2), 0).unwrap());
    }

    #[test]
    fn cap_evicts_cheapest_and_adjusts_total() {
        let inv = setup();
        for i in 0..UTXO_INVENTORY_CAP {
            inv.add(UtxoEntry::new(txid((i % 250) as u8), i as u32, 1000 + i as u64))
                .unwrap();
        }
        assert_eq!(inv.entries().unwrap().len(), UTXO_INVENTORY_CAP);

        // the cheapest retained entry is value 1001 after this insert
        inv.add(UtxoEntry::new(txid(251), 9, 5000)).unwrap();
        let entries = inv.entries().unwrap();
        assert_eq!(entries.len(), UTXO_INVENTORY_CAP);
        assert_eq!(entries[0].value, 5000);
        assert!(entries.iter().all(|e| e.value != 1000));
        assert_eq!(inv.total_value().unwrap(), sum(&inv));
        assert!(!inv.contains(&txid(0), 0).unwrap());

        // a dust insert below the floor is evicted immediately
        inv.add(UtxoEntry::new(txid(252), 0, 1)).unwrap();
        assert!(!inv.contains(&txid(252), 0).unwrap());
        assert_eq!(inv.total_value().unwrap(), sum(&inv));
    }

    #[test]
    fn remove_returns_entry_and_fixes_positions() {
        let inv = setup();
        inv.add(UtxoEntry::new(txid(1), 0, 3000)).unwrap();
        inv.add(UtxoEntry::new(txid(2), 0, 2000)).unwrap();
        inv.add(UtxoEntry::new(txid(3), 0, 1000)).unwrap();

        let removed = inv.remove(&txid(2), 0).unwrap().unwrap();
        assert_eq!(removed.value, 2000);
        assert_eq!(inv.total_value().unwrap(), 4000);
        assert!(!inv.contains(&txid(2), 0).unwrap());

        // positions rebuilt, so the shifted entry is still removable
        let removed = inv.remove(&txid(3), 0).unwrap().unwrap();
        assert_eq!(removed.value, 1000);
        assert_eq!(inv.total_value().unwrap(), 3000);

        assert_eq!(inv.remove(&txid(9), 0).unwrap(), None);
    }
}
