//! Spendable-output types for the bridge's UTXO inventory.

use bitcoin::{OutPoint, Txid};
use serde::{Deserialize, Serialize};

/// Maximum number of spendable outputs retained in the inventory. When the
/// cap is exceeded the lowest-value entries are dropped first.
pub const UTXO_INVENTORY_CAP: usize = 200;

/// A spendable output owned by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtxoEntry {
    pub txid: Txid,
    pub vout: u32,
    /// Value in satoshis.
    pub value: u64,
}

impl UtxoEntry {
    pub fn new(txid: Txid, vout: u32, value: u64) -> Self {
        Self { txid, vout, value }
    }

    /// The `txid:vout` key fragment used for reservation marks and the
    /// inventory position index.
    pub fn outpoint_key(&self) -> String {
        outpoint_key(&self.txid, self.vout)
    }

    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }
}

/// Formats the canonical `txid:vout` store key fragment for an outpoint.
pub fn outpoint_key(txid: &Txid, vout: u32) -> String {
    format!("{txid}:{vout}")
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn outpoint_key_format() {
        let txid =
            Txid::from_str("4cfbec13cf1510545f285cceceb6229bd7b6a918a8f6eba1dbee64d26226a3b7")
                .unwrap();
        let entry = UtxoEntry::new(txid, 3, 1000);
        assert_eq!(
            entry.outpoint_key(),
            "4cfbec13cf1510545f285cceceb6229bd7b6a918a8f6eba1dbee64d26226a3b7:3"
        );
        assert_eq!(entry.outpoint(), OutPoint::new(txid, 3));
    }
}
