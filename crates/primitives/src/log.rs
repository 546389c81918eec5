//! Ledger-log entry types.
//!
//! A [`LogEntry`] is a durable, append-only record of settlement work derived
//! from a deposit. Entries are created once by the inbound interpreter with
//! `processed = false` and flipped exactly once by the queue processor, which
//! also records the settlement receipt. No field ever reverts.

use serde::{Deserialize, Serialize};

/// Kinds of settlement work recorded in the ledger log.
///
/// Wire tags match the log format clients already index (`mintMessage`,
/// `btcRefund`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LogEntryKind {
    /// Token mint settlement: a signed redemption document plus a bitcoin
    /// payout of the remaining postage.
    #[serde(rename = "mintMessage")]
    MintSettlement {
        /// Ticker of the minted token.
        tick: String,
        /// Decimal places of the ticker.
        dec: u8,
        /// Minted token amount in base units, as an integer string.
        amt: String,
    },

    /// Plain bitcoin refund of the deposit postage.
    #[serde(rename = "btcRefund")]
    RefundSettlement,
}

/// Result payload recorded on an entry when its settlement completes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementReceipt {
    /// Serialized redemption document, for mint settlements.
    pub redeem: Option<String>,

    /// Hex of the broadcast bitcoin transaction, when one was sent.
    pub tx: Option<String>,
}

/// The unit of settlement work. See the module docs for lifecycle rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(flatten)]
    pub kind: LogEntryKind,

    /// Destination address for the bitcoin payout.
    #[serde(rename = "addr")]
    pub address: String,

    /// Satoshis to pay out (deposit postage minus the instruction fee).
    #[serde(rename = "sats")]
    pub amount_sats: u64,

    /// Satoshis reserved for the payout transaction fee.
    #[serde(rename = "fee")]
    pub fee_sats: u64,

    /// Block the originating deposit confirmed in.
    #[serde(rename = "blck")]
    pub block_height: u64,

    /// `txid:vout` of the originating deposit output.
    pub utxo: String,

    /// Inscription id of the originating deposit.
    #[serde(rename = "ins")]
    pub inscription_id: String,

    /// Monotone false→true; set by the queue processor on completion.
    #[serde(rename = "proc")]
    pub processed: bool,

    /// Set once, together with `processed`.
    #[serde(rename = "dta")]
    pub result: Option<SettlementReceipt>,
}

impl LogEntry {
    /// Whether the queue processor can act on this entry: it must name a
    /// destination and still be pending. All current kinds are settlement
    /// kinds; the check mirrors what clients rely on when reading the log.
    pub fn is_transactable(&self) -> bool {
        !self.address.is_empty() && !self.processed
    }
}
