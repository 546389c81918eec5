//! Deposits observed on chain and the instruction payloads they embed.

use serde::{Deserialize, Serialize};

/// Largest fee a deposit instruction may claim, exclusive. Instructions are
/// produced by arbitrary wallets, so the bound mirrors the widest integer
/// those clients can represent exactly (2^53 - 1).
pub const MAX_INSTRUCTION_FEE: u64 = (1 << 53) - 1;

/// An observed on-chain payment to the bridge address, as reported by the
/// chain-data oracle. Deposits are read-only facts; each one is consumed at
/// most once to produce a single log entry.
///
/// Field renames match the oracle's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposit {
    /// Receiving address of the deposit.
    #[serde(rename = "addr")]
    pub address: String,

    /// Block the deposit was confirmed in.
    #[serde(rename = "blck")]
    pub block: u64,

    /// Whether the oracle flagged the inscription as invalid.
    #[serde(rename = "fail")]
    pub failed: bool,

    /// Raw embedded instruction payload, if any.
    #[serde(rename = "dta")]
    pub data: Option<String>,

    /// Postage carried by the deposit output, in satoshis.
    #[serde(rename = "val")]
    pub amount: u64,

    /// Token amount minted to the bridge, as an integer string in the
    /// ticker's base units.
    #[serde(rename = "amt")]
    pub token_amount: String,

    /// Funding transaction id (hex).
    #[serde(rename = "tx")]
    pub txid: String,

    /// Funding output index.
    #[serde(rename = "vo")]
    pub vout: u32,

    /// Inscription id (not the inscription number).
    #[serde(rename = "ins")]
    pub inscription_id: String,
}

/// The `processMint` instruction a deposit may embed in its data field.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MintInstruction {
    pub op: String,

    /// Address the bridge should pay out (or refund) to.
    #[serde(rename = "addr")]
    pub target_address: String,

    /// Portion of the postage reserved for transaction fees, in satoshis.
    pub fee: u64,
}

impl MintInstruction {
    /// Parses an embedded instruction payload. Returns `None` for anything
    /// that is not a well-formed `processMint` instruction with a fee
    /// strictly between zero and [`MAX_INSTRUCTION_FEE`]. Address-format
    /// validation is the caller's concern since it depends on the active
    /// network.
    pub fn parse(data: &str) -> Option<Self> {
        let inst: Self = serde_json::from_str(data).ok()?;
        if inst.op != "processMint" {
            return None;
        }
        if inst.fee == 0 || inst.fee >= MAX_INSTRUCTION_FEE {
            return None;
        }
        Some(inst)
    }
}
