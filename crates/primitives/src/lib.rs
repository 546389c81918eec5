//! Core domain types shared across the tapbridge workspace.
//!
//! Everything here is plain data: deposits observed on chain, the embedded
//! instruction payloads they carry, the settlement log entries derived from
//! them, and the spendable outputs the bridge controls. Persistence and
//! behavior live in the other crates.

pub mod amount;
pub mod deposit;
pub mod log;
pub mod utxo;

pub use amount::{format_number_string, normalize_value, resolve_number_string};
pub use deposit::{Deposit, MintInstruction, MAX_INSTRUCTION_FEE};
pub use log::{LogEntry, LogEntryKind, SettlementReceipt};
pub use utxo::{outpoint_key, UtxoEntry, UTXO_INVENTORY_CAP};
