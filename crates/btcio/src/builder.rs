//! Spending-transaction assembly.
//!
//! Fee estimation is a chicken-and-egg problem: the fee depends on the
//! signed size, and the size depends on the inputs selected for the fee.
//! [`build_transaction`] solves it iteratively, signing each candidate with
//! a mock signer to measure its final size.

use bitcoin::{
    absolute::LockTime, opcodes::all::OP_RETURN, script::Builder, transaction::Version, Amount,
    OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};
use tapbridge_primitives::UtxoEntry;
use tracing::debug;

use crate::{
    errors::BuildError,
    signer::{sign_transaction, MockSigner, SigValidation},
};

/// Outputs below this value are uneconomical to create or spend.
pub const DUST_THRESHOLD: u64 = 546;

/// Bound on the fee-convergence loop. The fee stabilizes in two or three
/// rounds in practice since extra fee rarely pulls in another input.
pub const MAX_FEE_ITERATIONS: usize = 16;

/// A specific outpoint that must be spent as the first input, ahead of
/// anything picked from the inventory.
#[derive(Debug, Clone)]
pub struct CarrierInput {
    pub txid: Txid,
    pub vout: u32,
    /// Value of the carried output, in satoshis.
    pub value: u64,
}

impl CarrierInput {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint::new(self.txid, self.vout)
    }
}

/// A transaction ready for signing, with the previous outputs each input
/// spends and the inventory entries it consumed.
#[derive(Debug, Clone)]
pub struct UnsignedTransaction {
    pub tx: Transaction,
    pub prevouts: Vec<TxOut>,
    pub selected: Vec<UtxoEntry>,
}

/// Picks inputs covering `amount + fee`, cheapest entries first so large
/// outputs stay available for large payouts. `exclude` keeps the carrier
/// outpoint from being double-spent when it also sits in the inventory.
pub fn select_inputs(
    utxos: &[UtxoEntry],
    amount: u64,
    fee: u64,
    exclude: Option<&OutPoint>,
) -> Result<(Vec<UtxoEntry>, u64), BuildError> {
    let need = amount.saturating_add(fee);
    let mut selected = Vec::new();
    let mut total = 0u64;
    // the set is value-descending, so walk it back to front
    for utxo in utxos.iter().rev() {
        if exclude.is_some_and(|op| *op == utxo.outpoint()) {
            continue;
        }
        total = total.saturating_add(utxo.value);
        selected.push(utxo.clone());
        if total >= need {
            return Ok((selected, total));
        }
    }
    Err(BuildError::InsufficientBalance {
        have: total,
        amount,
        fee,
    })
}

/// Assembles an unsigned spend at a fixed fee.
///
/// Input order: the carrier outpoint (if any), then the selected inventory
/// entries. Output order: a zero-value bare `OP_RETURN` burner (if
/// requested), the destination payment, then change back to the bridge when
/// it clears the dust threshold.
pub fn build_with_fee(
    utxos: &[UtxoEntry],
    own_script: &ScriptBuf,
    dest_script: &ScriptBuf,
    amount: u64,
    fee: u64,
    carrier: Option<&CarrierInput>,
    add_burner: bool,
) -> Result<UnsignedTransaction, BuildError> {
    let exclude = carrier.map(CarrierInput::outpoint);
    let (selected, total) = select_inputs(utxos, amount, fee, exclude.as_ref())?;

    let mut input = Vec::new();
    let mut prevouts = Vec::new();

    if let Some(carrier) = carrier {
        input.push(TxIn {
            previous_output: carrier.outpoint(),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        });
        prevouts.push(TxOut {
            value: Amount::from_sat(carrier.value),
            script_pubkey: own_script.clone(),
        });
    }

    for entry in &selected {
        input.push(TxIn {
            previous_output: entry.outpoint(),
            script_sig: ScriptBuf::new(),
            sequence: Sequence::MAX,
            witness: Witness::new(),
        });
        prevouts.push(TxOut {
            value: Amount::from_sat(entry.value),
            script_pubkey: own_script.clone(),
        });
    }

    let mut output = Vec::new();

    if add_burner {
        output.push(TxOut {
            value: Amount::ZERO,
            script_pubkey: Builder::new().push_opcode(OP_RETURN).into_script(),
        });
    }

    output.push(TxOut {
        value: Amount::from_sat(amount),
        script_pubkey: dest_script.clone(),
    });

    let remaining = total - amount - fee;
    if remaining >= DUST_THRESHOLD {
        output.push(TxOut {
            value: Amount::from_sat(remaining),
            script_pubkey: own_script.clone(),
        });
    }

    Ok(UnsignedTransaction {
        tx: Transaction {
            version: Version::TWO,
            lock_time: LockTime::ZERO,
            input,
            output,
        },
        prevouts,
        selected,
    })
}

/// Assembles an unsigned spend at `fee_per_byte` millisatoshi per byte,
/// converging on the fee implied by the signed transaction's size.
#[allow(clippy::too_many_arguments)]
pub async fn build_transaction(
    own_pubkey: &[u8],
    utxos: &[UtxoEntry],
    own_script: &ScriptBuf,
    dest_script: &ScriptBuf,
    amount: u64,
    fee_per_byte: u64,
    carrier: Option<&CarrierInput>,
    add_burner: bool,
) -> Result<UnsignedTransaction, BuildError> {
    let mut fee = 0u64;
    for _ in 0..MAX_FEE_ITERATIONS {
        let unsigned = build_with_fee(
            utxos,
            own_script,
            dest_script,
            amount,
            fee,
            carrier,
            add_burner,
        )?;

        // only the size of the signed transaction matters here
        let signed = sign_transaction(
            &MockSigner,
            "",
            &[],
            own_pubkey,
            &unsigned,
            SigValidation::Skip,
        )
        .await?;

        let target = (signed.total_size() as u64)
            .saturating_mul(fee_per_byte)
            .div_ceil(1000);
        if target == fee {
            debug!(fee, size = signed.total_size(), "transaction fee converged");
            return Ok(unsigned);
        }
        fee = target;
    }
    Err(BuildError::FeeConvergence(MAX_FEE_ITERATIONS))
}
