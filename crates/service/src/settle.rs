//! Settlement of a single reserved log entry.
//!
//! A mint settlement produces a signed redemption document and, when the
//! entry carries enough postage, a bitcoin payout; a refund settlement
//! produces only the payout. All signatures are collected before anything
//! is broadcast, so a failure anywhere leaves the chain untouched.

use bitcoin::consensus::encode::serialize;
use tapbridge_authority::{sign_token_redemption, SignOutcome, TokenRedemptionItem};
use tapbridge_btcio::{
    address::to_output_script, build_with_fee, sign_transaction, SigValidation,
};
use tapbridge_primitives::{format_number_string, LogEntry, LogEntryKind, SettlementReceipt, UtxoEntry};
use tracing::{debug, info};

use crate::{context::ServiceContext, errors::ServiceError, keys::KeyMaterial};

/// A log entry with the inventory inputs reserved for its payout. Entries
/// below the postage threshold reserve nothing and settle document-only.
#[derive(Debug)]
pub(crate) struct Reservation {
    pub index: u64,
    pub entry: LogEntry,
    pub inputs: Vec<UtxoEntry>,
}

/// Outcome of one settlement, ready to be recorded on the entry.
#[derive(Debug)]
pub(crate) struct Settlement {
    pub index: u64,
    pub receipt: SettlementReceipt,
}

pub(crate) async fn settle_entry(
    ctx: &ServiceContext,
    keys: &KeyMaterial,
    reservation: Reservation,
) -> Result<Settlement, ServiceError> {
    let Reservation { index, entry, inputs } = reservation;

    // payout transaction, signed but not yet sent
    let mut signed_bytes = None;
    if !inputs.is_empty() {
        let dest = to_output_script(&entry.address, ctx.config.network)?;
        let unsigned = build_with_fee(
            &inputs,
            &keys.script_pubkey,
            &dest,
            entry.amount_sats,
            entry.fee_sats,
            None,
            true,
        )?;
        let signed = sign_transaction(
            ctx.signer.as_ref(),
            ctx.key_id(),
            &[],
            &keys.pubkey_bytes,
            &unsigned,
            SigValidation::Verify,
        )
        .await?;
        signed_bytes = Some(serialize(&signed));
    }

    // redemption document for the token side of a mint
    let mut redeem = None;
    if let LogEntryKind::MintSettlement { tick, dec, amt } = &entry.kind {
        let item = TokenRedemptionItem {
            tick: tick.clone(),
            amt: format_number_string(amt, u32::from(*dec)),
            address: entry.address.clone(),
        };
        match sign_token_redemption(
            ctx.signer.as_ref(),
            ctx.key_id(),
            &keys.pubkey,
            vec![item],
            &ctx.config.token_auth_inscription,
        )
        .await?
        {
            SignOutcome::Signed(doc) => redeem = Some(doc),
            SignOutcome::RecoveryExhausted => {
                return Err(ServiceError::RedemptionFailed(index));
            }
        }
    }

    let tx = match signed_bytes {
        Some(bytes) => {
            ctx.broadcaster.send_raw(&bytes).await?;
            info!(index, "settlement transaction broadcast");
            Some(hex::encode(bytes))
        }
        None => {
            debug!(index, "postage below dust, settling without a transaction");
            None
        }
    };

    Ok(Settlement {
        index,
        receipt: SettlementReceipt { redeem, tx },
    })
}
