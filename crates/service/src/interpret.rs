//! Inbound interpreter: turns the deposits of one block into ledger-log
//! entries and inventory updates.
//!
//! The interpreter is replay-safe at two levels: a per-block mark makes the
//! whole invocation a no-op on repeat, and a per-outpoint mark keeps a
//! deposit from ever producing a second entry. Oracle errors abort the
//! invocation before either mark is written, so the ingestion loop retries
//! the block instead of advancing past it.

use bitcoin::Txid;
use tapbridge_btcio::address::is_valid_address;
use tapbridge_primitives::{outpoint_key, Deposit, LogEntry, LogEntryKind, MintInstruction, UtxoEntry};
use tracing::{debug, warn};

use crate::{context::ServiceContext, errors::ServiceError, keys::KeyMaterial};

/// Interprets every deposit recorded at `height`. Idempotent per block.
pub async fn process_mint_block(
    ctx: &ServiceContext,
    keys: &KeyMaterial,
    height: u64,
) -> Result<(), ServiceError> {
    if ctx.storage.is_block_processed(height)? {
        return Ok(());
    }

    let count = ctx.oracle.deposit_count(height).await?;
    let deposits = if count == 0 {
        Vec::new()
    } else {
        ctx.oracle.deposits(height, count).await?
    };

    let own_address = keys.address.to_string();
    for deposit in deposits {
        if let Some(entry) = interpret_deposit(ctx, &own_address, height, &deposit).await? {
            record_entry(ctx, &deposit, entry)?;
        }
    }

    ctx.storage.mark_block_processed(height)?;
    Ok(())
}

/// Validates one deposit and decides its settlement, or `None` to skip it.
/// Skips are permanent: a deposit that fails validation is treated like
/// money sent to a contract with no instructions.
async fn interpret_deposit(
    ctx: &ServiceContext,
    own_address: &str,
    height: u64,
    deposit: &Deposit,
) -> Result<Option<LogEntry>, ServiceError> {
    if deposit.address != own_address || deposit.block != height || deposit.failed {
        return Ok(None);
    }
    let Ok(token_amount) = deposit.token_amount.parse::<u128>() else {
        return Ok(None);
    };
    if token_amount == 0 {
        return Ok(None);
    }
    let Some(data) = deposit.data.as_deref() else {
        return Ok(None);
    };
    let Some(instruction) = MintInstruction::parse(data) else {
        return Ok(None);
    };
    if !is_valid_address(&instruction.target_address, ctx.config.network) {
        return Ok(None);
    }
    // the claimed fee must leave a payout; an overclaim invalidates the deposit
    let Some(net_sats) = deposit.amount.checked_sub(instruction.fee) else {
        warn!(utxo = %deposit.txid, fee = instruction.fee, "instruction fee exceeds postage");
        return Ok(None);
    };

    let outpoint = format!("{}:{}", deposit.txid, deposit.vout);
    if ctx.storage.is_utxo_consumed(&outpoint)? {
        return Ok(None);
    }

    // ticker decimals: cached, then the oracle; an undeployed ticker means
    // nothing can be redeemed and the postage goes back as a refund
    let decimals = ticker_decimals(ctx, mint_tick(ctx)).await?;

    let kind = match decimals {
        Some(dec) => LogEntryKind::MintSettlement {
            tick: mint_tick(ctx).to_string(),
            dec,
            amt: deposit.token_amount.clone(),
        },
        None => {
            debug!(tick = mint_tick(ctx), "ticker not deployed, refunding deposit");
            LogEntryKind::RefundSettlement
        }
    };

    Ok(Some(LogEntry {
        kind,
        address: instruction.target_address,
        amount_sats: net_sats,
        fee_sats: instruction.fee,
        block_height: height,
        utxo: outpoint,
        inscription_id: deposit.inscription_id.clone(),
        processed: false,
        result: None,
    }))
}

/// Stores an accepted deposit: inventory first, then the log entry and its
/// references, then the consumed mark.
fn record_entry(
    ctx: &ServiceContext,
    deposit: &Deposit,
    entry: LogEntry,
) -> Result<(), ServiceError> {
    let Ok(txid) = deposit.txid.parse::<Txid>() else {
        warn!(txid = %deposit.txid, "oracle reported an unparseable txid");
        return Ok(());
    };
    let outpoint = outpoint_key(&txid, deposit.vout);

    ctx.inventory
        .add(UtxoEntry::new(txid, deposit.vout, deposit.amount))?;

    if let Some(index) = ctx.storage.append_log(&entry)? {
        ctx.storage.add_utxo_ref(&outpoint, index)?;
        debug!(index, utxo = %outpoint, "deposit recorded");
    }
    ctx.storage.mark_utxo_consumed(&outpoint)?;
    Ok(())
}

fn mint_tick(ctx: &ServiceContext) -> &str {
    &ctx.config.mint_ticker
}

pub(crate) async fn ticker_decimals(
    ctx: &ServiceContext,
    tick: &str,
) -> Result<Option<u8>, ServiceError> {
    if let Some(dec) = ctx.storage.ticker_decimals(tick)? {
        return Ok(Some(dec));
    }
    match ctx.oracle.ticker_decimals(tick).await? {
        Some(dec) => {
            ctx.storage.put_ticker_decimals(tick, dec)?;
            Ok(Some(dec))
        }
        None => Ok(None),
    }
}
