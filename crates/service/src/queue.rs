//! Queue processor: drains pending ledger-log entries in bounded batches.
//!
//! Processing is two-phase. The reservation phase walks the batch in order
//! and removes each entry's inputs from the inventory before any settlement
//! work starts, so no two entries in a batch can share an outpoint. The
//! settlement phase then fans out concurrently. Successes are recorded
//! per entry; the cursor only advances when the whole batch succeeded, so a
//! failed entry is retried with the next batch.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use tapbridge_btcio::{select_inputs, BuildError, DUST_THRESHOLD};
use tapbridge_primitives::{LogEntry, UtxoEntry};
use tracing::{debug, warn};

use crate::{
    context::ServiceContext,
    errors::ServiceError,
    keys::KeyMaterial,
    settle::{settle_entry, Reservation},
};

/// Upper bound on entries dispatched per tick.
const QUEUE_BATCH_MAX: usize = 20;

/// Backlog size beyond which the busy flag is raised.
const BUSY_BACKLOG: u64 = 200;

/// Upper bound on inputs a single settlement may consume.
const MAX_INPUTS_PER_ENTRY: usize = 10;

const QUEUE_POLL: Duration = Duration::from_secs(1);

/// Runs one queue tick. The tick is single-flight: while a previous batch
/// still has settlements outstanding, the tick backs off without touching
/// anything.
pub async fn queue_tick(ctx: &ServiceContext) -> Duration {
    match ctx.storage.queue_depth() {
        Ok(0) => {}
        Ok(depth) => {
            debug!(depth, "queue batch still in flight");
            return QUEUE_POLL;
        }
        Err(err) => {
            let _ = ctx.storage.record_queue_debug(&err.to_string());
            return QUEUE_POLL;
        }
    }

    let result = run_queue_tick(ctx).await;
    // the in-flight guard drops in every path, including failures
    let _ = ctx.storage.set_queue_depth(0);
    if let Err(err) = result {
        warn!(err = %err, "queue tick failed");
        let _ = ctx.storage.record_queue_debug(&err.to_string());
    }
    QUEUE_POLL
}

async fn run_queue_tick(ctx: &ServiceContext) -> Result<(), ServiceError> {
    let cursor = ctx.storage.queue_cursor()?;
    let count = ctx.storage.log_count()?;
    ctx.storage.set_busy(count.saturating_sub(cursor) > BUSY_BACKLOG)?;

    let mut batch: Vec<(u64, LogEntry)> = Vec::new();
    for index in cursor..count {
        if batch.len() + 1 >= QUEUE_BATCH_MAX {
            break;
        }
        let Some(entry) = ctx.storage.log(index)? else {
            continue;
        };
        if !entry.is_transactable() {
            continue;
        }
        batch.push((index, entry));
    }

    let Some(&(last_index, _)) = batch.last() else {
        // nothing pending below `count`; skip the cursor past it
        ctx.storage.set_queue_cursor(count)?;
        return Ok(());
    };

    let keys = ctx
        .keys
        .ensure(ctx.signer.as_ref(), ctx.key_id(), ctx.config.network)
        .await?;

    ctx.storage.set_queue_depth(batch.len() as u64)?;

    let mut reservations = Vec::with_capacity(batch.len());
    for (index, entry) in batch {
        let inputs = reserve_inputs(ctx, &keys, index, &entry).await?;
        reservations.push(Reservation { index, entry, inputs });
    }

    debug!(batch = reservations.len(), "dispatching settlements");
    let results = join_all(
        reservations
            .into_iter()
            .map(|reservation| settle_entry(ctx, &keys, reservation)),
    )
    .await;

    let mut failures = 0usize;
    for result in results {
        match result {
            Ok(settlement) => {
                ctx.storage.set_processed(settlement.index, settlement.receipt)?;
            }
            Err(err) => {
                failures += 1;
                warn!(err = %err, "settlement failed");
                let _ = ctx.storage.record_queue_debug(&err.to_string());
            }
        }
    }

    // a partial batch keeps retrying until operators resolve the failures
    if failures == 0 {
        ctx.storage.set_queue_cursor(last_index + 1)?;
    }
    Ok(())
}

/// Reserves payout inputs for one entry: selects from the inventory and
/// removes the selection before returning, so later entries and later
/// batches cannot see the same outpoints. Entries whose postage or fee is
/// below the dust threshold settle without a transaction and reserve
/// nothing.
async fn reserve_inputs(
    ctx: &ServiceContext,
    keys: &KeyMaterial,
    index: u64,
    entry: &LogEntry,
) -> Result<Vec<UtxoEntry>, ServiceError> {
    if entry.amount_sats < DUST_THRESHOLD || entry.fee_sats < DUST_THRESHOLD {
        return Ok(Vec::new());
    }

    let available = ctx.inventory.entries()?;
    let selected = match select_inputs(&available, entry.amount_sats, entry.fee_sats, None) {
        Ok((selected, _)) => selected,
        Err(BuildError::InsufficientBalance { .. }) => {
            // the chain may know outputs the inventory lost track of
            replenish_inventory(ctx, keys).await?;
            let available = ctx.inventory.entries()?;
            select_inputs(&available, entry.amount_sats, entry.fee_sats, None)
                .map(|(selected, _)| selected)?
        }
        Err(err) => return Err(err.into()),
    };

    if selected.len() > MAX_INPUTS_PER_ENTRY {
        return Err(ServiceError::TooManyInputs {
            index,
            inputs: selected.len(),
        });
    }

    for input in &selected {
        ctx.inventory.remove(&input.txid, input.vout)?;
    }
    Ok(selected)
}

/// Refills the inventory from the oracle's view of the service address,
/// skipping outpoints already present.
async fn replenish_inventory(
    ctx: &ServiceContext,
    keys: &KeyMaterial,
) -> Result<(), ServiceError> {
    let address = keys.address.to_string();
    let fresh = ctx.oracle.spendable_utxos(&address).await?;
    let mut added = 0usize;
    for utxo in fresh {
        if ctx.inventory.contains(&utxo.txid, utxo.vout)? {
            continue;
        }
        ctx.inventory.add(utxo)?;
        added += 1;
    }
    debug!(added, "inventory replenished from chain");
    Ok(())
}

/// Worker loop around [`queue_tick`].
pub async fn run_queue_worker(ctx: Arc<ServiceContext>) {
    loop {
        let delay = queue_tick(&ctx).await;
        tokio::time::sleep(delay).await;
    }
}
