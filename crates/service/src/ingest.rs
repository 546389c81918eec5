//! Block ingestion loop.
//!
//! Walks the chain one block at a time, a configured finality distance
//! behind the oracle's head. The cursor only advances after a block is
//! fully interpreted; any failure leaves it in place so the same block is
//! retried on the next tick.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tracing::{debug, warn};

use crate::{context::ServiceContext, interpret::process_mint_block};

/// Tick interval while the cursor is behind by two or more blocks.
const FAST_POLL: Duration = Duration::from_secs(1);

/// Runs one ingestion tick and returns the delay until the next one.
/// Failures are recorded as a diagnostic and retried at the slow rate.
pub async fn block_tick(ctx: &ServiceContext) -> Duration {
    match run_block_tick(ctx).await {
        Ok(delay) => delay,
        Err(err) => {
            warn!(err = %err, "block tick failed");
            let _ = ctx.storage.record_debug(&format!("{err:#}"));
            ctx.config.slow_poll()
        }
    }
}

async fn run_block_tick(ctx: &ServiceContext) -> anyhow::Result<Duration> {
    let keys = ctx
        .keys
        .ensure(ctx.signer.as_ref(), ctx.key_id(), ctx.config.network)
        .await
        .context("resolving service key")?;

    if ctx.storage.block_cursor()?.is_none() {
        ctx.storage.set_block_cursor(ctx.config.start_block)?;
    }
    let cursor = ctx
        .storage
        .block_cursor()?
        .unwrap_or(ctx.config.start_block);

    let head = ctx
        .oracle
        .current_height()
        .await
        .context("fetching chain head")?
        .saturating_sub(ctx.config.finality_distance);

    let diff = head.saturating_sub(cursor);
    // catch up quickly, then settle back to block pace
    let delay = if diff >= 2 { FAST_POLL } else { ctx.config.slow_poll() };
    debug!(cursor, head, diff, "block tick");

    for height in cursor + 1..=head {
        process_mint_block(ctx, &keys, height)
            .await
            .with_context(|| format!("interpreting block {height}"))?;
        ctx.storage.set_block_cursor(height)?;
    }

    Ok(delay)
}

/// Worker loop around [`block_tick`].
pub async fn run_block_worker(ctx: Arc<ServiceContext>) {
    loop {
        let delay = block_tick(&ctx).await;
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use tapbridge_btcio::OracleError;

    use super::*;
    use crate::testutil::{deposit_at, TestBridge};

    #[tokio::test]
    async fn advances_cursor_through_finalized_blocks() {
        let bridge = TestBridge::new().await;
        // head 106, finality 3 -> process 101..=103
        bridge.oracle.set_height(106);
        bridge
            .oracle
            .push_deposits(102, vec![deposit_at(&bridge, 102, 50_000, 1_000)]);

        let delay = block_tick(&bridge.ctx).await;
        assert_eq!(bridge.ctx.storage.block_cursor().unwrap(), Some(103));
        assert_eq!(bridge.ctx.storage.log_count().unwrap(), 1);
        // caught up after the walk, but the pre-walk diff selects fast polling
        assert_eq!(delay, FAST_POLL);
    }

    #[tokio::test]
    async fn caught_up_polls_slowly() {
        let bridge = TestBridge::new().await;
        bridge.oracle.set_height(104); // head 101, one block ahead

        let delay = block_tick(&bridge.ctx).await;
        assert_eq!(delay, bridge.ctx.config.slow_poll());
        assert_eq!(bridge.ctx.storage.block_cursor().unwrap(), Some(101));
    }

    #[tokio::test]
    async fn failed_block_holds_the_cursor() {
        let bridge = TestBridge::new().await;
        bridge.oracle.set_height(106);
        bridge
            .oracle
            .push_deposits(101, vec![deposit_at(&bridge, 101, 50_000, 1_000)]);
        bridge.oracle.fail_deposits(102, OracleError::Api("down".to_string()));

        block_tick(&bridge.ctx).await;

        // 101 landed, 102 did not; the cursor waits there
        assert_eq!(bridge.ctx.storage.block_cursor().unwrap(), Some(101));
        assert_eq!(bridge.ctx.storage.log_count().unwrap(), 1);
        assert!(bridge.ctx.storage.raw_get("debug").unwrap().is_some());

        // once the oracle recovers the same block is retried
        bridge.oracle.clear_failure(102);
        block_tick(&bridge.ctx).await;
        assert_eq!(bridge.ctx.storage.block_cursor().unwrap(), Some(103));
    }
}
