//! Ethereum-side tracker.
//!
//! Mirrors the ingestion loop's pacing but only maintains cursors: the
//! current Ethereum head and the Bitcoin cursor position it last observed.
//! Deposit interpretation on this side hangs off the same skeleton when a
//! deployment needs it.

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use tracing::{debug, warn};

use crate::context::ServiceContext;

const FAST_POLL: Duration = Duration::from_secs(1);

/// Runs one tracker tick and returns the delay until the next one.
pub async fn eth_tick(ctx: &ServiceContext) -> Duration {
    match run_eth_tick(ctx).await {
        Ok(delay) => delay,
        Err(err) => {
            warn!(err = %err, "eth tick failed");
            let _ = ctx.storage.record_eth_debug(&format!("{err:#}"));
            ctx.config.slow_poll()
        }
    }
}

async fn run_eth_tick(ctx: &ServiceContext) -> anyhow::Result<Duration> {
    if ctx.storage.eth_block_cursor()?.is_none() {
        ctx.storage.set_eth_block_cursor(ctx.config.eth_start_block)?;
    }

    let eth_head = ctx
        .eth_oracle
        .current_block()
        .await
        .context("fetching eth head")?;
    ctx.storage.set_eth_block_cursor(eth_head)?;

    let btc_cursor = ctx
        .storage
        .block_cursor()?
        .unwrap_or(ctx.config.start_block);
    let last_seen = match ctx.storage.eth_last_bitcoin_block()? {
        Some(height) => height,
        None => {
            ctx.storage.set_eth_last_bitcoin_block(btc_cursor)?;
            btc_cursor
        }
    };

    let diff = btc_cursor.saturating_sub(last_seen);
    debug!(eth_head, btc_cursor, diff, "eth tick");
    ctx.storage.set_eth_last_bitcoin_block(btc_cursor)?;

    Ok(if diff >= 2 { FAST_POLL } else { ctx.config.slow_poll() })
}

/// Worker loop around [`eth_tick`].
pub async fn run_eth_worker(ctx: Arc<ServiceContext>) {
    loop {
        let delay = eth_tick(&ctx).await;
        tokio::time::sleep(delay).await;
    }
}
