//! The bridge service: worker loops and the operator surface.
//!
//! Three independent workers run over a shared [`ServiceContext`]: the
//! block ingestion loop that interprets finalized deposits into ledger-log
//! entries, the Ethereum-side tracker, and the queue processor that settles
//! pending entries. [`BridgeHandle`] wraps the same context for operator
//! queries and manually triggered signing operations.

pub mod context;
pub mod errors;
pub mod eth;
pub mod handle;
pub mod ingest;
pub mod interpret;
pub mod keys;
pub mod queue;

mod settle;
#[cfg(test)]
mod testutil;

use std::sync::Arc;

use tokio::task::JoinHandle;

pub use context::ServiceContext;
pub use errors::ServiceError;
pub use eth::{eth_tick, run_eth_worker};
pub use handle::BridgeHandle;
pub use ingest::{block_tick, run_block_worker};
pub use keys::{KeyMaterial, ServiceKeys};
pub use queue::{queue_tick, run_queue_worker};

/// Spawns the three worker loops onto the current runtime.
pub fn spawn_workers(ctx: Arc<ServiceContext>) -> Vec<JoinHandle<()>> {
    vec![
        tokio::spawn(run_block_worker(ctx.clone())),
        tokio::spawn(run_eth_worker(ctx.clone())),
        tokio::spawn(run_queue_worker(ctx)),
    ]
}
