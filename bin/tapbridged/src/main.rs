//! Bridge daemon entrypoint.

use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use argh::FromArgs;
use tapbridge_btcio::{HttpBridgeClient, HttpEthClient, HttpRemoteSigner, UtxoInventory};
use tapbridge_config::BridgeConfig;
use tapbridge_db::SledKvStore;
use tapbridge_service::{spawn_workers, ServiceContext, ServiceKeys};
use tapbridge_storage::BridgeStorage;
use tracing::{info, warn};

#[derive(Debug, FromArgs)]
#[argh(description = "tap token bridge daemon")]
struct Args {
    #[argh(option, short = 'c', description = "path to configuration")]
    config: PathBuf,

    /// Data directory path that will override the path in the config toml.
    #[argh(option, short = 'd', description = "datadir override")]
    datadir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing::level_filters::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let mut config = BridgeConfig::from_file(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;
    if let Some(datadir) = args.datadir {
        config.datadir = datadir;
    }

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("tapbridge-rt")
        .build()
        .context("building runtime")?;
    rt.block_on(run(config))
}

async fn run(config: BridgeConfig) -> anyhow::Result<()> {
    let db = sled::open(&config.datadir)
        .with_context(|| format!("opening database at {}", config.datadir.display()))?;
    let tree = db.open_tree("bridge")?;
    let storage = BridgeStorage::new(Arc::new(SledKvStore::new(tree)));

    let oracle = Arc::new(HttpBridgeClient::new(
        config.oracle_url.clone(),
        config.mint_ticker.clone(),
    ));
    let ctx = Arc::new(ServiceContext {
        inventory: UtxoInventory::new(storage.clone()),
        storage,
        eth_oracle: Arc::new(HttpEthClient::new(config.eth_rpc_url.clone())),
        signer: Arc::new(HttpRemoteSigner::new(config.signer_url.clone())),
        broadcaster: oracle.clone(),
        oracle,
        keys: ServiceKeys::new(),
        config,
    });

    // resolve the service key up front so a broken signer fails loudly
    match ctx
        .keys
        .ensure(ctx.signer.as_ref(), ctx.key_id(), ctx.config.network)
        .await
    {
        Ok(keys) => info!(address = %keys.address, "bridge starting"),
        Err(err) => warn!(err = %err, "signing oracle unreachable, workers will retry"),
    }

    let workers = spawn_workers(ctx);
    tokio::signal::ctrl_c().await.context("waiting for ctrl-c")?;
    info!("shutting down");
    for worker in workers {
        worker.abort();
    }
    Ok(())
}
