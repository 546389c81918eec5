//! Runtime configuration for the bridge daemon.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use bitcoin::Network;
use serde::{Deserialize, Serialize};

/// Default re-org safety distance on the Bitcoin side.
const DEFAULT_FINALITY_DISTANCE: u64 = 3;

/// Default re-org safety distance on the Ethereum side.
const DEFAULT_ETH_FINALITY_DISTANCE: u64 = 3;

/// Default value for `datadir` in [`BridgeConfig`].
const DEFAULT_DATADIR: &str = "tapbridge-data";

/// Key identifier used on mainnet. Polling slows down on this key since
/// signing there is paid per call.
const PRODUCTION_KEY_ID: &str = "key_1";

/// Fallback fee rate in millisatoshi per byte when the network has no fee
/// percentiles (regtest).
const DEFAULT_FEE_PER_BYTE: u64 = 2_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub network: Network,

    /// Base URL of the chain-data oracle.
    pub oracle_url: String,

    /// Base URL of the remote signing oracle.
    pub signer_url: String,

    /// Ethereum JSON-RPC endpoint.
    pub eth_rpc_url: String,

    /// Ticker whose mints the bridge consumes.
    pub mint_ticker: String,

    /// First Bitcoin block to interpret.
    pub start_block: u64,

    /// First Ethereum block for the tracker cursor.
    pub eth_start_block: u64,

    #[serde(default = "default_finality_distance")]
    pub finality_distance: u64,

    #[serde(default = "default_eth_finality_distance")]
    pub eth_finality_distance: u64,

    /// Chain id baked into mint vouchers.
    pub eth_chain_id: u64,

    /// Inscription id of the bridge's token authority.
    pub token_auth_inscription: String,

    /// Inscription id of the bridge's privilege authority, if any.
    #[serde(default)]
    pub privilege_auth_inscription: String,

    /// The data directory where database contents reside.
    #[serde(default = "default_datadir")]
    pub datadir: PathBuf,
}

fn default_finality_distance() -> u64 {
    DEFAULT_FINALITY_DISTANCE
}

fn default_eth_finality_distance() -> u64 {
    DEFAULT_ETH_FINALITY_DISTANCE
}

fn default_datadir() -> PathBuf {
    DEFAULT_DATADIR.into()
}

impl BridgeConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&raw)?)
    }

    /// Signing-oracle key identifier for the active network.
    pub fn key_id(&self) -> &'static str {
        match self.network {
            Network::Bitcoin => PRODUCTION_KEY_ID,
            Network::Testnet | Network::Signet => "test_key_1",
            _ => "dfx_test_key",
        }
    }

    /// Tick interval when the cursor is caught up. Production signing keys
    /// poll at block pace; everything else polls aggressively.
    pub fn slow_poll(&self) -> Duration {
        if self.key_id() == PRODUCTION_KEY_ID {
            Duration::from_secs(60)
        } else {
            Duration::from_secs(1)
        }
    }

    /// Picks a fee rate from the oracle's percentiles: the 75th on mainnet,
    /// the 50th on test networks, and a fixed fallback where no fee market
    /// exists.
    pub fn fee_per_byte(&self, percentiles: &[u64]) -> u64 {
        let index = match self.key_id() {
            PRODUCTION_KEY_ID => 75,
            "test_key_1" => 50,
            _ => return DEFAULT_FEE_PER_BYTE,
        };
        percentiles
            .get(index)
            .copied()
            .unwrap_or(DEFAULT_FEE_PER_BYTE)
    }
}
