//! Shared dependencies of the bridge workers.

use std::sync::Arc;

use tapbridge_btcio::{ChainOracle, EthereumOracle, RemoteSigner, TxBroadcaster, UtxoInventory};
use tapbridge_config::BridgeConfig;
use tapbridge_storage::BridgeStorage;

use crate::keys::ServiceKeys;

/// Everything a worker needs: configuration, durable state, and the
/// external collaborators behind their trait seams.
pub struct ServiceContext {
    pub config: BridgeConfig,
    pub storage: BridgeStorage,
    pub inventory: UtxoInventory,
    pub oracle: Arc<dyn ChainOracle>,
    pub eth_oracle: Arc<dyn EthereumOracle>,
    pub signer: Arc<dyn RemoteSigner>,
    pub broadcaster: Arc<dyn TxBroadcaster>,
    pub keys: ServiceKeys,
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ServiceContext {
    /// Oracle key identifier for the configured network.
    pub fn key_id(&self) -> &'static str {
        self.config.key_id()
    }
}
