//! Contracts the bridge requires from its external collaborators. The
//! bridge never holds keys or chain state itself; everything flows through
//! these traits so tests can substitute scripted fakes.

use async_trait::async_trait;
use tapbridge_primitives::{Deposit, UtxoEntry};

use crate::errors::{OracleError, SignerError};

/// Read-only view of the indexed chain provided by the remote oracle.
#[async_trait]
pub trait ChainOracle: Send + Sync {
    /// Latest block height the oracle has fully indexed.
    async fn current_height(&self) -> Result<u64, OracleError>;

    /// Number of bridge deposits recorded at `height`.
    async fn deposit_count(&self, height: u64) -> Result<u64, OracleError>;

    /// The deposits recorded at `height`. Implementations paginate
    /// internally; a failure on any page fails the whole call.
    async fn deposits(&self, height: u64, count: u64) -> Result<Vec<Deposit>, OracleError>;

    /// Decimals of a deployed ticker. `Ok(None)` means the ticker is not
    /// deployed (a permanent condition, unlike an [`OracleError`]).
    async fn ticker_decimals(&self, tick: &str) -> Result<Option<u8>, OracleError>;

    /// Spendable outputs currently confirmed for `address`.
    async fn spendable_utxos(&self, address: &str) -> Result<Vec<UtxoEntry>, OracleError>;

    /// Recent fee percentiles in millisatoshi per byte, or empty when the
    /// network has no fee market (regtest).
    async fn fee_percentiles(&self) -> Result<Vec<u64>, OracleError>;
}

/// Ethereum-side chain view, used only to advance the tracker cursor.
#[async_trait]
pub trait EthereumOracle: Send + Sync {
    async fn current_block(&self) -> Result<u64, OracleError>;
}

/// The remote signing authority. The bridge's keys never leave it; we only
/// send 32-byte digests and receive 64-byte compact signatures.
#[async_trait]
pub trait RemoteSigner: Send + Sync {
    async fn sign_hash(
        &self,
        key_id: &str,
        derivation_path: &[Vec<u8>],
        hash: &[u8; 32],
    ) -> Result<[u8; 64], SignerError>;

    /// Compressed secp256k1 public key for `key_id`.
    async fn public_key(&self, key_id: &str) -> Result<Vec<u8>, SignerError>;
}

/// Channel for submitting a fully-signed transaction to the network.
#[async_trait]
pub trait TxBroadcaster: Send + Sync {
    async fn send_raw(&self, tx: &[u8]) -> Result<(), OracleError>;
}
