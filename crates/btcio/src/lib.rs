//! Bitcoin-side I/O for the bridge: the chain-data oracle client, the UTXO
//! inventory, transaction building with iterative fee convergence, and the
//! gateway to the remote signing oracle.

pub mod address;
pub mod builder;
pub mod client;
pub mod errors;
pub mod inventory;
pub mod signer;
pub mod traits;

pub use builder::{
    build_transaction, build_with_fee, select_inputs, CarrierInput, UnsignedTransaction,
    DUST_THRESHOLD, MAX_FEE_ITERATIONS,
};
pub use client::{HttpBridgeClient, HttpEthClient, HttpRemoteSigner};
pub use errors::{BuildError, OracleError, SignerError};
pub use inventory::UtxoInventory;
pub use signer::{sign_transaction, MockSigner, SigValidation};
pub use traits::{ChainOracle, EthereumOracle, RemoteSigner, TxBroadcaster};
