//! Cached key material for the bridge's service key.
//!
//! The remote signing oracle is the only holder of the private key; all we
//! keep is the public key and the addresses derived from it, fetched once
//! and cached for the process lifetime.

use alloy_primitives::Address as EthAddress;
use bitcoin::{Address, Network, ScriptBuf};
use parking_lot::RwLock;
use secp256k1::PublicKey;
use tapbridge_authority::pubkey_to_eth_address;
use tapbridge_btcio::{address::pubkey_to_p2wpkh, RemoteSigner, SignerError};
use tracing::info;

use crate::errors::ServiceError;

/// Derived identities of the service key.
#[derive(Debug, Clone)]
pub struct KeyMaterial {
    pub pubkey: PublicKey,
    /// Compressed encoding, as the signing gateway expects it.
    pub pubkey_bytes: Vec<u8>,
    pub address: Address,
    pub script_pubkey: ScriptBuf,
    pub eth_address: EthAddress,
}

/// Lazily-initialized cache over the oracle's public key.
#[derive(Debug, Default)]
pub struct ServiceKeys {
    inner: RwLock<Option<KeyMaterial>>,
}

impl ServiceKeys {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached material, if the first fetch already happened.
    pub fn get(&self) -> Option<KeyMaterial> {
        self.inner.read().clone()
    }

    /// Returns the cached material, fetching and deriving it on first use.
    pub async fn ensure(
        &self,
        signer: &dyn RemoteSigner,
        key_id: &str,
        network: Network,
    ) -> Result<KeyMaterial, ServiceError> {
        if let Some(material) = self.get() {
            return Ok(material);
        }

        let pubkey_bytes = signer.public_key(key_id).await?;
        let pubkey =
            PublicKey::from_slice(&pubkey_bytes).map_err(|_| SignerError::InvalidPubkey)?;
        let address = pubkey_to_p2wpkh(&pubkey_bytes, network)?;
        let material = KeyMaterial {
            script_pubkey: address.script_pubkey(),
            eth_address: pubkey_to_eth_address(&pubkey),
            pubkey,
            pubkey_bytes,
            address,
        };
        info!(address = %material.address, eth = %material.eth_address, "service key resolved");

        *self.inner.write() = Some(material.clone());
        Ok(material)
    }
}
