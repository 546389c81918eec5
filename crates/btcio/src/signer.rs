//! Witness assembly over the remote signing oracle.
//!
//! The oracle only ever sees 32-byte digests, so all sighashes are computed
//! locally first and every returned signature can be checked against the
//! bridge key before anything is considered broadcastable.

use async_trait::async_trait;
use bitcoin::{hashes::Hash, sighash::SighashCache, EcdsaSighashType, Transaction, Witness};
use secp256k1::{ecdsa::Signature, Message, PublicKey, SECP256K1};

use crate::{builder::UnsignedTransaction, errors::SignerError, traits::RemoteSigner};

/// Whether returned signatures are verified against the bridge key.
/// Size-measurement passes skip verification since the mock signer's
/// output never validates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigValidation {
    Verify,
    Skip,
}

/// Stand-in signer used to measure signed transaction size. The payload is
/// all ones rather than all zeros so DER encoding keeps full length.
#[derive(Debug, Clone, Copy)]
pub struct MockSigner;

#[async_trait]
impl RemoteSigner for MockSigner {
    async fn sign_hash(
        &self,
        _key_id: &str,
        _derivation_path: &[Vec<u8>],
        _hash: &[u8; 32],
    ) -> Result<[u8; 64], SignerError> {
        Ok([1u8; 64])
    }

    async fn public_key(&self, _key_id: &str) -> Result<Vec<u8>, SignerError> {
        // generator point; any parseable key works for sizing
        Ok(
            hex::decode("0279be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798")
                .expect("static hex"),
        )
    }
}

/// Signs every input of `unsigned` as p2wpkh spends of the bridge key.
///
/// Nothing is returned on a partial signature set: the first failure aborts
/// and the caller retries the whole transaction.
pub async fn sign_transaction(
    signer: &dyn RemoteSigner,
    key_id: &str,
    derivation_path: &[Vec<u8>],
    own_pubkey: &[u8],
    unsigned: &UnsignedTransaction,
    validation: SigValidation,
) -> Result<Transaction, SignerError> {
    let pubkey = PublicKey::from_slice(own_pubkey).map_err(|_| SignerError::InvalidPubkey)?;

    let mut cache = SighashCache::new(&unsigned.tx);
    let mut sighashes = Vec::with_capacity(unsigned.prevouts.len());
    for (index, prevout) in unsigned.prevouts.iter().enumerate() {
        let sighash = cache
            .p2wpkh_signature_hash(
                index,
                &prevout.script_pubkey,
                prevout.value,
                EcdsaSighashType::All,
            )
            .map_err(|err| SignerError::Sighash(err.to_string()))?;
        sighashes.push(sighash.to_byte_array());
    }

    let mut tx = unsigned.tx.clone();
    for (index, digest) in sighashes.iter().enumerate() {
        let compact = signer.sign_hash(key_id, derivation_path, digest).await?;
        let signature =
            Signature::from_compact(&compact).map_err(|_| SignerError::MalformedSignature)?;

        if validation == SigValidation::Verify {
            let message = Message::from_digest(*digest);
            SECP256K1
                .verify_ecdsa(&message, &signature, &pubkey)
                .map_err(|_| SignerError::InvalidSignature(index))?;
        }

        let witness_sig = bitcoin::ecdsa::Signature {
            signature,
            sighash_type: EcdsaSighashType::All,
        };
        tx.input[index].witness = Witness::p2wpkh(&witness_sig, &pubkey);
    }

    Ok(tx)
}
