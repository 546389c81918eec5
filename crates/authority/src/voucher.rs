//! Cross-chain mint vouchers.
//!
//! A voucher authorizes the token contract on the Ethereum side to release
//! funds. The digest is the keccak-256 of the ABI encoding of
//! `(address account, uint256 value, string token, uint8 decimals,
//! uint256 nonce, uint256 chain_id)`, matching the contract's verifier.

use alloy_primitives::{keccak256, Address, U256};
use tapbridge_btcio::RemoteSigner;
use tracing::debug;

use crate::{
    errors::AuthorityError, eth::pubkey_to_eth_address, recovery::recover_matching_identifier,
};

/// Claim released to a token holder on the Ethereum side.
#[derive(Debug, Clone)]
pub struct MintVoucher {
    pub account: Address,
    /// Token amount in base units.
    pub value: U256,
    pub token: String,
    pub decimals: u8,
    pub nonce: U256,
    pub chain_id: u64,
}

/// Keccak-256 digest over the voucher's ABI encoding.
pub fn voucher_digest(voucher: &MintVoucher) -> [u8; 32] {
    // head: six 32-byte slots, the string slot holding its tail offset
    let mut buf = Vec::with_capacity(8 * 32);

    let mut account_slot = [0u8; 32];
    account_slot[12..].copy_from_slice(voucher.account.as_slice());
    buf.extend_from_slice(&account_slot);

    buf.extend_from_slice(&voucher.value.to_be_bytes::<32>());
    buf.extend_from_slice(&U256::from(6 * 32).to_be_bytes::<32>());
    buf.extend_from_slice(&U256::from(voucher.decimals).to_be_bytes::<32>());
    buf.extend_from_slice(&voucher.nonce.to_be_bytes::<32>());
    buf.extend_from_slice(&U256::from(voucher.chain_id).to_be_bytes::<32>());

    // tail: string length then contents padded to a slot boundary
    let token = voucher.token.as_bytes();
    buf.extend_from_slice(&U256::from(token.len()).to_be_bytes::<32>());
    buf.extend_from_slice(token);
    let partial = token.len() % 32;
    if partial != 0 {
        buf.extend_from_slice(&[0u8; 32][partial..]);
    }

    keccak256(&buf).0
}

/// Signs a voucher and resolves the Ethereum-style recovery byte by
/// checking candidates against the bridge's own Ethereum address. Returns
/// the 65-byte `r || s || v` signature as a 0x-prefixed hex string.
pub async fn sign_voucher(
    signer: &dyn RemoteSigner,
    key_id: &str,
    own_eth_address: Address,
    voucher: &MintVoucher,
) -> Result<String, AuthorityError> {
    let digest = voucher_digest(voucher);
    let compact = signer.sign_hash(key_id, &[], &digest).await?;

    let identifier = recover_matching_identifier(&digest, &compact, |pubkey| {
        pubkey_to_eth_address(pubkey) == own_eth_address
    })
    .ok_or(AuthorityError::RecoveryExhausted)?;

    let v = identifier + 27;
    debug!(%own_eth_address, v, "voucher signed");
    Ok(format!("0x{}{:02x}", hex::encode(compact), v))
}
