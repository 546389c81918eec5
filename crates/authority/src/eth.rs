//! Ethereum address derivation for the bridge key.

use alloy_primitives::{keccak256, Address};
use secp256k1::PublicKey;

/// Keccak-256 of the uncompressed public key (sans prefix byte), last
/// twenty bytes.
pub fn pubkey_to_eth_address(pubkey: &PublicKey) -> Address {
    let uncompressed = pubkey.serialize_uncompressed();
    let hash = keccak256(&uncompressed[1..]);
    Address::from_slice(&hash[12..])
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use secp256k1::{SecretKey, SECP256K1};

    use super::*;

    #[test]
    fn derives_known_address() {
        // secret key 0x01: the canonical test account
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        let pubkey = SecretKey::from_slice(&bytes).unwrap().public_key(SECP256K1);
        assert_eq!(
            pubkey_to_eth_address(&pubkey),
            Address::from_str("0x7e5f4552091a69125d5dfcb7b8c2659029395bdf").unwrap()
        );
    }
}
