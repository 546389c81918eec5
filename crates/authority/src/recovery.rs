//! Recovery-identifier search for compact signatures.
//!
//! The signing oracle returns bare `r || s` signatures with no recovery
//! information, so the identifier is rederived by trying each candidate and
//! comparing the recovered key against a caller-supplied predicate.

use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, SECP256K1,
};

/// Finds the recovery identifier in `0..=3` whose recovered public key
/// satisfies `matches`, or `None` if no candidate does. Candidates that
/// fail to recover at all are skipped rather than treated as errors.
pub fn recover_matching_identifier(
    digest: &[u8; 32],
    signature: &[u8; 64],
    matches: impl Fn(&PublicKey) -> bool,
) -> Option<u8> {
    let message = Message::from_digest(*digest);
    for candidate in 0..=3 {
        let Ok(id) = RecoveryId::from_i32(candidate) else {
            continue;
        };
        let Ok(recoverable) = RecoverableSignature::from_compact(signature, id) else {
            continue;
        };
        if let Ok(pubkey) = SECP256K1.recover_ecdsa(&message, &recoverable) {
            if matches(&pubkey) {
                return Some(candidate as u8);
            }
        }
    }
    None
}
