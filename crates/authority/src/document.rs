//! Authority documents for the token protocol.
//!
//! Each document is a JSON payload carrying a salted sha-256 hash of its
//! authoritative content and a `{v, r, s}` signature over that hash. The
//! recovery identifier is resolved against the bridge's own public key; an
//! exhausted search yields [`SignOutcome::RecoveryExhausted`] instead of a
//! document, so callers decide whether that is fatal.

use rand::Rng;
use secp256k1::PublicKey;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tapbridge_btcio::RemoteSigner;
use tracing::warn;

use crate::{errors::AuthorityError, recovery::recover_matching_identifier};

/// Result of a document-signing attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignOutcome {
    /// The serialized, signed document.
    Signed(String),
    /// The oracle's signature did not recover to the bridge key.
    RecoveryExhausted,
}

impl SignOutcome {
    pub fn into_signed(self) -> Option<String> {
        match self {
            Self::Signed(doc) => Some(doc),
            Self::RecoveryExhausted => None,
        }
    }
}

/// One redeemable position inside a token redemption document.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TokenRedemptionItem {
    pub tick: String,
    /// Human-form amount, already shifted by the ticker's decimals.
    pub amt: String,
    pub address: String,
}

#[derive(Debug, Serialize)]
struct DocumentSig {
    v: String,
    r: String,
    s: String,
}

#[derive(Serialize)]
struct RedeemBody {
    items: Vec<TokenRedemptionItem>,
    auth: String,
    data: String,
}

#[derive(Serialize)]
struct RedemptionProto {
    p: &'static str,
    op: &'static str,
    redeem: RedeemBody,
    sig: DocumentSig,
    hash: String,
    salt: String,
}

#[derive(Serialize)]
struct TokenAuthorityProto {
    p: &'static str,
    op: &'static str,
    auth: Vec<String>,
    sig: DocumentSig,
    hash: String,
    salt: String,
}

#[derive(Serialize)]
struct PrivilegeAuthorityBody {
    name: String,
}

#[derive(Serialize)]
struct PrivilegeAuthorityProto {
    p: &'static str,
    op: &'static str,
    sig: DocumentSig,
    hash: String,
    salt: String,
    auth: PrivilegeAuthorityBody,
}

#[derive(Serialize)]
struct PrivilegeVerifiedProto {
    p: &'static str,
    op: &'static str,
    sig: DocumentSig,
    hash: String,
    address: String,
    salt: String,
    prv: String,
    verify: String,
    col: String,
    seq: u64,
}

fn fresh_salt() -> String {
    rand::thread_rng().gen::<f64>().to_string()
}

/// Hashes and signs `raw`, resolving the recovery identifier against
/// `own_pubkey`. `None` means the search was exhausted.
async fn sign_payload(
    signer: &dyn RemoteSigner,
    key_id: &str,
    own_pubkey: &PublicKey,
    raw: &str,
) -> Result<Option<(String, DocumentSig)>, AuthorityError> {
    let digest: [u8; 32] = Sha256::digest(raw.as_bytes()).into();
    let compact = signer.sign_hash(key_id, &[], &digest).await?;

    let Some(identifier) =
        recover_matching_identifier(&digest, &compact, |pubkey| pubkey == own_pubkey)
    else {
        warn!("document signature did not recover to the bridge key");
        return Ok(None);
    };

    let r = alloy_primitives::U256::from_be_slice(&compact[..32]);
    let s = alloy_primitives::U256::from_be_slice(&compact[32..]);
    Ok(Some((
        hex::encode(digest),
        DocumentSig {
            v: identifier.to_string(),
            r: r.to_string(),
            s: s.to_string(),
        },
    )))
}

/// Signs a redemption document releasing `items` under the bridge's token
/// authority inscription.
pub async fn sign_token_redemption(
    signer: &dyn RemoteSigner,
    key_id: &str,
    own_pubkey: &PublicKey,
    items: Vec<TokenRedemptionItem>,
    auth_inscription: &str,
) -> Result<SignOutcome, AuthorityError> {
    let redeem = RedeemBody {
        items,
        auth: auth_inscription.to_string(),
        data: String::new(),
    };
    let salt = fresh_salt();
    let raw = format!("{}{salt}", serde_json::to_string(&redeem)?);

    let Some((hash, sig)) = sign_payload(signer, key_id, own_pubkey, &raw).await? else {
        return Ok(SignOutcome::RecoveryExhausted);
    };
    let proto = RedemptionProto {
        p: "tap",
        op: "token-auth",
        redeem,
        sig,
        hash,
        salt,
    };
    Ok(SignOutcome::Signed(serde_json::to_string(&proto)?))
}

/// Signs the document that establishes the bridge as a token authority.
pub async fn sign_token_authority(
    signer: &dyn RemoteSigner,
    key_id: &str,
    own_pubkey: &PublicKey,
) -> Result<SignOutcome, AuthorityError> {
    let auth: Vec<String> = Vec::new();
    let salt = fresh_salt();
    let raw = format!("{}{salt}", serde_json::to_string(&auth)?);

    let Some((hash, sig)) = sign_payload(signer, key_id, own_pubkey, &raw).await? else {
        return Ok(SignOutcome::RecoveryExhausted);
    };
    let proto = TokenAuthorityProto {
        p: "tap",
        op: "token-auth",
        auth,
        sig,
        hash,
        salt,
    };
    Ok(SignOutcome::Signed(serde_json::to_string(&proto)?))
}

/// Signs the document that establishes the bridge as a privilege authority
/// under `name`.
pub async fn sign_privilege_authority(
    signer: &dyn RemoteSigner,
    key_id: &str,
    own_pubkey: &PublicKey,
    name: &str,
) -> Result<SignOutcome, AuthorityError> {
    let auth = PrivilegeAuthorityBody {
        name: name.to_string(),
    };
    let salt = fresh_salt();
    let raw = format!("{}{salt}", serde_json::to_string(&auth)?);

    let Some((hash, sig)) = sign_payload(signer, key_id, own_pubkey, &raw).await? else {
        return Ok(SignOutcome::RecoveryExhausted);
    };
    let proto = PrivilegeAuthorityProto {
        p: "tap",
        op: "privilege-auth",
        sig,
        hash,
        salt,
        auth,
    };
    Ok(SignOutcome::Signed(serde_json::to_string(&proto)?))
}

/// Signs a privilege verification for `verify_hash` at `collection` /
/// `sequence`, bound to `address`.
#[allow(clippy::too_many_arguments)]
pub async fn sign_privilege_verified(
    signer: &dyn RemoteSigner,
    key_id: &str,
    own_pubkey: &PublicKey,
    privilege_inscription: &str,
    verify_hash: &str,
    collection: &str,
    sequence: u64,
    address: &str,
) -> Result<SignOutcome, AuthorityError> {
    let salt = fresh_salt();
    let raw = format!(
        "{privilege_inscription}-{collection}-{verify_hash}-{sequence}-{address}-{salt}"
    );

    let Some((hash, sig)) = sign_payload(signer, key_id, own_pubkey, &raw).await? else {
        return Ok(SignOutcome::RecoveryExhausted);
    };
    let proto = PrivilegeVerifiedProto {
        p: "tap",
        op: "privilege-auth",
        sig,
        hash,
        address: address.to_string(),
        salt,
        prv: privilege_inscription.to_string(),
        verify: verify_hash.to_string(),
        col: collection.to_string(),
        seq: sequence,
    };
    Ok(SignOutcome::Signed(serde_json::to_string(&proto)?))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use secp256k1::{Message, SecretKey, SECP256K1};
    use tapbridge_btcio::SignerError;

    use super::*;

    struct LocalSigner {
        secret: SecretKey,
    }

    #[async_trait]
    impl RemoteSigner for LocalSigner {
        async fn sign_hash(
            &self,
            _key_id: &str,
            _derivation_path: &[Vec<u8>],
            hash: &[u8; 32],
        ) -> Result<[u8; 64], SignerError> {
            let message = Message::from_digest(*hash);
            Ok(SECP256K1
                .sign_ecdsa(&message, &self.secret)
                .serialize_compact())
        }

        async fn public_key(&self, _key_id: &str) -> Result<Vec<u8>, SignerError> {
            Ok(self.secret.public_key(SECP256K1).serialize().to_vec())
        }
    }

    fn signer() -> (LocalSigner, PublicKey) {
        let secret = SecretKey::from_slice(&[3u8; 32]).unwrap();
        let pubkey = secret.public_key(SECP256K1);
        (LocalSigner { secret }, pubkey)
    }

    fn items() -> Vec<TokenRedemptionItem> {
        vec![TokenRedemptionItem {
            tick: "brdg".to_string(),
            amt: "1.5".to_string(),
            address: "bcrt1q6u6qyya3sryhh42lahtnz2m7zuufe7dlt8j0j5".to_string(),
        }]
    }

    #[tokio::test]
    async fn redemption_hash_covers_body_and_salt() {
        let (signer, pubkey) = signer();
        let outcome = sign_token_redemption(&signer, "key_1", &pubkey, items(), "authi0")
            .await
            .unwrap();
        let doc = outcome.into_signed().unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&doc).unwrap();
        assert_eq!(parsed["p"], "tap");
        assert_eq!(parsed["op"], "token-auth");
        assert_eq!(parsed["redeem"]["auth"], "authi0");
        assert_eq!(parsed["redeem"]["items"][0]["amt"], "1.5");

        // the hash must cover exactly the redeem body plus the salt
        let body = RedeemBody {
            items: items(),
            auth: "authi0".to_string(),
            data: String::new(),
        };
        let raw = format!(
            "{}{}",
            serde_json::to_string(&body).unwrap(),
            parsed["salt"].as_str().unwrap()
        );
        let expected = hex::encode(Sha256::digest(raw.as_bytes()));
        assert_eq!(parsed["hash"], expected.as_str());

        // v is a raw recovery identifier, not an Ethereum-style v
        let v: u8 = parsed["sig"]["v"].as_str().unwrap().parse().unwrap();
        assert!(v <= 3);
    }

    #[tokio::test]
    async fn foreign_key_yields_recovery_exhausted() {
        let (signer, _) = signer();
        let other = SecretKey::from_slice(&[4u8; 32]).unwrap().public_key(SECP256K1);
        let outcome = sign_token_redemption(&signer, "key_1", &other, items(), "authi0")
            .await
            .unwrap();
        assert_eq!(outcome, SignOutcome::RecoveryExhausted);
    }

    #[tokio::test]
    async fn authority_documents_sign() {
        let (signer, pubkey) = signer();

        let doc = sign_token_authority(&signer, "key_1", &pubkey)
            .await
            .unwrap()
            .into_signed()
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&doc).unwrap();
        assert_eq!(parsed["auth"], serde_json::json!([]));

        let doc = sign_privilege_authority(&signer, "key_1", &pubkey, "Bridge Authority")
            .await
            .unwrap()
            .into_signed()
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&doc).unwrap();
        assert_eq!(parsed["op"], "privilege-auth");
        assert_eq!(parsed["auth"]["name"], "Bridge Authority");
    }

    #[tokio::test]
    async fn privilege_verification_binds_all_fields() {
        let (signer, pubkey) = signer();
        let doc = sign_privilege_verified(
            &signer,
            "key_1",
            &pubkey,
            "prvi0",
            "aa".repeat(32).as_str(),
            "col",
            9,
            "bcrt1q6u6qyya3sryhh42lahtnz2m7zuufe7dlt8j0j5",
        )
        .await
        .unwrap()
        .into_signed()
        .unwrap();

        let parsed: serde_json::Value = serde_json::from_str(&doc).unwrap();
        assert_eq!(parsed["seq"], 9);
        assert_eq!(parsed["col"], "col");

        let raw = format!(
            "{}-{}-{}-{}-{}-{}",
            parsed["prv"].as_str().unwrap(),
            parsed["col"].as_str().unwrap(),
            parsed["verify"].as_str().unwrap(),
            parsed["seq"],
            parsed["address"].as_str().unwrap(),
            parsed["salt"].as_str().unwrap(),
        );
        let expected = hex::encode(Sha256::digest(raw.as_bytes()));
        assert_eq!(parsed["hash"], expected.as_str());
    }
}
