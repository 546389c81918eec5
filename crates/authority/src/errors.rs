use tapbridge_btcio::SignerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error(transparent)]
    Signer(#[from] SignerError),

    /// No recovery identifier reproduced the bridge's own key. The oracle
    /// signed with a different key than expected.
    #[error("no recovery identifier matched the bridge key")]
    RecoveryExhausted,

    #[error("document encode: {0}")]
    Encode(#[from] serde_json::Error),
}
