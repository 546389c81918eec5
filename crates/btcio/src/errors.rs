use thiserror::Error;

/// Errors from the chain-data oracle or broadcast channel. These are
/// retryable: callers record a diagnostic and try again next tick.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("http: {0}")]
    Http(#[from] reqwest::Error),

    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),

    /// The oracle answered with an error sentinel instead of data.
    #[error("oracle: {0}")]
    Api(String),
}

/// Errors from assembling a spending transaction.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("insufficient balance: have {have}, need {amount} + fee {fee}")]
    InsufficientBalance { have: u64, amount: u64, fee: u64 },

    #[error("fee did not converge after {0} iterations")]
    FeeConvergence(usize),

    #[error("address {0} is not valid for the active network")]
    InvalidAddress(String),

    #[error("invalid public key: {0}")]
    InvalidPubkey(#[from] secp256k1::Error),

    /// Size measurement during fee convergence failed.
    #[error(transparent)]
    Signing(#[from] SignerError),
}

/// Errors from the remote signing oracle path. All of these are fatal for
/// the current attempt; nothing is broadcast on a partial signature set.
#[derive(Debug, Error)]
pub enum SignerError {
    #[error("signing oracle: {0}")]
    Oracle(String),

    #[error("oracle returned a malformed signature")]
    MalformedSignature,

    #[error("signing key is not a valid secp256k1 public key")]
    InvalidPubkey,

    #[error("signature for input {0} failed validation")]
    InvalidSignature(usize),

    #[error("sighash: {0}")]
    Sighash(String),
}
