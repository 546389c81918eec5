use tapbridge_authority::AuthorityError;
use tapbridge_btcio::{BuildError, OracleError, SignerError};
use tapbridge_db::DbError;
use thiserror::Error;

/// Errors surfaced by the bridge workers and the operator surface. Worker
/// loops never propagate these out; they record a diagnostic and retry on
/// the next tick.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error(transparent)]
    Authority(#[from] AuthorityError),

    /// The redemption document for a mint settlement failed recovery. The
    /// settlement is aborted; nothing was broadcast.
    #[error("redemption document for log entry {0} failed recovery")]
    RedemptionFailed(u64),

    /// A settlement would need more inputs than one transaction may carry.
    #[error("log entry {index} needs {inputs} inputs, over the per-entry cap")]
    TooManyInputs { index: u64, inputs: usize },
}
