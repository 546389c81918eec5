use thiserror::Error;

/// Errors from the persistent store.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),

    #[error("codec error for key {key}: {source}")]
    Codec {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("value under key {0} is not valid utf-8")]
    NotUtf8(String),
}

pub type DbResult<T> = Result<T, DbError>;
