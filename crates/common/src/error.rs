use thiserror::Error;

#[derive(Debug, Error)]
pub enum OffgateError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("cache store error: {0}")]
    Store(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("lifecycle error: {0}")]
    Lifecycle(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type OffgateResult<T> = Result<T, OffgateError>;
