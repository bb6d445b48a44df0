use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Config(String),

    #[error("Hydration failed: {0}")]
    Hydration(String),

    #[error("Invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("Ingest queue closed")]
    QueueClosed,

    #[error("Malformed stored value in column '{column}': {value}")]
    MalformedRow { column: &'static str, value: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type MonitorResult<T> = Result<T, MonitorError>;
