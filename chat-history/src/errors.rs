use thiserror::Error;

pub type Result<T> = std::result::Result<T, HistoryError>;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history session id must not be empty")]
    EmptySession,

    #[error("invalid history connection string: {0}")]
    InvalidConnectionString(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("history record (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
