//! Protocol error types.

use thiserror::Error;

/// Protocol error type.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("frame error: {0}")]
    Frame(String),

    #[error("reply error: {0}")]
    Reply(String),
}

/// Protocol result type.
pub type Result<T> = std::result::Result<T, ProtocolError>;
