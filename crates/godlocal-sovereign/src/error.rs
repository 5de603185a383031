//! Sovereign-mode error types.

use thiserror::Error;

/// Sovereign-mode error type.
#[derive(Debug, Error)]
pub enum SovereignError {
    #[error("no API key configured; set one with /key before enabling sovereign mode")]
    MissingCredential,

    #[error("request failed: {0}")]
    Request(String),

    #[error("timeout error: {0}")]
    Timeout(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("decode error: {0}")]
    Decode(String),

    #[error("model returned no reply text")]
    EmptyReply,
}

/// Sovereign-mode result type.
pub type Result<T> = std::result::Result<T, SovereignError>;
