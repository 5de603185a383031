//! Sovereign mode: chat without the gateway.
//!
//! When the user flips to sovereign mode, prompts go directly from their
//! machine to a model provider using their own API key, with the local
//! soul memory folded into the system prompt.

pub mod client;
pub mod error;
pub mod prompt;

pub use client::{DEFAULT_ENDPOINT, DEFAULT_MODEL, SovereignClient, SovereignReply};
pub use error::{Result, SovereignError};
pub use prompt::system_prompt;
