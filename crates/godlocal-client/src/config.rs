//! Gateway endpoint configuration.
//!
//! One base URL covers every backend surface: the WebSocket session
//! stream is derived from it by scheme swap, the HTTP fallback and the
//! health probes call it directly. All timeouts live here so the rest of
//! the crate never hard-codes a duration.

use crate::error::{ClientError, Result};
use std::time::Duration;
use url::Url;

/// Public production gateway.
pub const DEFAULT_BASE_URL: &str = "https://godlocal-api.onrender.com";

/// WebSocket session path; the session id rides in the `sid` query.
pub const WS_SESSION_PATH: &str = "/ws/oasis";

/// Gateway connection configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    /// WebSocket dial timeout.
    pub connect_timeout: Duration,
    /// Fixed delay before each reconnect attempt.
    pub reconnect_delay: Duration,
    /// One-shot fallback request timeout.
    pub request_timeout: Duration,
    /// Health probe timeout.
    pub probe_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            reconnect_delay: Duration::from_millis(4000),
            request_timeout: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(8),
        }
    }
}

impl GatewayConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// WebSocket session URL for a session id.
    pub fn ws_url(&self, session_id: &str) -> Result<Url> {
        let base = normalize_base_url(&self.base_url)?;
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else if base.starts_with("ws://") || base.starts_with("wss://") {
            base
        } else {
            return Err(ClientError::InvalidUrl(format!(
                "base URL must use http:// or https:// scheme, got: {base}"
            )));
        };
        Ok(Url::parse(&format!(
            "{ws_base}{WS_SESSION_PATH}?sid={session_id}"
        ))?)
    }
}

/// Trim and strip the trailing slash; an empty base URL is an error.
pub fn normalize_base_url(base_url: &str) -> Result<String> {
    let trimmed = base_url.trim();
    if trimmed.is_empty() {
        return Err(ClientError::InvalidUrl("base URL is empty".to_string()));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}
