//! One-shot HTTP fallback.
//!
//! When the socket is down, a prompt goes to `POST /think` instead: one
//! attempt, one timeout, no retries. The gateway answers with reply text
//! under `response` (older deployments use `message` or `text`), and can
//! do so even on a non-2xx status, so the body is decoded first and the
//! HTTP status only matters when the body carries nothing usable.

use crate::config::{GatewayConfig, normalize_base_url};
use crate::error::{ClientError, Result};
use godlocal_protocol::{FallbackReply, FallbackRequest, decode_reply};
use reqwest::StatusCode;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

/// One-shot `/think` client.
#[derive(Debug, Clone)]
pub struct FallbackClient {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl FallbackClient {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(&config.base_url)?,
            timeout: config.request_timeout,
            http: reqwest::Client::new(),
        })
    }

    #[must_use]
    pub fn think_path() -> &'static str {
        "/think"
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    /// Ask the gateway once over HTTP. Never retries; the caller decides
    /// what a failure means for the session.
    pub async fn ask(&self, request: &FallbackRequest) -> Result<FallbackReply> {
        let url = self
            .endpoint(Self::think_path())
            .ok_or_else(|| ClientError::InvalidUrl("empty request path".to_string()))?;
        debug!("fallback ask via {url}");

        let response = self
            .http
            .post(url.as_str())
            .header("x-request-id", format!("req_{}", Uuid::new_v4().simple()))
            .timeout(self.timeout)
            .json(request)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    ClientError::Timeout(format!("fallback request timeout after {:?}", self.timeout))
                } else {
                    ClientError::Request(error.to_string())
                }
            })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|error| ClientError::Request(error.to_string()))?;
        decode_think_response(status, &bytes)
    }
}

/// Decode a `/think` response body. Reply text in the body wins even on
/// an error status; the status is only reported when the body is unusable.
pub fn decode_think_response(status: StatusCode, bytes: &[u8]) -> Result<FallbackReply> {
    let value: serde_json::Value = match serde_json::from_slice(bytes) {
        Ok(value) => value,
        Err(error) => {
            if status.is_success() {
                return Err(ClientError::Decode(error.to_string()));
            }
            return Err(http_error(status, bytes));
        }
    };

    match decode_reply(&value) {
        Ok(reply) => Ok(reply),
        Err(error) => {
            if status.is_success() {
                Err(ClientError::Protocol(error))
            } else {
                Err(http_error(status, bytes))
            }
        }
    }
}

fn http_error(status: StatusCode, body: &[u8]) -> ClientError {
    let body = String::from_utf8_lossy(body);
    let trimmed = body.trim();
    let body = if trimmed.is_empty() {
        "<empty>".to_string()
    } else {
        trimmed.to_string()
    };
    ClientError::Http { status, body }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> FallbackClient {
        match FallbackClient::new(&GatewayConfig::new("https://godlocal-api.onrender.com/")) {
            Ok(client) => client,
            Err(error) => panic!("fallback client: {error}"),
        }
    }

    #[test]
    fn endpoint_builder_normalizes_paths() {
        let client = test_client();
        assert_eq!(
            client.endpoint("/think"),
            Some("https://godlocal-api.onrender.com/think".to_string())
        );
        assert_eq!(
            client.endpoint("think"),
            Some("https://godlocal-api.onrender.com/think".to_string())
        );
        assert_eq!(client.endpoint(""), None);
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let result = FallbackClient::new(&GatewayConfig::new("   "));
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }

    #[test]
    fn reply_text_is_decoded_from_a_success_body() -> Result<()> {
        let reply = decode_think_response(StatusCode::OK, br#"{"response":"hi there"}"#)?;
        assert_eq!(reply.text, "hi there");
        Ok(())
    }

    #[test]
    fn reply_text_wins_over_an_error_status() -> Result<()> {
        let body = br#"{"error":"upstream","response":"⚠️ Backend unavailable: upstream"}"#;
        let reply = decode_think_response(StatusCode::SERVICE_UNAVAILABLE, body)?;
        assert_eq!(reply.text, "⚠️ Backend unavailable: upstream");
        Ok(())
    }

    #[test]
    fn unusable_error_bodies_surface_the_status() {
        let result = decode_think_response(StatusCode::BAD_GATEWAY, b"gateway exploded");
        match result {
            Err(ClientError::Http { status, body }) => {
                assert_eq!(status, StatusCode::BAD_GATEWAY);
                assert_eq!(body, "gateway exploded");
            }
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }

    #[test]
    fn non_json_success_bodies_are_a_decode_error() {
        let result = decode_think_response(StatusCode::OK, b"plain text");
        assert!(matches!(result, Err(ClientError::Decode(_))));
    }

    #[test]
    fn success_body_without_text_is_a_protocol_error() {
        let result = decode_think_response(StatusCode::OK, br#"{"steps":[]}"#);
        assert!(matches!(result, Err(ClientError::Protocol(_))));
    }
}
