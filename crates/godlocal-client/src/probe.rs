//! Backend reachability probes.
//!
//! Fire-and-forget GETs against `/health` and `/status`. Probes decorate
//! the header line of the UI, so every failure collapses to `None`
//! rather than an error the session would have to handle.

use crate::config::{GatewayConfig, normalize_base_url};
use crate::error::Result;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// `/health` answer, loosely typed. Fields the gateway stops sending
/// simply come back empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayHealth {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// `/status` answer. Only the kill switch matters to the client.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayStatus {
    #[serde(default)]
    pub kill_switch: bool,
}

/// Health probe client.
#[derive(Debug, Clone)]
pub struct HealthProbe {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

impl HealthProbe {
    pub fn new(config: &GatewayConfig) -> Result<Self> {
        Ok(Self {
            base_url: normalize_base_url(&config.base_url)?,
            timeout: config.probe_timeout,
            http: reqwest::Client::new(),
        })
    }

    #[must_use]
    pub fn health_path() -> &'static str {
        "/health"
    }

    #[must_use]
    pub fn status_path() -> &'static str {
        "/status"
    }

    pub async fn health(&self) -> Option<GatewayHealth> {
        self.fetch(Self::health_path()).await
    }

    pub async fn status(&self) -> Option<GatewayStatus> {
        self.fetch(Self::status_path()).await
    }

    async fn fetch<T>(&self, path: &str) -> Option<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.base_url, path);
        let response = match self.http.get(url.as_str()).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(error) => {
                debug!("probe {path} failed: {error}");
                return None;
            }
        };
        if !response.status().is_success() {
            debug!("probe {path} answered {}", response.status());
            return None;
        }
        match response.json::<T>().await {
            Ok(value) => Some(value),
            Err(error) => {
                debug!("probe {path} body unreadable: {error}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    #[test]
    fn paths_are_deterministic() {
        assert_eq!(HealthProbe::health_path(), "/health");
        assert_eq!(HealthProbe::status_path(), "/status");
    }

    #[test]
    fn empty_base_url_is_rejected() {
        let result = HealthProbe::new(&GatewayConfig::new(""));
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }

    #[test]
    fn health_answer_tolerates_extra_fields() {
        let raw = r#"{"status":"ok","version":"9.0.0","models":{"fast":"x"},"ts":"now"}"#;
        let health: GatewayHealth = match serde_json::from_str(raw) {
            Ok(health) => health,
            Err(error) => panic!("health decode: {error}"),
        };
        assert_eq!(health.status.as_deref(), Some("ok"));
        assert_eq!(health.version.as_deref(), Some("9.0.0"));
    }

    #[test]
    fn status_answer_defaults_the_kill_switch() {
        let status: GatewayStatus = match serde_json::from_str(r#"{"sparks":[]}"#) {
            Ok(status) => status,
            Err(error) => panic!("status decode: {error}"),
        };
        assert!(!status.kill_switch);
    }
}
