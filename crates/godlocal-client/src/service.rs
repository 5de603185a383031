//! Owned session transport.
//!
//! [`SessionService`] bundles the socket, the HTTP fallback and the
//! probes behind one handle. It is constructed, owned and dropped by the
//! caller; there are no globals, so two sessions in one process stay
//! fully independent.

use crate::config::GatewayConfig;
use crate::error::Result;
use crate::fallback::FallbackClient;
use crate::gateway::{ConnectionState, GatewayConnection, GatewayEvent};
use crate::probe::{GatewayHealth, GatewayStatus, HealthProbe};
use godlocal_protocol::{AskEnvelope, FallbackReply, FallbackRequest};
use tracing::warn;

/// Where a prompt goes, decided by the socket state at send time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRoute {
    Stream,
    Fallback,
}

/// Only an open socket streams; connecting counts as down.
#[must_use]
pub fn route_for(state: ConnectionState) -> SendRoute {
    match state {
        ConnectionState::Connected => SendRoute::Stream,
        ConnectionState::Connecting | ConnectionState::Disconnected => SendRoute::Fallback,
    }
}

/// One backend, one socket, one fallback channel.
#[derive(Clone)]
pub struct SessionService {
    session_id: String,
    config: GatewayConfig,
    gateway: GatewayConnection,
    fallback: FallbackClient,
    probe: HealthProbe,
}

impl SessionService {
    pub fn new(session_id: impl Into<String>, config: GatewayConfig) -> Result<Self> {
        let session_id = session_id.into();
        let gateway = GatewayConnection::new(config.ws_url(&session_id)?, &config);
        let fallback = FallbackClient::new(&config)?;
        let probe = HealthProbe::new(&config)?;
        Ok(Self {
            session_id,
            config,
            gateway,
            fallback,
            probe,
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Dial the gateway; failures arm the reconnect timer, so the
    /// session loop never has to retry by hand.
    pub async fn connect(&self) {
        self.gateway.connect_with_retry().await;
    }

    pub async fn state(&self) -> ConnectionState {
        self.gateway.state().await
    }

    /// Next gateway event for the session loop.
    pub async fn recv_event(&self) -> Option<GatewayEvent> {
        self.gateway.recv().await
    }

    pub async fn shutdown(&self) {
        self.gateway.shutdown().await;
    }

    /// Send a prompt by whichever route the socket state allows right
    /// now. Returns the route actually taken: [`SendRoute::Stream`] means
    /// the envelope is on the wire and the reply will arrive as frames;
    /// [`SendRoute::Fallback`] means the caller still owes the prompt to
    /// [`Self::ask_fallback`].
    pub async fn dispatch(&self, envelope: &AskEnvelope) -> SendRoute {
        match route_for(self.gateway.state().await) {
            SendRoute::Stream => match self.gateway.send(envelope).await {
                Ok(()) => SendRoute::Stream,
                Err(error) => {
                    warn!("stream send failed, routing to fallback: {error}");
                    SendRoute::Fallback
                }
            },
            SendRoute::Fallback => {
                // Nudge the socket back up for next time; this prompt
                // still goes over HTTP.
                let gateway = self.gateway.clone();
                tokio::spawn(async move {
                    gateway.connect_with_retry().await;
                });
                SendRoute::Fallback
            }
        }
    }

    /// One-shot HTTP ask; see [`FallbackClient::ask`].
    pub async fn ask_fallback(&self, request: &FallbackRequest) -> Result<FallbackReply> {
        self.fallback.ask(request).await
    }

    pub async fn health(&self) -> Option<GatewayHealth> {
        self.probe.health().await
    }

    pub async fn status(&self) -> Option<GatewayStatus> {
        self.probe.status().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;

    #[test]
    fn only_an_open_socket_streams() {
        assert_eq!(route_for(ConnectionState::Connected), SendRoute::Stream);
        assert_eq!(route_for(ConnectionState::Connecting), SendRoute::Fallback);
        assert_eq!(route_for(ConnectionState::Disconnected), SendRoute::Fallback);
    }

    #[test]
    fn construction_rejects_an_empty_base_url() {
        let result = SessionService::new("abc123xy", GatewayConfig::new("  "));
        assert!(matches!(result, Err(ClientError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn dispatch_before_connect_takes_the_fallback_route() {
        let service = match SessionService::new("abc123xy", GatewayConfig::new("https://gateway.test"))
        {
            Ok(service) => service,
            Err(error) => panic!("service: {error}"),
        };
        let envelope = AskEnvelope::new("hello", service.session_id());
        assert_eq!(service.dispatch(&envelope).await, SendRoute::Fallback);
    }

    #[test]
    fn session_id_is_preserved() {
        let service = match SessionService::new("abc123xy", GatewayConfig::default()) {
            Ok(service) => service,
            Err(error) => panic!("service: {error}"),
        };
        assert_eq!(service.session_id(), "abc123xy");
    }
}
