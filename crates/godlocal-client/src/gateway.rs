//! Gateway WebSocket connection management.
//!
//! One connection per session. The reader task turns wire frames into
//! [`GatewayEvent`]s on an unbounded channel; whenever the socket drops
//! for any reason other than [`GatewayConnection::shutdown`], a single
//! reconnect timer is armed and keeps retrying at a fixed delay until the
//! gateway answers again. Malformed frames are logged and dropped, they
//! never surface to the caller.

use crate::config::GatewayConfig;
use crate::error::{ClientError, Result};
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use godlocal_protocol::{AskEnvelope, StreamFrame, parse_frame};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsWriter = SplitSink<WsStream, Message>;
type WsReader = SplitStream<WsStream>;

/// Connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Event surfaced to the session loop.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    Connected,
    Disconnected,
    Frame(StreamFrame),
}

/// Gateway connection. Cheap to clone; all clones share one socket.
#[derive(Clone)]
pub struct GatewayConnection {
    url: Url,
    connect_timeout: Duration,
    reconnect_delay: Duration,
    state: Arc<RwLock<ConnectionState>>,
    writer: Arc<Mutex<Option<WsWriter>>>,
    event_tx: mpsc::UnboundedSender<GatewayEvent>,
    event_rx: Arc<Mutex<mpsc::UnboundedReceiver<GatewayEvent>>>,
    recv_task: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
    reconnect_task: Arc<Mutex<Option<tokio::task::JoinHandle<()>>>>,
    shutdown: Arc<AtomicBool>,
}

impl GatewayConnection {
    #[must_use]
    pub fn new(url: Url, config: &GatewayConfig) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            url,
            connect_timeout: config.connect_timeout,
            reconnect_delay: config.reconnect_delay,
            state: Arc::new(RwLock::new(ConnectionState::Disconnected)),
            writer: Arc::new(Mutex::new(None)),
            event_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
            recv_task: Arc::new(Mutex::new(None)),
            reconnect_task: Arc::new(Mutex::new(None)),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Session URL as string.
    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Current connection state.
    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Dial the gateway and start the background reader. A no-op when a
    /// connection is already open or a dial is in flight.
    pub async fn connect(&self) -> Result<()> {
        {
            let mut state_guard = self.state.write().await;
            match *state_guard {
                ConnectionState::Connected | ConnectionState::Connecting => return Ok(()),
                ConnectionState::Disconnected => *state_guard = ConnectionState::Connecting,
            }
        }
        self.shutdown.store(false, Ordering::SeqCst);

        match self.establish().await {
            Ok(()) => Ok(()),
            Err(error) => {
                *self.state.write().await = ConnectionState::Disconnected;
                Err(error)
            }
        }
    }

    /// Dial now; on failure arm the reconnect timer instead of giving up.
    /// Later drops re-arm themselves, so one call keeps the session live.
    pub async fn connect_with_retry(&self) {
        match self.connect().await {
            Ok(()) => {}
            Err(error) => {
                debug!("initial dial of {} failed: {error}", self.url);
                self.schedule_reconnect().await;
            }
        }
    }

    async fn establish(&self) -> Result<()> {
        let connect_result = timeout(self.connect_timeout, connect_async(self.url.as_str()))
            .await
            .map_err(|_| {
                ClientError::Timeout(format!(
                    "connection timeout after {:?}",
                    self.connect_timeout
                ))
            })?
            .map_err(|error| ClientError::WebSocket(error.to_string()))?;

        let (stream, _response) = connect_result;
        let (writer, reader) = stream.split();
        *self.writer.lock().await = Some(writer);
        *self.state.write().await = ConnectionState::Connected;
        info!("gateway stream open: {}", self.url);
        let _ = self.event_tx.send(GatewayEvent::Connected);

        let task = tokio::spawn(read_loop(self.clone(), reader));
        *self.recv_task.lock().await = Some(task);
        Ok(())
    }

    /// Send one ask envelope over the open socket.
    pub async fn send(&self, envelope: &AskEnvelope) -> Result<()> {
        if self.state().await != ConnectionState::Connected {
            return Err(ClientError::NotConnected);
        }
        let text = serde_json::to_string(envelope)?;
        self.send_text(text).await
    }

    async fn send_text(&self, text: String) -> Result<()> {
        let mut writer_guard = self.writer.lock().await;
        let writer = writer_guard.as_mut().ok_or(ClientError::NotConnected)?;
        writer
            .send(Message::Text(text.into()))
            .await
            .map_err(|error| ClientError::WebSocket(error.to_string()))
    }

    /// Receive the next gateway event. `None` once the connection has
    /// been torn down for good.
    pub async fn recv(&self) -> Option<GatewayEvent> {
        self.event_rx.lock().await.recv().await
    }

    /// Close the socket and stop background tasks, including any pending
    /// reconnect timer.
    pub async fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);

        if let Some(task) = self.reconnect_task.lock().await.take() {
            task.abort();
        }

        if let Some(mut writer) = self.writer.lock().await.take()
            && let Err(error) = writer.send(Message::Close(None)).await
        {
            debug!("close frame not delivered to {}: {error}", self.url);
        }

        if let Some(task) = self.recv_task.lock().await.take() {
            task.abort();
        }

        *self.state.write().await = ConnectionState::Disconnected;
    }

    /// Arm the reconnect timer, replacing any pending one. The timer
    /// keeps retrying at the configured delay until a dial succeeds.
    async fn schedule_reconnect(&self) {
        let connection = self.clone();
        let delay = self.reconnect_delay;

        let mut slot = self.reconnect_task.lock().await;
        if let Some(pending) = slot.take() {
            pending.abort();
        }
        *slot = Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(delay).await;
                if connection.shutdown.load(Ordering::SeqCst) {
                    break;
                }
                match connection.connect().await {
                    Ok(()) => break,
                    Err(error) => {
                        debug!("reconnect to {} failed: {error}", connection.url);
                    }
                }
            }
        }));
    }
}

async fn read_loop(connection: GatewayConnection, mut reader: WsReader) {
    let url = connection.url.to_string();

    while let Some(frame) = reader.next().await {
        match frame {
            Ok(Message::Text(text)) => match parse_frame(text.as_str()) {
                Ok(Some(frame)) => {
                    if connection
                        .event_tx
                        .send(GatewayEvent::Frame(frame))
                        .is_err()
                    {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("ignoring unrecognized frame from {url}");
                }
                Err(error) => {
                    // Malformed frames are dropped without disturbing the
                    // session.
                    warn!("dropping malformed frame from {url}: {error}");
                }
            },
            Ok(Message::Ping(payload)) => {
                debug!("received ping from {url} ({} bytes)", payload.len());
            }
            Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => break,
            Ok(Message::Binary(_)) => {}
            Ok(Message::Frame(_)) => {}
            Err(error) => {
                warn!("websocket read error on {url}: {error}");
                break;
            }
        }
    }

    info!("gateway stream closed: {url}");
    *connection.state.write().await = ConnectionState::Disconnected;
    connection.writer.lock().await.take();
    let _ = connection.event_tx.send(GatewayEvent::Disconnected);

    if !connection.shutdown.load(Ordering::SeqCst) {
        connection.schedule_reconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;

    fn test_connection() -> GatewayConnection {
        let config = GatewayConfig::new("https://gateway.test");
        let url = match config.ws_url("abc123xy") {
            Ok(url) => url,
            Err(error) => panic!("ws url failed: {error}"),
        };
        GatewayConnection::new(url, &config)
    }

    #[tokio::test]
    async fn starts_disconnected() {
        let gateway = test_connection();
        assert_eq!(gateway.state().await, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn send_before_connect_is_rejected() {
        let gateway = test_connection();
        let envelope = AskEnvelope::new("hello", "abc123xy");
        let result = gateway.send(&envelope).await;
        assert!(matches!(result, Err(ClientError::NotConnected)));
    }

    #[tokio::test]
    async fn shutdown_without_connection_is_a_noop() {
        let gateway = test_connection();
        gateway.shutdown().await;
        gateway.shutdown().await;
        assert_eq!(gateway.state().await, ConnectionState::Disconnected);
    }
}
