//! Gateway transport for GodLocal sessions.
//!
//! One WebSocket to the backend per session, with a fixed-delay
//! reconnect timer, plus the one-shot HTTP fallback used whenever the
//! socket is down. [`SessionService`] ties both together behind a single
//! owned handle.

pub mod config;
pub mod error;
pub mod fallback;
pub mod gateway;
pub mod probe;
pub mod service;

pub use config::{DEFAULT_BASE_URL, GatewayConfig, WS_SESSION_PATH};
pub use error::{ClientError, Result};
pub use fallback::{FallbackClient, decode_think_response};
pub use gateway::{ConnectionState, GatewayConnection, GatewayEvent};
pub use probe::{GatewayHealth, GatewayStatus, HealthProbe};
pub use service::{SendRoute, SessionService, route_for};
