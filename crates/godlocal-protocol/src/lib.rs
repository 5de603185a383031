//! Wire protocol for the GodLocal agent gateway.
//!
//! This crate intentionally exposes a small surface:
//! - inbound stream frame classification (token / agent reply / tool / done / error)
//! - the outbound ask envelope sent over the streaming session
//! - the non-streaming fallback request and reply shapes

pub mod envelope;
pub mod error;
pub mod frame;
pub mod tool;

pub use envelope::{
    AskEnvelope, FallbackReply, FallbackRequest, HistoryRole, HistoryTurn, ToolStep, decode_reply,
    short_model,
};
pub use error::{ProtocolError, Result};
pub use frame::{StreamFrame, parse_frame};
pub use tool::{TOOL_QUERY_MAX, tool_label, tool_summary};
