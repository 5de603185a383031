//! Inbound stream frame classification.
//!
//! The gateway pushes one JSON object per frame, discriminated by a `t`
//! field (`type` occurs in older deployments and is accepted as an alias).
//! Unknown discriminants parse to `None` so that newer backends can add
//! frame kinds without breaking older clients.

use crate::error::{ProtocolError, Result};
use serde_json::{Map, Value};

/// Author name assumed when a frame does not carry one.
pub const PRIMARY_AGENT: &str = "godlocal";

/// A decoded frame pushed by the gateway over the streaming session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamFrame {
    /// Incremental fragment of the reply currently being generated.
    Token { text: String },
    /// A named sub-agent opened a streamed turn of its own.
    AgentStart { agent: String },
    /// Complete, non-incremental reply from a named sub-agent.
    AgentReply { agent: String, text: String },
    /// A backend capability was invoked on the user's behalf.
    Tool { name: String, query: String },
    /// Completion marker: everything currently streaming is finished.
    Done,
    /// Backend-reported failure; the stream itself stays usable.
    Error { message: String },
}

/// Parse one inbound gateway frame into a typed stream frame.
///
/// Returns `Ok(None)` for frames with an unknown or absent discriminant.
/// Malformed frames (non-object payloads, wrongly typed fields) are
/// errors; the transport drops them per frame without closing the stream.
pub fn parse_frame(text: &str) -> Result<Option<StreamFrame>> {
    let value: Value = serde_json::from_str(text)?;
    let object = value
        .as_object()
        .ok_or_else(|| ProtocolError::Frame("expected JSON object frame".to_string()))?;

    let Some(kind_value) = object.get("t").or_else(|| object.get("type")) else {
        return Ok(None);
    };
    let kind = kind_value
        .as_str()
        .ok_or_else(|| ProtocolError::Frame("invalid frame discriminant".to_string()))?;

    match kind {
        "token" => Ok(Some(StreamFrame::Token {
            text: optional_text(object, "v", "invalid token fragment")?,
        })),
        "agent_start" | "arch_start" => Ok(Some(StreamFrame::AgentStart {
            agent: agent_name(object)?,
        })),
        "agent_reply" | "arch_reply" => {
            // `v` carries the reply in current backends, `reply` in older
            // ones; an empty `v` defers to `reply`.
            let mut text = optional_text(object, "v", "invalid agent reply text")?;
            if text.is_empty() {
                text = optional_text(object, "reply", "invalid agent reply text")?;
            }
            Ok(Some(StreamFrame::AgentReply {
                agent: agent_name(object)?,
                text,
            }))
        }
        "tool" => {
            let name = object
                .get("n")
                .ok_or_else(|| ProtocolError::Frame("missing tool name".to_string()))?
                .as_str()
                .ok_or_else(|| ProtocolError::Frame("invalid tool name".to_string()))?
                .to_string();
            Ok(Some(StreamFrame::Tool {
                name,
                query: coerced_text(object.get("q")),
            }))
        }
        "done" | "session_done" => Ok(Some(StreamFrame::Done)),
        "error" => {
            let message = optional_text(object, "v", "invalid error text")?;
            Ok(Some(StreamFrame::Error {
                message: if message.is_empty() {
                    "error".to_string()
                } else {
                    message
                },
            }))
        }
        _ => Ok(None),
    }
}

/// Sub-agent name, lowercased; absent names fall back to the primary agent.
fn agent_name(object: &Map<String, Value>) -> Result<String> {
    match object.get("agent") {
        None | Some(Value::Null) => Ok(PRIMARY_AGENT.to_string()),
        Some(Value::String(name)) if name.trim().is_empty() => Ok(PRIMARY_AGENT.to_string()),
        Some(Value::String(name)) => Ok(name.trim().to_lowercase()),
        Some(_) => Err(ProtocolError::Frame("invalid agent name".to_string())),
    }
}

/// A string field that may be absent (treated as empty) but, when present,
/// must actually be a string.
fn optional_text(object: &Map<String, Value>, key: &str, context: &str) -> Result<String> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) => Err(ProtocolError::Frame(context.to_string())),
    }
}

/// Stringify loosely typed scalar payloads the way the web client did.
fn coerced_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
