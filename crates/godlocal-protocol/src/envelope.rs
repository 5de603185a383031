//! Outbound payloads and the non-streaming fallback shapes.
//!
//! The gateway's reply bodies are not strictly typed from the client's
//! point of view: deployed backends disagree on which field carries the
//! reply text. Decoding therefore probes `response`, `message` and `text`
//! in that order instead of deserializing a fixed struct.

use crate::error::{ProtocolError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Payload sent over the streaming session for one user turn.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AskEnvelope {
    pub prompt: String,
    pub session_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
}

impl AskEnvelope {
    pub fn new(prompt: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            session_id: session_id.into(),
            agent: None,
            files: None,
        }
    }

    #[must_use]
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = Some(agent.into());
        self
    }

    #[must_use]
    pub fn with_files(mut self, files: Vec<String>) -> Self {
        if !files.is_empty() {
            self.files = Some(files);
        }
        self
    }
}

/// Role of one prior turn carried to the fallback endpoint.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HistoryRole {
    User,
    Assistant,
}

/// One prior conversation turn in a fallback request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryTurn {
    pub role: HistoryRole,
    pub content: String,
}

impl HistoryTurn {
    pub fn new(role: HistoryRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Body of the one-shot HTTP ask used when the stream is down.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FallbackRequest {
    pub prompt: String,
    pub history: Vec<HistoryTurn>,
}

/// A tool invocation reported alongside a fallback reply.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolStep {
    pub tool: String,
    pub result: String,
}

/// Decoded fallback reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackReply {
    pub text: String,
    pub steps: Vec<ToolStep>,
    pub model: Option<String>,
}

/// Decode a fallback reply body.
///
/// Reply text is taken from `response`, then `message`, then `text`;
/// first non-empty wins. A body with none of those but a non-empty
/// `error` field is a backend-reported failure; a body with neither is
/// unusable.
pub fn decode_reply(body: &Value) -> Result<FallbackReply> {
    let object = body
        .as_object()
        .ok_or_else(|| ProtocolError::Reply("expected JSON object reply".to_string()))?;

    let text = ["response", "message", "text"]
        .iter()
        .find_map(|key| non_empty_string(object.get(key)));

    let Some(text) = text else {
        if let Some(error) = non_empty_string(object.get("error")) {
            return Err(ProtocolError::Reply(error));
        }
        return Err(ProtocolError::Reply(
            "reply carried no usable text field".to_string(),
        ));
    };

    let steps = object
        .get("steps")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| {
                    let step = entry.as_object()?;
                    let tool = step.get("tool")?.as_str()?.to_string();
                    let result = match step.get("result") {
                        None | Some(Value::Null) => String::new(),
                        Some(Value::String(text)) => text.clone(),
                        Some(other) => other.to_string(),
                    };
                    Some(ToolStep { tool, result })
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(FallbackReply {
        text,
        steps,
        model: non_empty_string(object.get("model")),
    })
}

/// Display form of a backend model identifier: the first three
/// dash-separated segments (`llama-3.1-8b-instant` renders `llama-3.1-8b`).
pub fn short_model(model: &str) -> String {
    model.splitn(4, '-').take(3).collect::<Vec<_>>().join("-")
}

fn non_empty_string(value: Option<&Value>) -> Option<String> {
    let text = value?.as_str()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ask_envelope_skips_absent_fields() {
        let envelope = AskEnvelope::new("hello", "ab12cd34");
        let encoded = serde_json::to_value(&envelope).map_err(ProtocolError::from);
        assert_eq!(
            encoded.ok(),
            Some(json!({"prompt": "hello", "session_id": "ab12cd34"}))
        );
    }

    #[test]
    fn ask_envelope_carries_agent_and_files() {
        let envelope = AskEnvelope::new("ship it", "ab12cd34")
            .with_agent("builder")
            .with_files(vec!["notes.txt".to_string()]);
        let encoded = serde_json::to_value(&envelope).map_err(ProtocolError::from);
        assert_eq!(
            encoded.ok(),
            Some(json!({
                "prompt": "ship it",
                "session_id": "ab12cd34",
                "agent": "builder",
                "files": ["notes.txt"],
            }))
        );
    }

    #[test]
    fn empty_file_list_is_not_serialized() {
        let envelope = AskEnvelope::new("hello", "ab12cd34").with_files(vec![]);
        assert_eq!(envelope.files, None);
    }

    #[test]
    fn fallback_request_wire_shape() {
        let request = FallbackRequest {
            prompt: "hello".to_string(),
            history: vec![],
        };
        let encoded = serde_json::to_value(&request).map_err(ProtocolError::from);
        assert_eq!(
            encoded.ok(),
            Some(json!({"prompt": "hello", "history": []}))
        );
    }

    #[test]
    fn history_roles_serialize_lowercase() {
        let history = vec![
            HistoryTurn::new(HistoryRole::User, "hi"),
            HistoryTurn::new(HistoryRole::Assistant, "hello"),
        ];
        let encoded = serde_json::to_value(&history).map_err(ProtocolError::from);
        assert_eq!(
            encoded.ok(),
            Some(json!([
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"},
            ]))
        );
    }

    #[test]
    fn reply_text_prefers_response_then_message_then_text() {
        struct Case {
            name: &'static str,
            body: Value,
            expected: &'static str,
        }

        let cases = vec![
            Case {
                name: "response wins",
                body: json!({"response": "one", "message": "two", "text": "three"}),
                expected: "one",
            },
            Case {
                name: "message when response absent",
                body: json!({"message": "two", "text": "three"}),
                expected: "two",
            },
            Case {
                name: "text as last resort",
                body: json!({"text": "three"}),
                expected: "three",
            },
            Case {
                name: "empty response defers to message",
                body: json!({"response": "  ", "message": "two"}),
                expected: "two",
            },
        ];

        for case in cases {
            let reply = decode_reply(&case.body);
            assert_eq!(
                reply.map(|reply| reply.text).ok(),
                Some(case.expected.to_string()),
                "{}",
                case.name
            );
        }
    }

    #[test]
    fn reply_error_field_is_a_failure() {
        let result = decode_reply(&json!({"error": "backend asleep"}));
        assert!(matches!(result, Err(ProtocolError::Reply(ref m)) if m == "backend asleep"));

        let empty = decode_reply(&json!({"status": "ok"}));
        assert!(
            matches!(empty, Err(ProtocolError::Reply(ref m)) if m.contains("no usable text field"))
        );

        let non_object = decode_reply(&json!(["response"]));
        assert!(
            matches!(non_object, Err(ProtocolError::Reply(ref m)) if m.contains("expected JSON object"))
        );
    }

    #[test]
    fn reply_steps_are_probed_loosely() {
        let body = json!({
            "response": "done",
            "steps": [
                {"tool": "web_search", "result": "3 hits"},
                {"tool": "get_market_data", "result": {"btc": 64000}},
                {"tool": "remember"},
                {"no_tool_key": true},
                "not an object",
            ],
            "model": "llama-3.1-8b-instant",
        });

        let reply = decode_reply(&body).ok();
        let Some(reply) = reply else {
            panic!("expected decoded reply");
        };
        assert_eq!(reply.steps.len(), 3);
        assert_eq!(reply.steps[0].tool, "web_search");
        assert_eq!(reply.steps[0].result, "3 hits");
        assert_eq!(reply.steps[1].result, r#"{"btc":64000}"#);
        assert_eq!(reply.steps[2].result, "");
        assert_eq!(reply.model, Some("llama-3.1-8b-instant".to_string()));
    }

    #[test]
    fn model_is_shortened_for_display() {
        assert_eq!(short_model("llama-3.1-8b-instant"), "llama-3.1-8b");
        assert_eq!(short_model("gpt-4o"), "gpt-4o");
        assert_eq!(short_model("claude"), "claude");
    }
}
