//! Direct chat-completions client for sovereign mode.
//!
//! Talks straight to an OpenAI-compatible completions endpoint with the
//! user's own key. No gateway in the path: the prompt, the soul memory
//! and the key never leave the user's machine except toward the model
//! provider itself.

use crate::error::{Result, SovereignError};
use crate::prompt::system_prompt;
use godlocal_protocol::{HistoryRole, HistoryTurn};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_ENDPOINT: &str = "https://api.groq.com/openai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

const MAX_TOKENS: u32 = 2048;
const TEMPERATURE: f32 = 0.7;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Sovereign-mode chat client.
#[derive(Clone)]
pub struct SovereignClient {
    http: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

// Hand-written so the key can never reach a log line.
impl std::fmt::Debug for SovereignClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SovereignClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// A settled sovereign reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SovereignReply {
    pub text: String,
    /// Model identifier reported by the provider, or the requested one.
    pub model: String,
}

impl SovereignClient {
    /// Create a client for the default provider. An empty key is refused
    /// up front so the caller can surface the fix instead of a 401.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(SovereignError::MissingCredential);
        }
        Ok(Self {
            http: Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key,
            model: DEFAULT_MODEL.to_string(),
        })
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// One chat turn. `history` already ends with the user's latest
    /// prompt; `soul` is the persistent memory text, empty when unset.
    pub async fn chat(&self, history: &[HistoryTurn], soul: &str) -> Result<SovereignReply> {
        let request = build_request(&self.model, history, soul);
        debug!("sovereign chat with {} prior turns", history.len());

        let response = self
            .http
            .post(self.endpoint.as_str())
            .bearer_auth(&self.api_key)
            .timeout(REQUEST_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|error| {
                if error.is_timeout() {
                    SovereignError::Timeout(format!(
                        "sovereign request timeout after {REQUEST_TIMEOUT:?}"
                    ))
                } else {
                    SovereignError::Request(error.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(map_http_error(status, &body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|error| SovereignError::Decode(error.to_string()))?;
        extract_reply(parsed, &self.model)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn build_request(model: &str, history: &[HistoryTurn], soul: &str) -> ChatRequest {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage {
        role: "system".to_string(),
        content: system_prompt(soul),
    });
    for turn in history {
        let role = match turn.role {
            HistoryRole::User => "user",
            HistoryRole::Assistant => "assistant",
        };
        messages.push(ChatMessage {
            role: role.to_string(),
            content: turn.content.clone(),
        });
    }

    ChatRequest {
        model: model.to_string(),
        messages,
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
    }
}

fn map_http_error(status: StatusCode, body: &str) -> SovereignError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or_else(|_| format!("Groq {}", status.as_u16()));
    SovereignError::Http {
        status: status.as_u16(),
        message,
    }
}

fn extract_reply(response: ChatResponse, requested_model: &str) -> Result<SovereignReply> {
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(SovereignError::EmptyReply)?;

    Ok(SovereignReply {
        text,
        model: response
            .model
            .unwrap_or_else(|| requested_model.to_string()),
    })
}
