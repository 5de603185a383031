//! Transcript state machine.
//!
//! One transcript per conversation, owned by a single task and mutated
//! only through these methods. Decoded stream frames are applied in
//! delivery order; fallback replies fold in through [`Transcript::fold_reply`].

use crate::message::{Message, MessageId, Role};
use chrono::Utc;
use godlocal_protocol::frame::PRIMARY_AGENT;
use godlocal_protocol::{FallbackReply, HistoryRole, HistoryTurn, StreamFrame};
use godlocal_protocol::{short_model, tool_summary};

/// Prior turns carried to the fallback endpoint.
pub const HISTORY_WINDOW: usize = 6;

/// In-memory conversation transcript.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Message>,
    next_id: u64,
    revision: u64,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[Message] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bumped on every mutation; renderers compare it to skip redraws.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// True while any entry is still receiving fragments.
    pub fn is_streaming(&self) -> bool {
        self.entries.iter().any(|message| message.streaming)
    }

    /// Append a settled user turn.
    pub fn push_user(&mut self, content: impl Into<String>) -> MessageId {
        self.push(Role::User, None, content.into(), false)
    }

    /// Append a settled client-side notice (restored history, mode switches).
    pub fn push_system(&mut self, content: impl Into<String>) -> MessageId {
        self.push(Role::System, None, content.into(), false)
    }

    /// Append a settled agent turn that arrived whole (sovereign mode,
    /// restored archive entries).
    pub fn push_agent(
        &mut self,
        author: impl Into<String>,
        content: impl Into<String>,
    ) -> MessageId {
        self.push(Role::Agent, Some(author.into()), content.into(), false)
    }

    /// Apply one decoded stream frame.
    pub fn apply(&mut self, frame: &StreamFrame) {
        match frame {
            StreamFrame::Token { text } => self.append_fragment(text),
            StreamFrame::AgentStart { agent } => {
                // A new turn opens: whatever was streaming is done.
                self.settle_all();
                self.push(Role::Agent, Some(agent.clone()), String::new(), true);
            }
            StreamFrame::AgentReply { agent, text } => {
                self.push(Role::Agent, Some(agent.clone()), text.clone(), false);
            }
            StreamFrame::Tool { name, query } => {
                self.push(Role::ToolEvent, None, tool_summary(name, query), false);
            }
            StreamFrame::Done => self.settle_all(),
            StreamFrame::Error { message } => {
                self.push(Role::System, None, format!("❌ {message}"), false);
            }
        }
    }

    /// Fold a successful fallback reply into the transcript: tool steps as
    /// subordinate entries, then exactly one settled agent message.
    pub fn fold_reply(&mut self, reply: &FallbackReply) -> MessageId {
        for step in &reply.steps {
            self.push(
                Role::ToolEvent,
                None,
                tool_summary(&step.tool, &step.result),
                false,
            );
        }
        let id = self.push(
            Role::Agent,
            Some(PRIMARY_AGENT.to_string()),
            reply.text.clone(),
            false,
        );
        if let Some(model) = &reply.model
            && let Some(message) = self.entries.last_mut()
        {
            message.model = Some(short_model(model));
        }
        id
    }

    /// Fold a failed fallback attempt: exactly one settled error entry.
    pub fn fold_reply_error(&mut self, reason: &str) -> MessageId {
        self.push(Role::System, None, format!("⚠️ {reason}"), false)
    }

    /// Settle every streaming entry. Idempotent.
    pub fn settle_all(&mut self) {
        let mut changed = false;
        for message in &mut self.entries {
            if message.streaming {
                message.streaming = false;
                changed = true;
            }
        }
        if changed {
            self.revision += 1;
        }
    }

    /// The most recent settled user/agent turns, oldest first, mapped to
    /// fallback history roles. Tool events, system notices and
    /// still-streaming entries are not part of the conversation proper.
    pub fn recent_history(&self) -> Vec<HistoryTurn> {
        let mut turns: Vec<HistoryTurn> = self
            .entries
            .iter()
            .rev()
            .filter(|message| message.is_settled())
            .filter_map(|message| match message.role {
                Role::User => Some(HistoryTurn::new(HistoryRole::User, message.content.clone())),
                Role::Agent => Some(HistoryTurn::new(
                    HistoryRole::Assistant,
                    message.content.clone(),
                )),
                Role::ToolEvent | Role::System => None,
            })
            .take(HISTORY_WINDOW)
            .collect();
        turns.reverse();
        turns
    }

    fn append_fragment(&mut self, text: &str) {
        if let Some(last) = self.entries.last_mut()
            && last.streaming
            && last.role == Role::Agent
        {
            last.content.push_str(text);
            self.revision += 1;
            return;
        }
        // No open bubble to extend; anything streaming further up is
        // stale and settles before a fresh bubble opens.
        self.settle_all();
        self.push(
            Role::Agent,
            Some(PRIMARY_AGENT.to_string()),
            text.to_string(),
            true,
        );
    }

    fn push(&mut self, role: Role, author: Option<String>, content: String, streaming: bool) -> MessageId {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        self.entries.push(Message {
            id,
            role,
            author,
            content,
            streaming,
            model: None,
            timestamp: Utc::now(),
        });
        self.revision += 1;
        id
    }
}
