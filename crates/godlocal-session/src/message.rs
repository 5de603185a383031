//! Transcript message records.

use chrono::{DateTime, Utc};

/// Opaque transcript entry id, unique within one transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub(crate) u64);

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Agent,
    /// Subordinate entry describing a backend tool invocation.
    ToolEvent,
    /// Client-injected notices and inline errors.
    System,
}

/// One transcript entry.
///
/// `content` is mutable while `streaming` is true; a settled message is
/// never edited again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    /// Sub-agent that produced the entry, lowercase. `None` for user,
    /// tool-event and system entries.
    pub author: Option<String>,
    pub content: String,
    pub streaming: bool,
    /// Backend model tag attached to fallback replies, display form.
    pub model: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn is_settled(&self) -> bool {
        !self.streaming
    }
}
