//! Conversation state for GodLocal clients.
//!
//! Owns the transcript reducer (decoded stream frames in, message records
//! out), attachment staging, the persona roster and session identity.
//! Everything here is synchronous and single-owner; the transport and the
//! renderer live elsewhere.

pub mod attachment;
pub mod identity;
pub mod message;
pub mod persona;
pub mod transcript;

pub use attachment::{Attachment, AttachmentList, ContentRef, format_size};
pub use identity::new_session_id;
pub use message::{Message, MessageId, Role};
pub use persona::{PERSONAS, Persona, default_persona, find_persona};
pub use transcript::{HISTORY_WINDOW, Transcript};
