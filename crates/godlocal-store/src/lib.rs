//! Local persistence for GodLocal clients.
//!
//! Two small surfaces, both deliberately forgiving: a key/value
//! preference store (soul memory, API key, UI preferences) and an
//! append-only transcript archive. Reads never fail the caller: absent
//! or unreadable state degrades to defaults, and writes are
//! fire-and-forget with a `warn` on the way down.

pub mod archive;
pub mod paths;
pub mod prefs;

pub use archive::{ArchiveMode, ArchivedTurn, TranscriptArchive};
pub use paths::{ENV_DATA_DIR, data_dir};
pub use prefs::PreferenceStore;
