//! Append-only transcript archive.
//!
//! Settled turns are appended to `{data_dir}/transcript.jsonl`, one JSON
//! object per line. Reads are forgiving: lines that fail to parse are
//! skipped with a warning so one bad write never poisons the history.

use anyhow::{Context, Result};
use godlocal_protocol::{HistoryRole, ToolStep};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

const ARCHIVE_FILE: &str = "transcript.jsonl";

/// Which backend produced an archived reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveMode {
    Server,
    Sovereign,
}

/// One settled transcript entry on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedTurn {
    pub role: HistoryRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<ToolStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub mode: ArchiveMode,
    /// Unix timestamp in milliseconds.
    pub ts: i64,
}

/// Append-only JSONL archive of settled turns.
#[derive(Debug)]
pub struct TranscriptArchive {
    path: PathBuf,
}

impl TranscriptArchive {
    pub fn open(dir: impl AsRef<Path>) -> Self {
        Self {
            path: dir.as_ref().join(ARCHIVE_FILE),
        }
    }

    /// Append one turn. Failures are logged and swallowed so archiving
    /// never interferes with the live session.
    pub fn append(&self, turn: &ArchivedTurn) {
        if let Err(error) = self.append_line(turn) {
            warn!(
                "transcript archive write failed at {}: {error:#}",
                self.path.display()
            );
        }
    }

    /// Load up to `limit` most recent turns in chronological order.
    /// Unparseable lines are skipped; a missing file is an empty history.
    pub fn load_recent(&self, limit: usize) -> Vec<ArchivedTurn> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(error) => {
                warn!(
                    "transcript archive unreadable at {}: {error}",
                    self.path.display()
                );
                return Vec::new();
            }
        };

        let mut turns = Vec::new();
        for line in raw.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            match serde_json::from_str::<ArchivedTurn>(line) {
                Ok(turn) => turns.push(turn),
                Err(error) => warn!("skipping bad transcript line: {error}"),
            }
        }

        if turns.len() > limit {
            turns.drain(..turns.len() - limit);
        }
        turns
    }

    /// Remove the archive file. Missing files are fine.
    pub fn clear(&self) {
        if let Err(error) = std::fs::remove_file(&self.path)
            && error.kind() != std::io::ErrorKind::NotFound
        {
            warn!(
                "transcript archive clear failed at {}: {error}",
                self.path.display()
            );
        }
    }

    fn append_line(&self, turn: &ArchivedTurn) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }

        let mut line = serde_json::to_string(turn).context("failed to render turn")?;
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        file.write_all(line.as_bytes())
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(role: HistoryRole, content: &str, ts: i64) -> ArchivedTurn {
        ArchivedTurn {
            role,
            author: None,
            content: content.to_string(),
            steps: Vec::new(),
            model: None,
            mode: ArchiveMode::Server,
            ts,
        }
    }

    #[test]
    fn append_then_load_preserves_order() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let archive = TranscriptArchive::open(dir.path());

        archive.append(&turn(HistoryRole::User, "first", 1));
        archive.append(&turn(HistoryRole::Assistant, "second", 2));
        archive.append(&turn(HistoryRole::User, "third", 3));

        let loaded = archive.load_recent(10);
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0].content, "first");
        assert_eq!(loaded[2].content, "third");
    }

    #[test]
    fn load_recent_keeps_only_the_tail() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let archive = TranscriptArchive::open(dir.path());
        for i in 0..5 {
            archive.append(&turn(HistoryRole::User, &format!("turn {i}"), i));
        }

        let loaded = archive.load_recent(2);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].content, "turn 3");
        assert_eq!(loaded[1].content, "turn 4");
    }

    #[test]
    fn bad_lines_are_skipped() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let archive = TranscriptArchive::open(dir.path());
        archive.append(&turn(HistoryRole::User, "good", 1));

        let path = dir.path().join(ARCHIVE_FILE);
        let mut raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(error) => panic!("read failed: {error}"),
        };
        raw.push_str("this is not json\n");
        if let Err(error) = std::fs::write(&path, raw) {
            panic!("write failed: {error}");
        }
        archive.append(&turn(HistoryRole::Assistant, "after", 2));

        let loaded = archive.load_recent(10);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].content, "good");
        assert_eq!(loaded[1].content, "after");
    }

    #[test]
    fn missing_file_is_an_empty_history() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let archive = TranscriptArchive::open(dir.path());
        assert!(archive.load_recent(10).is_empty());
    }

    #[test]
    fn clear_removes_the_file() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let archive = TranscriptArchive::open(dir.path());
        archive.append(&turn(HistoryRole::User, "gone soon", 1));
        archive.clear();
        assert!(archive.load_recent(10).is_empty());

        // Clearing twice is fine.
        archive.clear();
    }

    #[test]
    fn optional_fields_round_trip() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let archive = TranscriptArchive::open(dir.path());
        let full = ArchivedTurn {
            role: HistoryRole::Assistant,
            author: Some("architect".to_string()),
            content: "settled".to_string(),
            steps: vec![ToolStep {
                tool: "web_search".to_string(),
                result: "three links".to_string(),
            }],
            model: Some("llama-3.1-8b".to_string()),
            mode: ArchiveMode::Sovereign,
            ts: 42,
        };
        archive.append(&full);

        let loaded = archive.load_recent(1);
        assert_eq!(loaded, vec![full]);
    }
}
