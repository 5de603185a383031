//! Attachment staging for outbound turns.
//!
//! Attachments are staged locally, summarized into the prompt as
//! `[File: name (mime, size)]` lines, and released when removed or when a
//! send drains the pending list. Dropping an [`Attachment`] releases any
//! inline payload it holds.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Where an attachment's bytes live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentRef {
    /// Still on disk; read lazily if ever needed.
    Path(PathBuf),
    /// Carried inline (pasted content, small previews).
    Inline(Vec<u8>),
}

/// One staged attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub mime_type: String,
    pub size_bytes: u64,
    pub content_ref: ContentRef,
}

impl Attachment {
    /// Stage a file from disk, taking name, size and a mime guess from the
    /// path itself.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("failed to stat attachment {}", path.display()))?;
        if !metadata.is_file() {
            anyhow::bail!("attachment is not a regular file: {}", path.display());
        }
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            name,
            mime_type: guess_mime(path).to_string(),
            size_bytes: metadata.len(),
            content_ref: ContentRef::Path(path.to_path_buf()),
        })
    }

    /// Prompt line describing this attachment.
    pub fn description(&self) -> String {
        format!(
            "[File: {} ({}, {})]",
            self.name,
            self.mime_type,
            format_size(self.size_bytes)
        )
    }
}

/// Pending attachments for the next send.
#[derive(Debug, Default)]
pub struct AttachmentList {
    staged: Vec<Attachment>,
}

impl AttachmentList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage(&mut self, attachment: Attachment) {
        self.staged.push(attachment);
    }

    /// Remove one staged attachment by position; returns it so the caller
    /// can report what was released.
    pub fn remove(&mut self, index: usize) -> Option<Attachment> {
        if index < self.staged.len() {
            Some(self.staged.remove(index))
        } else {
            None
        }
    }

    /// Take everything for a send, leaving the list empty.
    pub fn drain_for_send(&mut self) -> Vec<Attachment> {
        std::mem::take(&mut self.staged)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Attachment> {
        self.staged.iter()
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// `[File: ...]` lines for every staged attachment, newline-joined.
    pub fn descriptions(&self) -> String {
        self.staged
            .iter()
            .map(Attachment::description)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Staged file names, for the envelope's `files` field.
    pub fn names(&self) -> Vec<String> {
        self.staged
            .iter()
            .map(|attachment| attachment.name.clone())
            .collect()
    }
}

/// Human-readable size: bytes below 1 KB, otherwise one decimal.
pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    if bytes < 1024 * 1024 {
        return format!("{:.1} KB", bytes as f64 / 1024.0);
    }
    format!("{:.1} MB", bytes as f64 / 1024.0 / 1024.0)
}

fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|extension| extension.to_string_lossy().to_lowercase());
    match extension.as_deref() {
        Some("txt" | "log") => "text/plain",
        Some("md") => "text/markdown",
        Some("json") => "application/json",
        Some("csv") => "text/csv",
        Some("html" | "htm") => "text/html",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
