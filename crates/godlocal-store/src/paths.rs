//! Data directory resolution.

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment override for the data directory.
pub const ENV_DATA_DIR: &str = "GODLOCAL_HOME";

/// Resolve the data directory: `$GODLOCAL_HOME` when set, otherwise
/// `~/.godlocal`. The directory itself is created lazily on first write.
pub fn data_dir() -> Result<PathBuf> {
    if let Ok(override_path) = std::env::var(ENV_DATA_DIR) {
        let trimmed = override_path.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".godlocal"))
}
