//! Optional `config.toml` in the data directory, layered below environment
//! variables and CLI flags.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

const CONFIG_FILE: &str = "config.toml";

/// Launch settings read from `config.toml`. Every field is optional; a
/// missing file means all defaults.
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    /// Backend base URL, overridden by `$GODLOCAL_BACKEND_URL` and
    /// `--backend-url`.
    pub backend_url: Option<String>,
    /// Persona to seed new installs with. A persona picked with `/persona`
    /// is stored as a preference and wins over this.
    pub persona: Option<String>,
}

/// Read `config.toml` from the data directory. A missing file is not an
/// error; a file that fails to parse is.
pub fn load_config(data_dir: &Path) -> Result<FileConfig> {
    let path = data_dir.join(CONFIG_FILE);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
            return Ok(FileConfig::default());
        }
        Err(error) => {
            return Err(error).with_context(|| format!("read {}", path.display()));
        }
    };
    toml::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = load_config(dir.path()).expect("load");
        assert!(config.backend_url.is_none());
        assert!(config.persona.is_none());
    }

    #[test]
    fn file_values_are_picked_up() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "backend_url = \"http://localhost:8787\"\npersona = \"builder\"\n",
        )
        .expect("write config");

        let config = load_config(dir.path()).expect("load");
        assert_eq!(
            config.backend_url.as_deref(),
            Some("http://localhost:8787")
        );
        assert_eq!(config.persona.as_deref(), Some("builder"));
    }

    #[test]
    fn unparseable_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join(CONFIG_FILE), "backend_url = [broken")
            .expect("write config");

        assert!(load_config(dir.path()).is_err());
    }
}
