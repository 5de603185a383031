//! Key/value preference store.
//!
//! File-backed equivalent of the web client's local storage: one JSON
//! object at `{data_dir}/prefs.json`, rewritten whole on every set. A
//! missing key is an ordinary `None`; a failed write is logged and
//! swallowed. The sovereign API key lives here in plaintext; the file is
//! written with owner-only permissions, and nothing here ever logs values.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::warn;

const PREFS_FILE: &str = "prefs.json";

/// Well-known preference keys.
pub const KEY_SOUL: &str = "soul_memory";
pub const KEY_API_KEY: &str = "sovereign_api_key";
pub const KEY_PERSONA: &str = "persona";
pub const KEY_SOVEREIGN: &str = "sovereign_mode";

/// Key/value preference store, owned by one task.
#[derive(Debug)]
pub struct PreferenceStore {
    path: PathBuf,
    values: Map<String, Value>,
}

impl PreferenceStore {
    /// Open the store under a data directory. Never fails: an absent or
    /// unreadable file simply starts empty.
    pub fn open(dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(PREFS_FILE);
        let values = match load_values(&path) {
            Ok(values) => values,
            Err(error) => {
                warn!("preference store unreadable at {}: {error:#}", path.display());
                Map::new()
            }
        };
        Self { path, values }
    }

    /// Raw value for a key; absent keys are a normal `None`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// String value for a key; non-string values are treated as absent.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)?.as_str().map(str::to_string)
    }

    /// Store a value. Fire-and-forget: persistence failures are logged
    /// and swallowed, the in-memory value is kept either way.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
        self.persist();
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.set(key, Value::String(value.into()));
    }

    /// Drop a key. No-op when absent.
    pub fn remove(&mut self, key: &str) {
        if self.values.remove(key).is_some() {
            self.persist();
        }
    }

    /// Drop everything.
    pub fn clear(&mut self) {
        if !self.values.is_empty() {
            self.values.clear();
            self.persist();
        }
    }

    /// Soul memory text injected into sovereign-mode prompts. Defaults to
    /// empty, like an unset browser store.
    pub fn soul(&self) -> String {
        self.get_string(KEY_SOUL).unwrap_or_default()
    }

    pub fn set_soul(&mut self, text: impl Into<String>) {
        self.set_string(KEY_SOUL, text);
    }

    /// User-supplied sovereign API key, if one was ever configured.
    pub fn api_key(&self) -> Option<String> {
        self.get_string(KEY_API_KEY)
            .filter(|key| !key.trim().is_empty())
    }

    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.set_string(KEY_API_KEY, key);
    }

    /// Last selected persona id.
    pub fn persona(&self) -> Option<String> {
        self.get_string(KEY_PERSONA)
    }

    pub fn set_persona(&mut self, id: impl Into<String>) {
        self.set_string(KEY_PERSONA, id);
    }

    /// Whether sovereign mode was left enabled.
    pub fn sovereign_mode(&self) -> bool {
        self.get(KEY_SOVEREIGN).and_then(Value::as_bool) == Some(true)
    }

    pub fn set_sovereign_mode(&mut self, enabled: bool) {
        self.set(KEY_SOVEREIGN, Value::Bool(enabled));
    }

    fn persist(&self) {
        if let Err(error) = write_values(&self.path, &self.values) {
            warn!(
                "preference write failed at {}: {error:#}",
                self.path.display()
            );
        }
    }
}

fn load_values(path: &Path) -> Result<Map<String, Value>> {
    if !path.exists() {
        return Ok(Map::new());
    }
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    match value {
        Value::Object(map) => Ok(map),
        _ => anyhow::bail!("preference file is not a JSON object"),
    }
}

fn write_values(path: &Path, values: &Map<String, Value>) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let rendered = serde_json::to_string_pretty(&Value::Object(values.clone()))
        .context("failed to render preferences")?;
    std::fs::write(path, rendered)
        .with_context(|| format!("failed to write {}", path.display()))?;

    // The sovereign API key sits in this file in plaintext; keep it
    // owner-only.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trip_returns_exact_value() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let mut store = PreferenceStore::open(dir.path());

        store.set_string("persona", "architect");
        assert_eq!(store.get_string("persona").as_deref(), Some("architect"));

        store.set("window", json!({"w": 120, "h": 40}));
        assert_eq!(store.get("window"), Some(&json!({"w": 120, "h": 40})));
    }

    #[test]
    fn missing_keys_are_a_normal_none() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let store = PreferenceStore::open(dir.path());
        assert_eq!(store.get("never_written"), None);
        assert_eq!(store.api_key(), None);
        assert_eq!(store.soul(), "");
        assert!(!store.sovereign_mode());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        {
            let mut store = PreferenceStore::open(dir.path());
            store.set_soul("remember the lighthouse");
            store.set_api_key("gsk_live_not_really");
            store.set_sovereign_mode(true);
        }

        let reopened = PreferenceStore::open(dir.path());
        assert_eq!(reopened.soul(), "remember the lighthouse");
        assert_eq!(reopened.api_key().as_deref(), Some("gsk_live_not_really"));
        assert!(reopened.sovereign_mode());
    }

    #[test]
    fn corrupt_file_degrades_to_empty() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        if let Err(error) = std::fs::write(dir.path().join(PREFS_FILE), "{{ not json") {
            panic!("seed write failed: {error}");
        }

        let mut store = PreferenceStore::open(dir.path());
        assert_eq!(store.get("anything"), None);

        // The store stays usable and the next write repairs the file.
        store.set_string("persona", "grok");
        let reopened = PreferenceStore::open(dir.path());
        assert_eq!(reopened.persona().as_deref(), Some("grok"));
    }

    #[test]
    fn failed_writes_do_not_crash_the_caller() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        // Point the store's directory at a regular file so create_dir_all
        // fails underneath it.
        let blocker = dir.path().join("blocker");
        if let Err(error) = std::fs::write(&blocker, b"flat file") {
            panic!("seed write failed: {error}");
        }

        let mut store = PreferenceStore::open(blocker.join("nested"));
        store.set_string("persona", "lucas");
        // Write was swallowed; the in-memory value still serves reads.
        assert_eq!(store.persona().as_deref(), Some("lucas"));
    }

    #[test]
    fn remove_and_clear_drop_keys() {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let mut store = PreferenceStore::open(dir.path());
        store.set_string("a", "1");
        store.set_string("b", "2");

        store.remove("a");
        assert_eq!(store.get("a"), None);
        assert_eq!(store.get_string("b").as_deref(), Some("2"));

        store.clear();
        assert_eq!(store.get("b"), None);

        let reopened = PreferenceStore::open(dir.path());
        assert_eq!(reopened.get("b"), None);
    }

    #[cfg(unix)]
    #[test]
    fn preference_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(error) => panic!("tempdir failed: {error}"),
        };
        let mut store = PreferenceStore::open(dir.path());
        store.set_api_key("gsk_live_not_really");

        let metadata = match std::fs::metadata(dir.path().join(PREFS_FILE)) {
            Ok(metadata) => metadata,
            Err(error) => panic!("prefs file missing: {error}"),
        };
        assert_eq!(metadata.permissions().mode() & 0o777, 0o600);
    }
}
