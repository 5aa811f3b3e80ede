//! Persisted queue settings.
//!
//! The rate-limit delay survives restarts in a JSON settings file shaped as
//! `{"queueSettings": {"rateLimitDelay": 1.0}}` (seconds). The file may hold
//! unrelated top-level keys owned by other parts of the deployment; reads and
//! writes go through a read-modify-write cycle that leaves those untouched.
//!
//! Settings I/O failures are never fatal: a failed load falls back to the
//! configured default and a failed save keeps the in-memory value.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::{json, Value};
use tracing::warn;

const SETTINGS_KEY: &str = "queueSettings";
const RATE_LIMIT_KEY: &str = "rateLimitDelay";

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted rate-limit delay, if the file exists and parses.
    /// Returns `None` (after logging) on any read or parse failure.
    pub fn load_rate_limit(&self) -> Option<Duration> {
        let root = match self.read_root() {
            Ok(root) => root?,
            Err(e) => {
                warn!("Failed to read settings file {}: {e:#}", self.path.display());
                return None;
            }
        };

        let seconds = root
            .get(SETTINGS_KEY)
            .and_then(|s| s.get(RATE_LIMIT_KEY))
            .and_then(Value::as_f64)?;

        if seconds.is_sign_negative() || !seconds.is_finite() {
            warn!(
                "Ignoring invalid persisted rate-limit delay {seconds} in {}",
                self.path.display()
            );
            return None;
        }
        Some(Duration::from_secs_f64(seconds))
    }

    /// Persist the rate-limit delay, preserving any other keys in the file.
    pub fn save_rate_limit(&self, delay: Duration) -> Result<()> {
        let mut root = match self.read_root() {
            Ok(Some(root)) => root,
            Ok(None) => json!({}),
            Err(e) => {
                // Corrupt file: start fresh rather than lose the new value
                warn!(
                    "Settings file {} unreadable ({e:#}), rewriting",
                    self.path.display()
                );
                json!({})
            }
        };

        root.as_object_mut()
            .context("settings file root is not a JSON object")?
            .insert(
                SETTINGS_KEY.to_string(),
                json!({ RATE_LIMIT_KEY: delay.as_secs_f64() }),
            );

        let body = serde_json::to_string_pretty(&root)?;
        std::fs::write(&self.path, body)
            .with_context(|| format!("failed to write settings file {}", self.path.display()))?;
        Ok(())
    }

    /// Read the whole settings file. `Ok(None)` means the file does not exist.
    fn read_root(&self) -> Result<Option<Value>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("read settings file"),
        };
        let root = serde_json::from_str(&raw).context("parse settings file as JSON")?;
        Ok(Some(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> SettingsStore {
        SettingsStore::new(dir.path().join("config.json"))
    }

    #[test]
    fn test_load_missing_file_returns_none() {
        let dir = TempDir::new().unwrap();
        assert_eq!(store_in(&dir).load_rate_limit(), None);
    }

    #[test]
    fn test_save_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        store
            .save_rate_limit(Duration::from_millis(1500))
            .expect("save should succeed");

        assert_eq!(store.load_rate_limit(), Some(Duration::from_millis(1500)));
    }

    #[test]
    fn test_save_preserves_unrelated_keys() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        std::fs::write(
            store.path(),
            r#"{"guilds": {"123": {"source": 1, "target": 2}}, "theme": "dark"}"#,
        )
        .unwrap();

        store.save_rate_limit(Duration::from_secs(2)).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let root: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(root["theme"], "dark");
        assert_eq!(root["guilds"]["123"]["source"], 1);
        assert_eq!(root["queueSettings"]["rateLimitDelay"], 2.0);
    }

    #[test]
    fn test_load_corrupt_json_returns_none() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        std::fs::write(store.path(), "{not json").unwrap();
        assert_eq!(store.load_rate_limit(), None);
    }

    #[test]
    fn test_load_negative_delay_rejected() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        std::fs::write(store.path(), r#"{"queueSettings": {"rateLimitDelay": -1.0}}"#).unwrap();
        assert_eq!(store.load_rate_limit(), None);
    }

    #[test]
    fn test_save_over_corrupt_file_rewrites() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        std::fs::write(store.path(), "]]garbage[[").unwrap();
        store.save_rate_limit(Duration::from_millis(300)).unwrap();

        assert_eq!(store.load_rate_limit(), Some(Duration::from_millis(300)));
    }
}
