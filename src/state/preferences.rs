//! Preference Store
//!
//! Key-value persistence for small node state (display name). The trait
//! mirrors the platform preference APIs the transport hosts provide; writes
//! are best-effort and never fail the caller.

use std::collections::HashMap;
use std::path::PathBuf;

use dashmap::DashMap;
use log::warn;
use parking_lot::Mutex;

pub trait PreferenceStore: Send + Sync {
    /// Read a value, falling back to `default` when the key is unset.
    fn get(&self, key: &str, default: &str) -> String;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Volatile store for tests and simulations.
#[derive(Default)]
pub struct MemoryPreferences {
    values: DashMap<String, String>,
}

impl MemoryPreferences {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str, default: &str) -> String {
        self.values
            .get(key)
            .map(|value| value.clone())
            .unwrap_or_else(|| default.to_string())
    }

    fn set(&self, key: &str, value: &str) {
        self.values.insert(key.to_string(), value.to_string());
    }

    fn remove(&self, key: &str) {
        self.values.remove(key);
    }
}

/// JSON-file-backed store. Loaded once at open; every mutation rewrites the
/// file. IO failures are logged and swallowed so a broken disk never takes
/// the mesh down with it.
pub struct JsonFilePreferences {
    path: PathBuf,
    values: Mutex<HashMap<String, String>>,
}

impl JsonFilePreferences {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|error| {
                warn!("preferences file {} is corrupt ({error}), starting empty", path.display());
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    fn persist(&self, values: &HashMap<String, String>) {
        match serde_json::to_string_pretty(values) {
            Ok(raw) => {
                if let Err(error) = std::fs::write(&self.path, raw) {
                    warn!("failed to persist preferences to {}: {error}", self.path.display());
                }
            }
            Err(error) => warn!("failed to serialize preferences: {error}"),
        }
    }
}

impl PreferenceStore for JsonFilePreferences {
    fn get(&self, key: &str, default: &str) -> String {
        self.values
            .lock()
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }

    fn set(&self, key: &str, value: &str) {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value.to_string());
        self.persist(&values);
    }

    fn remove(&self, key: &str) {
        let mut values = self.values.lock();
        values.remove(key);
        self.persist(&values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_get_set_remove() {
        let prefs = MemoryPreferences::new();
        assert_eq!(prefs.get("username", "fallback"), "fallback");
        prefs.set("username", "Dana");
        assert_eq!(prefs.get("username", "fallback"), "Dana");
        prefs.remove("username");
        assert_eq!(prefs.get("username", ""), "");
    }

    #[test]
    fn json_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        {
            let prefs = JsonFilePreferences::open(&path);
            prefs.set("username", "Dana");
        }

        let reopened = JsonFilePreferences::open(&path);
        assert_eq!(reopened.get("username", ""), "Dana");
    }

    #[test]
    fn corrupt_json_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").unwrap();

        let prefs = JsonFilePreferences::open(&path);
        assert_eq!(prefs.get("username", "fresh"), "fresh");
    }
}
