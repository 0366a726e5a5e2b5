use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::{bail, Result};
use log::warn;
use serde::{de::DeserializeOwned, Serialize};

/// Handoff keys shared between the capture, analysis and chat flows.
pub const PATIENT_DATA_KEY: &str = "patientData";
pub const ANALYSIS_RESULT_KEY: &str = "analysisResult";
pub const CURRENT_RECORD_KEY: &str = "currentRecord";
pub const CHAT_MESSAGES_KEY: &str = "current_chat_messages";
pub const MEDIA_PREVIEWS_KEY: &str = "current_media_previews";
pub const DIAGRAM_KEY: &str = "current_diagram";

const DEFAULT_CAPACITY_BYTES: usize = 5 * 1024 * 1024;

/// Session-scoped key/value store. Lives for the process lifetime and is
/// bounded by a byte budget, so callers that persist large payloads (media
/// previews in particular) hit the same quota wall a browser session store
/// would and must treat a failed write as survivable.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    entries: RwLock<HashMap<String, String>>,
    capacity_bytes: usize,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY_BYTES)
    }

    pub fn with_capacity(capacity_bytes: usize) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                entries: RwLock::new(HashMap::new()),
                capacity_bytes,
            }),
        }
    }

    pub fn put(&self, key: &str, value: String) -> Result<()> {
        let mut entries = self.inner.entries.write().unwrap();
        let current: usize = entries
            .iter()
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, v)| k.len() + v.len())
            .sum();
        if current + key.len() + value.len() > self.inner.capacity_bytes {
            bail!(
                "session store quota exceeded writing '{}' ({} bytes over budget)",
                key,
                current + key.len() + value.len() - self.inner.capacity_bytes
            );
        }
        entries.insert(key.to_string(), value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.inner.entries.read().unwrap().get(key).cloned()
    }

    pub fn remove(&self, key: &str) {
        self.inner.entries.write().unwrap().remove(key);
    }

    pub fn clear(&self) {
        self.inner.entries.write().unwrap().clear();
    }

    pub fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let serialized = serde_json::to_string(value)?;
        self.put(key, serialized)
    }

    /// Reads and decodes a stored value. A malformed payload is logged and
    /// treated as absent so a bad restore never takes the app down.
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Discarding malformed session value for '{key}': {err}");
                None
            }
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_round_trip_and_remove() {
        let store = SessionStore::new();
        store.put("greeting", "namaste".to_string()).unwrap();
        assert_eq!(store.get("greeting").as_deref(), Some("namaste"));

        store.remove("greeting");
        assert!(store.get("greeting").is_none());
    }

    #[test]
    fn writes_over_the_quota_fail_and_leave_the_store_intact() {
        let store = SessionStore::with_capacity(32);
        store.put("a", "x".repeat(10)).unwrap();

        assert!(store.put("b", "y".repeat(40)).is_err());
        assert_eq!(store.get("a").as_deref(), Some(&"x".repeat(10)[..]));
        assert!(store.get("b").is_none());
    }

    #[test]
    fn replacing_a_key_charges_only_the_new_value() {
        let store = SessionStore::with_capacity(16);
        store.put("k", "x".repeat(15)).unwrap();
        // The old 15 bytes under "k" do not count against the rewrite.
        store.put("k", "y".repeat(12)).unwrap();
        assert_eq!(store.get("k").as_deref(), Some(&"y".repeat(12)[..]));
    }

    #[test]
    fn malformed_stored_json_reads_as_absent() {
        let store = SessionStore::new();
        store.put("numbers", "not-a-list".to_string()).unwrap();
        assert!(store.get_json::<Vec<u32>>("numbers").is_none());
    }
}
