//! Saved navigation places, one file per identity.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

use super::{identity_key, load_json, write_json_atomic};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceEntry {
    pub key: String,
    /// Street address or "lat,lon" pair
    pub address: String,
    pub updated_at: DateTime<Utc>,
}

pub struct PlaceStore {
    path: PathBuf,
    entries: BTreeMap<String, PlaceEntry>,
}

impl PlaceStore {
    /// Open the places file for `identity` under `dir`.
    pub fn open(dir: &Path, identity: &str) -> Result<Self> {
        let path = dir.join(format!("{}.json", identity_key(identity)));
        Self::open_file(path)
    }

    pub fn open_file(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = load_json(&path)?;
        Ok(Self { path, entries })
    }

    /// Create or overwrite a place. Last write wins.
    pub fn set(&mut self, key: &str, address: &str) -> Result<&PlaceEntry> {
        let key = normalize_key(key);
        let address = address.trim();
        if key.is_empty() || address.is_empty() {
            return Err(Error::invalid_arguments("setplace", "/setplace <key> = <address>"));
        }

        let mut next = self.entries.clone();
        next.insert(
            key.clone(),
            PlaceEntry {
                key: key.clone(),
                address: address.to_string(),
                updated_at: Utc::now(),
            },
        );
        write_json_atomic(&self.path, &next)?;
        self.entries = next;
        debug!(place = %key, "Place saved");

        self.entries
            .get(&key)
            .ok_or_else(|| Error::Internal("place vanished after insert".to_string()))
    }

    pub fn lookup(&self, key: &str) -> Result<&PlaceEntry> {
        let key = normalize_key(key);
        self.entries.get(&key).ok_or(Error::PlaceNotFound { key })
    }

    pub fn get(&self, key: &str) -> Option<&PlaceEntry> {
        self.entries.get(&normalize_key(key))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PlaceEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Lowercase with inner whitespace collapsed: " My  Gym " -> "my gym".
pub fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_then_lookup() {
        let tmp = TempDir::new().unwrap();
        let mut store = PlaceStore::open(tmp.path(), "Alice").unwrap();
        store.set("Home", "123 Main St").unwrap();

        assert_eq!(store.lookup("home").unwrap().address, "123 Main St");
        assert_eq!(store.lookup("  HOME ").unwrap().address, "123 Main St");
    }

    #[test]
    fn test_last_write_wins() {
        let tmp = TempDir::new().unwrap();
        let mut store = PlaceStore::open(tmp.path(), "Alice").unwrap();
        store.set("work", "1 Old Rd").unwrap();
        store.set("Work", "2 New Rd").unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.lookup("work").unwrap().address, "2 New Rd");
    }

    #[test]
    fn test_lookup_missing() {
        let tmp = TempDir::new().unwrap();
        let store = PlaceStore::open(tmp.path(), "Alice").unwrap();
        let err = store.lookup("Gym").unwrap_err();
        assert!(matches!(err, Error::PlaceNotFound { ref key } if key == "gym"));
    }

    #[test]
    fn test_places_are_per_identity_and_persist() {
        let tmp = TempDir::new().unwrap();
        PlaceStore::open(tmp.path(), "Alice")
            .unwrap()
            .set("home", "123 Main St")
            .unwrap();

        let bob = PlaceStore::open(tmp.path(), "Bob").unwrap();
        assert!(bob.is_empty());

        let alice = PlaceStore::open(tmp.path(), "alice").unwrap();
        assert_eq!(alice.get("home").unwrap().address, "123 Main St");
    }

    #[test]
    fn test_failed_write_leaves_places_unchanged() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("alice.json");
        let mut store = PlaceStore::open_file(&path).unwrap();
        store.set("work", "1 Old Rd").unwrap();

        // A non-empty directory in place of the file makes the rename fail
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir_all(path.join("blocker")).unwrap();

        assert!(store.set("home", "123 Main St").is_err());
        assert!(store.get("home").is_none());
        assert!(store.set("work", "2 New Rd").is_err());
        assert_eq!(store.lookup("work").unwrap().address, "1 Old Rd");
    }

    #[test]
    fn test_rejects_empty_address() {
        let tmp = TempDir::new().unwrap();
        let mut store = PlaceStore::open(tmp.path(), "Alice").unwrap();
        assert!(store.set("home", "   ").is_err());
        assert!(store.is_empty());
    }
}
