//! Per-identity preferences and the last identity seen on this machine.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::{identity_key, load_json, write_json_atomic};

/// Unset fields fall back to configuration defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityPreferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tts_enabled: Option<bool>,

    /// Index into the synthesizer's voice list
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_index: Option<usize>,

    /// Speaking rate in words per minute
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub calendar_access: Option<bool>,

    /// Persona selected the last time this identity used /switch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
struct PreferencesFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    last_identity: Option<String>,
    identities: BTreeMap<String, IdentityPreferences>,
}

pub struct PreferencesStore {
    path: PathBuf,
    data: PreferencesFile,
}

impl PreferencesStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = load_json(&path)?;
        Ok(Self { path, data })
    }

    pub fn get(&self, identity: &str) -> IdentityPreferences {
        self.data
            .identities
            .get(&identity_key(identity))
            .cloned()
            .unwrap_or_default()
    }

    /// Apply `change` to the identity's preferences and persist.
    pub fn update<F>(&mut self, identity: &str, change: F) -> Result<()>
    where
        F: FnOnce(&mut IdentityPreferences),
    {
        let mut next = self.data.clone();
        change(next.identities.entry(identity_key(identity)).or_default());
        self.commit(next)
    }

    /// Persist `next`, then adopt it. A failed write keeps the current data.
    fn commit(&mut self, next: PreferencesFile) -> Result<()> {
        write_json_atomic(&self.path, &next)?;
        self.data = next;
        Ok(())
    }

    pub fn last_identity(&self) -> Option<&str> {
        self.data.last_identity.as_deref()
    }

    pub fn set_last_identity(&mut self, identity: &str) -> Result<()> {
        if self.data.last_identity.as_deref() == Some(identity) {
            return Ok(());
        }
        let mut next = self.data.clone();
        next.last_identity = Some(identity.to_string());
        self.commit(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_for_unknown_identity() {
        let tmp = TempDir::new().unwrap();
        let store = PreferencesStore::open(tmp.path().join("preferences.json")).unwrap();
        assert_eq!(store.get("nobody"), IdentityPreferences::default());
        assert_eq!(store.last_identity(), None);
    }

    #[test]
    fn test_update_persists() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("preferences.json");

        let mut store = PreferencesStore::open(&path).unwrap();
        store.update("Alice", |p| p.rate = Some(200)).unwrap();
        store.update("alice", |p| p.calendar_access = Some(false)).unwrap();
        store.set_last_identity("Alice").unwrap();

        let reopened = PreferencesStore::open(&path).unwrap();
        let prefs = reopened.get("ALICE");
        assert_eq!(prefs.rate, Some(200));
        assert_eq!(prefs.calendar_access, Some(false));
        assert_eq!(reopened.last_identity(), Some("Alice"));
    }

    #[test]
    fn test_failed_write_keeps_previous_preferences() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("preferences.json");
        let mut store = PreferencesStore::open(&path).unwrap();
        store.update("Alice", |p| p.calendar_access = Some(true)).unwrap();

        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir_all(path.join("blocker")).unwrap();

        assert!(store.update("Alice", |p| p.calendar_access = Some(false)).is_err());
        assert_eq!(store.get("Alice").calendar_access, Some(true));
        assert!(store.set_last_identity("Alice").is_err());
        assert_eq!(store.last_identity(), None);
    }
}
