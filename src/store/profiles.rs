//! Enrolled face profiles.
//!
//! `profiles.json` maps each identity name to metadata; the template itself
//! is an opaque blob under `templates/`, named by a digest of the identity so
//! names never appear in file names and blobs never appear in logs.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::error::{Error, Result};

use super::{identity_key, load_json, write_bytes_atomic, write_json_atomic};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEntry {
    /// Identity name as enrolled (display casing)
    pub name: String,

    /// Template blob file name under the templates directory
    pub template: String,

    /// Number of samples the template was built from
    pub sample_count: u32,

    pub created_at: DateTime<Utc>,
}

/// Identity name to profile, one entry per name.
pub struct ProfileStore {
    path: PathBuf,
    templates_dir: PathBuf,
    entries: BTreeMap<String, ProfileEntry>,
}

impl ProfileStore {
    pub fn open(path: impl Into<PathBuf>, templates_dir: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let entries = load_json(&path)?;
        Ok(Self {
            path,
            templates_dir: templates_dir.into(),
            entries,
        })
    }

    /// Store a template for `name`, replacing any previous enrollment.
    ///
    /// The blob goes to a fresh file and the entry points at it only once
    /// `profiles.json` is committed; the old blob is removed afterwards. A
    /// failure at any step leaves the previous enrollment intact.
    pub fn upsert(&mut self, name: &str, template: &[u8], sample_count: u32) -> Result<&ProfileEntry> {
        let name = validate_name(name)?;
        let key = identity_key(name);
        let file_name = template_file_name(name);
        let blob = self.templates_dir.join(&file_name);

        write_bytes_atomic(&blob, template)?;

        let mut next = self.entries.clone();
        let previous = next.insert(
            key.clone(),
            ProfileEntry {
                name: name.to_string(),
                template: file_name,
                sample_count,
                created_at: Utc::now(),
            },
        );
        if let Err(e) = write_json_atomic(&self.path, &next) {
            let _ = fs::remove_file(&blob);
            return Err(e);
        }
        self.entries = next;

        if let Some(old) = &previous {
            if let Err(e) = fs::remove_file(self.templates_dir.join(&old.template)) {
                warn!(profile = %name, error = %e, "Could not remove replaced template");
            }
        }

        info!(profile = %name, samples = sample_count, replaced = previous.is_some(), "Profile enrolled");
        self.entries
            .get(&key)
            .ok_or_else(|| Error::Internal("profile vanished after insert".to_string()))
    }

    /// Case-insensitive lookup.
    pub fn get(&self, name: &str) -> Option<&ProfileEntry> {
        self.entries.get(&identity_key(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProfileEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn read_template(&self, entry: &ProfileEntry) -> Result<Vec<u8>> {
        let path = self.templates_dir.join(&entry.template);
        fs::read(&path).map_err(|e| Error::IoRead { path, source: e })
    }

    /// Every enrolled name with its template bytes.
    pub fn load_templates(&self) -> Result<Vec<(String, Vec<u8>)>> {
        self.entries
            .values()
            .map(|entry| Ok((entry.name.clone(), self.read_template(entry)?)))
            .collect()
    }
}

/// Names become prompt text and store keys; keep them plain.
fn validate_name(name: &str) -> Result<&str> {
    let name = name.trim();
    let valid = !name.is_empty()
        && name.len() <= 64
        && name
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.'));
    if valid {
        Ok(name)
    } else {
        Err(Error::invalid_arguments("setup_profile", "/setup_profile <Name>"))
    }
}

/// Digest of the identity plus a per-enrollment suffix, so a new template
/// never overwrites the one still referenced by `profiles.json`.
fn template_file_name(name: &str) -> String {
    let digest = Sha256::digest(identity_key(name).as_bytes());
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}.tpl", &hex::encode(digest)[..16], &suffix[..8])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open(tmp: &TempDir) -> ProfileStore {
        ProfileStore::open(tmp.path().join("profiles.json"), tmp.path().join("templates")).unwrap()
    }

    #[test]
    fn test_upsert_and_reopen() {
        let tmp = TempDir::new().unwrap();
        let mut store = open(&tmp);
        store.upsert("Alice", &[1, 2, 3], 5).unwrap();
        store.upsert("Bob", &[4, 5], 3).unwrap();

        let reopened = open(&tmp);
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.get("alice"), store.get("Alice"));
        let entry = reopened.get("Bob").unwrap();
        assert_eq!(reopened.read_template(entry).unwrap(), vec![4, 5]);
    }

    #[test]
    fn test_reenroll_replaces() {
        let tmp = TempDir::new().unwrap();
        let mut store = open(&tmp);
        store.upsert("Alice", &[1], 1).unwrap();
        store.upsert("alice", &[9, 9], 2).unwrap();

        assert_eq!(store.len(), 1);
        let entry = store.get("ALICE").unwrap();
        assert_eq!(entry.sample_count, 2);
        assert_eq!(store.read_template(entry).unwrap(), vec![9, 9]);
    }

    #[test]
    fn test_reenroll_removes_old_blob() {
        let tmp = TempDir::new().unwrap();
        let mut store = open(&tmp);
        let first = store.upsert("Alice", &[1], 1).unwrap().template.clone();
        let second = store.upsert("Alice", &[2], 1).unwrap().template.clone();

        assert_ne!(first, second);
        assert!(!tmp.path().join("templates").join(first).exists());
        assert!(tmp.path().join("templates").join(second).is_file());
    }

    #[test]
    fn test_failed_commit_keeps_previous_enrollment() {
        let tmp = TempDir::new().unwrap();
        let mut store = open(&tmp);
        store.upsert("Alice", &[1, 2, 3], 5).unwrap();
        let before = store.get("Alice").unwrap().clone();

        let json = tmp.path().join("profiles.json");
        fs::remove_file(&json).unwrap();
        fs::create_dir_all(json.join("blocker")).unwrap();

        assert!(store.upsert("Alice", &[9, 9], 2).is_err());
        assert!(store.upsert("Bob", &[4], 1).is_err());

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("Alice"), Some(&before));
        assert_eq!(store.read_template(&before).unwrap(), vec![1, 2, 3]);
        let blobs = fs::read_dir(tmp.path().join("templates")).unwrap().count();
        assert_eq!(blobs, 1);
    }

    #[test]
    fn test_template_file_hides_name() {
        let tmp = TempDir::new().unwrap();
        let mut store = open(&tmp);
        let entry = store.upsert("Alice", &[1], 1).unwrap().clone();

        assert!(!entry.template.to_lowercase().contains("alice"));
        assert!(tmp.path().join("templates").join(&entry.template).is_file());
        let json = fs::read_to_string(tmp.path().join("profiles.json")).unwrap();
        assert!(!json.contains("[1]"));
    }

    #[test]
    fn test_rejects_bad_names() {
        let tmp = TempDir::new().unwrap();
        let mut store = open(&tmp);
        assert!(store.upsert("", &[1], 1).is_err());
        assert!(store.upsert("a/b", &[1], 1).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupt_file_fails_open() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("profiles.json"), "[[").unwrap();
        let result = ProfileStore::open(tmp.path().join("profiles.json"), tmp.path().join("t"));
        assert!(matches!(result, Err(Error::StoreCorrupt { .. })));
    }
}
