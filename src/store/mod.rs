//! Persisted key-value stores.
//!
//! Every store is a JSON document under the data directory, loaded once at
//! open and rewritten in full on each mutation. Writes go to a sibling temp
//! file that is renamed over the original, so a crash never leaves a
//! half-written store behind.

pub mod places;
pub mod preferences;
pub mod profiles;

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

pub use places::{PlaceEntry, PlaceStore};
pub use preferences::{IdentityPreferences, PreferencesStore};
pub use profiles::{ProfileEntry, ProfileStore};

/// Load a JSON document, or `T::default()` when the file does not exist.
///
/// A file that exists but does not decode is reported as corrupt rather than
/// silently replaced.
pub(crate) fn load_json<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => {
            return Err(Error::IoRead {
                path: path.to_path_buf(),
                source: e,
            })
        }
    };

    if content.trim().is_empty() {
        return Ok(T::default());
    }

    serde_json::from_str(&content).map_err(|e| Error::store_corrupt(path, e.to_string()))
}

/// Serialize `value` as pretty JSON and atomically replace `path`.
pub(crate) fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| Error::Internal(format!("Failed to encode {}: {}", path.display(), e)))?;
    write_bytes_atomic(path, &bytes)
}

/// Atomically replace `path` with `bytes`, creating parent directories.
pub(crate) fn write_bytes_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let io_err = |source| Error::IoWrite {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = Path::new(&temp_name);

    {
        let file = File::create(temp_path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(bytes).map_err(io_err)?;
        let file = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
        file.sync_all().map_err(io_err)?;
    }

    fs::rename(temp_path, path).map_err(io_err)?;
    Ok(())
}

/// Canonical form of a user-supplied identity for file names and map keys.
pub(crate) fn identity_key(identity: &str) -> String {
    identity
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
