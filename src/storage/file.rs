//! JSON file token storage
//!
//! Used by the command-line binary: `login` and `callback` run as separate
//! processes, so the PKCE verifier and `state` written by the first must be
//! readable by the second.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use super::{StorageKey, TokenStore};
use crate::error::{CommerceError, Result};

/// File name used inside the platform data directory.
const SESSION_FILE: &str = "session.json";

/// [`TokenStore`] persisted as a flat JSON object.
///
/// The whole file is rewritten on every mutation. On Unix the file is
/// created with mode `0600`.
pub struct FileTokenStore {
    path: PathBuf,
    cache: RwLock<HashMap<String, String>>,
}

impl FileTokenStore {
    /// Opens (or prepares to create) the store at `path`.
    ///
    /// Missing parent directories are created. An existing file that is not a
    /// JSON object of strings is reported as a storage error rather than
    /// silently discarded.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::Io`] if the directory cannot be created or the
    /// file cannot be read, and [`CommerceError::Storage`] if its contents are
    /// malformed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let cache = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            if contents.trim().is_empty() {
                HashMap::new()
            } else {
                serde_json::from_str(&contents).map_err(|e| {
                    CommerceError::Storage(format!(
                        "malformed session file {}: {e}",
                        path.display()
                    ))
                })?
            }
        } else {
            HashMap::new()
        };

        tracing::debug!(path = %path.display(), entries = cache.len(), "Opened file token store");

        Ok(Self {
            path,
            cache: RwLock::new(cache),
        })
    }

    /// Default session file under the platform data directory.
    ///
    /// Returns `None` when no home directory can be determined.
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("ai", "hanzo", "hanzo-commerce")
            .map(|dirs| dirs.data_dir().join(SESSION_FILE))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, values: &HashMap<String, String>) -> Result<()> {
        let contents = serde_json::to_string_pretty(values)?;
        write_private(&self.path, contents.as_bytes())
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    use std::io::Write as _;
    use std::os::unix::fs::OpenOptionsExt as _;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> Result<()> {
    std::fs::write(path, contents)?;
    Ok(())
}

fn poisoned() -> CommerceError {
    CommerceError::Storage("file token store lock poisoned".to_string())
}

impl TokenStore for FileTokenStore {
    fn get(&self, key: StorageKey) -> Result<Option<String>> {
        let cache = self.cache.read().map_err(|_| poisoned())?;
        Ok(cache.get(key.as_str()).cloned())
    }

    // Mutations are staged on a copy; the cache only changes once the file
    // write succeeded.
    fn set(&self, key: StorageKey, value: &str) -> Result<()> {
        let mut cache = self.cache.write().map_err(|_| poisoned())?;
        let mut next = cache.clone();
        next.insert(key.as_str().to_string(), value.to_string());
        self.save(&next)?;
        *cache = next;
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<()> {
        let mut cache = self.cache.write().map_err(|_| poisoned())?;
        if !cache.contains_key(key.as_str()) {
            return Ok(());
        }
        let mut next = cache.clone();
        next.remove(key.as_str());
        self.save(&next)?;
        *cache = next;
        Ok(())
    }
}

impl std::fmt::Debug for FileTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTokenStore")
            .field("path", &self.path)
            .finish()
    }
}
