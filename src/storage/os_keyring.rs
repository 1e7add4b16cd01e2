//! Token storage via OS keyring
//!
//! Stores each slot as its own entry in the operating system's native
//! credential store (Keychain on macOS, Secret Service on Linux, Windows
//! Credential Manager on Windows). The service name namespaces the entries;
//! the prefixed storage key is the entry's user name.

use super::{StorageKey, TokenStore};
use crate::error::{CommerceError, Result};

/// Default keyring service name.
pub const DEFAULT_SERVICE: &str = "hanzo-commerce";

/// [`TokenStore`] backed by the OS keyring.
///
/// The keyring itself is stateless from our point of view; the struct only
/// carries the service name.
///
/// # Examples
///
/// ```no_run
/// use hanzo_commerce::storage::{KeyringTokenStore, StorageKey, TokenStore};
///
/// let store = KeyringTokenStore::new();
/// store.set(StorageKey::AccessToken, "token").unwrap();
/// assert!(store.get(StorageKey::AccessToken).unwrap().is_some());
/// ```
#[derive(Debug, Clone)]
pub struct KeyringTokenStore {
    service: String,
}

impl KeyringTokenStore {
    /// Creates a store under [`DEFAULT_SERVICE`].
    pub fn new() -> Self {
        Self::with_service(DEFAULT_SERVICE)
    }

    /// Creates a store under a custom service name.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// The keyring service name.
    pub fn service(&self) -> &str {
        &self.service
    }

    fn entry(&self, key: StorageKey) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service, key.as_str()).map_err(CommerceError::Keyring)
    }
}

impl Default for KeyringTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self, key: StorageKey) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CommerceError::Keyring(e)),
        }
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(CommerceError::Keyring)
    }

    fn remove(&self, key: StorageKey) -> Result<()> {
        match self.entry(key)?.delete_password() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(CommerceError::Keyring(e)),
        }
    }
}
