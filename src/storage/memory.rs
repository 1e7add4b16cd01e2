//! In-memory token storage

use std::collections::HashMap;
use std::sync::RwLock;

use super::{StorageKey, TokenStore};
use crate::error::{CommerceError, Result};

/// Process-lifetime [`TokenStore`].
///
/// The in-process counterpart of a browser tab's session storage: each
/// instance is an independent scope and nothing outlives it.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    values: RwLock<HashMap<StorageKey, String>>,
}

impl MemoryTokenStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> CommerceError {
    CommerceError::Storage("memory token store lock poisoned".to_string())
}

impl TokenStore for MemoryTokenStore {
    fn get(&self, key: StorageKey) -> Result<Option<String>> {
        let values = self.values.read().map_err(|_| poisoned())?;
        Ok(values.get(&key).cloned())
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<()> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<()> {
        let mut values = self.values.write().map_err(|_| poisoned())?;
        values.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_returns_none() {
        let store = MemoryTokenStore::new();
        assert_eq!(store.get(StorageKey::AccessToken).unwrap(), None);
    }

    #[test]
    fn test_set_then_get() {
        let store = MemoryTokenStore::new();
        store.set(StorageKey::State, "abc").unwrap();
        assert_eq!(store.get(StorageKey::State).unwrap().as_deref(), Some("abc"));
    }

    #[test]
    fn test_set_overwrites() {
        let store = MemoryTokenStore::new();
        store.set(StorageKey::State, "first").unwrap();
        store.set(StorageKey::State, "second").unwrap();
        assert_eq!(
            store.get(StorageKey::State).unwrap().as_deref(),
            Some("second")
        );
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = MemoryTokenStore::new();
        store.set(StorageKey::CodeVerifier, "v").unwrap();
        store.remove(StorageKey::CodeVerifier).unwrap();
        store.remove(StorageKey::CodeVerifier).unwrap();
        assert_eq!(store.get(StorageKey::CodeVerifier).unwrap(), None);
    }

    #[test]
    fn test_instances_are_independent() {
        let a = MemoryTokenStore::new();
        let b = MemoryTokenStore::new();
        a.set(StorageKey::AccessToken, "tok").unwrap();
        assert_eq!(b.get(StorageKey::AccessToken).unwrap(), None);
    }
}
