//! Session-scoped token storage
//!
//! The login flow keeps five values between the authorization redirect and
//! the callback: the access token, the refresh token, the expiry timestamp,
//! and the transient PKCE verifier and `state`. They live behind the
//! [`TokenStore`] trait so hosts can choose where a "session" lives:
//!
//! - [`MemoryTokenStore`] -- process memory; the session ends with the process
//! - [`FileTokenStore`]   -- a JSON file; survives between CLI invocations
//! - [`KeyringTokenStore`] -- the OS credential store
//!
//! All keys carry the `hanzo_commerce_` prefix.

pub mod file;
pub mod memory;
pub mod os_keyring;

use std::fmt;

use crate::error::Result;

pub use self::file::FileTokenStore;
pub use self::memory::MemoryTokenStore;
pub use self::os_keyring::KeyringTokenStore;

/// Prefix applied to every storage key.
pub const KEY_PREFIX: &str = "hanzo_commerce_";

/// The logical slots held by a [`TokenStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    /// Bearer access token
    AccessToken,
    /// Refresh token, when the identity provider issued one
    RefreshToken,
    /// Access token expiry, epoch milliseconds as a decimal string
    ExpiresAt,
    /// PKCE code verifier of the in-flight authorization request
    CodeVerifier,
    /// Anti-CSRF state of the in-flight authorization request
    State,
}

impl StorageKey {
    /// Every slot, in a stable order.
    pub const ALL: [StorageKey; 5] = [
        StorageKey::AccessToken,
        StorageKey::RefreshToken,
        StorageKey::ExpiresAt,
        StorageKey::CodeVerifier,
        StorageKey::State,
    ];

    /// The prefixed key under which the slot is stored.
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::AccessToken => "hanzo_commerce_access_token",
            StorageKey::RefreshToken => "hanzo_commerce_refresh_token",
            StorageKey::ExpiresAt => "hanzo_commerce_expires_at",
            StorageKey::CodeVerifier => "hanzo_commerce_code_verifier",
            StorageKey::State => "hanzo_commerce_state",
        }
    }
}

impl fmt::Display for StorageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Keyed string storage for session tokens.
///
/// Implementations report backend failures as errors; the
/// [`SessionTokenStore`](crate::session::SessionTokenStore) wrapper decides
/// how each failure is surfaced.
pub trait TokenStore: Send + Sync {
    /// Reads a slot. Returns `Ok(None)` when the slot is empty.
    fn get(&self, key: StorageKey) -> Result<Option<String>>;

    /// Writes a slot, replacing any previous value.
    fn set(&self, key: StorageKey, value: &str) -> Result<()>;

    /// Clears a slot. Clearing an empty slot is not an error.
    fn remove(&self, key: StorageKey) -> Result<()>;
}
