//! Login session state
//!
//! [`SessionTokenStore`] is the only reader of the raw storage slots. It
//! applies the session invariant: an access token counts only while its
//! recorded expiry lies in the future (or no expiry was recorded). An expired
//! token, an absent token, and a failing storage backend are all
//! indistinguishable from "not logged in".

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use crate::error::Result;
use crate::storage::{MemoryTokenStore, StorageKey, TokenStore};

/// Token lifetime assumed when the identity provider omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of the current time in epoch milliseconds.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_ms(&self) -> i64;
}

/// Wall-clock time via `chrono`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// A clock that only moves when told to.
///
/// # Examples
///
/// ```
/// use hanzo_commerce::session::{Clock, ManualClock};
///
/// let clock = ManualClock::new(1_000);
/// clock.advance_ms(500);
/// assert_eq!(clock.now_ms(), 1_500);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Creates a clock reading `now_ms`.
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: AtomicI64::new(now_ms),
        }
    }

    /// Sets the current reading.
    pub fn set_ms(&self, now_ms: i64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    /// Moves the clock forward (or backward, for negative `delta_ms`).
    pub fn advance_ms(&self, delta_ms: i64) {
        self.now.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// SessionTokenStore
// ---------------------------------------------------------------------------

/// Typed access to the session slots of a [`TokenStore`].
///
/// Cloning is cheap; clones share the same backend and clock.
///
/// # Examples
///
/// ```
/// use hanzo_commerce::session::SessionTokenStore;
///
/// let session = SessionTokenStore::in_memory();
/// assert!(!session.is_logged_in());
///
/// session.store_tokens("access", None, Some(60)).unwrap();
/// assert_eq!(session.get_access_token().as_deref(), Some("access"));
///
/// session.clear().unwrap();
/// assert!(session.get_access_token().is_none());
/// ```
#[derive(Clone)]
pub struct SessionTokenStore {
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
}

impl SessionTokenStore {
    /// Wraps `store` using the system clock.
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
        }
    }

    /// A session backed by a fresh [`MemoryTokenStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryTokenStore::new()))
    }

    /// Replaces the clock used for expiry checks and expiry computation.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Current time according to this session's clock.
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// Reads a slot, mapping backend failures to "absent".
    fn read(&self, key: StorageKey) -> Option<String> {
        match self.store.get(key) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Token store read failed");
                None
            }
        }
    }

    // -----------------------------------------------------------------------
    // Access token
    // -----------------------------------------------------------------------

    /// Returns `true` iff an access token is stored and it has not expired.
    ///
    /// A stored expiry that does not parse as an integer counts as expired.
    pub fn is_logged_in(&self) -> bool {
        if self.read(StorageKey::AccessToken).is_none() {
            return false;
        }
        match self.read(StorageKey::ExpiresAt) {
            None => true,
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(expires_at) => expires_at > self.clock.now_ms(),
                Err(_) => {
                    tracing::debug!(value = %raw, "Unparseable token expiry, treating as expired");
                    false
                }
            },
        }
    }

    /// Returns the access token only while [`is_logged_in`](Self::is_logged_in) holds.
    pub fn get_access_token(&self) -> Option<String> {
        if !self.is_logged_in() {
            return None;
        }
        self.read(StorageKey::AccessToken)
    }

    /// The stored refresh token, if any.
    pub fn refresh_token(&self) -> Option<String> {
        self.read(StorageKey::RefreshToken)
    }

    /// The stored expiry in epoch milliseconds, if any and parseable.
    pub fn expires_at_ms(&self) -> Option<i64> {
        self.read(StorageKey::ExpiresAt)
            .and_then(|raw| raw.trim().parse().ok())
    }

    /// Persists a freshly issued access token.
    ///
    /// The expiry is `now + expires_in * 1000`, with `expires_in` defaulting
    /// to [`DEFAULT_EXPIRES_IN_SECS`]. The refresh token slot is written only
    /// when a refresh token is supplied.
    ///
    /// # Errors
    ///
    /// Propagates backend write failures. After a failed write the access
    /// token slot is cleared, so the session reads as logged out.
    pub fn store_tokens(
        &self,
        access_token: &str,
        refresh_token: Option<&str>,
        expires_in_secs: Option<u64>,
    ) -> Result<()> {
        let expires_in = expires_in_secs.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let lifetime_ms = i64::try_from(expires_in.saturating_mul(1000)).unwrap_or(i64::MAX);
        let expires_at = self.clock.now_ms().saturating_add(lifetime_ms);

        // The expiry goes first: an access token must never be readable
        // without the expiry that bounds it.
        let written = self
            .store
            .set(StorageKey::ExpiresAt, &expires_at.to_string())
            .and_then(|()| match refresh_token {
                Some(refresh) => self.store.set(StorageKey::RefreshToken, refresh),
                None => Ok(()),
            })
            .and_then(|()| self.store.set(StorageKey::AccessToken, access_token));

        if let Err(e) = written {
            if let Err(remove_err) = self.store.remove(StorageKey::AccessToken) {
                tracing::warn!(error = %remove_err, "Failed to drop access token after partial write");
            }
            return Err(e);
        }

        tracing::debug!(expires_at, has_refresh = refresh_token.is_some(), "Stored session tokens");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // PKCE slots
    // -----------------------------------------------------------------------

    /// Persists the parameters of a new authorization request, replacing any
    /// in-flight request.
    ///
    /// # Errors
    ///
    /// Propagates backend write failures.
    pub fn set_pkce(&self, state: &str, code_verifier: &str) -> Result<()> {
        self.store.set(StorageKey::State, state)?;
        self.store.set(StorageKey::CodeVerifier, code_verifier)
    }

    /// The anti-CSRF `state` of the in-flight request.
    pub fn pkce_state(&self) -> Option<String> {
        self.read(StorageKey::State)
    }

    /// The PKCE verifier of the in-flight request.
    pub fn pkce_code_verifier(&self) -> Option<String> {
        self.read(StorageKey::CodeVerifier)
    }

    /// Clears both PKCE slots.
    ///
    /// Both removals are attempted even if the first fails.
    ///
    /// # Errors
    ///
    /// Returns the first backend failure.
    pub fn clear_pkce(&self) -> Result<()> {
        self.remove_all(&[StorageKey::State, StorageKey::CodeVerifier])
    }

    // -----------------------------------------------------------------------
    // Logout
    // -----------------------------------------------------------------------

    /// Clears all five slots. Idempotent.
    ///
    /// Every removal is attempted even if an earlier one fails.
    ///
    /// # Errors
    ///
    /// Returns the first backend failure.
    pub fn clear(&self) -> Result<()> {
        self.remove_all(&StorageKey::ALL)
    }

    fn remove_all(&self, keys: &[StorageKey]) -> Result<()> {
        let mut first_error = None;
        for key in keys {
            if let Err(e) = self.store.remove(*key) {
                tracing::warn!(key = %key, error = %e, "Token store remove failed");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for SessionTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTokenStore")
            .field("logged_in", &self.is_logged_in())
            .finish()
    }
}
