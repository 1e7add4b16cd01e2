//! Authorization code flow with PKCE against Hanzo IAM
//!
//! The flow is split across a redirect: [`PkceLoginFlow::start`] persists the
//! PKCE parameters and returns the authorization URL; the host sends the user
//! there; the identity provider redirects back; [`PkceLoginFlow::handle_callback`]
//! is then called with the full redirect URL, possibly from a different
//! process. Everything that crosses the redirect lives in the
//! [`SessionTokenStore`].
//!
//! # Flow overview
//!
//! 1. Generate `state` and `code_verifier`, derive the `S256` challenge.
//! 2. Persist `state` and `code_verifier`.
//! 3. Build `{iam}/login/oauth/authorize?...` and hand it to the host.
//! 4. On callback: reject provider errors, accept an implicit-grant token,
//!    or validate `state` and exchange the code at
//!    `{iam}/api/login/oauth/access_token`.
//! 5. Persist the tokens and decode the user from the access token.
//!
//! # References
//!
//! - RFC 6749 <https://www.rfc-editor.org/rfc/rfc6749>
//! - RFC 7636 PKCE <https://www.rfc-editor.org/rfc/rfc7636>

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use url::Url;

use crate::auth::callback::CallbackParams;
use crate::auth::pkce::{CryptoProvider, PkceParams, SystemCrypto, CHALLENGE_METHOD};
use crate::auth::user::{decode_user, IamUser};
use crate::error::{AuthError, CommerceError, Result};
use crate::session::SessionTokenStore;

/// Path of the authorization endpoint relative to the IAM server.
pub const AUTHORIZE_PATH: &str = "/login/oauth/authorize";

/// Path of the token endpoint relative to the IAM server.
pub const TOKEN_PATH: &str = "/api/login/oauth/access_token";

/// Scopes requested when none are configured.
pub const DEFAULT_SCOPES: &str = "openid profile email";

// ---------------------------------------------------------------------------
// IamAuthConfig
// ---------------------------------------------------------------------------

/// Per-application settings for the login flow.
///
/// # Examples
///
/// ```
/// use hanzo_commerce::auth::IamAuthConfig;
///
/// let config = IamAuthConfig::new(
///     "https://hanzo.id/",
///     "my-client",
///     "http://127.0.0.1:8765/callback",
/// );
/// assert_eq!(config.token_endpoint(), "https://hanzo.id/api/login/oauth/access_token");
/// assert_eq!(config.scopes, "openid profile email");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IamAuthConfig {
    /// IAM server base URL; trailing slashes are ignored.
    pub iam_server_url: String,

    /// OAuth client identifier registered with the IAM server.
    pub client_id: String,

    /// Redirect URI registered for `client_id`.
    pub redirect_uri: String,

    /// Space-separated scopes sent with the authorization request.
    pub scopes: String,
}

impl IamAuthConfig {
    /// Creates a config requesting [`DEFAULT_SCOPES`].
    pub fn new(
        iam_server_url: impl Into<String>,
        client_id: impl Into<String>,
        redirect_uri: impl Into<String>,
    ) -> Self {
        Self {
            iam_server_url: iam_server_url.into(),
            client_id: client_id.into(),
            redirect_uri: redirect_uri.into(),
            scopes: DEFAULT_SCOPES.to_string(),
        }
    }

    /// The IAM server URL without trailing slashes.
    pub fn base_url(&self) -> &str {
        self.iam_server_url.trim_end_matches('/')
    }

    /// Full URL of the authorization endpoint, without query.
    pub fn authorize_endpoint(&self) -> String {
        format!("{}{}", self.base_url(), AUTHORIZE_PATH)
    }

    /// Full URL of the token endpoint.
    pub fn token_endpoint(&self) -> String {
        format!("{}{}", self.base_url(), TOKEN_PATH)
    }
}

// ---------------------------------------------------------------------------
// FlowState / AuthorizationRequest
// ---------------------------------------------------------------------------

/// Where a [`PkceLoginFlow`] instance is in the login lifecycle.
///
/// A new `start()` always moves to `Authorizing`, abandoning any earlier
/// in-flight request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowState {
    /// Nothing started yet, or logged out
    #[default]
    Idle,
    /// Authorization URL issued, waiting for the redirect
    Authorizing,
    /// A callback is being processed
    CallbackPending,
    /// Tokens stored
    Authenticated,
    /// The last callback or refresh failed
    Failed,
}

impl FlowState {
    /// `true` for `Authenticated` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, FlowState::Authenticated | FlowState::Failed)
    }
}

/// An authorization request ready to be opened in a browser.
///
/// `state` and `code_verifier` have already been persisted; they are exposed
/// for hosts that keep their own correlation records.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    /// URL to send the user to
    pub url: Url,
    /// Anti-CSRF state included in `url`
    pub state: String,
    /// PKCE verifier to be presented at the token endpoint
    pub code_verifier: String,
    /// `S256` challenge included in `url`
    pub code_challenge: String,
}

// ---------------------------------------------------------------------------
// Token endpoint response (raw deserialization)
// ---------------------------------------------------------------------------

/// Raw JSON response from the token endpoint.
///
/// Every field is optional so that a missing `access_token` surfaces as
/// [`AuthError::MissingAccessToken`] rather than a parse error.
#[derive(Debug, Default, serde::Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// A validated token grant.
#[derive(Debug)]
struct TokenGrant {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<u64>,
}

impl TryFrom<TokenResponse> for TokenGrant {
    type Error = AuthError;

    fn try_from(raw: TokenResponse) -> std::result::Result<Self, Self::Error> {
        if let Some(error) = raw.error.filter(|e| !e.is_empty()) {
            let description = raw
                .error_description
                .filter(|d| !d.is_empty())
                .unwrap_or_else(|| error.clone());
            return Err(AuthError::Provider { error, description });
        }

        let access_token = raw
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingAccessToken)?;

        Ok(Self {
            access_token,
            refresh_token: raw.refresh_token.filter(|t| !t.is_empty()),
            expires_in: raw.expires_in,
        })
    }
}

// ---------------------------------------------------------------------------
// PkceLoginFlow
// ---------------------------------------------------------------------------

/// Drives the PKCE login flow for one application.
///
/// # Examples
///
/// ```no_run
/// use hanzo_commerce::auth::{IamAuthConfig, PkceLoginFlow};
/// use hanzo_commerce::session::SessionTokenStore;
///
/// # async fn example() -> hanzo_commerce::error::Result<()> {
/// let config = IamAuthConfig::new("https://hanzo.id", "my-client", "http://127.0.0.1:8765/callback");
/// let flow = PkceLoginFlow::new(config, SessionTokenStore::in_memory());
///
/// let request = flow.start()?;
/// println!("Open {}", request.url);
///
/// // ... after the redirect:
/// let redirect = url::Url::parse("http://127.0.0.1:8765/callback?code=abc&state=xyz")?;
/// let user = flow.handle_callback(&redirect).await?;
/// # let _ = user;
/// # Ok(())
/// # }
/// ```
pub struct PkceLoginFlow {
    config: IamAuthConfig,
    session: SessionTokenStore,
    crypto: Arc<dyn CryptoProvider>,
    http: reqwest::Client,
    state: Mutex<FlowState>,
}

impl PkceLoginFlow {
    /// Creates a flow using [`SystemCrypto`] and a default HTTP client.
    pub fn new(config: IamAuthConfig, session: SessionTokenStore) -> Self {
        Self {
            config,
            session,
            crypto: Arc::new(SystemCrypto),
            http: reqwest::Client::new(),
            state: Mutex::new(FlowState::Idle),
        }
    }

    /// Replaces the crypto provider.
    pub fn with_crypto(mut self, crypto: Arc<dyn CryptoProvider>) -> Self {
        self.crypto = crypto;
        self
    }

    /// Replaces the HTTP client used for the token endpoint.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// The flow configuration.
    pub fn config(&self) -> &IamAuthConfig {
        &self.config
    }

    /// The session the flow reads and writes.
    pub fn session(&self) -> &SessionTokenStore {
        &self.session
    }

    /// Current lifecycle state of this instance.
    pub fn state(&self) -> FlowState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, next: FlowState) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        tracing::debug!(from = ?*state, to = ?next, "Login flow state change");
        *state = next;
    }

    // -----------------------------------------------------------------------
    // start
    // -----------------------------------------------------------------------

    /// Begins a login: persists fresh PKCE parameters and returns the
    /// authorization URL.
    ///
    /// Any previously stored `state` and `code_verifier` are overwritten.
    ///
    /// # Errors
    ///
    /// Returns an error if the IAM server URL does not parse or the
    /// parameters cannot be persisted.
    pub fn start(&self) -> Result<AuthorizationRequest> {
        let params = PkceParams::generate(self.crypto.as_ref());
        self.session
            .set_pkce(&params.state, &params.code_verifier)?;

        let mut url = Url::parse(&self.config.authorize_endpoint())?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scopes)
            .append_pair("state", &params.state)
            .append_pair("code_challenge", &params.code_challenge)
            .append_pair("code_challenge_method", CHALLENGE_METHOD);

        self.set_state(FlowState::Authorizing);
        tracing::info!(
            client_id = %self.config.client_id,
            endpoint = %self.config.authorize_endpoint(),
            "Login started"
        );

        Ok(AuthorizationRequest {
            url,
            state: params.state,
            code_verifier: params.code_verifier,
            code_challenge: params.code_challenge,
        })
    }

    // -----------------------------------------------------------------------
    // handle_callback
    // -----------------------------------------------------------------------

    /// Completes a login from the redirect URL.
    ///
    /// Returns the user decoded from the new access token, or `None` when the
    /// token is not a decodable JWT. The stored PKCE parameters are consumed
    /// whether or not the callback succeeds.
    ///
    /// # Errors
    ///
    /// - [`AuthError::Provider`] when the redirect carries `error`
    /// - [`AuthError::MissingCode`] when there is neither a code nor a token
    /// - [`AuthError::StateMismatch`] when `state` differs from the stored
    ///   value; no request is made
    /// - [`AuthError::MissingVerifier`] when no verifier is stored
    /// - [`AuthError::TokenExchange`] on a non-2xx token response
    /// - [`AuthError::MissingAccessToken`] when the response has no token
    pub async fn handle_callback(&self, callback_url: &Url) -> Result<Option<IamUser>> {
        self.set_state(FlowState::CallbackPending);

        match self.process_callback(callback_url).await {
            Ok(user) => {
                self.set_state(FlowState::Authenticated);
                tracing::info!(
                    user = user.as_ref().map(|u| u.sub.as_str()).unwrap_or(""),
                    "Login completed"
                );
                Ok(user)
            }
            Err(e) => {
                if let Err(clear_err) = self.session.clear_pkce() {
                    tracing::warn!(error = %clear_err, "Failed to clear PKCE parameters");
                }
                self.set_state(FlowState::Failed);
                tracing::warn!(error = %e, "Login callback failed");
                Err(e)
            }
        }
    }

    async fn process_callback(&self, callback_url: &Url) -> Result<Option<IamUser>> {
        let params = CallbackParams::from_url(callback_url);

        if let Some(error) = params.error {
            let description = params
                .error_description
                .unwrap_or_else(|| error.clone());
            return Err(AuthError::Provider { error, description }.into());
        }

        if let (None, Some(token)) = (params.code.as_deref(), params.access_token.as_deref()) {
            tracing::debug!("Accepting implicit-grant token from callback");
            self.session
                .store_tokens(token, None, params.expires_in_secs())?;
            self.session.clear_pkce()?;
            return Ok(self.current_user());
        }

        let code = params.code.ok_or(AuthError::MissingCode)?;

        match (self.session.pkce_state(), params.state.as_deref()) {
            (Some(saved), Some(returned)) if saved == returned => {}
            _ => return Err(AuthError::StateMismatch.into()),
        }

        let code_verifier = self
            .session
            .pkce_code_verifier()
            .ok_or(AuthError::MissingVerifier)?;

        self.session.clear_pkce()?;

        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.config.client_id.as_str()),
            ("code", code.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("code_verifier", code_verifier.as_str()),
        ];
        let grant = self.request_token(&form).await?;
        self.store_grant(&grant)?;

        Ok(self.current_user())
    }

    // -----------------------------------------------------------------------
    // refresh
    // -----------------------------------------------------------------------

    /// Exchanges the stored refresh token for a new access token.
    ///
    /// A refresh token in the response replaces the stored one; otherwise the
    /// stored one is kept.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingRefreshToken`] when none is stored, and the
    /// token endpoint errors of [`handle_callback`](Self::handle_callback).
    pub async fn refresh(&self) -> Result<Option<IamUser>> {
        let refresh_token = self
            .session
            .refresh_token()
            .ok_or(AuthError::MissingRefreshToken)?;

        let mut form: HashMap<&str, &str> = HashMap::new();
        form.insert("grant_type", "refresh_token");
        form.insert("client_id", &self.config.client_id);
        form.insert("refresh_token", &refresh_token);

        match self.request_token(&form).await {
            Ok(grant) => {
                self.store_grant(&grant)?;
                self.set_state(FlowState::Authenticated);
                tracing::info!("Access token refreshed");
                Ok(self.current_user())
            }
            Err(e) => {
                self.set_state(FlowState::Failed);
                tracing::warn!(error = %e, "Token refresh failed");
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Session accessors
    // -----------------------------------------------------------------------

    /// The user decoded from the current valid access token.
    pub fn current_user(&self) -> Option<IamUser> {
        self.session
            .get_access_token()
            .and_then(|token| decode_user(&token))
    }

    /// `true` while a non-expired access token is stored.
    pub fn is_logged_in(&self) -> bool {
        self.session.is_logged_in()
    }

    /// The current valid access token.
    pub fn access_token(&self) -> Option<String> {
        self.session.get_access_token()
    }

    /// Clears every stored token and PKCE parameter. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns the first storage failure; all slots are still attempted.
    pub fn logout(&self) -> Result<()> {
        self.session.clear()?;
        self.set_state(FlowState::Idle);
        tracing::info!("Logged out");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Private helpers
    // -----------------------------------------------------------------------

    async fn request_token<T: serde::Serialize + ?Sized>(&self, form: &T) -> Result<TokenGrant> {
        let endpoint = self.config.token_endpoint();
        tracing::debug!(endpoint = %endpoint, "Requesting token");

        let resp = self.http.post(&endpoint).form(form).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let detail = resp.text().await.unwrap_or_default();
            return Err(AuthError::TokenExchange {
                status: status.as_u16(),
                detail,
            }
            .into());
        }

        let body = resp.text().await?;
        let raw: TokenResponse = if body.trim().is_empty() {
            TokenResponse::default()
        } else {
            serde_json::from_str(&body).map_err(CommerceError::Serialization)?
        };

        Ok(TokenGrant::try_from(raw)?)
    }

    fn store_grant(&self, grant: &TokenGrant) -> Result<()> {
        self.session.store_tokens(
            &grant.access_token,
            grant.refresh_token.as_deref(),
            grant.expires_in,
        )
    }
}

impl std::fmt::Debug for PkceLoginFlow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceLoginFlow")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Browser launch
// ---------------------------------------------------------------------------

/// Tries to open `url` with the platform's default handler.
///
/// Returns `false` when no opener could be spawned; the caller should then
/// print the URL for the user to open manually.
pub fn open_in_browser(url: &str) -> bool {
    #[cfg(target_os = "macos")]
    let spawned = std::process::Command::new("open").arg(url).spawn();

    #[cfg(target_os = "linux")]
    let spawned = std::process::Command::new("xdg-open").arg(url).spawn();

    #[cfg(target_os = "windows")]
    let spawned = std::process::Command::new("cmd")
        .args(["/C", "start", "", url])
        .spawn();

    #[cfg(not(any(target_os = "macos", target_os = "linux", target_os = "windows")))]
    let spawned: std::io::Result<std::process::Child> = Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "no browser opener for this platform",
    ));

    match spawned {
        Ok(_) => true,
        Err(e) => {
            tracing::debug!(error = %e, "Could not launch browser");
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
