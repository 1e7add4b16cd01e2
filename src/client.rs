//! Commerce API HTTP client
//!
//! [`CommerceClient`] issues bearer-authenticated JSON requests against the
//! Commerce REST API. Every request is bounded by the client timeout (10
//! seconds by default); a request that exceeds it is dropped and reported as
//! [`CommerceError::Timeout`]. Non-2xx responses become
//! [`CommerceError::Api`] carrying the status code and
//! `"<status text>: <body>"`.
//!
//! The typed per-endpoint wrappers live in [`crate::billing`].
//!
//! # Example
//!
//! ```rust,no_run
//! use hanzo_commerce::client::{CommerceClient, CommerceClientConfig};
//!
//! #[tokio::main]
//! async fn main() -> hanzo_commerce::error::Result<()> {
//!     let client = CommerceClient::new(CommerceClientConfig::default())?
//!         .with_token("access-token");
//!
//!     let balance = client.get_balance("user-1", "usd").await?;
//!     println!("available: {}", balance.available);
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::debug;
use url::Url;

use crate::error::{CommerceError, Result};
use crate::session::SessionTokenStore;

/// Default Commerce API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.commerce.hanzo.ai";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Commerce API client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommerceClientConfig {
    /// Base URL of the Commerce API; trailing slashes are ignored.
    pub base_url: String,
    /// Bearer token sent when a request has no per-call token.
    pub token: Option<String>,
    /// Upper bound on each request, including reading the body.
    pub timeout: Duration,
}

impl Default for CommerceClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

// ---------------------------------------------------------------------------
// ApiRequest
// ---------------------------------------------------------------------------

/// A single Commerce API call.
///
/// `path` is resolved against the base URL the way a browser resolves a
/// relative reference, so an absolute path replaces any path on the base.
/// Segments added with [`segment`](Self::segment) are percent-encoded.
///
/// # Examples
///
/// ```
/// use hanzo_commerce::client::ApiRequest;
///
/// let request = ApiRequest::get("/api/v1/billing/transactions")
///     .param("user", "u1")
///     .param_opt("limit", Some(10u32))
///     .param_opt("offset", None::<u32>);
/// # let _ = request;
/// ```
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    segments: Vec<String>,
    params: Vec<(String, String)>,
    body: Option<JsonValue>,
    token: Option<String>,
}

impl ApiRequest {
    /// A request with the given method and path.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            segments: Vec::new(),
            params: Vec::new(),
            body: None,
            token: None,
        }
    }

    /// A `GET` request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// A `POST` request.
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    /// A `PATCH` request.
    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    /// A `DELETE` request.
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends one encoded path segment, such as a resource id.
    pub fn segment(mut self, segment: impl Into<String>) -> Self {
        self.segments.push(segment.into());
        self
    }

    /// Sets a query parameter, replacing an earlier value for `key`.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        self.params.retain(|(k, _)| *k != key);
        self.params.push((key, value.to_string()));
        self
    }

    /// Sets a query parameter when `value` is present.
    pub fn param_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.param(key, v),
            None => self,
        }
    }

    /// Sets the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::Serialization`] if `body` cannot be
    /// represented as JSON.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Overrides the client's bearer token for this call.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }
}

// ---------------------------------------------------------------------------
// CommerceClient
// ---------------------------------------------------------------------------

/// Commerce API client.
///
/// Cloning is cheap and clones share the connection pool.
#[derive(Debug, Clone)]
pub struct CommerceClient {
    http: reqwest::Client,
    base_url: Url,
    token: Option<String>,
    timeout: Duration,
}

impl CommerceClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::Url`] if the base URL does not parse.
    pub fn new(config: CommerceClientConfig) -> Result<Self> {
        let trimmed = config.base_url.trim_end_matches('/');
        let base_url = Url::parse(trimmed)?;

        debug!(base_url = %base_url, timeout = ?config.timeout, "Created Commerce API client");

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            token: config.token.filter(|t| !t.is_empty()),
            timeout: config.timeout,
        })
    }

    /// Creates a client carrying the session's current valid access token.
    ///
    /// The client is unauthenticated when the session is logged out.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::Url`] if the base URL does not parse.
    pub fn from_session(config: CommerceClientConfig, session: &SessionTokenStore) -> Result<Self> {
        let token = session.get_access_token();
        Self::new(CommerceClientConfig { token, ..config })
    }

    /// Replaces the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.set_token(token);
        self
    }

    /// A client for one call: `Some(token)` overrides the bearer token,
    /// `None` keeps the current one.
    ///
    /// ```no_run
    /// # async fn run(client: hanzo_commerce::CommerceClient) -> hanzo_commerce::Result<()> {
    /// let balance = client
    ///     .authorized(Some("other-token"))
    ///     .get_balance("user-1", "usd")
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn authorized(&self, token: Option<&str>) -> Self {
        match token {
            Some(token) => self.clone().with_token(token),
            None => self.clone(),
        }
    }

    /// Replaces the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the underlying HTTP client.
    pub fn with_http_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    /// Sets the bearer token used by subsequent requests.
    pub fn set_token(&mut self, token: impl Into<String>) {
        let token = token.into();
        self.token = if token.is_empty() { None } else { Some(token) };
    }

    /// Removes the bearer token.
    pub fn clear_token(&mut self) {
        self.token = None;
    }

    /// `true` when a bearer token is set.
    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// The normalized base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves the full URL of `request`.
    ///
    /// # Errors
    ///
    /// Returns [`CommerceError::Url`] if the path does not resolve.
    pub fn resolve(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = self.base_url.join(&request.path)?;

        if !request.segments.is_empty() {
            let mut segments = url.path_segments_mut().map_err(|_| {
                CommerceError::Config(format!("base URL cannot take a path: {}", self.base_url))
            })?;
            segments.pop_if_empty();
            for segment in &request.segments {
                segments.push(segment);
            }
        }

        if !request.params.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &request.params {
                query.append_pair(key, value);
            }
        }

        Ok(url)
    }

    /// Sends `request` and parses the JSON response body as `T`.
    ///
    /// # Errors
    ///
    /// - [`CommerceError::Timeout`] when the client timeout elapses
    /// - [`CommerceError::Api`] for a non-2xx response
    /// - [`CommerceError::Http`] for transport failures
    /// - [`CommerceError::Serialization`] when the body is not a `T`
    pub async fn request<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T> {
        let body = self.execute(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Sends `request` and discards the response body.
    ///
    /// # Errors
    ///
    /// As [`request`](Self::request), minus body parsing.
    pub async fn request_empty(&self, request: ApiRequest) -> Result<()> {
        self.execute(request).await.map(|_| ())
    }

    async fn execute(&self, request: ApiRequest) -> Result<String> {
        let url = self.resolve(&request)?;
        let method = request.method.clone();

        let mut builder = self
            .http
            .request(method.clone(), url.clone())
            .header(reqwest::header::ACCEPT, "application/json");

        if let Some(token) = request.token.as_deref().or(self.token.as_deref()) {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            // `.json()` also sets Content-Type: application/json
            builder = builder.json(body);
        }

        debug!(method = %method, path = %url.path(), "Commerce API request");

        match tokio::time::timeout(self.timeout, Self::exchange(builder)).await {
            Ok(Ok(body)) => Ok(body),
            Ok(Err(e)) => {
                debug!(method = %method, path = %url.path(), error = %e, "Commerce API request failed");
                Err(e)
            }
            Err(_) => {
                debug!(method = %method, path = %url.path(), timeout = ?self.timeout, "Commerce API request timed out");
                Err(CommerceError::Timeout(self.timeout))
            }
        }
    }

    async fn exchange(builder: reqwest::RequestBuilder) -> Result<String> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response.text().await?);
        }

        let text = response.text().await.unwrap_or_default();
        let reason = status.canonical_reason().unwrap_or("");
        Err(CommerceError::api(
            status.as_u16(),
            format!("{reason}: {text}").trim(),
        ))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn client(base: &str) -> CommerceClient {
        CommerceClient::new(CommerceClientConfig {
            base_url: base.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = CommerceClientConfig::default();
        assert_eq!(config.base_url, "https://api.commerce.hanzo.ai");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.token, None);
    }

    #[test]
    fn test_base_url_trailing_slashes_stripped() {
        let c = client("https://api.example.com///");
        assert_eq!(c.base_url().as_str(), "https://api.example.com/");
    }

    #[test]
    fn test_invalid_base_url() {
        let err = CommerceClient::new(CommerceClientConfig {
            base_url: "::nope".to_string(),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(err, CommerceError::Url(_)));
    }

    #[test]
    fn test_resolve_absolute_path_replaces_base_path() {
        let c = client("https://api.example.com/gateway/");
        let url = c.resolve(&ApiRequest::get("/api/v1/plan")).unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/api/v1/plan");
    }

    #[test]
    fn test_resolve_encodes_segments() {
        let c = client("https://api.example.com");
        let url = c
            .resolve(
                &ApiRequest::post("/api/v1/subscribe")
                    .segment("sub/1 x")
                    .segment("promotion"),
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/api/v1/subscribe/sub%2F1%20x/promotion"
        );
    }

    #[test]
    fn test_resolve_query_params() {
        let c = client("https://api.example.com");
        let url = c
            .resolve(
                &ApiRequest::get("/api/v1/billing/balance")
                    .param("user", "a b")
                    .param("currency", "usd")
                    .param("currency", "eur")
                    .param_opt("limit", None::<u32>),
            )
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.com/api/v1/billing/balance?user=a+b&currency=eur"
        );
    }

    #[test]
    fn test_set_and_clear_token() {
        let mut c = client("https://api.example.com");
        assert!(!c.has_token());
        c.set_token("tok");
        assert!(c.has_token());
        c.set_token("");
        assert!(!c.has_token());
        c.set_token("tok");
        c.clear_token();
        assert!(!c.has_token());
    }

    #[test]
    fn test_authorized_leaves_original_untouched() {
        let c = client("https://api.example.com").with_token("base");

        let scoped = c.authorized(Some("call"));
        assert_eq!(scoped.token.as_deref(), Some("call"));
        assert_eq!(c.token.as_deref(), Some("base"));

        assert_eq!(c.authorized(None).token.as_deref(), Some("base"));
        assert!(!client("https://api.example.com").authorized(None).has_token());
    }

    #[test]
    fn test_from_session_uses_valid_token_only() {
        use crate::session::ManualClock;

        let clock = Arc::new(ManualClock::new(0));
        let session = SessionTokenStore::in_memory().with_clock(clock.clone());
        session.store_tokens("tok", None, Some(60)).unwrap();

        let c = CommerceClient::from_session(CommerceClientConfig::default(), &session).unwrap();
        assert!(c.has_token());

        clock.set_ms(60_000);
        let c = CommerceClient::from_session(CommerceClientConfig::default(), &session).unwrap();
        assert!(!c.has_token());
    }

    #[test]
    fn test_json_body_serialization() {
        let request = ApiRequest::post("/x")
            .json(&serde_json::json!({ "user": "u1" }))
            .unwrap();
        assert_eq!(request.body, Some(serde_json::json!({ "user": "u1" })));
        assert_eq!(request.method(), &Method::POST);
    }
}
