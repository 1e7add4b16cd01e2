//! Redirect callback parsing
//!
//! The identity provider returns to the redirect URI with either an
//! authorization code (`?code=..&state=..`), an implicit-grant token in the
//! query or fragment (`#access_token=..&expires_in=..`), or an error
//! (`?error=..&error_description=..`).

use std::collections::HashMap;

use url::Url;

/// Parameters extracted from a redirect callback URL.
///
/// Query parameters take precedence over fragment parameters for the
/// implicit-grant fields; `code`, `state`, and the error fields are only
/// read from the query string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    /// Authorization code
    pub code: Option<String>,
    /// Anti-CSRF state echoed by the provider
    pub state: Option<String>,
    /// Provider error code
    pub error: Option<String>,
    /// Human-readable provider error
    pub error_description: Option<String>,
    /// Implicit-grant access token
    pub access_token: Option<String>,
    /// Implicit-grant lifetime in seconds, as sent
    pub expires_in: Option<String>,
}

impl CallbackParams {
    /// Extracts the callback parameters from `url`.
    ///
    /// Empty values are treated as absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use url::Url;
    /// use hanzo_commerce::auth::CallbackParams;
    ///
    /// let url = Url::parse("http://127.0.0.1:8765/callback?code=abc&state=xyz").unwrap();
    /// let params = CallbackParams::from_url(&url);
    /// assert_eq!(params.code.as_deref(), Some("abc"));
    /// assert_eq!(params.state.as_deref(), Some("xyz"));
    /// ```
    pub fn from_url(url: &Url) -> Self {
        let query = parse_pairs(url.query().unwrap_or(""));
        let fragment = parse_pairs(url.fragment().unwrap_or(""));

        let from_query = |key: &str| query.get(key).cloned();
        let from_either = |key: &str| {
            query
                .get(key)
                .or_else(|| fragment.get(key))
                .cloned()
        };

        // expires_in travels alongside the token it describes
        let expires_in = if query.contains_key("access_token") {
            from_query("expires_in")
        } else {
            fragment
                .get("expires_in")
                .or_else(|| query.get("expires_in"))
                .cloned()
        };

        Self {
            code: from_query("code"),
            state: from_query("state"),
            error: from_query("error"),
            error_description: from_query("error_description"),
            access_token: from_either("access_token"),
            expires_in,
        }
    }

    /// `true` when the callback is an implicit-grant response.
    pub fn is_implicit_grant(&self) -> bool {
        self.access_token.is_some() && self.code.is_none()
    }

    /// Implicit-grant lifetime, if present and a valid number of seconds.
    pub fn expires_in_secs(&self) -> Option<u64> {
        self.expires_in
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
    }
}

/// Decodes an `application/x-www-form-urlencoded` string, keeping the first
/// non-empty value for each key.
fn parse_pairs(input: &str) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for (key, value) in url::form_urlencoded::parse(input.as_bytes()) {
        if value.is_empty() {
            continue;
        }
        out.entry(key.into_owned())
            .or_insert_with(|| value.into_owned());
    }
    out
}
