//! Error types for Hanzo Commerce
//!
//! This module defines the error types shared by the login flow, the token
//! store, and the billing client, using `thiserror` for ergonomic error
//! handling.

use std::time::Duration;

use thiserror::Error;

/// Protocol errors raised by the PKCE login flow.
///
/// Every variant indicates either interference with the redirect or a broken
/// flow, so none of them are swallowed by the flow itself.
#[derive(Error, Debug)]
pub enum AuthError {
    /// The identity provider redirected back with an `error` parameter
    #[error("OAuth error: {description}")]
    Provider {
        /// The raw `error` code
        error: String,
        /// `error_description` when present, otherwise the code
        description: String,
    },

    /// The callback carried neither a code nor an implicit-grant token
    #[error("No authorization code in callback")]
    MissingCode,

    /// The callback `state` did not match the stored anti-CSRF value
    #[error("State mismatch -- possible CSRF")]
    StateMismatch,

    /// No PKCE code verifier was stored for this callback
    #[error("Missing code verifier")]
    MissingVerifier,

    /// The token endpoint answered with a non-2xx status
    #[error("Token exchange failed ({status}): {detail}")]
    TokenExchange {
        /// HTTP status code
        status: u16,
        /// Response body text
        detail: String,
    },

    /// The token endpoint response did not contain an access token
    #[error("No access token received")]
    MissingAccessToken,

    /// A refresh was requested but no refresh token is stored
    #[error("No refresh token stored")]
    MissingRefreshToken,
}

/// Main error type for Hanzo Commerce operations
#[derive(Error, Debug)]
pub enum CommerceError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Login flow protocol errors
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Non-2xx response from the Commerce API
    #[error("Commerce API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// `"<status text>: <response body>"`
        message: String,
    },

    /// A request did not complete within the client's timeout
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    /// Token storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// URL parsing errors
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// HTTP transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl CommerceError {
    /// Builds an API error from a status code and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Returns the HTTP status of an [`CommerceError::Api`] error.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` when the error is the CSRF `state` mismatch.
    pub fn is_state_mismatch(&self) -> bool {
        matches!(self, Self::Auth(AuthError::StateMismatch))
    }
}

/// Result type alias for Hanzo Commerce operations
pub type Result<T> = std::result::Result<T, CommerceError>;
