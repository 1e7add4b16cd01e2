/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

- `auth`: sign-in flow, session status, logout, refresh
- `billing`: read-only billing queries rendered as tables or JSON

Handlers open the configured session store on every invocation, so a
login started by one process can be completed by the next.
*/

pub mod auth;
pub mod billing;

use crate::auth::PkceLoginFlow;
use crate::client::CommerceClient;
use crate::config::Config;
use crate::error::{CommerceError, Result};
use crate::session::SessionTokenStore;

/// Builds a login flow over the configured session store.
///
/// # Errors
///
/// Returns an error if the session store cannot be opened.
pub fn login_flow(config: &Config) -> Result<PkceLoginFlow> {
    let session = config.open_session()?;
    Ok(PkceLoginFlow::new(config.iam_auth_config(), session))
}

/// Builds an API client.
///
/// A static token from the configuration takes precedence over the session's
/// access token.
///
/// # Errors
///
/// Returns an error if the session store cannot be opened or the base URL
/// is invalid.
pub fn commerce_client(config: &Config, session: &SessionTokenStore) -> Result<CommerceClient> {
    if config.commerce.token.is_some() {
        CommerceClient::new(config.client_config())
    } else {
        CommerceClient::from_session(config.client_config(), session)
    }
}

/// Resolves the user a billing command acts for: the explicit id, else the
/// `sub` of the signed-in user.
///
/// # Errors
///
/// Returns [`CommerceError::Config`] when neither is available.
pub fn resolve_user(explicit: Option<String>, session: &SessionTokenStore) -> Result<String> {
    if let Some(user) = explicit.filter(|u| !u.is_empty()) {
        return Ok(user);
    }

    session
        .get_access_token()
        .and_then(|token| crate::auth::decode_user(&token))
        .map(|user| user.sub)
        .filter(|sub| !sub.is_empty())
        .ok_or_else(|| {
            CommerceError::Config(
                "Not logged in. Run `hanzo-commerce login` or pass --user".to_string(),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TOKEN: &str = "h.eyJzdWIiOiJ1MSIsImVtYWlsIjoiYUBiLmMifQ.s";

    #[test]
    fn test_resolve_user_prefers_explicit() {
        let session = SessionTokenStore::in_memory();
        session.store_tokens(TOKEN, None, None).unwrap();
        assert_eq!(resolve_user(Some("other".into()), &session).unwrap(), "other");
    }

    #[test]
    fn test_resolve_user_from_session() {
        let session = SessionTokenStore::in_memory();
        session.store_tokens(TOKEN, None, None).unwrap();
        assert_eq!(resolve_user(None, &session).unwrap(), "u1");
        assert_eq!(resolve_user(Some(String::new()), &session).unwrap(), "u1");
    }

    #[test]
    fn test_resolve_user_logged_out() {
        let session = SessionTokenStore::in_memory();
        let err = resolve_user(None, &session).unwrap_err();
        assert!(matches!(err, CommerceError::Config(_)));
    }

    async fn plans_server(bearer: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/plan"))
            .and(header("authorization", format!("Bearer {bearer}").as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_static_token_wins_over_session_token() {
        let server = plans_server("static").await;
        let session = SessionTokenStore::in_memory();
        session.store_tokens(TOKEN, None, None).unwrap();

        let mut config = Config::default();
        config.commerce.base_url = server.uri();
        config.commerce.token = Some("static".to_string());

        let client = commerce_client(&config, &session).unwrap();
        client.get_plans().await.unwrap();
    }

    #[tokio::test]
    async fn test_session_token_used_without_static_token() {
        let server = plans_server(TOKEN).await;
        let session = SessionTokenStore::in_memory();
        session.store_tokens(TOKEN, None, None).unwrap();

        let mut config = Config::default();
        config.commerce.base_url = server.uri();

        let client = commerce_client(&config, &session).unwrap();
        client.get_plans().await.unwrap();
    }
}
