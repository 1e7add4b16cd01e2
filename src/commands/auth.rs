//! Sign-in commands
//!
//! `login` persists the PKCE parameters and prints the authorization URL.
//! The flow completes either in the same process (`--listen`, which accepts
//! the browser redirect on the loopback redirect URI) or later via
//! `callback <URL>`.

use std::time::Duration;

use colored::Colorize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

use crate::auth::{open_in_browser, IamUser, PkceLoginFlow};
use crate::commands::login_flow;
use crate::config::Config;
use crate::error::{CommerceError, Result};

const REDIRECT_RESPONSE: &str = "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\nSigned in to Hanzo. You may close this tab.";

const NOT_FOUND_RESPONSE: &str =
    "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// Starts the sign-in flow.
///
/// # Errors
///
/// Returns an error if the session store is unavailable, the redirect
/// listener cannot be bound, or the callback fails.
pub async fn login(config: &Config, no_browser: bool, listen: bool, listen_timeout: u64) -> Result<()> {
    let flow = login_flow(config)?;

    let listener = if listen {
        Some(bind_redirect_listener(&config.iam.redirect_uri).await?)
    } else {
        None
    };

    let request = flow.start()?;

    println!("\nOpen the following URL in your browser to sign in:\n");
    println!("  {}\n", request.url);

    if !no_browser && !open_in_browser(request.url.as_str()) {
        tracing::debug!("No browser opener available");
    }

    let Some(listener) = listener else {
        println!(
            "After signing in, run:\n\n  hanzo-commerce callback '<redirect URL>'\n"
        );
        return Ok(());
    };

    println!("Waiting for the redirect on {} ...", config.iam.redirect_uri);
    let callback_url = tokio::time::timeout(
        Duration::from_secs(listen_timeout),
        accept_redirect(listener, &config.iam.redirect_uri),
    )
    .await
    .map_err(|_| CommerceError::Timeout(Duration::from_secs(listen_timeout)))??;

    complete(&flow, &callback_url).await
}

/// Completes the sign-in flow with the URL the browser was sent to.
///
/// # Errors
///
/// Returns an error if the URL does not parse or the callback fails.
pub async fn callback(config: &Config, url: &str) -> Result<()> {
    let flow = login_flow(config)?;
    let url = Url::parse(url)?;
    complete(&flow, &url).await
}

async fn complete(flow: &PkceLoginFlow, url: &Url) -> Result<()> {
    let user = flow.handle_callback(url).await?;
    print_signed_in(user.as_ref());
    Ok(())
}

fn print_signed_in(user: Option<&IamUser>) {
    match user {
        Some(user) => println!("{} Signed in as {}", "✓".green(), user.label().bold()),
        None => println!("{} Signed in", "✓".green()),
    }
}

/// Prints the signed-in user.
///
/// # Errors
///
/// Returns an error if the session store is unavailable.
pub fn whoami(config: &Config) -> Result<()> {
    let flow = login_flow(config)?;

    match flow.current_user() {
        Some(user) => {
            println!("\nSigned-in User\n");
            println!("Name:    {}", user.display_name.as_deref().unwrap_or("-"));
            println!("Email:   {}", if user.email.is_empty() { "-" } else { &user.email });
            println!("Subject: {}", if user.sub.is_empty() { "-" } else { &user.sub });
            if let Some(avatar) = &user.avatar {
                println!("Avatar:  {}", avatar);
            }
            println!();
        }
        None if flow.is_logged_in() => {
            println!("Signed in, but the access token carries no readable identity");
        }
        None => println!("{}", "Not signed in".yellow()),
    }

    Ok(())
}

/// Prints the session status.
///
/// # Errors
///
/// Returns an error if the session store is unavailable.
pub fn status(config: &Config) -> Result<()> {
    let flow = login_flow(config)?;
    let session = flow.session();

    println!("\nSession Status\n");
    println!("IAM server:    {}", config.iam.server_url);
    println!("Storage:       {}", config.storage.backend);

    if session.is_logged_in() {
        println!("State:         {}", "signed in".green());
    } else if session.expires_at_ms().is_some() {
        println!("State:         {}", "expired".red());
    } else {
        println!("State:         {}", "signed out".yellow());
    }

    if let Some(expires_at) = session.expires_at_ms() {
        let when = chrono::DateTime::from_timestamp_millis(expires_at)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| expires_at.to_string());
        println!("Expires at:    {}", when);
    }

    println!(
        "Refresh token: {}",
        if session.refresh_token().is_some() { "yes" } else { "no" }
    );

    if session.pkce_state().is_some() {
        println!("Pending login: yes (complete it with `hanzo-commerce callback`)");
    }

    println!();
    Ok(())
}

/// Clears the stored session.
///
/// # Errors
///
/// Returns an error if the session store cannot be cleared.
pub fn logout(config: &Config) -> Result<()> {
    login_flow(config)?.logout()?;
    println!("{} Signed out", "✓".green());
    Ok(())
}

/// Refreshes the access token.
///
/// # Errors
///
/// Returns an error if no refresh token is stored or the token endpoint
/// rejects it.
pub async fn refresh(config: &Config) -> Result<()> {
    let flow = login_flow(config)?;
    let user = flow.refresh().await?;
    match user {
        Some(user) => println!("{} Token refreshed for {}", "✓".green(), user.label()),
        None => println!("{} Token refreshed", "✓".green()),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Loopback redirect listener
// ---------------------------------------------------------------------------

/// Binds the host and port of a loopback `redirect_uri`.
///
/// # Errors
///
/// Returns [`CommerceError::Config`] for a redirect URI without a host or
/// port, and [`CommerceError::Io`] if binding fails.
pub async fn bind_redirect_listener(redirect_uri: &str) -> Result<TcpListener> {
    let url = Url::parse(redirect_uri)?;
    let host = url.host_str().ok_or_else(|| {
        CommerceError::Config(format!("redirect URI has no host: {}", redirect_uri))
    })?;
    let port = url.port_or_known_default().ok_or_else(|| {
        CommerceError::Config(format!("redirect URI has no port: {}", redirect_uri))
    })?;

    let listener = TcpListener::bind((host, port)).await?;
    tracing::debug!(host, port, "Listening for the login redirect");
    Ok(listener)
}

/// Waits for the browser redirect and returns the full URL it carried.
///
/// Only the request line is used; the fragment never reaches the server, so
/// implicit-grant redirects must go through `callback` instead. Requests for
/// any other path (favicon fetches, speculative preconnects) get a 404 and
/// the listener keeps waiting.
///
/// # Errors
///
/// Returns [`CommerceError::Io`] if the listener fails and
/// [`CommerceError::Url`] if the redirect URI is invalid.
pub async fn accept_redirect(listener: TcpListener, redirect_uri: &str) -> Result<Url> {
    let base = Url::parse(redirect_uri)?;

    loop {
        let (stream, peer) = listener.accept().await?;
        tracing::debug!(peer = %peer, "Accepted login redirect connection");

        match serve_redirect(stream, &base).await {
            Ok(Some(url)) => return Ok(url),
            Ok(None) => {}
            Err(e) => tracing::warn!(peer = %peer, error = %e, "Dropped redirect connection"),
        }
    }
}

/// Answers one connection. `Some` when it was the redirect.
async fn serve_redirect(stream: TcpStream, base: &Url) -> Result<Option<Url>> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let mut request_line = String::new();
    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            break;
        }
        if request_line.is_empty() {
            request_line = line;
        }
    }

    // "GET /callback?code=...&state=... HTTP/1.1"
    let url = match request_line.split_whitespace().nth(1) {
        Some(target) => Some(base.join(target)?),
        None => None,
    };
    let url = url.filter(|url| url.path() == base.path());

    let response = if url.is_some() {
        REDIRECT_RESPONSE
    } else {
        tracing::debug!(request = %request_line, "Ignoring request off the redirect path");
        NOT_FOUND_RESPONSE
    };
    write_half.write_all(response.as_bytes()).await?;
    write_half.shutdown().await?;

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_accept_redirect_returns_full_url() {
        let listener = bind_redirect_listener("http://127.0.0.1:0/callback")
            .await
            .unwrap();
        let port = listener.local_addr().unwrap().port();
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);

        let server = tokio::spawn({
            let redirect_uri = redirect_uri.clone();
            async move { accept_redirect(listener, &redirect_uri).await }
        });

        let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
            .await
            .unwrap();
        stream
            .write_all(b"GET /callback?code=abc&state=xyz HTTP/1.1\r\nHost: localhost\r\n\r\n")
            .await
            .unwrap();

        let mut response = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut stream, &mut response)
            .await
            .unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"));

        let url = server.await.unwrap().unwrap();
        assert_eq!(url.path(), "/callback");
        assert_eq!(url.query(), Some("code=abc&state=xyz"));
        assert_eq!(url.port(), Some(port));
    }

    #[tokio::test]
    async fn test_accept_redirect_skips_other_paths() {
        let listener = bind_redirect_listener("http://127.0.0.1:0/callback")
            .await
            .unwrap();
        let port = listener.local_addr().unwrap().port();
        let redirect_uri = format!("http://127.0.0.1:{}/callback", port);

        let server = tokio::spawn({
            let redirect_uri = redirect_uri.clone();
            async move { accept_redirect(listener, &redirect_uri).await }
        });

        async fn send(port: u16, request: &[u8]) -> String {
            let mut stream = tokio::net::TcpStream::connect(("127.0.0.1", port))
                .await
                .unwrap();
            stream.write_all(request).await.unwrap();
            let mut response = String::new();
            tokio::io::AsyncReadExt::read_to_string(&mut stream, &mut response)
                .await
                .unwrap();
            response
        }

        // A preconnect that closes without sending anything.
        drop(
            tokio::net::TcpStream::connect(("127.0.0.1", port))
                .await
                .unwrap(),
        );

        let favicon = send(port, b"GET /favicon.ico HTTP/1.1\r\nHost: localhost\r\n\r\n").await;
        assert!(favicon.starts_with("HTTP/1.1 404 Not Found"));
        assert!(!server.is_finished());

        let redirect = send(
            port,
            b"GET /callback?code=abc&state=xyz HTTP/1.1\r\nHost: localhost\r\n\r\n",
        )
        .await;
        assert!(redirect.starts_with("HTTP/1.1 200 OK"));

        let url = server.await.unwrap().unwrap();
        assert_eq!(url.path(), "/callback");
        assert_eq!(url.query(), Some("code=abc&state=xyz"));
    }

    #[tokio::test]
    async fn test_bind_rejects_redirect_without_host() {
        let err = bind_redirect_listener("mailto:someone@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, CommerceError::Config(_)));
    }
}
