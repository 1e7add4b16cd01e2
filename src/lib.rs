//! Hanzo Commerce - IAM login and billing client library
//!
//! This library signs users in against a Hanzo IAM (Casdoor-compatible)
//! server with the OAuth2 authorization-code flow and PKCE, keeps the
//! resulting tokens in a session store, and calls the Commerce billing API
//! with typed requests and responses.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: PKCE parameters, callback parsing, the login flow, and user decoding
//! - `session`: session-scoped token slots with an injectable clock
//! - `storage`: `TokenStore` backends (memory, JSON file, OS keyring)
//! - `client`: the HTTP transport for the Commerce API
//! - `billing`: one method per Commerce API endpoint
//! - `types`: request and response bodies
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli` / `commands`: the command-line front end
//!
//! # Example
//!
//! ```no_run
//! use hanzo_commerce::{CommerceClient, CommerceClientConfig, IamAuthConfig, PkceLoginFlow, SessionTokenStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = SessionTokenStore::in_memory();
//!     let flow = PkceLoginFlow::new(
//!         IamAuthConfig::new("https://hanzo.id", "my-app", "http://127.0.0.1:8765/callback"),
//!         session.clone(),
//!     );
//!
//!     let request = flow.start()?;
//!     println!("Open {}", request.url);
//!
//!     // ... the browser is redirected back ...
//!     let redirect = url::Url::parse("http://127.0.0.1:8765/callback?code=c&state=s")?;
//!     flow.handle_callback(&redirect).await?;
//!
//!     let client = CommerceClient::from_session(CommerceClientConfig::default(), &session)?;
//!     let plans = client.get_plans().await?;
//!     println!("{} plans", plans.len());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod billing;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod session;
pub mod storage;
pub mod types;

// Re-export commonly used types
pub use auth::{
    decode_user, AuthorizationRequest, CallbackParams, CryptoProvider, FlowState, IamAuthConfig,
    IamUser, PkceLoginFlow, PkceParams, SystemCrypto,
};
pub use client::{ApiRequest, CommerceClient, CommerceClientConfig};
pub use config::Config;
pub use error::{AuthError, CommerceError, Result};
pub use session::{Clock, ManualClock, SessionTokenStore, SystemClock};
pub use storage::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, StorageKey, TokenStore};
