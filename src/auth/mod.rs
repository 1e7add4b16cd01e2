//! Hanzo IAM login
//!
//! OIDC authorization code flow with PKCE against a Casdoor-compatible IAM
//! server, plus decoding of the signed-in user from the access token.
//!
//! - [`pkce`] generates the `state`, verifier, and `S256` challenge
//! - [`flow`] drives the redirect, callback, token exchange, and refresh
//! - [`callback`] parses the redirect URL
//! - [`user`] decodes identity claims

pub mod callback;
pub mod flow;
pub mod pkce;
pub mod user;

pub use callback::CallbackParams;
pub use flow::{
    open_in_browser, AuthorizationRequest, FlowState, IamAuthConfig, PkceLoginFlow,
    DEFAULT_SCOPES,
};
pub use pkce::{CryptoProvider, PkceParams, SystemCrypto};
pub use user::{decode_user, IamUser};
