//! User identity derived from the access token
//!
//! The access token is a JWT whose payload carries the identity claims. The
//! payload is decoded without verifying the signature: the result is display
//! data for the host, not an authorization decision.

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identity claims read from the current access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IamUser {
    /// `email`, falling back to `name`, else empty
    pub email: String,
    /// `displayName`, falling back to `name`
    pub display_name: Option<String>,
    /// `avatar` URL
    pub avatar: Option<String>,
    /// `sub`, falling back to `name`, else empty
    pub sub: String,
}

impl IamUser {
    /// Maps a decoded JWT payload onto an [`IamUser`].
    ///
    /// Returns `None` unless the payload is a JSON object. Claims that are
    /// present but not strings are ignored.
    pub fn from_claims(claims: &Value) -> Option<Self> {
        let obj = claims.as_object()?;
        let claim = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);
        let name = claim("name");

        Some(Self {
            email: claim("email").or_else(|| name.clone()).unwrap_or_default(),
            display_name: claim("displayName").or_else(|| name.clone()),
            avatar: claim("avatar"),
            sub: claim("sub").or(name).unwrap_or_default(),
        })
    }

    /// Label for terminal output.
    pub fn label(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ if !self.email.is_empty() => &self.email,
            _ => &self.sub,
        }
    }
}

/// Decodes the payload segment of `token` into an [`IamUser`].
///
/// Returns `None` for anything that is not a three-part token with a base64
/// JSON-object payload.
///
/// # Examples
///
/// ```
/// use hanzo_commerce::auth::decode_user;
///
/// // {"sub":"u1","email":"a@b.c"}
/// let token = "h.eyJzdWIiOiJ1MSIsImVtYWlsIjoiYUBiLmMifQ.s";
/// let user = decode_user(token).unwrap();
/// assert_eq!(user.sub, "u1");
/// assert_eq!(user.email, "a@b.c");
///
/// assert!(decode_user("not-a-jwt").is_none());
/// ```
pub fn decode_user(token: &str) -> Option<IamUser> {
    let mut parts = token.split('.');
    let (_header, payload) = (parts.next()?, parts.next()?);
    parts.next()?;

    let bytes = decode_segment(payload)?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    IamUser::from_claims(&claims)
}

fn decode_segment(segment: &str) -> Option<Vec<u8>> {
    use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};

    let trimmed = segment.trim_end_matches('=');
    URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| STANDARD_NO_PAD.decode(trimmed))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
    use serde_json::json;

    fn token_with(payload: &Value) -> String {
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("eyJhbGciOiJub25lIn0.{body}.sig")
    }

    #[test]
    fn test_full_claims() {
        let token = token_with(&json!({
            "sub": "user-1",
            "email": "ada@example.com",
            "displayName": "Ada",
            "avatar": "https://img.example.com/ada.png",
            "name": "ada"
        }));
        let user = decode_user(&token).unwrap();
        assert_eq!(user.sub, "user-1");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.display_name.as_deref(), Some("Ada"));
        assert_eq!(user.avatar.as_deref(), Some("https://img.example.com/ada.png"));
    }

    #[test]
    fn test_name_fallbacks() {
        let user = decode_user(&token_with(&json!({ "name": "ada" }))).unwrap();
        assert_eq!(user.email, "ada");
        assert_eq!(user.display_name.as_deref(), Some("ada"));
        assert_eq!(user.sub, "ada");
        assert_eq!(user.avatar, None);
    }

    #[test]
    fn test_empty_claims_give_empty_strings() {
        let user = decode_user(&token_with(&json!({}))).unwrap();
        assert_eq!(user.email, "");
        assert_eq!(user.sub, "");
        assert_eq!(user.display_name, None);
    }

    #[test]
    fn test_padded_standard_base64_payload() {
        // encodes as "eyJzdWIiOiI/Pz8ifQ==": standard alphabet, padded
        let payload = json!({ "sub": "???" }).to_string();
        let token = format!("h.{}.s", STANDARD.encode(payload));
        assert!(token.contains('/') && token.contains('='));
        assert_eq!(decode_user(&token).unwrap().sub, "???");
    }

    #[test]
    fn test_malformed_tokens_return_none() {
        assert!(decode_user("").is_none());
        assert!(decode_user("only.two").is_none());
        assert!(decode_user("a.!!!.c").is_none());
        assert!(decode_user(&format!("a.{}.c", URL_SAFE_NO_PAD.encode("not json"))).is_none());
        assert!(decode_user(&format!("a.{}.c", URL_SAFE_NO_PAD.encode("[1,2]"))).is_none());
    }

    #[test]
    fn test_non_string_claims_ignored() {
        let user = decode_user(&token_with(&json!({ "email": 42, "name": "n" }))).unwrap();
        assert_eq!(user.email, "n");
    }

    #[test]
    fn test_label_prefers_display_name() {
        let user = IamUser {
            email: "e".to_string(),
            display_name: Some("D".to_string()),
            avatar: None,
            sub: "s".to_string(),
        };
        assert_eq!(user.label(), "D");

        let user = IamUser {
            display_name: None,
            ..user
        };
        assert_eq!(user.label(), "e");
    }
}
