//! PKCE S256 parameter generation
//!
//! This module implements the client side of Proof Key for Code Exchange
//! (RFC 7636) with the `S256` challenge method: random `state` and
//! `code_verifier` strings and the derived `code_challenge`.
//!
//! # How PKCE works
//!
//! 1. The client generates a high-entropy random `code_verifier`.
//! 2. The client computes `BASE64URL(SHA256(code_verifier))` to produce the
//!    `code_challenge` and sends it with the authorization request.
//! 3. The token exchange request includes the original `code_verifier`.
//! 4. The authorization server recomputes the challenge and compares it,
//!    proving possession of the verifier.
//!
//! The primitives sit behind [`CryptoProvider`] so a host can swap in a
//! hardware RNG or a platform crypto library. [`SystemCrypto`] uses
//! `rand`'s thread-local CSPRNG, `sha2`, and `base64`.
//!
//! # References
//!
//! - RFC 7636 <https://www.rfc-editor.org/rfc/rfc7636>

use base64::Engine as _;
use sha2::{Digest, Sha256};

/// Length of the generated anti-CSRF `state` value.
pub const STATE_LENGTH: usize = 32;

/// Length of the generated PKCE `code_verifier`.
pub const VERIFIER_LENGTH: usize = 64;

/// The PKCE challenge method sent with every authorization request.
pub const CHALLENGE_METHOD: &str = "S256";

const BASE36_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

// ---------------------------------------------------------------------------
// CryptoProvider
// ---------------------------------------------------------------------------

/// Cryptographic primitives needed by the login flow.
///
/// Implementations of [`random_bytes`](Self::random_bytes) must draw from a
/// cryptographically secure generator: the output seeds both the PKCE
/// verifier and the anti-CSRF state.
pub trait CryptoProvider: Send + Sync {
    /// Returns `len` bytes from a cryptographically secure RNG.
    fn random_bytes(&self, len: usize) -> Vec<u8>;

    /// Returns the SHA-256 digest of `input`.
    fn sha256(&self, input: &[u8]) -> Vec<u8>;

    /// Encodes `bytes` as base64url without `=` padding.
    fn base64_url_encode(&self, bytes: &[u8]) -> String;

    /// Generates a random string of exactly `length` characters.
    ///
    /// Each random byte becomes a two-character, zero-padded base-36 code;
    /// the concatenation is truncated to `length`. The output alphabet is
    /// `[0-9a-z]`.
    fn generate_random(&self, length: usize) -> String {
        let mut out = String::with_capacity(length * 2);
        for byte in self.random_bytes(length) {
            out.push(BASE36_DIGITS[usize::from(byte / 36)] as char);
            out.push(BASE36_DIGITS[usize::from(byte % 36)] as char);
        }
        out.truncate(length);
        out
    }

    /// Computes the `S256` code challenge for `verifier`.
    ///
    /// `challenge = BASE64URL(SHA256(UTF8(verifier)))`
    fn code_challenge(&self, verifier: &str) -> String {
        self.base64_url_encode(&self.sha256(verifier.as_bytes()))
    }
}

/// Default [`CryptoProvider`] backed by `rand`, `sha2`, and `base64`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCrypto;

impl CryptoProvider for SystemCrypto {
    fn random_bytes(&self, len: usize) -> Vec<u8> {
        use rand::RngCore as _;

        let mut bytes = vec![0u8; len];
        rand::rng().fill_bytes(&mut bytes);
        bytes
    }

    fn sha256(&self, input: &[u8]) -> Vec<u8> {
        Sha256::digest(input).to_vec()
    }

    fn base64_url_encode(&self, bytes: &[u8]) -> String {
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }
}

// ---------------------------------------------------------------------------
// PkceParams
// ---------------------------------------------------------------------------

/// A fresh `state` / `code_verifier` pair with its derived challenge.
///
/// # Examples
///
/// ```
/// use hanzo_commerce::auth::pkce::{PkceParams, SystemCrypto, STATE_LENGTH, VERIFIER_LENGTH};
///
/// let params = PkceParams::generate(&SystemCrypto);
/// assert_eq!(params.state.len(), STATE_LENGTH);
/// assert_eq!(params.code_verifier.len(), VERIFIER_LENGTH);
/// assert!(!params.code_challenge.contains('='));
/// ```
#[derive(Debug, Clone)]
pub struct PkceParams {
    /// Anti-CSRF value round-tripped through the redirect.
    pub state: String,

    /// Secret sent to the token endpoint during the code exchange.
    pub code_verifier: String,

    /// `BASE64URL(SHA256(code_verifier))`, sent with the authorization request.
    pub code_challenge: String,
}

impl PkceParams {
    /// Generates a new set of parameters using `crypto`.
    pub fn generate(crypto: &dyn CryptoProvider) -> Self {
        let state = crypto.generate_random(STATE_LENGTH);
        let code_verifier = crypto.generate_random(VERIFIER_LENGTH);
        let code_challenge = crypto.code_challenge(&code_verifier);

        Self {
            state,
            code_verifier,
            code_challenge,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic provider: returns the byte sequence 0, 1, 2, ...
    struct CountingCrypto;

    impl CryptoProvider for CountingCrypto {
        fn random_bytes(&self, len: usize) -> Vec<u8> {
            (0..len).map(|i| (i % 256) as u8).collect()
        }

        fn sha256(&self, input: &[u8]) -> Vec<u8> {
            SystemCrypto.sha256(input)
        }

        fn base64_url_encode(&self, bytes: &[u8]) -> String {
            SystemCrypto.base64_url_encode(bytes)
        }
    }

    fn is_base64url(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    // -----------------------------------------------------------------------
    // generate_random
    // -----------------------------------------------------------------------

    #[test]
    fn test_generate_random_has_requested_length() {
        for len in [0, 1, 7, 32, 64, 128] {
            assert_eq!(SystemCrypto.generate_random(len).len(), len);
        }
    }

    #[test]
    fn test_generate_random_uses_base36_alphabet() {
        let value = SystemCrypto.generate_random(256);
        assert!(
            value
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()),
            "unexpected character in {value}"
        );
    }

    #[test]
    fn test_generate_random_encodes_each_byte_as_two_chars() {
        // bytes 0, 1, 2, 3 -> "00" "01" "02" "03", truncated to 6 chars
        assert_eq!(CountingCrypto.generate_random(6), "000102");
    }

    #[test]
    fn test_generate_random_encodes_high_bytes() {
        struct MaxCrypto;
        impl CryptoProvider for MaxCrypto {
            fn random_bytes(&self, len: usize) -> Vec<u8> {
                vec![255; len]
            }
            fn sha256(&self, input: &[u8]) -> Vec<u8> {
                SystemCrypto.sha256(input)
            }
            fn base64_url_encode(&self, bytes: &[u8]) -> String {
                SystemCrypto.base64_url_encode(bytes)
            }
        }
        // 255 = 7 * 36 + 3
        assert_eq!(MaxCrypto.generate_random(4), "7373");
    }

    #[test]
    fn test_generate_random_is_unique() {
        let a = SystemCrypto.generate_random(64);
        let b = SystemCrypto.generate_random(64);
        assert_ne!(a, b);
    }

    // -----------------------------------------------------------------------
    // sha256 / base64_url_encode
    // -----------------------------------------------------------------------

    #[test]
    fn test_sha256_known_digest() {
        let digest = SystemCrypto.sha256(b"abc");
        assert_eq!(digest.len(), 32);
        assert_eq!(digest[0], 0xba);
        assert_eq!(digest[31], 0xad);
    }

    #[test]
    fn test_base64_url_encode_replaces_unsafe_characters() {
        // 0xfb 0xff encodes to "+/8=" in standard base64.
        assert_eq!(SystemCrypto.base64_url_encode(&[0xfb, 0xff]), "-_8");
    }

    #[test]
    fn test_base64_url_encode_strips_padding() {
        assert_eq!(SystemCrypto.base64_url_encode(b"a"), "YQ");
    }

    // -----------------------------------------------------------------------
    // code_challenge
    // -----------------------------------------------------------------------

    /// RFC 7636 Appendix B test vector.
    #[test]
    fn test_code_challenge_known_answer_rfc7636_appendix_b() {
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            SystemCrypto.code_challenge(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_code_challenge_is_deterministic_and_url_safe() {
        for _ in 0..32 {
            let verifier = SystemCrypto.generate_random(VERIFIER_LENGTH);
            let first = SystemCrypto.code_challenge(&verifier);
            let second = SystemCrypto.code_challenge(&verifier);
            assert_eq!(first, second);
            assert_eq!(first.len(), 43);
            assert!(is_base64url(&first), "not base64url: {first}");
            assert!(!first.contains('='));
        }
    }

    // -----------------------------------------------------------------------
    // PkceParams
    // -----------------------------------------------------------------------

    #[test]
    fn test_pkce_params_challenge_matches_verifier() {
        let params = PkceParams::generate(&SystemCrypto);
        assert_eq!(
            params.code_challenge,
            SystemCrypto.code_challenge(&params.code_verifier)
        );
        assert_ne!(params.state, params.code_verifier);
    }

    #[test]
    fn test_pkce_params_lengths() {
        let params = PkceParams::generate(&SystemCrypto);
        assert_eq!(params.state.len(), STATE_LENGTH);
        assert_eq!(params.code_verifier.len(), VERIFIER_LENGTH);
    }
}
