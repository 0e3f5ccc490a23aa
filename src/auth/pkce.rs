//! PKCE (Proof Key for Code Exchange) utilities
//!
//! Verifiers are drawn from the RFC 7636 unreserved alphabet using the OS
//! random source; challenges use the S256 method.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};

/// Length of generated code verifiers (RFC 7636 maximum)
pub const CODE_VERIFIER_LENGTH: usize = 128;

/// Characters allowed in a code verifier (unreserved URI characters)
pub const CODE_VERIFIER_CHARSET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

/// The only challenge method this client sends
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// PKCE verifier and its derived challenge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkcePair {
    /// Code verifier (kept by the client, sent on token exchange)
    pub verifier: String,
    /// Code challenge (sent on the authorization URL)
    pub challenge: String,
}

impl PkcePair {
    /// Generate a fresh verifier and derive its challenge
    #[must_use]
    pub fn generate() -> Self {
        let verifier = generate_verifier();
        let challenge = derive_challenge(&verifier);
        Self {
            verifier,
            challenge,
        }
    }
}

/// Generate a cryptographically random code verifier
#[must_use]
pub fn generate_verifier() -> String {
    let mut rng = OsRng;
    (0..CODE_VERIFIER_LENGTH)
        .map(|_| CODE_VERIFIER_CHARSET[rng.gen_range(0..CODE_VERIFIER_CHARSET.len())] as char)
        .collect()
}

/// Derive the S256 code challenge: BASE64URL(SHA256(verifier)) without padding
#[must_use]
pub fn derive_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}
