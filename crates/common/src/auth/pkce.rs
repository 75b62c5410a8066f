//! PKCE (Proof Key for Code Exchange, RFC 7636)
//!
//! Desktop clients cannot keep a client secret confidential, so every
//! authorization request carries an S256 challenge whose verifier is only
//! revealed during the code exchange.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

const RANDOM_BYTES: usize = 32;

fn random_token() -> String {
    let mut bytes = [0u8; RANDOM_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute `BASE64URL(SHA256(verifier))`.
pub fn code_challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Verifier, challenge and CSRF state for one authorization attempt.
#[derive(Debug, Clone)]
pub struct PkceChallenge {
    /// 43-char base64url secret, sent only with the token exchange
    pub code_verifier: String,
    /// S256 hash of the verifier, sent with the authorization request
    pub code_challenge: String,
    /// Opaque CSRF token echoed back in the redirect
    pub state: String,
}

impl PkceChallenge {
    /// Generate fresh random values.
    #[must_use]
    pub fn generate() -> Self {
        let code_verifier = random_token();
        let code_challenge = code_challenge_for(&code_verifier);
        Self { code_verifier, code_challenge, state: random_token() }
    }

    /// Always `S256`; the plain method is never used.
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        "S256"
    }
}
