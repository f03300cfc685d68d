//! Ownership tokens for anonymous resources.
//!
//! An upload made without an account gets a random token that proves the
//! holder may delete it later. Only the SHA-256 digest is ever stored.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Digest;
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Random bytes per token (256 bits of entropy).
pub const OWNERSHIP_TOKEN_BYTES: usize = 32;

/// Freshly minted ownership token.
///
/// `token` is handed to the client exactly once; `token_hash` is what gets
/// persisted alongside the resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnershipToken {
    pub token: String,
    pub token_hash: String,
}

impl OwnershipToken {
    /// Generate a URL-safe token from the OS random number generator.
    pub fn generate() -> Self {
        let mut bytes = [0u8; OWNERSHIP_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);

        let token = URL_SAFE_NO_PAD.encode(bytes);
        let token_hash = hash_ownership_token(&token);

        Self { token, token_hash }
    }
}

/// Hex-encoded SHA-256 digest of a token, suitable for storage.
pub fn hash_ownership_token(token: &str) -> String {
    Sha256::digest(token.as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Check a presented token against a stored digest in constant time.
pub fn verify_ownership_token(token: &str, stored_hash: &str) -> bool {
    let computed = hash_ownership_token(token);
    computed.as_bytes().ct_eq(stored_hash.as_bytes()).into()
}
