// Opaque token generation

use chrono::{DateTime, Duration, Utc};
use data_encoding::BASE32_NOPAD;
use libris_core_types::Sensitive;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::errors::{LibrisError, Result};
use crate::model::token::{Token, TokenScope};

/// Random bytes drawn per token
pub const TOKEN_ENTROPY_BYTES: usize = 16;

/// Length of the base32 plaintext handed to callers
pub const TOKEN_PLAINTEXT_LEN: usize = 26;

/// SHA-256 digest of a token plaintext, the only form that is persisted
pub fn hash_token_plaintext(plaintext: &str) -> Vec<u8> {
    Sha256::digest(plaintext.as_bytes()).to_vec()
}

/// Generate a fresh token for `user_id` that expires `ttl` after `now`
///
/// # Errors
/// Returns `LibrisError::Credential` if the OS random source fails.
pub fn generate_token_at(
    user_id: i64,
    ttl: Duration,
    scope: TokenScope,
    now: DateTime<Utc>,
) -> Result<Token> {
    let mut bytes = [0u8; TOKEN_ENTROPY_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| LibrisError::Credential {
            message: format!("random source failed: {}", e),
        })?;

    let plaintext = BASE32_NOPAD.encode(&bytes);
    let hash = hash_token_plaintext(&plaintext);

    Ok(Token {
        plaintext: Sensitive::new(plaintext),
        hash,
        user_id,
        expiry: now + ttl,
        scope,
    })
}

/// Generate a fresh token for `user_id` that expires `ttl` from now
///
/// # Errors
/// Returns `LibrisError::Credential` if the OS random source fails.
pub fn generate_token(user_id: i64, ttl: Duration, scope: TokenScope) -> Result<Token> {
    generate_token_at(user_id, ttl, scope, crate::clock::now_millis())
}
