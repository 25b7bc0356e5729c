// Password hashing and verification

use crate::errors::{LibrisError, Result};

/// Bcrypt cost factor for stored passwords
pub const BCRYPT_COST: u32 = 12;

/// Minimum password length in bytes
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length in bytes (bcrypt ignores anything past 72)
pub const MAX_PASSWORD_LENGTH: usize = 72;

/// Hash a password with bcrypt at the given cost.
///
/// The returned bytes are the full bcrypt string (algorithm, cost, salt and
/// digest), ready to persist.
///
/// # Errors
/// Returns `LibrisError::Credential` if bcrypt rejects the cost or fails.
pub fn hash_password(plaintext: &str, cost: u32) -> Result<Vec<u8>> {
    bcrypt::hash(plaintext, cost)
        .map(String::into_bytes)
        .map_err(|e| LibrisError::Credential {
            message: format!("password hash error: {}", e),
        })
}

/// Verify a password against a stored bcrypt hash.
///
/// `Ok(false)` means the password does not match. A corrupted or non-bcrypt
/// hash is an error, not a mismatch.
///
/// # Errors
/// Returns `LibrisError::Credential` if the stored hash cannot be parsed.
pub fn verify_password(plaintext: &str, hash: &[u8]) -> Result<bool> {
    let hash = std::str::from_utf8(hash).map_err(|e| LibrisError::Credential {
        message: format!("stored password hash is not utf-8: {}", e),
    })?;
    bcrypt::verify(plaintext, hash).map_err(|e| LibrisError::Credential {
        message: format!("password verify error: {}", e),
    })
}
