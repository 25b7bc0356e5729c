//! Checksum validation for migrations
//!
//! Computes SHA256 checksums of migration SQL so an edited migration that was
//! already applied is detected instead of silently skipped.

use sha2::{Digest, Sha256};

/// Compute SHA256 checksum of a string
pub fn compute_checksum(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}
