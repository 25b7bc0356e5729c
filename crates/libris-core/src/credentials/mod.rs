//! Credential subsystem: password hashing and opaque token generation

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password, BCRYPT_COST};
pub use token::{generate_token, generate_token_at, hash_token_plaintext, TOKEN_PLAINTEXT_LEN};
