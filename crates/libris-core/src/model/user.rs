use std::fmt;

use chrono::{DateTime, Utc};
use libris_core_types::Sensitive;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credentials::password::{
    hash_password, verify_password, BCRYPT_COST, MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH,
};
use crate::errors::{LibrisError, Result};
use crate::rules::validation::{matches, Validator, EMAIL_RX};

/// Password held as a transient plaintext plus its persisted bcrypt hash
#[derive(Clone, Default, PartialEq)]
pub struct Password {
    plaintext: Option<Sensitive<String>>,
    hash: Option<Vec<u8>>,
}

impl Password {
    /// Wrap a hash read back from storage
    pub fn from_hash(hash: Vec<u8>) -> Self {
        Self {
            plaintext: None,
            hash: Some(hash),
        }
    }

    /// Hash `plaintext` at the standard cost and keep both forms
    ///
    /// # Errors
    /// Returns `LibrisError::Credential` if hashing fails.
    pub fn set(&mut self, plaintext: &str) -> Result<()> {
        self.set_with_cost(plaintext, BCRYPT_COST)
    }

    /// Hash `plaintext` at an explicit bcrypt cost
    ///
    /// # Errors
    /// Returns `LibrisError::Credential` if hashing fails.
    pub fn set_with_cost(&mut self, plaintext: &str, cost: u32) -> Result<()> {
        let hash = hash_password(plaintext, cost)?;
        self.plaintext = Some(Sensitive::new(plaintext.to_string()));
        self.hash = Some(hash);
        Ok(())
    }

    /// Check a candidate password against the stored hash
    ///
    /// # Errors
    /// Returns `LibrisError::Credential` when no hash is held or it is corrupt.
    pub fn matches(&self, plaintext: &str) -> Result<bool> {
        let hash = self.hash.as_deref().ok_or_else(|| LibrisError::Credential {
            message: "no password hash to compare against".to_string(),
        })?;
        verify_password(plaintext, hash)
    }

    pub fn plaintext(&self) -> Option<&str> {
        self.plaintext.as_ref().map(|p| p.expose().as_str())
    }

    pub fn hash(&self) -> Option<&[u8]> {
        self.hash.as_deref()
    }

    /// The hash to write to storage
    ///
    /// # Panics
    /// Persisting a user without a password hash is a programming error.
    pub fn persisted_hash(&self) -> &[u8] {
        match self.hash.as_deref() {
            Some(hash) => hash,
            None => panic!("missing password hash for user"),
        }
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Password")
            .field("plaintext", &self.plaintext)
            .field("hash", &self.hash.as_ref().map(|_| "***REDACTED***"))
            .finish()
    }
}

/// User account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub name: String,
    pub email: String,

    #[serde(skip)]
    pub password: Password,

    pub activated: bool,

    #[serde(skip)]
    pub version: Uuid,
}

impl User {
    /// Build an unsaved, unactivated user without a password
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: 0,
            created_at: DateTime::<Utc>::default(),
            name: name.into(),
            email: email.into(),
            password: Password::default(),
            activated: false,
            version: Uuid::nil(),
        }
    }
}

/// Who is making a request
#[derive(Debug, Clone, PartialEq)]
pub enum Principal {
    /// No credentials were presented
    Anonymous,
    User(User),
}

impl Principal {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Principal::Anonymous => None,
            Principal::User(user) => Some(user),
        }
    }
}

pub fn validate_email(v: &mut Validator, email: &str) {
    v.check(!email.is_empty(), "email", "must be provided");
    v.check(
        matches(email, &EMAIL_RX),
        "email",
        "must be a valid email address",
    );
}

pub fn validate_password_plaintext(v: &mut Validator, password: &str) {
    v.check(!password.is_empty(), "password", "must be provided");
    v.check(
        password.len() >= MIN_PASSWORD_LENGTH,
        "password",
        "must be at least 8 bytes long",
    );
    v.check(
        password.len() <= MAX_PASSWORD_LENGTH,
        "password",
        "must not be more than 72 bytes long",
    );
}

/// Record every violated user invariant in `v`
///
/// # Panics
/// Panics if the user carries no password hash; that is a programming error
/// rather than bad input.
pub fn validate_user(v: &mut Validator, user: &User) {
    v.check(!user.name.is_empty(), "name", "must be provided");
    v.check(
        user.name.len() <= 500,
        "name",
        "must not be more than 500 bytes long",
    );

    validate_email(v, &user.email);

    if let Some(plaintext) = user.password.plaintext() {
        validate_password_plaintext(v, plaintext);
    }

    let _ = user.password.persisted_hash();
}
