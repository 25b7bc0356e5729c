//! User model

use std::sync::Arc;

use libris_core::credentials::hash_token_plaintext;
use libris_core::errors::{LibrisError, Result};
use libris_core::model::{validate_user, TokenScope, User};
use libris_core::rules::Validator;
use libris_core::storage::{Collection, Key, Record, Storage};

use super::observe;

#[derive(Clone)]
pub struct UserModel {
    storage: Arc<dyn Storage>,
}

impl UserModel {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Validate and persist a new user
    ///
    /// # Errors
    /// `Validation`, or `DuplicateKey` on field `email` when the address is taken.
    ///
    /// # Panics
    /// Panics if the user has no password hash.
    pub fn insert(&self, user: User) -> Result<User> {
        observe("user_insert", || {
            let mut v = Validator::new();
            validate_user(&mut v, &user);
            v.finish()?;
            self.storage.insert(Record::User(user))?.into_user()
        })
    }

    /// # Errors
    /// `RecordNotFound` for ids below 1 or absent users.
    pub fn get(&self, id: i64) -> Result<User> {
        observe("user_get", || {
            if id < 1 {
                return Err(LibrisError::not_found(
                    Collection::Users.name(),
                    Key::Id(id).to_string(),
                ));
            }
            self.storage.get(Collection::Users, &Key::Id(id))?.into_user()
        })
    }

    /// # Errors
    /// `RecordNotFound` if no user has this address.
    pub fn get_by_email(&self, email: &str) -> Result<User> {
        observe("user_get_by_email", || {
            self.storage
                .get(Collection::Users, &Key::Email(email.to_string()))?
                .into_user()
        })
    }

    /// Owner of a live token presented in plaintext
    ///
    /// # Errors
    /// `RecordNotFound` if the token is unknown, expired or issued for
    /// another scope.
    pub fn get_for_token(&self, scope: TokenScope, plaintext: &str) -> Result<User> {
        observe("user_get_for_token", || {
            let key = Key::Token {
                hash: hash_token_plaintext(plaintext),
                scope,
            };
            self.storage.get(Collection::Tokens, &key)?.into_user()
        })
    }

    /// # Errors
    /// `Validation`, `EditConflict` or `DuplicateKey`.
    ///
    /// # Panics
    /// Panics if the user has no password hash.
    pub fn update(&self, user: User) -> Result<User> {
        observe("user_update", || {
            let mut v = Validator::new();
            validate_user(&mut v, &user);
            v.finish()?;
            self.storage.update(Record::User(user))?.into_user()
        })
    }
}
