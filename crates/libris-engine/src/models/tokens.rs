//! Token model

use std::sync::Arc;

use chrono::Duration;
use libris_core::credentials::generate_token;
use libris_core::errors::Result;
use libris_core::model::{Token, TokenScope};
use libris_core::storage::{Collection, Key, Record, Storage};

use super::observe;

#[derive(Clone)]
pub struct TokenModel {
    storage: Arc<dyn Storage>,
}

impl TokenModel {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Issue and persist a token for `user_id`
    ///
    /// The returned token is the only place its plaintext ever appears.
    ///
    /// # Errors
    /// `RecordNotFound` if the user does not exist, `Credential` if the random
    /// source fails.
    pub fn new_token(&self, user_id: i64, ttl: Duration, scope: TokenScope) -> Result<Token> {
        observe("token_new", || {
            let token = generate_token(user_id, ttl, scope)?;
            self.storage.insert(Record::Token(token.clone()))?;
            Ok(token)
        })
    }

    /// Persist an already generated token
    ///
    /// # Errors
    /// `DuplicateKey` if the hash is already stored for this scope.
    pub fn insert(&self, token: Token) -> Result<()> {
        observe("token_insert", || {
            self.storage.insert(Record::Token(token)).map(|_| ())
        })
    }

    /// Revoke every token `user_id` holds in `scope`; none held is not an error
    ///
    /// # Errors
    /// Storage errors other than nothing to delete.
    pub fn delete_all_for_user(&self, scope: TokenScope, user_id: i64) -> Result<()> {
        observe("token_delete_all_for_user", || {
            match self
                .storage
                .delete(Collection::Tokens, &Key::UserScope { user_id, scope })
            {
                Ok(_) => Ok(()),
                Err(e) if e.is_not_found() => Ok(()),
                Err(e) => Err(e),
            }
        })
    }
}
