//! Request authorization
//!
//! `authenticate` resolves an Authorization header to a [`Principal`];
//! `require_permission` gates a principal on a permission code. Every way a
//! presented token can fail (malformed, unknown, expired, wrong scope)
//! collapses into `InvalidAuthenticationToken` so callers cannot tell them
//! apart.

use std::sync::Arc;

use libris_core::core_types::Sensitive;
use libris_core::errors::{LibrisError, Result};
use libris_core::model::{validate_token_plaintext, Principal, TokenScope, User};
use libris_core::rules::Validator;
use libris_core::storage::Storage;

use crate::models::{observe, Models, PermissionModel, UserModel};

const BEARER_SCHEME: &str = "Bearer";

/// Token plaintext from `Bearer <token>`; any other shape is rejected
fn bearer_token(header: &str) -> Option<Sensitive<String>> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(BEARER_SCHEME), Some(token), None) => Some(Sensitive::new(token.to_string())),
        _ => None,
    }
}

#[derive(Clone)]
pub struct Authorizer {
    users: UserModel,
    permissions: PermissionModel,
}

impl Authorizer {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            users: UserModel::new(Arc::clone(&storage)),
            permissions: PermissionModel::new(storage),
        }
    }

    pub fn from_models(models: &Models) -> Self {
        Self {
            users: models.users.clone(),
            permissions: models.permissions.clone(),
        }
    }

    /// Resolve the Authorization header, if any, to a principal
    ///
    /// # Errors
    /// `InvalidAuthenticationToken` for any header that does not name a live
    /// authentication token; storage failures such as `Timeout` pass through.
    pub fn authenticate(&self, header: Option<&str>) -> Result<Principal> {
        observe("authenticate", || {
            let Some(header) = header else {
                return Ok(Principal::Anonymous);
            };
            let token = bearer_token(header).ok_or(LibrisError::InvalidAuthenticationToken)?;

            let mut v = Validator::new();
            validate_token_plaintext(&mut v, token.expose());
            if !v.valid() {
                return Err(LibrisError::InvalidAuthenticationToken);
            }

            match self
                .users
                .get_for_token(TokenScope::Authentication, token.expose())
            {
                Ok(user) => Ok(Principal::User(user)),
                Err(e) if e.is_not_found() => Err(LibrisError::InvalidAuthenticationToken),
                Err(e) => Err(e),
            }
        })
    }

    /// The principal's user, provided it is signed in and activated
    ///
    /// # Errors
    /// `AuthenticationRequired` for the anonymous principal, `InactiveAccount`
    /// for a user who has not activated.
    pub fn require_activated<'a>(&self, principal: &'a Principal) -> Result<&'a User> {
        let user = principal.user().ok_or(LibrisError::AuthenticationRequired)?;
        if !user.activated {
            return Err(LibrisError::InactiveAccount { user_id: user.id });
        }
        Ok(user)
    }

    /// Check that the principal holds `code`
    ///
    /// # Errors
    /// As `require_activated`, plus `PermissionDenied` when the code is missing.
    pub fn require_permission(&self, principal: &Principal, code: &str) -> Result<()> {
        observe("authorize_permission", || {
            let user = self.require_activated(principal)?;
            let granted = self.permissions.get_all_for_user(user.id)?;
            if !granted.include(code) {
                tracing::debug!(user_id = user.id, code, "permission denied");
                return Err(LibrisError::PermissionDenied {
                    user_id: user.id,
                    code: code.to_string(),
                });
            }
            Ok(())
        })
    }

    /// Authenticate then require `code`, returning the allowed principal
    ///
    /// # Errors
    /// Any error of `authenticate` or `require_permission`.
    pub fn authorize(&self, header: Option<&str>, code: &str) -> Result<Principal> {
        let principal = self.authenticate(header)?;
        self.require_permission(&principal, code)?;
        Ok(principal)
    }
}
