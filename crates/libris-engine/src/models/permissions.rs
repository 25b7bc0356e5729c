//! Permission model

use std::sync::Arc;

use libris_core::errors::Result;
use libris_core::model::{Permissions, UserPermissions};
use libris_core::storage::{Collection, Key, Record, Storage};

use super::observe;

#[derive(Clone)]
pub struct PermissionModel {
    storage: Arc<dyn Storage>,
}

impl PermissionModel {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Every code granted to `user_id`, possibly none
    ///
    /// # Errors
    /// Storage errors.
    pub fn get_all_for_user(&self, user_id: i64) -> Result<Permissions> {
        observe("permission_get_all_for_user", || {
            let perms = self
                .storage
                .get(Collection::Permissions, &Key::UserId(user_id))?
                .into_permissions()?;
            Ok(perms.codes)
        })
    }

    /// Grant `codes` to `user_id`; codes already held are kept once
    ///
    /// # Errors
    /// `RecordNotFound` if the user does not exist.
    pub fn add_for_user(&self, user_id: i64, codes: &[&str]) -> Result<Permissions> {
        observe("permission_add_for_user", || {
            let perms = UserPermissions::new(user_id, codes.iter().copied());
            let merged = self
                .storage
                .insert(Record::Permissions(perms))?
                .into_permissions()?;
            Ok(merged.codes)
        })
    }
}
