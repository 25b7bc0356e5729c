//! Entity models
//!
//! Thin orchestration over a shared `Storage`: validate, call the backend,
//! unwrap the record variant. Every public operation is bracketed by the
//! canonical lifecycle log events.

pub mod books;
pub mod permissions;
pub mod tokens;
pub mod users;

use std::sync::Arc;
use std::time::Instant;

use libris_core::errors::Result;
use libris_core::storage::Storage;
use libris_core::{log_op_end, log_op_error, log_op_start};
use libris_store::{open_storage, StoreConfig};

pub use books::BookModel;
pub use permissions::PermissionModel;
pub use tokens::TokenModel;
pub use users::UserModel;

/// Run `f` between start and end (or end_error) events for `op`
pub(crate) fn observe<T>(op: &'static str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    log_op_start!(op);
    let start = Instant::now();
    match f() {
        Ok(value) => {
            log_op_end!(op, duration_ms = start.elapsed().as_millis() as u64);
            Ok(value)
        }
        Err(err) => {
            log_op_error!(
                op,
                err.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
            Err(err)
        }
    }
}

/// All models over one backend
#[derive(Clone)]
pub struct Models {
    pub books: BookModel,
    pub users: UserModel,
    pub tokens: TokenModel,
    pub permissions: PermissionModel,
}

impl Models {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            books: BookModel::new(Arc::clone(&storage)),
            users: UserModel::new(Arc::clone(&storage)),
            tokens: TokenModel::new(Arc::clone(&storage)),
            permissions: PermissionModel::new(storage),
        }
    }

    /// Open the configured backend and build models over it
    ///
    /// # Errors
    /// Returns `Persistence` if the backend cannot be opened.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        Ok(Self::new(open_storage(config)?))
    }
}
