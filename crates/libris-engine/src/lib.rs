//! Libris Engine - entity models and request authorization
//!
//! Sits between the HTTP layer and a `Storage` backend:
//! - Book, user, token and permission models that validate before persisting
//! - The authorizer that turns a bearer header into a principal and checks
//!   permission codes
//!
//! ## Logging Ownership
//!
//! The engine owns lifecycle logging (`log_op_start!` / `log_op_end!` /
//! `log_op_error!`). Store and core layers only emit `tracing::debug!` for
//! internal details.

pub mod auth;
pub mod models;

pub use auth::Authorizer;
pub use models::{BookModel, Models, PermissionModel, TokenModel, UserModel};
