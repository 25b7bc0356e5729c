//! Libris Core - catalog domain, credentials and the storage contract
//!
//! This crate provides the backend-independent half of the catalog:
//! - Book, User, Token and Permission models with field validation
//! - Password hashing and opaque token generation
//! - The `Storage` trait every backend implements
//! - The filter/sort/pagination engine shared by all list queries
//! - The error and logging facilities used across the workspace

pub mod clock;
pub mod credentials;
pub mod errors;
pub mod logging_facility;
pub mod model;
pub mod query;
pub mod rules;
pub mod storage;

// Macro expansions refer to shared schema constants through this path
pub use libris_core_types as core_types;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, LibrisError, Result};
pub use model::{Book, Permissions, Principal, Size, Token, TokenScope, User, UserPermissions};
pub use query::{Filters, ListQuery, Metadata, QueryPlan, SortDirection};
pub use rules::{FieldError, Validator};
pub use storage::{BackendKind, Collection, Deadline, Key, Page, Record, Storage};
