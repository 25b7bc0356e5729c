//! Libris Store - storage backends for the catalog
//!
//! Provides:
//! - An embedded document engine and the adapter mapping records onto it
//! - A SQLite adapter with embedded, checksummed migrations
//! - Store configuration and startup backend selection

pub mod config;
pub mod db;
pub mod document;
pub mod errors;
pub mod matching;
pub mod migrations;
pub mod sql;

use std::sync::Arc;

use libris_core::storage::{BackendKind, Storage};

pub use config::StoreConfig;
pub use document::DocumentStore;
pub use errors::Result;
pub use sql::SqlStore;

/// Build the backend named by `config`
///
/// `database_path` names the SQLite file or the document store's directory;
/// without it either backend lives in memory.
///
/// # Errors
/// Returns `Persistence` if the SQLite database cannot be opened or migrated,
/// or the document directory cannot be loaded.
pub fn open_storage(config: &StoreConfig) -> Result<Arc<dyn Storage>> {
    let timeout = config.op_timeout();
    let storage: Arc<dyn Storage> = match config.backend {
        BackendKind::Document => match &config.database_path {
            Some(dir) => Arc::new(DocumentStore::open(dir, timeout)?),
            None => Arc::new(DocumentStore::new(timeout)),
        },
        BackendKind::Sqlite => match &config.database_path {
            Some(path) => Arc::new(SqlStore::open(path, timeout)?),
            None => Arc::new(SqlStore::open_in_memory(timeout)?),
        },
    };
    tracing::info!(
        backend = %config.backend,
        op_timeout_ms = config.op_timeout_ms,
        "storage opened"
    );
    Ok(storage)
}
