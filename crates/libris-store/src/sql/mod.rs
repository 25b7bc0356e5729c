//! Relational backend

mod sql_store;

pub use sql_store::SqlStore;
