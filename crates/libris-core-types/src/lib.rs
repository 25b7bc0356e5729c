//! Core types shared across Libris facilities
//!
//! This crate provides the leaf types used by the error, logging, credential
//! and storage facilities:
//!
//! - **Sensitive data**: `Sensitive<T>` marker for automatic redaction of
//!   password plaintexts, token plaintexts and bearer headers
//! - **Schema constants**: Canonical structured-log field keys and event names

pub mod schema;
pub mod sensitive;

pub use sensitive::Sensitive;
