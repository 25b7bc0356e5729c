//! Document backend
//!
//! An in-process engine of JSON collections and the adapter that maps
//! catalog records onto it.

pub mod codec;
pub mod engine;
mod store;

pub use store::DocumentStore;
