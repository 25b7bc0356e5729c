//! Database connection management
//!
//! Provides utilities for opening and configuring SQLite connections

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use regex::Regex;
use rusqlite::functions::FunctionFlags;
use rusqlite::types::ValueRef;
use rusqlite::Connection;

use crate::errors::{from_rusqlite, Result};
use crate::matching::substring_matcher;

/// `contains_ci(haystack, needle)`: case-insensitive literal substring test
pub const CONTAINS_CI: &str = "contains_ci";

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Open a SQLite database at the given path
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Connection::open(path).map_err(from_rusqlite)
}

/// Open an in-memory SQLite database
pub fn open_in_memory() -> Result<Connection> {
    Connection::open_in_memory().map_err(from_rusqlite)
}

/// Configure a connection for catalog use
///
/// Foreign keys on, WAL journaling where the database supports it, and a busy
/// timeout matching the per-operation deadline.
pub fn configure(conn: &Connection, busy_timeout: Duration) -> Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")
        .map_err(from_rusqlite)?;

    // In-memory databases answer "memory" and keep their journal mode
    let _mode: String = conn
        .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
        .map_err(from_rusqlite)?;

    conn.busy_timeout(busy_timeout).map_err(from_rusqlite)?;

    register_functions(conn)
}

/// Install the scalar functions text filters compile to
///
/// The matcher is compiled once per statement from the bound needle; a
/// non-text haystack never matches.
pub fn register_functions(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        CONTAINS_CI,
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let matcher: Arc<Regex> =
                ctx.get_or_create_aux(1, |needle| -> std::result::Result<_, BoxError> {
                    Ok(substring_matcher(needle.as_str()?)?)
                })?;
            let found = match ctx.get_raw(0) {
                ValueRef::Text(bytes) => std::str::from_utf8(bytes)
                    .map(|haystack| matcher.is_match(haystack))
                    .unwrap_or(false),
                _ => false,
            };
            Ok(found)
        },
    )
    .map_err(from_rusqlite)
}
