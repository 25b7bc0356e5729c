//! Error handling for libris-store
//!
//! Translates rusqlite failures, lock timeouts and migration problems into
//! `LibrisError` so nothing backend-specific crosses the `Storage` boundary.

use libris_core::errors::LibrisError;
use libris_core::storage::Deadline;
use rusqlite::ErrorCode;

pub use libris_core::errors::Result;

const UNIQUE_FAILED_PREFIX: &str = "UNIQUE constraint failed: ";

/// Create a migration error
pub fn migration_error(migration_id: &str, reason: &str) -> LibrisError {
    LibrisError::Persistence {
        op: "migration".to_string(),
        message: format!("Migration {} failed: {}", migration_id, reason),
    }
}

/// Create a checksum mismatch error
pub fn checksum_mismatch(migration_id: &str, expected: &str, actual: &str) -> LibrisError {
    LibrisError::Persistence {
        op: "migration_checksum".to_string(),
        message: format!(
            "Checksum mismatch for migration {}: expected {}, got {}",
            migration_id, expected, actual
        ),
    }
}

/// Create a database error from rusqlite::Error outside any deadline
pub fn from_rusqlite(err: rusqlite::Error) -> LibrisError {
    LibrisError::Persistence {
        op: "sqlite".to_string(),
        message: err.to_string(),
    }
}

/// Error mapper for a statement run under `deadline`
///
/// - an interrupted statement or an exhausted busy wait becomes `Timeout`
/// - a UNIQUE violation becomes `DuplicateKey` naming the offending column
/// - anything else becomes `Persistence`
pub fn sqlite_error<'a>(
    op: &'a str,
    deadline: &'a Deadline,
) -> impl Fn(rusqlite::Error) -> LibrisError + 'a {
    move |err| classify(op, deadline, err)
}

fn classify(op: &str, deadline: &Deadline, err: rusqlite::Error) -> LibrisError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        match failure.code {
            ErrorCode::OperationInterrupted
            | ErrorCode::DatabaseBusy
            | ErrorCode::DatabaseLocked => {
                tracing::warn!(
                    op,
                    budget_ms = deadline.budget().as_millis() as u64,
                    "sqlite deadline exceeded"
                );
                return deadline.timeout(op);
            }
            ErrorCode::ConstraintViolation => {
                if let Some((collection, field)) = message.as_deref().and_then(unique_target) {
                    return LibrisError::DuplicateKey { collection, field };
                }
            }
            _ => {}
        }
    }
    LibrisError::Persistence {
        op: op.to_string(),
        message: err.to_string(),
    }
}

/// True if `err` is a FOREIGN KEY violation
pub fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(failure, message) => {
            failure.code == ErrorCode::ConstraintViolation
                && message
                    .as_deref()
                    .is_some_and(|m| m.contains("FOREIGN KEY"))
        }
        _ => false,
    }
}

/// Parse `"UNIQUE constraint failed: users.email"` into `("users", "email")`
fn unique_target(message: &str) -> Option<(String, String)> {
    let columns = message.strip_prefix(UNIQUE_FAILED_PREFIX)?;
    let first = columns.split(',').next()?.trim();
    let (table, column) = first.split_once('.')?;
    Some((table.to_string(), column.to_string()))
}

/// A lock could not be acquired before the deadline
pub fn lock_timeout(op: &str, collection: &str, deadline: &Deadline) -> LibrisError {
    tracing::warn!(
        op,
        collection,
        budget_ms = deadline.budget().as_millis() as u64,
        "lock wait exceeded deadline"
    );
    deadline.timeout(op)
}
