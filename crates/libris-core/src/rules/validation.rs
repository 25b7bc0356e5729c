//! Field-level validation
//!
//! A `Validator` collects every violated rule before the caller decides what
//! to do with them. Only the first message recorded for a field is kept, so a
//! missing value reports "must be provided" rather than every downstream rule
//! that also fails for it.

use std::collections::HashSet;
use std::hash::Hash;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{LibrisError, Result};

/// Email grammar accepted for user accounts
pub static EMAIL_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is a valid regex")
});

/// One violated rule on one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Accumulates field errors in detection order
#[derive(Debug, Default, Clone)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no rule has failed
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record `message` against `field` unless the field already has one
    pub fn add_error(&mut self, field: &str, message: &str) {
        if self.errors.iter().any(|e| e.field == field) {
            return;
        }
        self.errors.push(FieldError::new(field, message));
    }

    /// Record an error when `ok` is false
    pub fn check(&mut self, ok: bool, field: &str, message: &str) {
        if !ok {
            self.add_error(field, message);
        }
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Convert the collected errors into a `Validation` error, if any
    ///
    /// # Errors
    ///
    /// Returns `LibrisError::Validation` carrying every recorded field error.
    pub fn finish(self) -> Result<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(LibrisError::Validation {
                errors: self.errors,
            })
        }
    }
}

/// True if `value` appears in `permitted`
pub fn permitted_value<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.iter().any(|p| p == value)
}

pub fn matches(value: &str, rx: &Regex) -> bool {
    rx.is_match(value)
}

/// True if every element of `values` is distinct
pub fn unique<T: Eq + Hash>(values: &[T]) -> bool {
    let mut seen = HashSet::with_capacity(values.len());
    values.iter().all(|v| seen.insert(v))
}
