//! Text filter matching shared by both backends

use regex::{Regex, RegexBuilder};

/// Literal, Unicode case-insensitive substring matcher for `needle`
///
/// # Errors
/// Returns the regex error if the escaped pattern exceeds the compiled size
/// limit.
pub fn substring_matcher(needle: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
}
