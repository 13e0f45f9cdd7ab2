//! Drive query-language helpers.
//!
//! Patterns end up inside a single-quoted string literal of the `q`
//! parameter, so quotes and backslashes must be escaped.

use crate::error::{GatewayError, Result};

/// Excludes files in the bin.
pub const NOT_TRASHED: &str = "trashed = false";

/// Escape a value for use inside a single-quoted query literal.
pub fn escape_literal(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '\\' || ch == '\'' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// `name contains '<pattern>' and trashed = false`
///
/// A pattern that is empty after trimming is rejected.
pub fn name_contains(pattern: &str) -> Result<String> {
    let pattern = pattern.trim();
    if pattern.is_empty() {
        return Err(GatewayError::InvalidQuery(
            "search pattern must not be empty".to_string(),
        ));
    }

    Ok(format!(
        "name contains '{}' and {}",
        escape_literal(pattern),
        NOT_TRASHED
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_contains() {
        assert_eq!(
            name_contains("asr").unwrap(),
            "name contains 'asr' and trashed = false"
        );
    }

    #[test]
    fn test_quotes_cannot_break_out() {
        assert_eq!(
            name_contains("x' or name contains '").unwrap(),
            r"name contains 'x\' or name contains \'' and trashed = false"
        );
        assert_eq!(escape_literal(r"C:\dossiers"), r"C:\\dossiers");
    }

    #[test]
    fn test_empty_pattern_rejected() {
        assert!(matches!(name_contains(""), Err(GatewayError::InvalidQuery(_))));
        assert!(matches!(name_contains("   "), Err(GatewayError::InvalidQuery(_))));
    }

    #[test]
    fn test_surrounding_whitespace_trimmed() {
        assert_eq!(
            name_contains("  polis ").unwrap(),
            "name contains 'polis' and trashed = false"
        );
    }
}
