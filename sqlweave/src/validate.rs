//! Identifier validation for statement targets.
//!
//! Table and column names reach SQL as identifiers, never as parameters,
//! so the builder checks them before rendering DML and DDL targets.
//!
//! # Example
//!
//! ```
//! use sqlweave::validate_identifier;
//!
//! assert!(validate_identifier("[dbo].[profile]", Some(128)).is_ok());
//! assert!(validate_identifier("", Some(128)).is_err());
//! ```

use crate::error::{SqlError, SqlResult};

// ═══════════════════════════════════════════════════════════════════════════
// TARGET NAMES
// ═══════════════════════════════════════════════════════════════════════════

/// Validate a table or column name that will be quoted by the dialect.
///
/// Quoting makes any character safe except NUL, so this only rejects
/// empty names, NUL bytes and parts longer than `max_len` characters.
/// `{{ }}` markers, `%` prefixes and quote characters are not counted.
pub fn validate_identifier(name: &str, max_len: Option<usize>) -> SqlResult<()> {
    if name.contains('\0') {
        return Err(invalid(name, "contains a NUL character"));
    }

    let bare = strip_markers(name);
    if bare.trim().is_empty() {
        return Err(invalid(name, "is empty"));
    }

    if let Some(max) = max_len {
        for part in bare.split('.') {
            let len = part.chars().count();
            if len > max {
                return Err(invalid(
                    name,
                    &format!("part '{part}' has {len} characters, the limit is {max}"),
                ));
            }
        }
    }

    Ok(())
}

fn strip_markers(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, '{' | '}' | '%' | '[' | ']' | '"' | '`'))
        .collect()
}

fn invalid(name: &str, reason: &str) -> SqlError {
    SqlError::InvalidIdentifier {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_quoted_and_marked_names() {
        assert!(validate_identifier("[table name with spaces]", Some(128)).is_ok());
        assert!(validate_identifier("{{%type}}", Some(128)).is_ok());
        assert!(validate_identifier("stranger 'table", Some(128)).is_ok());
        assert!(validate_identifier("dbo.profile", Some(128)).is_ok());
    }

    #[test]
    fn test_validate_rejects_empty() {
        let err = validate_identifier("[]", Some(128)).unwrap_err();
        assert!(matches!(err, SqlError::InvalidIdentifier { .. }));
        assert!(validate_identifier("  ", None).is_err());
    }

    #[test]
    fn test_validate_rejects_nul() {
        assert!(validate_identifier("a\0b", None).is_err());
    }

    #[test]
    fn test_validate_length_per_part() {
        let long = "a".repeat(64);
        assert!(validate_identifier(&long, Some(63)).is_err());
        assert!(validate_identifier(&format!("s.{}", "a".repeat(63)), Some(63)).is_ok());
        assert!(validate_identifier(&long, None).is_ok());
    }
}
