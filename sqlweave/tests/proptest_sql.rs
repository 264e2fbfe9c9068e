//! Property-based tests for quoting, escaping and placeholder allocation.
//!
//! These tests generate random inputs to find edge cases that
//! manual tests might miss.

use proptest::prelude::*;
use sqlweave::{
    Condition, Dialect, Mssql, ParamBinder, Postgres, QueryBuilder, Value, validate_identifier,
};

// =============================================================================
// SQL Identifier Property Tests
// =============================================================================

proptest! {
    /// Plain identifiers within the limit always pass validation
    #[test]
    fn valid_identifiers_always_pass(s in "[a-zA-Z][a-zA-Z0-9_]{0,62}") {
        prop_assert!(validate_identifier(&s, Some(63)).is_ok(), "should pass: {}", s);
    }

    /// Quoted and marked names are accepted
    #[test]
    fn quoted_names_validate_like_bare(s in "[a-zA-Z0-9_ ]{1,30}") {
        prop_assume!(!s.trim().is_empty());
        let bracketed = format!("[{s}]");
        prop_assert!(validate_identifier(&bracketed, Some(128)).is_ok());
        let marked = format!("{{{{%{s}}}}}");
        prop_assert!(validate_identifier(&marked, Some(128)).is_ok());
    }

    /// A NUL byte anywhere is rejected
    #[test]
    fn nul_always_fails(prefix in "[a-z]{0,10}", suffix in "[a-z]{0,10}") {
        let ident = format!("{prefix}\0{suffix}");
        prop_assert!(validate_identifier(&ident, None).is_err());
    }

    /// Names over the dialect limit are rejected, per dotted part
    #[test]
    fn overlong_parts_rejected(schema in "[a-z]{1,10}", name in "[a-z]{64,80}") {
        let qualified = format!("{schema}.{name}");
        prop_assert!(validate_identifier(&qualified, Some(63)).is_err());
        prop_assert!(validate_identifier(&qualified, None).is_ok());
    }
}

// =============================================================================
// Quoting Property Tests
// =============================================================================

proptest! {
    /// Quoting an already quoted name is a no-op
    #[test]
    fn quote_table_name_idempotent(name in "[a-zA-Z_][a-zA-Z0-9_ ]{0,20}") {
        let once = Mssql.quote_table_name(&name);
        prop_assert_eq!(Mssql.quote_table_name(&once), once.clone());

        let once = Postgres.quote_table_name(&name);
        prop_assert_eq!(Postgres.quote_table_name(&once), once);
    }

    /// A quoted identifier round-trips its closing quote by doubling
    #[test]
    fn quote_identifier_doubles_close_quote(name in "[a-z\\]]{0,20}") {
        let quoted = Mssql.quote_identifier(&name);
        let inner = &quoted[1..quoted.len() - 1];
        prop_assert_eq!(inner.replace("]]", "]"), name);
    }

    /// String literals never leave a lone quote inside
    #[test]
    fn quote_value_doubles_single_quotes(text in "[a-zA-Z0-9 ';-]{0,40}") {
        let quoted = Postgres.quote_value(&Value::from(text.as_str()));
        prop_assert!(quoted.starts_with('\'') && quoted.ends_with('\''));
        let inner = &quoted[1..quoted.len() - 1];
        prop_assert_eq!(inner.replace("''", "'"), text);
    }
}

// =============================================================================
// LIKE Escaping Property Tests
// =============================================================================

proptest! {
    /// After escaping, no wildcard survives outside a bracket escape
    #[test]
    fn mssql_escape_like_neutralizes_wildcards(pattern in "[a-z%_\\[\\]]{0,30}") {
        let escaped = Mssql.escape_like(&pattern);
        let stripped = escaped
            .replace("[%]", "")
            .replace("[_]", "")
            .replace("[[]", "")
            .replace("[]]", "");
        prop_assert!(!stripped.contains('%'), "escaped: {}", escaped);
        prop_assert!(!stripped.contains('_'), "escaped: {}", escaped);
        prop_assert!(!stripped.contains('['), "escaped: {}", escaped);
    }

    /// Plain text passes through unchanged
    #[test]
    fn escape_like_keeps_plain_text(pattern in "[a-zA-Z0-9 ]{0,30}") {
        prop_assert_eq!(Mssql.escape_like(&pattern), pattern.clone());
        prop_assert_eq!(Postgres.escape_like(&pattern), pattern);
    }
}

// =============================================================================
// Placeholder Property Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Every bound value gets its own placeholder
    #[test]
    fn binder_names_are_unique(values in prop::collection::vec(any::<i64>(), 0..50)) {
        let mut binder = ParamBinder::new(":qp");
        let mut names = Vec::new();
        for value in &values {
            names.push(binder.bind(Value::Int(*value)).unwrap());
        }
        let mut deduped = names.clone();
        deduped.sort();
        deduped.dedup();
        prop_assert_eq!(deduped.len(), values.len());
        prop_assert_eq!(binder.len(), values.len());
    }

    /// Each equality pair in a hash condition binds exactly one parameter
    #[test]
    fn hash_condition_param_count(pairs in prop::collection::btree_map("[a-z]{1,8}", any::<i32>(), 1..10)) {
        let condition = Condition::hash(pairs.iter().map(|(k, v)| (k.clone(), *v)));
        let result = QueryBuilder::new(&Mssql).build_condition(&condition).unwrap();
        prop_assert_eq!(result.params.len(), pairs.len());
        for name in result.placeholders() {
            prop_assert!(result.sql.contains(name), "missing {} in {}", name, result.sql);
        }
    }
}

// =============================================================================
// Fuzzing-style Random Input Tests
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    /// Random ASCII should never panic
    #[test]
    fn random_ascii_no_panic(s in "[[:print:]]{0,100}") {
        let _valid = validate_identifier(&s, Some(128));
        let _table = Mssql.quote_table_name(&s);
        let _source = Mssql.quote_source(&s);
        let _sql = Mssql.quote_sql(&s);
    }

    /// Random bytes should never panic
    #[test]
    fn random_bytes_no_panic(bytes in prop::collection::vec(any::<u8>(), 0..100)) {
        if let Ok(s) = std::str::from_utf8(&bytes) {
            let _escaped = Mssql.escape_like(s);
            let _quoted = Mssql.quote_value(&Value::from(s));
        }
    }
}
