//! SQL dialect configuration and quoting rules.
//!
//! A dialect is an immutable [`DialectConfig`] value. The [`Dialect`] trait
//! exposes the quoting and escaping rules derived from it; presets for SQL
//! Server, Postgres, `SQLite` and `MySQL` are lazily built statics.

use std::sync::{LazyLock, OnceLock};

use regex::Regex;
use serde::Deserialize;

use crate::Value;
use crate::error::SqlResult;

/// How LIMIT / OFFSET are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitOffsetSyntax {
    /// `ORDER BY .. OFFSET m ROWS FETCH NEXT n ROWS ONLY`
    RowOffsetFetch,
    /// `LIMIT n OFFSET m`
    LimitOffset,
    /// `SELECT TOP n ..` (no offset support)
    Top,
}

/// How an upsert is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertStrategy {
    /// `MERGE target USING source ..`
    Merge,
    /// `INSERT .. ON CONFLICT (..) DO UPDATE ..`
    InsertOnConflict,
    /// `UPDATE ..; INSERT .. WHERE NOT EXISTS (..)`
    SelectThenInsertOrUpdate,
}

/// How table and column comments are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentStyle {
    /// SQL Server extended properties (`MS_description`).
    ExtendedProperty,
    /// `COMMENT ON TABLE .. IS ..`
    CommentOn,
}

/// One entry of a LIKE escaping table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LikeEscape {
    /// Character reserved by the dialect's LIKE grammar.
    pub from: char,
    /// Replacement text.
    pub to: String,
}

impl LikeEscape {
    fn new(from: char, to: &str) -> Self {
        Self {
            from,
            to: to.to_string(),
        }
    }
}

/// Capabilities and formatting rules of one SQL backend.
///
/// Unspecified TOML fields take the generic ANSI values of
/// [`DialectConfig::default`].
///
/// # Example
/// ```
/// use sqlweave::{DialectConfig, LimitOffsetSyntax};
///
/// let config = DialectConfig::from_toml_str(r#"
///     name = "warehouse"
///     identifier_quotes = ["[", "]"]
///     limit_offset = "row_offset_fetch"
/// "#).unwrap();
/// assert_eq!(config.limit_offset, LimitOffsetSyntax::RowOffsetFetch);
/// assert_eq!(config.param_prefix, ":qp");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DialectConfig {
    pub name: String,
    pub identifier_quotes: (char, char),
    pub limit_offset: LimitOffsetSyntax,
    /// Literal used as LIMIT when only an offset is given.
    pub no_limit_marker: Option<String>,
    pub upsert: Option<UpsertStrategy>,
    pub like_escapes: Vec<LikeEscape>,
    /// Suffix appended after each LIKE placeholder, e.g. `" ESCAPE '\'"`.
    pub like_escape_clause: String,
    /// Native case-insensitive LIKE operator.
    pub ilike_operator: Option<String>,
    pub param_prefix: String,
    /// Replaces `%` in `{{%table}}` placeholders.
    pub table_prefix: String,
    pub merge_lock_hint: Option<String>,
    /// Capture generated values of an INSERT through a scratch table.
    pub capture_inserted: bool,
    pub scratch_table: String,
    pub comment_style: Option<CommentStyle>,
    /// Render booleans as `1`/`0` instead of `TRUE`/`FALSE`.
    pub numeric_booleans: bool,
    /// Prefix non-ASCII string literals with `N`.
    pub national_strings: bool,
    pub max_identifier_length: Option<usize>,
}

fn backslash_escapes() -> Vec<LikeEscape> {
    vec![
        LikeEscape::new('%', "\\%"),
        LikeEscape::new('_', "\\_"),
        LikeEscape::new('\\', "\\\\"),
    ]
}

impl Default for DialectConfig {
    fn default() -> Self {
        Self {
            name: "ansi".to_string(),
            identifier_quotes: ('"', '"'),
            limit_offset: LimitOffsetSyntax::LimitOffset,
            no_limit_marker: None,
            upsert: None,
            like_escapes: backslash_escapes(),
            like_escape_clause: " ESCAPE '\\'".to_string(),
            ilike_operator: None,
            param_prefix: ":qp".to_string(),
            table_prefix: String::new(),
            merge_lock_hint: None,
            capture_inserted: false,
            scratch_table: "@temporary_inserted".to_string(),
            comment_style: None,
            numeric_booleans: false,
            national_strings: false,
            max_identifier_length: Some(128),
        }
    }
}

impl DialectConfig {
    /// SQL Server (T-SQL).
    pub fn mssql() -> Self {
        Self {
            name: "mssql".to_string(),
            identifier_quotes: ('[', ']'),
            limit_offset: LimitOffsetSyntax::RowOffsetFetch,
            upsert: Some(UpsertStrategy::Merge),
            like_escapes: vec![
                LikeEscape::new('%', "[%]"),
                LikeEscape::new('_', "[_]"),
                LikeEscape::new('[', "[[]"),
                LikeEscape::new(']', "[]]"),
                LikeEscape::new('\\', "[\\]"),
            ],
            like_escape_clause: String::new(),
            merge_lock_hint: Some("HOLDLOCK".to_string()),
            capture_inserted: true,
            comment_style: Some(CommentStyle::ExtendedProperty),
            numeric_booleans: true,
            national_strings: true,
            ..Self::default()
        }
    }

    /// `PostgreSQL`.
    pub fn postgres() -> Self {
        Self {
            name: "pgsql".to_string(),
            upsert: Some(UpsertStrategy::InsertOnConflict),
            like_escape_clause: String::new(),
            ilike_operator: Some("ILIKE".to_string()),
            comment_style: Some(CommentStyle::CommentOn),
            max_identifier_length: Some(63),
            ..Self::default()
        }
    }

    /// `SQLite`.
    pub fn sqlite() -> Self {
        Self {
            name: "sqlite".to_string(),
            identifier_quotes: ('`', '`'),
            no_limit_marker: Some("-1".to_string()),
            upsert: Some(UpsertStrategy::InsertOnConflict),
            numeric_booleans: true,
            max_identifier_length: None,
            ..Self::default()
        }
    }

    /// `MySQL`.
    pub fn mysql() -> Self {
        Self {
            name: "mysql".to_string(),
            identifier_quotes: ('`', '`'),
            no_limit_marker: Some("18446744073709551615".to_string()),
            upsert: Some(UpsertStrategy::SelectThenInsertOrUpdate),
            like_escape_clause: String::new(),
            numeric_booleans: true,
            max_identifier_length: Some(64),
            ..Self::default()
        }
    }

    /// Parse a dialect from TOML.
    pub fn from_toml_str(source: &str) -> SqlResult<Self> {
        Ok(toml::from_str(source)?)
    }
}

static MSSQL: LazyLock<DialectConfig> = LazyLock::new(DialectConfig::mssql);
static POSTGRES: LazyLock<DialectConfig> = LazyLock::new(DialectConfig::postgres);
static SQLITE: LazyLock<DialectConfig> = LazyLock::new(DialectConfig::sqlite);
static MYSQL: LazyLock<DialectConfig> = LazyLock::new(DialectConfig::mysql);

// ═══════════════════════════════════════════════════════════════════════════
// DIALECT TRAIT
// ═══════════════════════════════════════════════════════════════════════════

/// Quoting and escaping rules of a dialect.
///
/// Only [`Dialect::config`] is required; everything else is derived from it.
pub trait Dialect {
    /// The configuration backing this dialect.
    fn config(&self) -> &DialectConfig;

    /// Dialect name used in logs and errors.
    fn name(&self) -> &str {
        &self.config().name
    }

    /// Wrap a name in quotes, doubling any literal closing quote.
    ///
    /// Never treats the input as already quoted: `[test]` becomes `[[test]]]`.
    fn quote_identifier(&self, name: &str) -> String {
        let (open, close) = self.config().identifier_quotes;
        let doubled: String = [close, close].iter().collect();
        format!("{open}{}{close}", name.replace(close, &doubled))
    }

    /// Quote a single name part, passing through `*` and already quoted parts.
    fn quote_simple_name(&self, name: &str) -> String {
        let (open, close) = self.config().identifier_quotes;
        let already_quoted = name.len() >= 2 && name.starts_with(open) && name.ends_with(close);
        if name == "*" || already_quoted {
            name.to_string()
        } else {
            self.quote_identifier(name)
        }
    }

    /// Quote a possibly schema-qualified table name.
    ///
    /// Names containing `(` or `{{` are raw and returned unchanged.
    fn quote_table_name(&self, name: &str) -> String {
        if name.contains('(') || name.contains("{{") {
            return name.to_string();
        }
        split_outside_quotes(name, self.config().identifier_quotes, |c| c == '.')
            .iter()
            .map(|part| self.quote_simple_name(part))
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Quote a possibly table-qualified column name.
    ///
    /// Names containing `(`, `[[` or `{{` are raw and returned unchanged.
    fn quote_column_name(&self, name: &str) -> String {
        if name.contains('(') || name.contains("[[") || name.contains("{{") {
            return name.to_string();
        }
        self.quote_table_name(name)
    }

    /// Quote a FROM source of the form `table`, `table alias` or
    /// `table AS alias`.
    fn quote_source(&self, source: &str) -> String {
        if source.contains('(') {
            return source.to_string();
        }
        let parts = split_outside_quotes(source.trim(), self.config().identifier_quotes, |c| {
            c.is_whitespace()
        });
        match parts.as_slice() {
            [table, alias] => format!(
                "{} {}",
                self.quote_table_name(table),
                self.quote_simple_name(alias)
            ),
            [table, kw, alias] if kw.eq_ignore_ascii_case("as") => format!(
                "{} {}",
                self.quote_table_name(table),
                self.quote_simple_name(alias)
            ),
            _ => self.quote_table_name(source.trim()),
        }
    }

    /// Render a literal inline.
    fn quote_value(&self, value: &Value) -> String {
        let config = self.config();
        match value {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => match (config.numeric_booleans, *b) {
                (true, true) => "1".to_string(),
                (true, false) => "0".to_string(),
                (false, true) => "TRUE".to_string(),
                (false, false) => "FALSE".to_string(),
            },
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => {
                let escaped = s.replace('\'', "''");
                if config.national_strings && !s.is_ascii() {
                    format!("N'{escaped}'")
                } else {
                    format!("'{escaped}'")
                }
            },
        }
    }

    /// Escape the dialect's LIKE wildcards in a single pass.
    fn escape_like(&self, pattern: &str) -> String {
        let escapes = &self.config().like_escapes;
        let mut out = String::with_capacity(pattern.len());
        for c in pattern.chars() {
            match escapes.iter().find(|e| e.from == c) {
                Some(e) => out.push_str(&e.to),
                None => out.push(c),
            }
        }
        out
    }

    /// Resolve `{{table}}`, `{{%table}}` and `[[column]]` placeholders.
    ///
    /// # Example
    /// ```
    /// use sqlweave::{Dialect, Mssql};
    ///
    /// assert_eq!(
    ///     Mssql.quote_sql("SELECT [[id]] FROM {{%user}}"),
    ///     "SELECT [id] FROM [user]"
    /// );
    /// ```
    fn quote_sql(&self, sql: &str) -> String {
        placeholder_regex()
            .replace_all(sql, |caps: &regex::Captures<'_>| {
                if let Some(column) = caps.get(2) {
                    return self.quote_column_name(column.as_str());
                }
                let table = caps.get(1).map_or("", |m| m.as_str());
                self.quote_table_name(table)
                    .replace('%', &self.config().table_prefix)
            })
            .into_owned()
    }
}

#[allow(clippy::expect_used)]
fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_RE.get_or_init(|| {
        Regex::new(r"\{\{(%?[\w\-\. ]+%?)\}\}|\[\[([\w\-\. ]+)\]\]")
            .expect("invalid built-in placeholder regex")
    })
}

/// Split `input` on `is_sep` characters that are not inside quotes.
pub(crate) fn split_outside_quotes(
    input: &str,
    (open, close): (char, char),
    is_sep: impl Fn(char) -> bool,
) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut inside = false;
    for c in input.chars() {
        if !inside && c == open {
            inside = true;
            current.push(c);
        } else if inside && c == close {
            inside = false;
            current.push(c);
        } else if !inside && is_sep(c) {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

impl Dialect for DialectConfig {
    fn config(&self) -> &DialectConfig {
        self
    }
}

impl<D: Dialect + ?Sized> Dialect for &D {
    fn config(&self) -> &DialectConfig {
        (**self).config()
    }
}

macro_rules! preset_dialect {
    ($(#[$meta:meta])* $ty:ident => $config:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $ty;

        impl Dialect for $ty {
            #[inline]
            fn config(&self) -> &DialectConfig {
                &$config
            }
        }
    };
}

preset_dialect!(
    /// SQL Server dialect.
    Mssql => MSSQL
);
preset_dialect!(
    /// Postgres dialect.
    Postgres => POSTGRES
);
preset_dialect!(
    /// `SQLite` dialect.
    Sqlite => SQLITE
);
preset_dialect!(
    /// `MySQL` dialect.
    MySql => MYSQL
);
