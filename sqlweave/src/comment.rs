//! Comment DDL for tables and columns.
//!
//! SQL Server stores comments as `MS_description` extended properties, so an
//! add has to choose between the add and update procedures and a drop must
//! be guarded. `COMMENT ON` dialects are idempotent as written.
//!
//! # Example
//!
//! ```
//! use sqlweave::{Postgres, QueryBuilder};
//!
//! let sql = QueryBuilder::new(&Postgres)
//!     .add_comment_on_column("profile", "description", "Public bio")
//!     .unwrap();
//! assert_eq!(sql, r#"COMMENT ON COLUMN "profile"."description" IS 'Public bio'"#);
//! ```

use crate::builder::QueryBuilder;
use crate::dialect::{CommentStyle, Dialect, DialectConfig};
use crate::error::{SqlError, SqlResult};
use crate::validate::validate_identifier;
use crate::value::Value;

const PROPERTY: &str = "N'MS_description'";
const DEFAULT_SCHEMA: &str = "dbo";

impl QueryBuilder<'_> {
    /// Set the comment of `table`, replacing any existing one.
    pub fn add_comment_on_table(&self, table: &str, comment: &str) -> SqlResult<String> {
        self.comment_ddl(table, None, Some(comment))
    }

    /// Set the comment of `table.column`, replacing any existing one.
    pub fn add_comment_on_column(&self, table: &str, column: &str, comment: &str) -> SqlResult<String> {
        self.comment_ddl(table, Some(column), Some(comment))
    }

    /// Remove the comment of `table`; a no-op when there is none.
    pub fn drop_comment_from_table(&self, table: &str) -> SqlResult<String> {
        self.comment_ddl(table, None, None)
    }

    /// Remove the comment of `table.column`; a no-op when there is none.
    pub fn drop_comment_from_column(&self, table: &str, column: &str) -> SqlResult<String> {
        self.comment_ddl(table, Some(column), None)
    }

    fn comment_ddl(&self, table: &str, column: Option<&str>, comment: Option<&str>) -> SqlResult<String> {
        let d = self.dialect();
        validate_identifier(table, d.max_identifier_length)?;
        if let Some(column) = column {
            validate_identifier(column, d.max_identifier_length)?;
        }

        let sql = match d.comment_style {
            Some(CommentStyle::ExtendedProperty) => {
                let target = self.property_target(table, column);
                match comment {
                    Some(comment) => target.set_statement(comment),
                    None => target.drop_statement(),
                }
            },
            Some(CommentStyle::CommentOn) => comment_on(d, table, column, comment),
            None => return Err(SqlError::unsupported(&d.name, "comment DDL")),
        };
        tracing::debug!(dialect = %d.name, table, column, "rendered comment DDL");
        Ok(sql)
    }

    fn property_target(&self, table: &str, column: Option<&str>) -> PropertyTarget {
        let d = self.dialect();
        let bare = bare_name(d, table);
        let (schema, table_name) = match bare.rsplit_once('.') {
            Some((schema, name)) => (Some(schema.to_string()), name.to_string()),
            None => {
                let known = self
                    .schema_provider()
                    .and_then(|provider| provider.table_schema(table))
                    .and_then(|table| table.schema.clone());
                (known, bare)
            },
        };

        PropertyTarget {
            schema: national(schema.as_deref().unwrap_or(DEFAULT_SCHEMA)),
            table: national(&table_name),
            column: column.map(|c| national(&bare_name(d, c))),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// EXTENDED PROPERTIES
// ═══════════════════════════════════════════════════════════════════════════

/// Level names of an extended property, already rendered as literals.
struct PropertyTarget {
    schema: String,
    table: String,
    column: Option<String>,
}

impl PropertyTarget {
    fn exists_check(&self) -> String {
        let level2 = match &self.column {
            Some(column) => format!("'COLUMN', {column}"),
            None => "DEFAULT, DEFAULT".to_string(),
        };
        format!(
            "SELECT 1 FROM fn_listextendedproperty ({PROPERTY}, 'SCHEMA', {}, 'TABLE', {}, {level2})",
            self.schema, self.table
        )
    }

    fn levels(&self) -> String {
        let mut levels = format!(
            "@level0type = N'SCHEMA', @level0name = {}, @level1type = N'TABLE', @level1name = {}",
            self.schema, self.table
        );
        if let Some(column) = &self.column {
            levels.push_str(&format!(", @level2type = N'COLUMN', @level2name = {column}"));
        }
        levels
    }

    fn set_statement(&self, comment: &str) -> String {
        let params = format!(
            "@name = {PROPERTY}, @value = {}, {}",
            national(comment),
            self.levels()
        );
        format!(
            "IF NOT EXISTS ({}) EXEC sys.sp_addextendedproperty {params}; \
             ELSE EXEC sys.sp_updateextendedproperty {params};",
            self.exists_check()
        )
    }

    fn drop_statement(&self) -> String {
        format!(
            "IF EXISTS ({}) EXEC sys.sp_dropextendedproperty @name = {PROPERTY}, {};",
            self.exists_check(),
            self.levels()
        )
    }
}

/// `N'...'` literal with quotes doubled.
fn national(text: &str) -> String {
    format!("N'{}'", text.replace('\'', "''"))
}

/// Name without quoting or `{{ }}` markers, `%` resolved to the table prefix.
fn bare_name(dialect: &DialectConfig, name: &str) -> String {
    let (open, close) = dialect.identifier_quotes;
    name.replace("{{", "")
        .replace("}}", "")
        .replace("[[", "")
        .replace("]]", "")
        .replace('%', &dialect.table_prefix)
        .chars()
        .filter(|&c| c != open && c != close)
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════
// COMMENT ON
// ═══════════════════════════════════════════════════════════════════════════

fn comment_on(dialect: &DialectConfig, table: &str, column: Option<&str>, comment: Option<&str>) -> String {
    let table = dialect.quote_table_name(table);
    let target = match column {
        Some(column) => format!("COLUMN {table}.{}", dialect.quote_column_name(column)),
        None => format!("TABLE {table}"),
    };
    let value = comment.map_or(Value::Null, Value::from);
    format!("COMMENT ON {target} IS {}", dialect.quote_value(&value))
}
