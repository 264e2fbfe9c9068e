//! Table metadata consumed by the builder.
//!
//! The builder needs column types to declare the scratch table of a
//! capturing INSERT, and key constraints to derive upsert conflict targets.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::SqlResult;

/// One column of a table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnSchema {
    pub name: String,
    /// Database type as declared, e.g. `varchar(128)`.
    pub db_type: String,
    #[serde(default)]
    pub allow_null: bool,
    #[serde(default)]
    pub auto_increment: bool,
}

impl ColumnSchema {
    /// A `NOT NULL` column.
    pub fn new(name: impl Into<String>, db_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            db_type: db_type.into(),
            allow_null: false,
            auto_increment: false,
        }
    }

    /// Mark the column nullable.
    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.allow_null = true;
        self
    }

    /// Mark the column as server generated.
    #[must_use]
    pub const fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }
}

/// Columns and key constraints of a table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TableSchema {
    pub name: String,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
    #[serde(default)]
    pub primary_key: Vec<String>,
    #[serde(default)]
    pub unique_keys: Vec<Vec<String>>,
}

impl TableSchema {
    /// An empty table definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            columns: Vec::new(),
            primary_key: Vec::new(),
            unique_keys: Vec::new(),
        }
    }

    /// Append a column.
    #[must_use]
    pub fn column(mut self, column: ColumnSchema) -> Self {
        self.columns.push(column);
        self
    }

    /// Set the primary key.
    #[must_use]
    pub fn primary_key<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.primary_key = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add a unique constraint.
    #[must_use]
    pub fn unique<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_keys
            .push(columns.into_iter().map(Into::into).collect());
        self
    }

    /// Primary key first, then unique constraints, skipping empty ones.
    pub fn key_constraints(&self) -> impl Iterator<Item = &[String]> {
        std::iter::once(self.primary_key.as_slice())
            .chain(self.unique_keys.iter().map(Vec::as_slice))
            .filter(|key| !key.is_empty())
    }

    /// Look up a column by name.
    pub fn get_column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// Source of table metadata.
pub trait SchemaProvider: Send + Sync {
    /// Metadata for `name`, which may still carry quotes or `{{ }}` markers.
    fn table_schema(&self, name: &str) -> Option<&TableSchema>;
}

/// In-memory [`SchemaProvider`].
///
/// # Example
/// ```
/// use sqlweave::{Catalog, SchemaProvider};
///
/// let catalog = Catalog::from_toml_str(r#"
///     [[tables]]
///     name = "customer"
///     primary_key = ["id"]
///     columns = [
///         { name = "id", db_type = "int", auto_increment = true },
///         { name = "email", db_type = "varchar(128)" },
///     ]
/// "#).unwrap();
///
/// assert!(catalog.table_schema("{{%customer}}").is_some());
/// assert!(catalog.table_schema("[dbo].[customer]").is_some());
/// ```
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    tables: IndexMap<String, TableSchema>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CatalogFile {
    #[serde(default)]
    tables: Vec<TableSchema>,
}

impl Catalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a catalog from TOML (`[[tables]]` array).
    pub fn from_toml_str(source: &str) -> SqlResult<Self> {
        let file: CatalogFile = toml::from_str(source)?;
        let mut catalog = Self::new();
        for table in file.tables {
            catalog.insert(table);
        }
        Ok(catalog)
    }

    /// Add or replace a table.
    pub fn insert(&mut self, table: TableSchema) {
        self.tables.insert(normalize_table_name(&table.name), table);
    }

    /// Builder-style [`Catalog::insert`].
    #[must_use]
    pub fn with_table(mut self, table: TableSchema) -> Self {
        self.insert(table);
        self
    }

    /// Number of known tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl SchemaProvider for Catalog {
    fn table_schema(&self, name: &str) -> Option<&TableSchema> {
        let normalized = normalize_table_name(name);
        self.tables.get(&normalized).or_else(|| {
            normalized
                .rsplit('.')
                .next()
                .and_then(|last| self.tables.get(last))
        })
    }
}

/// Strip `{{ }}`, `%` and quote characters, keeping dotted parts.
fn normalize_table_name(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !matches!(c, '{' | '}' | '%' | '[' | ']' | '"' | '`'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn customer() -> TableSchema {
        TableSchema::new("customer")
            .column(ColumnSchema::new("id", "int").auto_increment())
            .column(ColumnSchema::new("email", "varchar(128)"))
            .column(ColumnSchema::new("name", "varchar(128)").nullable())
            .primary_key(["id"])
            .unique(["email"])
    }

    #[test]
    fn test_lookup_normalizes_names() {
        let catalog = Catalog::new().with_table(customer());
        assert!(catalog.table_schema("customer").is_some());
        assert!(catalog.table_schema("[customer]").is_some());
        assert!(catalog.table_schema("{{%customer}}").is_some());
        assert!(catalog.table_schema("dbo.customer").is_some());
        assert!(catalog.table_schema("order").is_none());
    }

    #[test]
    fn test_key_constraints_order() {
        let table = customer();
        let keys: Vec<_> = table.key_constraints().collect();
        assert_eq!(keys, vec![&["id".to_string()][..], &["email".to_string()][..]]);
    }

    #[test]
    fn test_key_constraints_skip_missing_primary_key() {
        let table = TableSchema::new("t").unique(["a"]);
        assert_eq!(table.key_constraints().count(), 1);
    }

    #[test]
    fn test_from_toml() {
        let catalog = Catalog::from_toml_str(
            r#"
            [[tables]]
            name = "T_upsert_1"
            primary_key = ["a"]
            columns = [{ name = "a", db_type = "int" }]
            "#,
        )
        .unwrap();
        assert_eq!(catalog.len(), 1);
        let table = catalog.table_schema("T_upsert_1").unwrap();
        assert!(!table.get_column("a").unwrap().allow_null);
    }

    #[test]
    fn test_from_toml_unknown_field() {
        let err = Catalog::from_toml_str("[[tables]]\nname = \"t\"\ncolumnz = []").unwrap_err();
        assert!(matches!(err, crate::SqlError::Config(_)));
    }
}
