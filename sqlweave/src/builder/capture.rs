//! INSERT with generated values returned through a scratch table.
//!
//! The statements must appear in a fixed order: declare the scratch table,
//! insert with `OUTPUT INSERTED.*` into it, select from it. Each step is a
//! state so the sequence cannot be assembled out of order.

use std::marker::PhantomData;

use crate::dialect::{Dialect, DialectConfig};
use crate::schema::TableSchema;

/// Nothing emitted yet.
pub struct DeclareScratch;
/// Scratch table declared.
pub struct EmitInsert;
/// Insert emitted.
pub struct EmitSelect;

/// Capture sequence under construction.
pub struct OutputCapture<'a, S> {
    scratch: &'a str,
    sql: String,
    _state: PhantomData<S>,
}

impl<'a> OutputCapture<'a, DeclareScratch> {
    pub const fn new(scratch: &'a str) -> Self {
        Self {
            scratch,
            sql: String::new(),
            _state: PhantomData,
        }
    }

    /// `SET NOCOUNT ON;DECLARE <scratch> TABLE (<column defs>);`
    pub fn declare(self, dialect: &DialectConfig, table: &TableSchema) -> OutputCapture<'a, EmitInsert> {
        let columns = table
            .columns
            .iter()
            .map(|column| {
                format!(
                    "{} {} {}",
                    dialect.quote_column_name(&column.name),
                    column.db_type,
                    if column.allow_null { "NULL" } else { "" }
                )
            })
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = self.sql;
        sql.push_str(&format!("SET NOCOUNT ON;DECLARE {} TABLE ({columns});", self.scratch));
        OutputCapture {
            scratch: self.scratch,
            sql,
            _state: PhantomData,
        }
    }
}

impl<'a> OutputCapture<'a, EmitInsert> {
    /// `<head> OUTPUT INSERTED.* INTO <scratch><body>;`
    pub fn insert(self, head: &str, body: &str) -> OutputCapture<'a, EmitSelect> {
        let mut sql = self.sql;
        sql.push_str(&format!("{head} OUTPUT INSERTED.* INTO {}{body};", self.scratch));
        OutputCapture {
            scratch: self.scratch,
            sql,
            _state: PhantomData,
        }
    }
}

impl OutputCapture<'_, EmitSelect> {
    /// Append the final select and return the whole sequence.
    pub fn finish(self) -> String {
        let mut sql = self.sql;
        sql.push_str(&format!("SELECT * FROM {}", self.scratch));
        sql
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ColumnSchema;

    #[test]
    fn test_capture_sequence() {
        let table = TableSchema::new("t")
            .column(ColumnSchema::new("id", "int"))
            .column(ColumnSchema::new("note", "text").nullable());
        let sql = OutputCapture::new("@out")
            .declare(&DialectConfig::mssql(), &table)
            .insert("INSERT INTO [t] ([note])", " VALUES (:qp0)")
            .finish();
        assert_eq!(
            sql,
            "SET NOCOUNT ON;DECLARE @out TABLE ([id] int , [note] text NULL);\
             INSERT INTO [t] ([note]) OUTPUT INSERTED.* INTO @out VALUES (:qp0);\
             SELECT * FROM @out"
        );
    }
}
