//! Insert-or-update rendering for the three upsert strategies.

use super::{QueryBuilder, RenderContext, RenderResult};
use crate::dialect::{Dialect, UpsertStrategy};
use crate::error::{SqlError, SqlResult};
use crate::params::Params;
use crate::query::{Upsert, UpsertUpdate};
use crate::validate::validate_identifier;

impl QueryBuilder<'_> {
    /// Render an upsert with the dialect's strategy.
    ///
    /// Conflict keys are the explicit ones, or every schema key whose
    /// columns are all inserted. Without any key the statement degrades
    /// to a plain (capturing) INSERT.
    pub fn upsert(&self, upsert: &Upsert) -> SqlResult<RenderResult> {
        self.upsert_with_params(upsert, Params::new())
    }

    /// Render an upsert, carrying caller parameters through unchanged.
    pub fn upsert_with_params(&self, upsert: &Upsert, params: Params) -> SqlResult<RenderResult> {
        let mut ctx = self.context(params, |visit| upsert.visit_params(visit));
        let sql = self.render_upsert(upsert, &mut ctx)?;
        Ok(self.done("upsert", ctx.finish(sql)))
    }

    fn render_upsert(&self, upsert: &Upsert, ctx: &mut RenderContext<'_>) -> SqlResult<String> {
        let d = self.dialect;
        let Some(strategy) = d.upsert else {
            return Err(SqlError::unsupported(&d.name, "upsert"));
        };

        let insert = &upsert.insert;
        validate_identifier(&insert.table, d.max_identifier_length)?;
        insert.check_shape()?;
        let columns = insert.column_names()?;

        let keys = self.conflict_keys(upsert, &columns)?;
        if keys.is_empty() {
            tracing::debug!(
                table = %insert.table,
                "no conflict key among inserted columns, rendering plain insert"
            );
            return self.render_insert(insert, ctx, true);
        }

        match strategy {
            UpsertStrategy::Merge => self.render_merge(upsert, &columns, &keys, ctx),
            UpsertStrategy::InsertOnConflict => self.render_on_conflict(upsert, &columns, &keys, ctx),
            UpsertStrategy::SelectThenInsertOrUpdate => {
                self.render_update_then_insert(upsert, &columns, &keys, ctx)
            },
        }
    }

    fn conflict_keys(&self, upsert: &Upsert, columns: &[String]) -> SqlResult<Vec<Vec<String>>> {
        if let Some(explicit) = &upsert.conflict {
            if let Some(missing) = explicit.iter().find(|key| !columns.contains(*key)) {
                return Err(SqlError::invalid_statement(format!(
                    "conflict column '{missing}' is not an inserted column"
                )));
            }
            return Ok(if explicit.is_empty() {
                Vec::new()
            } else {
                vec![explicit.clone()]
            });
        }

        let Some(table) = self
            .schema
            .and_then(|schema| schema.table_schema(&upsert.insert.table))
        else {
            return Ok(Vec::new());
        };

        let mut keys: Vec<Vec<String>> = Vec::new();
        for key in table.key_constraints() {
            let covered = key.iter().all(|column| columns.contains(column));
            if covered && !keys.iter().any(|seen| seen.as_slice() == key) {
                keys.push(key.to_vec());
            }
        }
        Ok(keys)
    }

    /// `column=value` assignments for the matched branch.
    ///
    /// `incoming` renders the reference to a column of the incoming row.
    fn update_assignments(
        &self,
        upsert: &Upsert,
        columns: &[String],
        keys: &[Vec<String>],
        ctx: &mut RenderContext<'_>,
        incoming: &dyn Fn(&str) -> String,
    ) -> SqlResult<Vec<String>> {
        let d = self.dialect;
        let identity: Vec<&str> = self
            .schema
            .and_then(|provider| provider.table_schema(&upsert.insert.table))
            .map(|table| {
                table
                    .columns
                    .iter()
                    .filter(|column| column.auto_increment)
                    .map(|column| column.name.as_str())
                    .collect()
            })
            .unwrap_or_default();
        let auto = || -> Vec<(String, String)> {
            columns
                .iter()
                .filter(|column| !keys.iter().flatten().any(|key| key == *column))
                .filter(|column| !identity.contains(&column.as_str()))
                .map(|column| (column.clone(), incoming(column.as_str())))
                .collect()
        };

        let assignments = match &upsert.update {
            UpsertUpdate::Disabled => Vec::new(),
            UpsertUpdate::Auto => auto(),
            UpsertUpdate::Explicit(list) => {
                let mut assignments = Vec::with_capacity(list.len());
                for (column, value) in list {
                    assignments.push((column.clone(), ctx.operand(value)?));
                }
                assignments
            },
            UpsertUpdate::Merge(list) => {
                let mut assignments = auto();
                for (column, value) in list {
                    let rendered = ctx.operand(value)?;
                    match assignments.iter_mut().find(|(name, _)| name == column) {
                        Some(existing) => existing.1 = rendered,
                        None => assignments.push((column.clone(), rendered)),
                    }
                }
                assignments
            },
        };

        Ok(assignments
            .into_iter()
            .map(|(column, value)| format!("{}={value}", d.quote_column_name(&column)))
            .collect())
    }

    // ───────────────────────────────────────────────────────────────────────
    // MERGE
    // ───────────────────────────────────────────────────────────────────────

    fn render_merge(
        &self,
        upsert: &Upsert,
        columns: &[String],
        keys: &[Vec<String>],
        ctx: &mut RenderContext<'_>,
    ) -> SqlResult<String> {
        let d = self.dialect;
        let insert = &upsert.insert;
        let table = d.quote_table_name(&insert.table);
        let excluded = d.quote_simple_name("EXCLUDED");
        let quoted_columns = self.quote_columns(columns.iter().map(String::as_str));

        let source = match &insert.query {
            Some(query) => self.render_select(query, ctx)?,
            None => {
                let mut values = Vec::with_capacity(insert.values.len());
                for value in &insert.values {
                    values.push(ctx.operand(value)?);
                }
                format!("VALUES ({})", values.join(", "))
            },
        };

        let on = join_wrapped(
            keys.iter().map(|key| {
                join_wrapped(
                    key.iter().map(|column| {
                        let column = d.quote_column_name(column);
                        format!("{table}.{column}={excluded}.{column}")
                    }),
                    " AND ",
                )
            }),
            " OR ",
        );

        let incoming = |column: &str| format!("{excluded}.{}", d.quote_column_name(column));
        let assignments = self.update_assignments(upsert, columns, keys, ctx, &incoming)?;

        let mut sql = format!("MERGE {table}");
        if let Some(hint) = &d.merge_lock_hint {
            sql.push_str(&format!(" WITH ({hint})"));
        }
        sql.push_str(&format!(
            " USING ({source}) AS {excluded} ({quoted_columns}) ON ({on})"
        ));
        if !assignments.is_empty() {
            sql.push_str(&format!(
                " WHEN MATCHED THEN UPDATE SET {}",
                assignments.join(", ")
            ));
        }
        let incoming_columns = columns
            .iter()
            .map(|column| incoming(column.as_str()))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(
            " WHEN NOT MATCHED THEN INSERT ({quoted_columns}) VALUES ({incoming_columns});"
        ));
        Ok(sql)
    }

    // ───────────────────────────────────────────────────────────────────────
    // INSERT .. ON CONFLICT
    // ───────────────────────────────────────────────────────────────────────

    fn render_on_conflict(
        &self,
        upsert: &Upsert,
        columns: &[String],
        keys: &[Vec<String>],
        ctx: &mut RenderContext<'_>,
    ) -> SqlResult<String> {
        let d = self.dialect;
        let insert_sql = self.render_insert(&upsert.insert, ctx, false)?;
        let target = keys
            .first()
            .map(|key| self.quote_columns(key.iter().map(String::as_str)))
            .unwrap_or_default();

        let incoming = |column: &str| format!("EXCLUDED.{}", d.quote_column_name(column));
        let assignments = self.update_assignments(upsert, columns, keys, ctx, &incoming)?;

        if assignments.is_empty() {
            Ok(format!("{insert_sql} ON CONFLICT ({target}) DO NOTHING"))
        } else {
            Ok(format!(
                "{insert_sql} ON CONFLICT ({target}) DO UPDATE SET {}",
                assignments.join(", ")
            ))
        }
    }

    // ───────────────────────────────────────────────────────────────────────
    // UPDATE; INSERT .. WHERE NOT EXISTS
    // ───────────────────────────────────────────────────────────────────────

    fn render_update_then_insert(
        &self,
        upsert: &Upsert,
        columns: &[String],
        keys: &[Vec<String>],
        ctx: &mut RenderContext<'_>,
    ) -> SqlResult<String> {
        let d = self.dialect;
        let insert = &upsert.insert;
        if insert.query.is_some() {
            return Err(SqlError::unsupported(
                &d.name,
                "sub-select sources in update-then-insert upserts",
            ));
        }

        let table = d.quote_table_name(&insert.table);
        let mut placeholders = Vec::with_capacity(insert.values.len());
        for value in &insert.values {
            placeholders.push(ctx.operand(value)?);
        }
        let placeholder_of = |column: &str| {
            columns
                .iter()
                .position(|name| name == column)
                .and_then(|idx| placeholders.get(idx))
                .cloned()
                .unwrap_or_default()
        };

        let key_condition = keys
            .first()
            .map(|key| {
                key.iter()
                    .map(|column| format!("{}={}", d.quote_column_name(column), placeholder_of(column.as_str())))
                    .collect::<Vec<_>>()
                    .join(" AND ")
            })
            .unwrap_or_default();

        let assignments = self.update_assignments(upsert, columns, keys, ctx, &placeholder_of)?;

        let mut sql = String::new();
        if !assignments.is_empty() {
            sql.push_str(&format!(
                "UPDATE {table} SET {} WHERE {key_condition};",
                assignments.join(", ")
            ));
        }
        sql.push_str(&format!(
            "INSERT INTO {table} ({}) SELECT {} WHERE NOT EXISTS (SELECT 1 FROM {table} WHERE {key_condition})",
            self.quote_columns(columns.iter().map(String::as_str)),
            placeholders.join(", ")
        ));
        Ok(sql)
    }
}

/// One part stays bare; several are each parenthesized and joined.
fn join_wrapped(parts: impl Iterator<Item = String>, separator: &str) -> String {
    let parts: Vec<String> = parts.collect();
    match parts.as_slice() {
        [only] => only.clone(),
        parts => parts
            .iter()
            .map(|part| format!("({part})"))
            .collect::<Vec<_>>()
            .join(separator),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::{DialectConfig, Mssql, MySql, Postgres};
    use crate::query::Query;
    use crate::schema::{Catalog, ColumnSchema, TableSchema};
    use crate::value::{Expr, Value};

    fn catalog() -> Catalog {
        Catalog::new()
            .with_table(
                TableSchema::new("account")
                    .column(ColumnSchema::new("id", "int").auto_increment())
                    .column(ColumnSchema::new("tenant", "int"))
                    .column(ColumnSchema::new("login", "varchar(64)"))
                    .column(ColumnSchema::new("email", "varchar(128)"))
                    .column(ColumnSchema::new("name", "varchar(128)").nullable())
                    .primary_key(["id"])
                    .unique(["tenant", "login"])
                    .unique(["email"]),
            )
            .with_table(
                TableSchema::new("counter")
                    .column(ColumnSchema::new("code", "varchar(16)"))
                    .column(ColumnSchema::new("seq", "int").auto_increment())
                    .column(ColumnSchema::new("hits", "int"))
                    .primary_key(["code"]),
            )
            .with_table(
                TableSchema::new("plain")
                    .column(ColumnSchema::new("note", "text").nullable()),
            )
    }

    #[test]
    fn test_merge_multiple_keys() {
        let catalog = catalog();
        let upsert = Upsert::new("account")
            .value("tenant", 1)
            .value("login", "oy")
            .value("email", "oy@example.com")
            .value("name", "Oy");
        let result = QueryBuilder::new(&Mssql)
            .with_schema(&catalog)
            .upsert(&upsert)
            .unwrap();
        assert_eq!(
            result.sql,
            "MERGE [account] WITH (HOLDLOCK) USING (VALUES (:qp0, :qp1, :qp2, :qp3)) AS [EXCLUDED] \
             ([tenant], [login], [email], [name]) ON ((([account].[tenant]=[EXCLUDED].[tenant]) \
             AND ([account].[login]=[EXCLUDED].[login])) OR ([account].[email]=[EXCLUDED].[email])) \
             WHEN MATCHED THEN UPDATE SET [name]=[EXCLUDED].[name] WHEN NOT MATCHED THEN INSERT \
             ([tenant], [login], [email], [name]) VALUES ([EXCLUDED].[tenant], [EXCLUDED].[login], \
             [EXCLUDED].[email], [EXCLUDED].[name]);"
        );
        assert_eq!(result.params.len(), 4);
    }

    #[test]
    fn test_auto_set_skips_identity_columns() {
        let catalog = catalog();
        let upsert = Upsert::new("counter")
            .value("code", "a")
            .value("seq", 7)
            .value("hits", 1);
        let result = QueryBuilder::new(&Mssql)
            .with_schema(&catalog)
            .upsert(&upsert)
            .unwrap();
        assert!(
            result.sql.contains("WHEN MATCHED THEN UPDATE SET [hits]=[EXCLUDED].[hits] WHEN NOT"),
            "SQL: {}",
            result.sql
        );
        assert!(!result.sql.contains("[seq]=[EXCLUDED].[seq]"), "SQL: {}", result.sql);
    }

    #[test]
    fn test_merge_overrides_auto_set() {
        let upsert = Upsert::new("account")
            .value("email", "oy@example.com")
            .value("name", "Oy")
            .conflict_on(["email"])
            .update_merge("name", Expr::new("UPPER([EXCLUDED].[name])"))
            .update_merge("hits", Expr::new("hits + 1"));
        let result = QueryBuilder::new(&Mssql).upsert(&upsert).unwrap();
        assert!(
            result
                .sql
                .contains("UPDATE SET [name]=UPPER([EXCLUDED].[name]), [hits]=hits + 1 WHEN"),
            "SQL: {}",
            result.sql
        );
    }

    #[test]
    fn test_no_key_falls_back_to_insert() {
        let catalog = catalog();
        let upsert = Upsert::new("plain").value("note", "x");
        let result = QueryBuilder::new(&Postgres)
            .with_schema(&catalog)
            .upsert(&upsert)
            .unwrap();
        assert_eq!(result.sql, "INSERT INTO \"plain\" (\"note\") VALUES (:qp0)");
    }

    #[test]
    fn test_on_conflict() {
        let upsert = Upsert::new("account")
            .value("email", "oy@example.com")
            .value("name", "Oy")
            .conflict_on(["email"]);
        let result = QueryBuilder::new(&Postgres).upsert(&upsert).unwrap();
        assert_eq!(
            result.sql,
            "INSERT INTO \"account\" (\"email\", \"name\") VALUES (:qp0, :qp1) \
             ON CONFLICT (\"email\") DO UPDATE SET \"name\"=EXCLUDED.\"name\""
        );

        let result = QueryBuilder::new(&Postgres)
            .upsert(&upsert.update(false))
            .unwrap();
        assert!(result.sql.ends_with("ON CONFLICT (\"email\") DO NOTHING"));
    }

    #[test]
    fn test_update_then_insert_reuses_placeholders() {
        let upsert = Upsert::new("account")
            .value("email", "oy@example.com")
            .value("name", "Oy")
            .conflict_on(["email"]);
        let result = QueryBuilder::new(&MySql).upsert(&upsert).unwrap();
        assert_eq!(
            result.sql,
            "UPDATE `account` SET `name`=:qp1 WHERE `email`=:qp0;INSERT INTO `account` \
             (`email`, `name`) SELECT :qp0, :qp1 WHERE NOT EXISTS \
             (SELECT 1 FROM `account` WHERE `email`=:qp0)"
        );
        assert_eq!(result.params.len(), 2);
    }

    #[test]
    fn test_update_then_insert_rejects_query_source() {
        let upsert = Upsert::new("account")
            .select(Query::new().select(["email"]).from("staging"))
            .conflict_on(["email"]);
        let err = QueryBuilder::new(&MySql).upsert(&upsert).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_missing_strategy() {
        let upsert = Upsert::new("t").value("a", 1);
        let err = QueryBuilder::new(&DialectConfig::default())
            .upsert(&upsert)
            .unwrap_err();
        assert_eq!(err.to_string(), "Dialect 'ansi' does not support upsert");
    }

    #[test]
    fn test_conflict_key_must_be_inserted() {
        let upsert = Upsert::new("t").value("a", 1).conflict_on(["b"]);
        let err = QueryBuilder::new(&Mssql).upsert(&upsert).unwrap_err();
        assert!(matches!(err, SqlError::InvalidStatement(_)));
    }

    #[test]
    fn test_update_values_bound_after_source() {
        let upsert = Upsert::new("t")
            .value("a", 1)
            .value("b", 2)
            .conflict_on(["a"])
            .update_set("b", 3);
        let result = QueryBuilder::new(&Mssql).upsert(&upsert).unwrap();
        let values: Vec<_> = result.params.values().cloned().collect();
        assert_eq!(values, vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(result.sql.contains("UPDATE SET [b]=:qp2"), "SQL: {}", result.sql);
    }
}
