//! Dialect-aware rendering of statement models to SQL with parameters.

mod capture;
mod upsert;

use std::fmt;

use crate::condition::{BuildCondition, Condition, LogicalOp, build_junction};
use crate::dialect::{Dialect, DialectConfig, LimitOffsetSyntax};
use crate::error::{SqlError, SqlResult};
use crate::params::{ParamBinder, Params};
use crate::query::{Insert, OrderTarget, Query, SelectItem, Source};
use crate::schema::SchemaProvider;
use crate::validate::validate_identifier;
use crate::value::{Expr, Operand, Value};

use capture::OutputCapture;

/// Rendered SQL with its parameters.
///
/// Every placeholder in `sql` has exactly one entry in `params`, in order of
/// first binding.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "RenderResult must be used to execute the statement"]
pub struct RenderResult {
    /// SQL text with named placeholders.
    pub sql: String,
    /// Placeholder name (including its `:`) to value.
    pub params: Params,
}

impl RenderResult {
    /// Resolve `{{table}}` and `[[column]]` placeholders left in the SQL by
    /// raw names and expressions.
    pub fn resolve_placeholders(mut self, dialect: &impl Dialect) -> Self {
        self.sql = dialect.quote_sql(&self.sql);
        self
    }

    /// Placeholder names in binding order.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// RENDER CONTEXT
// ═══════════════════════════════════════════════════════════════════════════

/// State shared by every fragment of one render call.
#[derive(Debug)]
pub struct RenderContext<'a> {
    dialect: &'a DialectConfig,
    binder: ParamBinder,
}

impl<'a> RenderContext<'a> {
    /// Render for `dialect`, allocating placeholders through `binder`.
    pub const fn new(dialect: &'a DialectConfig, binder: ParamBinder) -> Self {
        Self { dialect, binder }
    }

    /// Active dialect.
    pub const fn dialect(&self) -> &'a DialectConfig {
        self.dialect
    }

    /// Bind a value and return its placeholder.
    pub fn bind(&mut self, value: Value) -> SqlResult<String> {
        self.binder.bind(value)
    }

    /// Register an expression's own parameters and return its SQL.
    pub fn expr(&mut self, expr: &Expr) -> SqlResult<String> {
        for (name, value) in expr.params() {
            self.binder.bind_named(name, value)?;
        }
        Ok(expr.sql().to_string())
    }

    /// Bind a value or emit an expression.
    pub fn operand(&mut self, operand: &Operand) -> SqlResult<String> {
        match operand {
            Operand::Value(value) => self.bind(value.clone()),
            Operand::Expr(expr) => self.expr(expr),
        }
    }

    /// Consume the context and return the bound parameters.
    pub fn into_params(self) -> Params {
        self.binder.into_params()
    }

    fn finish(self, sql: String) -> RenderResult {
        RenderResult {
            sql,
            params: self.into_params(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// QUERY BUILDER
// ═══════════════════════════════════════════════════════════════════════════

/// Renders statement models for one dialect.
///
/// The builder only borrows its dialect and schema; every call allocates its
/// own binder, so one builder can serve any number of threads.
///
/// # Example
/// ```
/// use sqlweave::{Mssql, Query, QueryBuilder};
///
/// let builder = QueryBuilder::new(&Mssql);
/// let result = builder.build(&Query::new().select(["id"]).from("example").offset(10)).unwrap();
/// assert_eq!(result.sql, "SELECT [id] FROM [example] ORDER BY (SELECT NULL) OFFSET 10 ROWS");
/// assert!(result.params.is_empty());
/// ```
#[derive(Clone, Copy)]
pub struct QueryBuilder<'a> {
    dialect: &'a DialectConfig,
    schema: Option<&'a dyn SchemaProvider>,
}

impl fmt::Debug for QueryBuilder<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryBuilder")
            .field("dialect", &self.dialect.name)
            .field("schema", &self.schema.is_some())
            .finish()
    }
}

impl<'a> QueryBuilder<'a> {
    /// Builder for `dialect` without schema information.
    pub fn new<D: Dialect + ?Sized>(dialect: &'a D) -> Self {
        Self {
            dialect: dialect.config(),
            schema: None,
        }
    }

    /// Attach table metadata, enabling output capture and derived upsert keys.
    #[must_use]
    pub fn with_schema(mut self, schema: &'a dyn SchemaProvider) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Active dialect.
    pub const fn dialect(&self) -> &'a DialectConfig {
        self.dialect
    }

    /// Attached table metadata, if any.
    pub const fn schema_provider(&self) -> Option<&'a dyn SchemaProvider> {
        self.schema
    }

    /// Render a SELECT.
    pub fn build(&self, query: &Query) -> SqlResult<RenderResult> {
        self.build_with_params(query, Params::new())
    }

    /// Render a SELECT, carrying caller parameters through unchanged.
    pub fn build_with_params(&self, query: &Query, params: Params) -> SqlResult<RenderResult> {
        let mut ctx = self.context(params, |visit| query.visit_params(visit));
        let sql = self.render_select(query, &mut ctx)?;
        Ok(self.done("select", ctx.finish(sql)))
    }

    /// Render a single condition.
    pub fn build_condition(&self, condition: &Condition) -> SqlResult<RenderResult> {
        let mut ctx = self.context(Params::new(), |visit| condition.visit_params(visit));
        let sql = condition.build(&mut ctx)?;
        Ok(self.done("condition", ctx.finish(sql)))
    }

    /// Render an INSERT, capturing generated values when the dialect and
    /// schema allow it.
    pub fn insert(&self, insert: &Insert) -> SqlResult<RenderResult> {
        self.insert_with_params(insert, Params::new())
    }

    /// Render an INSERT, carrying caller parameters through unchanged.
    pub fn insert_with_params(&self, insert: &Insert, params: Params) -> SqlResult<RenderResult> {
        let mut ctx = self.context(params, |visit| insert.visit_params(visit));
        let sql = self.render_insert(insert, &mut ctx, true)?;
        Ok(self.done("insert", ctx.finish(sql)))
    }

    /// Render a multi-row INSERT with values inlined as literals.
    ///
    /// Expressions are emitted verbatim and keep their own parameters.
    ///
    /// # Example
    /// ```
    /// use sqlweave::{Mssql, QueryBuilder, Value, row};
    ///
    /// let result = QueryBuilder::new(&Mssql)
    ///     .batch_insert("type", &["bool_col", "bool_col2"], &[row([Value::Bool(false), Value::Null])])
    ///     .unwrap();
    /// assert_eq!(result.sql, "INSERT INTO [type] ([bool_col], [bool_col2]) VALUES (0, NULL)");
    /// ```
    pub fn batch_insert(
        &self,
        table: &str,
        columns: &[&str],
        rows: &[Vec<Operand>],
    ) -> SqlResult<RenderResult> {
        validate_identifier(table, self.dialect.max_identifier_length)?;
        if rows.is_empty() {
            return Err(SqlError::invalid_statement("batch insert needs at least one row"));
        }
        if columns.is_empty() {
            return Err(SqlError::invalid_statement("batch insert needs at least one column"));
        }

        let mut ctx = self.context(Params::new(), |visit| {
            for operand in rows.iter().flatten() {
                operand.visit_params(visit);
            }
        });

        let mut groups = Vec::with_capacity(rows.len());
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(SqlError::invalid_statement(format!(
                    "batch row {idx} has {} values for {} columns",
                    row.len(),
                    columns.len()
                )));
            }
            let mut literals = Vec::with_capacity(row.len());
            for operand in row {
                literals.push(match operand {
                    Operand::Value(value) => self.literal(value)?,
                    Operand::Expr(expr) => ctx.expr(expr)?,
                });
            }
            groups.push(format!("({})", literals.join(", ")));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.dialect.quote_table_name(table),
            self.quote_columns(columns.iter().copied()),
            groups.join(", ")
        );
        Ok(self.done("batch_insert", ctx.finish(sql)))
    }

    // ───────────────────────────────────────────────────────────────────────
    // shared plumbing
    // ───────────────────────────────────────────────────────────────────────

    /// Seed a binder with caller parameters and reserve every explicit
    /// placeholder the model carries.
    fn context(
        &self,
        params: Params,
        visit: impl FnOnce(&mut dyn FnMut(&str)),
    ) -> RenderContext<'a> {
        let mut binder = ParamBinder::with_params(self.dialect.param_prefix.clone(), params);
        visit(&mut |name: &str| binder.reserve(name));
        RenderContext::new(self.dialect, binder)
    }

    fn done(&self, kind: &str, result: RenderResult) -> RenderResult {
        tracing::debug!(
            dialect = %self.dialect.name,
            kind,
            params = result.params.len(),
            "rendered statement"
        );
        result
    }

    /// Inline literal; NaN and infinities have no SQL spelling.
    fn literal(&self, value: &Value) -> SqlResult<String> {
        if let Value::Float(f) = value
            && !f.is_finite()
        {
            return Err(SqlError::invalid_statement(format!("cannot inline non-finite float {f}")));
        }
        Ok(self.dialect.quote_value(value))
    }

    fn quote_columns<'s>(&self, columns: impl IntoIterator<Item = &'s str>) -> String {
        columns
            .into_iter()
            .map(|c| self.dialect.quote_column_name(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    // ───────────────────────────────────────────────────────────────────────
    // SELECT
    // ───────────────────────────────────────────────────────────────────────

    pub(crate) fn render_select(&self, query: &Query, ctx: &mut RenderContext<'_>) -> SqlResult<String> {
        let d = self.dialect;
        let mut sql = String::from("SELECT ");
        if query.distinct {
            sql.push_str("DISTINCT ");
        }
        if d.limit_offset == LimitOffsetSyntax::Top {
            if query.effective_offset().is_some() {
                return Err(SqlError::unsupported(&d.name, "OFFSET with TOP"));
            }
            if let Some(limit) = query.limit {
                sql.push_str(&format!("TOP {limit} "));
            }
        }
        sql.push_str(&self.render_select_items(query, ctx)?);

        if !query.sources.is_empty() {
            sql.push_str(" FROM ");
            sql.push_str(&self.render_sources(query, ctx)?);
        }

        if !query.conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&build_junction(ctx, LogicalOp::And, &query.conditions)?);
        }

        if !query.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.quote_columns(query.group_by.iter().map(String::as_str)));
        }

        if !query.having.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&build_junction(ctx, LogicalOp::And, &query.having)?);
        }

        sql.push_str(&self.render_order_and_limit(query, ctx)?);

        if !query.unions.is_empty() {
            sql = format!("({sql})");
            for union in &query.unions {
                let other = self.render_select(&union.query, ctx)?;
                let all = if union.all { "ALL " } else { "" };
                sql.push_str(&format!(" UNION {all}( {other} )"));
            }
        }

        Ok(sql)
    }

    fn render_select_items(&self, query: &Query, ctx: &mut RenderContext<'_>) -> SqlResult<String> {
        if query.items.is_empty() {
            return Ok("*".to_string());
        }
        let d = self.dialect;
        let mut items = Vec::with_capacity(query.items.len());
        for item in &query.items {
            let rendered = match item {
                SelectItem::Column { name, alias } => {
                    with_alias(d.quote_column_name(name), alias.as_deref(), d)
                },
                SelectItem::Expr { expr, alias } => with_alias(ctx.expr(expr)?, alias.as_deref(), d),
                SelectItem::SubQuery { query, alias } => {
                    let sub = self.render_select(query, ctx)?;
                    format!("({sub}) AS {}", d.quote_column_name(alias))
                },
            };
            items.push(rendered);
        }
        Ok(items.join(", "))
    }

    fn render_sources(&self, query: &Query, ctx: &mut RenderContext<'_>) -> SqlResult<String> {
        let d = self.dialect;
        let mut sources = Vec::with_capacity(query.sources.len());
        for (idx, source) in query.sources.iter().enumerate() {
            let rendered = match source {
                Source::Table { name, alias: None } => d.quote_source(name),
                Source::Table {
                    name,
                    alias: Some(alias),
                } => format!("{} {}", d.quote_table_name(name), d.quote_simple_name(alias)),
                Source::SubQuery { query, alias } => {
                    let sub = self.render_select(query, ctx)?;
                    let alias = alias.clone().unwrap_or_else(|| idx.to_string());
                    format!("({sub}) {}", d.quote_simple_name(&alias))
                },
                Source::Raw(expr) => ctx.expr(expr)?,
            };
            sources.push(rendered);
        }
        Ok(sources.join(", "))
    }

    fn render_order_by(&self, query: &Query, ctx: &mut RenderContext<'_>) -> SqlResult<Option<String>> {
        if query.order_by.is_empty() {
            return Ok(None);
        }
        let mut parts = Vec::with_capacity(query.order_by.len());
        for order in &query.order_by {
            let target = match &order.target {
                OrderTarget::Column(column) => self.dialect.quote_column_name(column),
                OrderTarget::Expr(expr) => ctx.expr(expr)?,
            };
            parts.push(if order.desc {
                format!("{target} DESC")
            } else {
                target
            });
        }
        Ok(Some(parts.join(", ")))
    }

    fn render_order_and_limit(&self, query: &Query, ctx: &mut RenderContext<'_>) -> SqlResult<String> {
        let order = self.render_order_by(query, ctx)?;
        let offset = query.effective_offset();
        let mut sql = String::new();

        match self.dialect.limit_offset {
            LimitOffsetSyntax::RowOffsetFetch => {
                if query.limit.is_none() && offset.is_none() {
                    if let Some(order) = order {
                        sql.push_str(&format!(" ORDER BY {order}"));
                    }
                    return Ok(sql);
                }
                let order = order.unwrap_or_else(|| "(SELECT NULL)".to_string());
                sql.push_str(&format!(
                    " ORDER BY {order} OFFSET {} ROWS",
                    offset.unwrap_or(0)
                ));
                if let Some(limit) = query.limit {
                    sql.push_str(&format!(" FETCH NEXT {limit} ROWS ONLY"));
                }
            },
            LimitOffsetSyntax::LimitOffset => {
                if let Some(order) = order {
                    sql.push_str(&format!(" ORDER BY {order}"));
                }
                match (query.limit, offset) {
                    (Some(limit), _) => sql.push_str(&format!(" LIMIT {limit}")),
                    (None, Some(_)) => {
                        if let Some(marker) = &self.dialect.no_limit_marker {
                            sql.push_str(&format!(" LIMIT {marker}"));
                        }
                    },
                    (None, None) => {},
                }
                if let Some(offset) = offset {
                    sql.push_str(&format!(" OFFSET {offset}"));
                }
            },
            LimitOffsetSyntax::Top => {
                if let Some(order) = order {
                    sql.push_str(&format!(" ORDER BY {order}"));
                }
            },
        }
        Ok(sql)
    }

    // ───────────────────────────────────────────────────────────────────────
    // INSERT
    // ───────────────────────────────────────────────────────────────────────

    /// Render an INSERT; with `capture` the generated row is returned
    /// through the dialect's scratch table when the schema is known.
    pub(crate) fn render_insert(
        &self,
        insert: &Insert,
        ctx: &mut RenderContext<'_>,
        capture: bool,
    ) -> SqlResult<String> {
        let d = self.dialect;
        validate_identifier(&insert.table, d.max_identifier_length)?;
        insert.check_shape()?;

        let columns = insert.column_names()?;
        let table = d.quote_table_name(&insert.table);
        let head = if columns.is_empty() {
            format!("INSERT INTO {table}")
        } else {
            format!(
                "INSERT INTO {table} ({})",
                self.quote_columns(columns.iter().map(String::as_str))
            )
        };

        let body = match &insert.query {
            Some(query) => format!(" {}", self.render_select(query, ctx)?),
            None if insert.values.is_empty() => " DEFAULT VALUES".to_string(),
            None => {
                let mut values = Vec::with_capacity(insert.values.len());
                for value in &insert.values {
                    values.push(ctx.operand(value)?);
                }
                format!(" VALUES ({})", values.join(", "))
            },
        };

        let scratch_schema = self
            .schema
            .filter(|_| capture && d.capture_inserted)
            .and_then(|schema| schema.table_schema(&insert.table));
        match scratch_schema {
            Some(table_schema) => Ok(OutputCapture::new(&d.scratch_table)
                .declare(d, table_schema)
                .insert(&head, &body)
                .finish()),
            None => Ok(format!("{head}{body}")),
        }
    }
}

fn with_alias(sql: String, alias: Option<&str>, dialect: &DialectConfig) -> String {
    match alias {
        Some(alias) => format!("{sql} AS {}", dialect.quote_column_name(alias)),
        None => sql,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::{InCondition, LikeCondition};
    use crate::dialect::{DialectConfig, Mssql, MySql, Postgres, Sqlite};
    use crate::schema::{Catalog, ColumnSchema, TableSchema};

    fn customer_catalog() -> Catalog {
        Catalog::new().with_table(
            TableSchema::new("customer")
                .column(ColumnSchema::new("id", "int").auto_increment())
                .column(ColumnSchema::new("email", "varchar(128)"))
                .column(ColumnSchema::new("name", "varchar(128)").nullable())
                .primary_key(["id"]),
        )
    }

    #[test]
    fn test_select_star_without_source() {
        let result = QueryBuilder::new(&Mssql).build(&Query::new()).unwrap();
        assert_eq!(result.sql, "SELECT *");
    }

    #[test]
    fn test_limit_only_defaults_offset_zero() {
        let query = Query::new().select(["id"]).from("example").limit(10);
        let result = QueryBuilder::new(&Mssql).build(&query).unwrap();
        assert_eq!(
            result.sql,
            "SELECT [id] FROM [example] ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
        );
    }

    #[test]
    fn test_offset_zero_is_ignored() {
        let query = Query::new().select(["id"]).from("example").offset(0);
        let result = QueryBuilder::new(&Mssql).build(&query).unwrap();
        assert_eq!(result.sql, "SELECT [id] FROM [example]");
    }

    #[test]
    fn test_order_by_kept_with_fetch() {
        let query = Query::new()
            .select(["id"])
            .from("example")
            .order_by("name", false)
            .order_by("id", true)
            .limit(5);
        let result = QueryBuilder::new(&Mssql).build(&query).unwrap();
        assert_eq!(
            result.sql,
            "SELECT [id] FROM [example] ORDER BY [name], [id] DESC OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
        );
    }

    #[test]
    fn test_limit_offset_dialects() {
        let query = Query::new().from("t").offset(10);
        let sqlite = QueryBuilder::new(&Sqlite).build(&query).unwrap();
        assert_eq!(sqlite.sql, "SELECT * FROM `t` LIMIT -1 OFFSET 10");

        let mysql = QueryBuilder::new(&MySql).build(&query).unwrap();
        assert_eq!(mysql.sql, "SELECT * FROM `t` LIMIT 18446744073709551615 OFFSET 10");

        let pg = QueryBuilder::new(&Postgres).build(&query.limit(5)).unwrap();
        assert_eq!(pg.sql, "SELECT * FROM \"t\" LIMIT 5 OFFSET 10");
    }

    #[test]
    fn test_top_syntax() {
        let top = DialectConfig {
            limit_offset: LimitOffsetSyntax::Top,
            ..DialectConfig::mssql()
        };
        let query = Query::new().distinct().select(["id"]).from("t").limit(3);
        let result = QueryBuilder::new(&top).build(&query).unwrap();
        assert_eq!(result.sql, "SELECT DISTINCT TOP 3 [id] FROM [t]");

        let err = QueryBuilder::new(&top).build(&query.offset(2)).unwrap_err();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_union_wraps_first_query() {
        let query = Query::new()
            .select(["id"])
            .from("a")
            .union(Query::new().select(["id"]).from("b"))
            .union_all(Query::new().select(["id"]).from("c"));
        let result = QueryBuilder::new(&Mssql).build(&query).unwrap();
        assert_eq!(
            result.sql,
            "(SELECT [id] FROM [a]) UNION ( SELECT [id] FROM [b] ) UNION ALL ( SELECT [id] FROM [c] )"
        );
    }

    #[test]
    fn test_unaliased_subquery_gets_position_alias() {
        let inner = Query::new().select(["id", "name"]).from("item").limit(2);
        let query = Query::new().select(["id", "name"]).from_query(inner, None);
        let result = QueryBuilder::new(&Mssql).build(&query).unwrap();
        assert_eq!(
            result.sql,
            "SELECT [id], [name] FROM (SELECT [id], [name] FROM [item] ORDER BY (SELECT NULL) \
             OFFSET 0 ROWS FETCH NEXT 2 ROWS ONLY) [0]"
        );
    }

    #[test]
    fn test_group_by_having() {
        let query = Query::new()
            .select(["status"])
            .select_expr(Expr::new("COUNT(*)"), "total")
            .from("customer")
            .group_by(["status"])
            .having(Expr::new("COUNT(*) > :min").bind(":min", 1));
        let result = QueryBuilder::new(&Mssql).build(&query).unwrap();
        assert_eq!(
            result.sql,
            "SELECT [status], COUNT(*) AS [total] FROM [customer] GROUP BY [status] HAVING COUNT(*) > :min"
        );
        assert_eq!(result.params.get(":min"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_where_conditions_are_anded() {
        let query = Query::new()
            .from("customer")
            .filter(InCondition::list("id", [1, 2]))
            .filter(LikeCondition::new("name", "a_"));
        let result = QueryBuilder::new(&Mssql).build(&query).unwrap();
        assert_eq!(
            result.sql,
            "SELECT * FROM [customer] WHERE ([id] IN (:qp0, :qp1)) AND ([name] LIKE :qp2)"
        );
        assert_eq!(result.params.get(":qp2"), Some(&Value::from("%a[_]%")));
    }

    #[test]
    fn test_insert_without_schema_is_plain() {
        let insert = Insert::new("customer").value("email", "a@b.c");
        let result = QueryBuilder::new(&Mssql).insert(&insert).unwrap();
        assert_eq!(result.sql, "INSERT INTO [customer] ([email]) VALUES (:qp0)");
    }

    #[test]
    fn test_insert_default_values() {
        let result = QueryBuilder::new(&Postgres)
            .insert(&Insert::new("audit"))
            .unwrap();
        assert_eq!(result.sql, "INSERT INTO \"audit\" DEFAULT VALUES");
    }

    #[test]
    fn test_insert_capture_default_values() {
        let catalog = customer_catalog();
        let result = QueryBuilder::new(&Mssql)
            .with_schema(&catalog)
            .insert(&Insert::new("customer"))
            .unwrap();
        assert_eq!(
            result.sql,
            "SET NOCOUNT ON;DECLARE @temporary_inserted TABLE ([id] int , [email] varchar(128) , \
             [name] varchar(128) NULL);INSERT INTO [customer] OUTPUT INSERTED.* INTO \
             @temporary_inserted DEFAULT VALUES;SELECT * FROM @temporary_inserted"
        );
    }

    #[test]
    fn test_insert_capture_needs_dialect_support() {
        let catalog = customer_catalog();
        let insert = Insert::new("customer").value("email", "a@b.c");
        let result = QueryBuilder::new(&Postgres)
            .with_schema(&catalog)
            .insert(&insert)
            .unwrap();
        assert_eq!(result.sql, "INSERT INTO \"customer\" (\"email\") VALUES (:qp0)");
    }

    #[test]
    fn test_insert_arity_mismatch() {
        let insert = Insert::new("t").columns(["a"]);
        let err = QueryBuilder::new(&Mssql).insert(&insert).unwrap_err();
        assert!(matches!(err, SqlError::InvalidStatement(_)));
    }

    #[test]
    fn test_insert_invalid_table() {
        let err = QueryBuilder::new(&Mssql)
            .insert(&Insert::new("").value("a", 1))
            .unwrap_err();
        assert!(matches!(err, SqlError::InvalidIdentifier { .. }));
    }

    #[test]
    fn test_batch_insert_literals() {
        let result = QueryBuilder::new(&Mssql)
            .batch_insert(
                "customer",
                &["address"],
                &[vec![Operand::from("SQL-danger chars are escaped: '); --")]],
            )
            .unwrap();
        assert_eq!(
            result.sql,
            "INSERT INTO [customer] ([address]) VALUES ('SQL-danger chars are escaped: ''); --')"
        );
        assert!(result.params.is_empty());
    }

    #[test]
    fn test_batch_insert_errors() {
        let builder = QueryBuilder::new(&Mssql);
        assert!(builder.batch_insert("t", &["a"], &[]).is_err());
        assert!(builder.batch_insert("t", &["a", "b"], &[vec![Operand::from(1)]]).is_err());
    }

    #[test]
    fn test_batch_insert_rejects_zero_width_rows() {
        let err = QueryBuilder::new(&Mssql)
            .batch_insert("t", &[], &[vec![]])
            .unwrap_err();
        assert!(matches!(err, SqlError::InvalidStatement(_)));
    }

    #[test]
    fn test_batch_insert_rejects_non_finite_floats() {
        let builder = QueryBuilder::new(&Mssql);
        for f in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = builder
                .batch_insert("t", &["a"], &[vec![Operand::from(Value::Float(f))]])
                .unwrap_err();
            assert!(matches!(err, SqlError::InvalidStatement(_)), "{f}");
        }
        let ok = builder
            .batch_insert("t", &["a"], &[vec![Operand::from(Value::Float(1.5))]])
            .unwrap();
        assert_eq!(ok.sql, "INSERT INTO [t] ([a]) VALUES (1.5)");
    }

    #[test]
    fn test_resolve_placeholders() {
        let query = Query::new().select(["[[id]]"]).from("{{%user}}");
        let result = QueryBuilder::new(&Mssql)
            .build(&query)
            .unwrap()
            .resolve_placeholders(&Mssql);
        assert_eq!(result.sql, "SELECT [id] FROM [user]");
    }

    #[test]
    fn test_builder_debug_hides_schema() {
        let catalog = customer_catalog();
        let builder = QueryBuilder::new(&Mssql).with_schema(&catalog);
        assert_eq!(
            format!("{builder:?}"),
            "QueryBuilder { dialect: \"mssql\", schema: true }"
        );
    }
}
