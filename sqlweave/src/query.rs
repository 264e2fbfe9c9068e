//! Backend-neutral statement model.
//!
//! Models are built with consuming fluent calls and only borrowed while
//! rendering, so one model can be rendered for several dialects.

use crate::condition::Condition;
use crate::error::{SqlError, SqlResult};
use crate::value::{Expr, Operand};

// ═══════════════════════════════════════════════════════════════════════════
// SELECT
// ═══════════════════════════════════════════════════════════════════════════

/// One entry of the select list.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// A column name, optionally aliased.
    Column { name: String, alias: Option<String> },
    /// A raw expression, optionally aliased.
    Expr { expr: Expr, alias: Option<String> },
    /// A scalar sub-query.
    SubQuery { query: Box<Query>, alias: String },
}

impl SelectItem {
    /// Name under which the item appears in the result set.
    pub fn output_name(&self) -> Option<&str> {
        match self {
            Self::Column { alias: Some(alias), .. }
            | Self::Expr {
                alias: Some(alias), ..
            }
            | Self::SubQuery { alias, .. } => Some(alias.as_str()),
            Self::Column { name, alias: None } => Some(name.as_str()),
            Self::Expr { alias: None, .. } => None,
        }
    }
}

/// A FROM source.
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    /// Table name; the name may carry its own alias (`"customer c"`).
    Table { name: String, alias: Option<String> },
    /// Sub-query; without alias its position in the FROM list is used.
    SubQuery {
        query: Box<Query>,
        alias: Option<String>,
    },
    /// Raw FROM fragment.
    Raw(Expr),
}

/// ORDER BY target.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderTarget {
    Column(String),
    Expr(Expr),
}

/// One ORDER BY entry.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub target: OrderTarget,
    pub desc: bool,
}

/// A set operation appended to a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Union {
    pub query: Query,
    pub all: bool,
}

/// SELECT statement model.
///
/// # Example
/// ```
/// use sqlweave::{Mssql, Query, QueryBuilder};
///
/// let query = Query::new().select(["id"]).from("example").limit(10).offset(5);
/// let result = QueryBuilder::new(&Mssql).build(&query).unwrap();
/// assert_eq!(
///     result.sql,
///     "SELECT [id] FROM [example] ORDER BY (SELECT NULL) OFFSET 5 ROWS FETCH NEXT 10 ROWS ONLY"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub(crate) items: Vec<SelectItem>,
    pub(crate) distinct: bool,
    pub(crate) sources: Vec<Source>,
    pub(crate) conditions: Vec<Condition>,
    pub(crate) group_by: Vec<String>,
    pub(crate) having: Vec<Condition>,
    pub(crate) order_by: Vec<OrderBy>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) unions: Vec<Union>,
}

impl Query {
    /// An empty `SELECT *` without source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append plain columns to the select list.
    #[must_use]
    pub fn select<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.items
            .extend(columns.into_iter().map(|name| SelectItem::Column {
                name: name.into(),
                alias: None,
            }));
        self
    }

    /// Append an aliased column.
    #[must_use]
    pub fn select_as(mut self, name: impl Into<String>, alias: impl Into<String>) -> Self {
        self.items.push(SelectItem::Column {
            name: name.into(),
            alias: Some(alias.into()),
        });
        self
    }

    /// Append an aliased raw expression.
    #[must_use]
    pub fn select_expr(mut self, expr: Expr, alias: impl Into<String>) -> Self {
        self.items.push(SelectItem::Expr {
            expr,
            alias: Some(alias.into()),
        });
        self
    }

    /// Append a scalar sub-query.
    #[must_use]
    pub fn select_query(mut self, query: Self, alias: impl Into<String>) -> Self {
        self.items.push(SelectItem::SubQuery {
            query: Box::new(query),
            alias: alias.into(),
        });
        self
    }

    /// Emit `SELECT DISTINCT`.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Append a table source. `"table alias"` and `"table AS alias"` are
    /// understood.
    #[must_use]
    pub fn from(mut self, table: impl Into<String>) -> Self {
        self.sources.push(Source::Table {
            name: table.into(),
            alias: None,
        });
        self
    }

    /// Append an aliased table source.
    #[must_use]
    pub fn from_as(mut self, table: impl Into<String>, alias: impl Into<String>) -> Self {
        self.sources.push(Source::Table {
            name: table.into(),
            alias: Some(alias.into()),
        });
        self
    }

    /// Append a sub-query source.
    #[must_use]
    pub fn from_query(mut self, query: Self, alias: Option<&str>) -> Self {
        self.sources.push(Source::SubQuery {
            query: Box::new(query),
            alias: alias.map(str::to_string),
        });
        self
    }

    /// Append a raw source fragment.
    #[must_use]
    pub fn from_expr(mut self, expr: Expr) -> Self {
        self.sources.push(Source::Raw(expr));
        self
    }

    /// Add a WHERE condition. Conditions are AND-ed.
    #[must_use]
    pub fn filter(mut self, condition: impl Into<Condition>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// Add an equality condition per `(column, operand)` pair.
    #[must_use]
    pub fn filter_hash<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Operand>,
    {
        self.filter(Condition::hash(pairs))
    }

    /// Append GROUP BY columns.
    #[must_use]
    pub fn group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by.extend(columns.into_iter().map(Into::into));
        self
    }

    /// Add a HAVING condition. Conditions are AND-ed.
    #[must_use]
    pub fn having(mut self, condition: impl Into<Condition>) -> Self {
        self.having.push(condition.into());
        self
    }

    /// Append an ORDER BY column.
    #[must_use]
    pub fn order_by(mut self, column: impl Into<String>, desc: bool) -> Self {
        self.order_by.push(OrderBy {
            target: OrderTarget::Column(column.into()),
            desc,
        });
        self
    }

    /// Append an ORDER BY expression.
    #[must_use]
    pub fn order_by_expr(mut self, expr: Expr) -> Self {
        self.order_by.push(OrderBy {
            target: OrderTarget::Expr(expr),
            desc: false,
        });
        self
    }

    /// Set the row limit.
    #[must_use]
    pub const fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the row offset. `0` means no offset.
    #[must_use]
    pub const fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Append `UNION ( query )`.
    #[must_use]
    pub fn union(mut self, query: Self) -> Self {
        self.unions.push(Union { query, all: false });
        self
    }

    /// Append `UNION ALL ( query )`.
    #[must_use]
    pub fn union_all(mut self, query: Self) -> Self {
        self.unions.push(Union { query, all: true });
        self
    }

    /// The limit, if set.
    pub const fn get_limit(&self) -> Option<u64> {
        self.limit
    }

    /// The offset, ignoring an explicit `0`.
    pub fn effective_offset(&self) -> Option<u64> {
        self.offset.filter(|offset| *offset > 0)
    }

    /// Output column names of the select list.
    ///
    /// Fails when an expression item has no alias or the list is `*`.
    pub fn output_columns(&self) -> SqlResult<Vec<String>> {
        if self.items.is_empty() {
            return Err(SqlError::invalid_statement(
                "sub-select source must name its columns",
            ));
        }
        self.items
            .iter()
            .map(|item| {
                item.output_name().map(str::to_string).ok_or_else(|| {
                    SqlError::invalid_statement("select expression used as a source needs an alias")
                })
            })
            .collect()
    }

    pub(crate) fn visit_params(&self, visit: &mut dyn FnMut(&str)) {
        for item in &self.items {
            match item {
                SelectItem::Column { .. } => {},
                SelectItem::Expr { expr, .. } => expr.visit_params(visit),
                SelectItem::SubQuery { query, .. } => query.visit_params(visit),
            }
        }
        for source in &self.sources {
            match source {
                Source::Table { .. } => {},
                Source::SubQuery { query, .. } => query.visit_params(visit),
                Source::Raw(expr) => expr.visit_params(visit),
            }
        }
        for condition in self.conditions.iter().chain(&self.having) {
            condition.visit_params(visit);
        }
        for order in &self.order_by {
            if let OrderTarget::Expr(expr) = &order.target {
                expr.visit_params(visit);
            }
        }
        for union in &self.unions {
            union.query.visit_params(visit);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// INSERT
// ═══════════════════════════════════════════════════════════════════════════

/// INSERT statement model: explicit values or a sub-select.
///
/// # Example
/// ```
/// use sqlweave::{Insert, Mssql, QueryBuilder};
///
/// let insert = Insert::new("customer").value("email", "a@b.c").value("is_active", false);
/// let result = QueryBuilder::new(&Mssql).insert(&insert).unwrap();
/// assert_eq!(result.sql, "INSERT INTO [customer] ([email], [is_active]) VALUES (:qp0, :qp1)");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Insert {
    pub(crate) table: String,
    pub(crate) columns: Vec<String>,
    pub(crate) values: Vec<Operand>,
    pub(crate) query: Option<Box<Query>>,
}

impl Insert {
    /// Insert into `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
            query: None,
        }
    }

    /// Append one column with its value or expression.
    #[must_use]
    pub fn value(mut self, column: impl Into<String>, value: impl Into<Operand>) -> Self {
        self.columns.push(column.into());
        self.values.push(value.into());
        self
    }

    /// Append several `(column, value)` pairs in order.
    #[must_use]
    pub fn values<I, K, V>(self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Operand>,
    {
        pairs
            .into_iter()
            .fold(self, |insert, (column, value)| insert.value(column, value))
    }

    /// Use a sub-select as the row source.
    #[must_use]
    pub fn select(mut self, query: Query) -> Self {
        self.query = Some(Box::new(query));
        self
    }

    /// Explicit target columns for a sub-select source.
    #[must_use]
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Target table.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Target column names as given by the caller or derived from the
    /// sub-select.
    pub fn column_names(&self) -> SqlResult<Vec<String>> {
        match &self.query {
            Some(query) if self.columns.is_empty() => query.output_columns(),
            _ => Ok(self.columns.clone()),
        }
    }

    /// Check that the columns and the row source line up.
    pub(crate) fn check_shape(&self) -> SqlResult<()> {
        match &self.query {
            Some(_) if !self.values.is_empty() => Err(SqlError::invalid_statement(
                "insert cannot mix explicit values with a sub-select",
            )),
            None if self.columns.len() != self.values.len() => {
                Err(SqlError::invalid_statement(format!(
                    "insert has {} columns but {} values",
                    self.columns.len(),
                    self.values.len()
                )))
            },
            _ => Ok(()),
        }
    }

    pub(crate) fn visit_params(&self, visit: &mut dyn FnMut(&str)) {
        for value in &self.values {
            value.visit_params(visit);
        }
        if let Some(query) = &self.query {
            query.visit_params(visit);
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// UPSERT
// ═══════════════════════════════════════════════════════════════════════════

/// What happens to an existing row in an upsert.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum UpsertUpdate {
    /// Copy every inserted non-key column from the incoming row.
    #[default]
    Auto,
    /// Insert only; existing rows are left untouched.
    Disabled,
    /// Exactly these assignments.
    Explicit(Vec<(String, Operand)>),
    /// The automatic set, with the named columns overridden or added.
    Merge(Vec<(String, Operand)>),
}

/// Insert-or-update statement model.
///
/// # Example
/// ```
/// use sqlweave::{Mssql, QueryBuilder, Upsert};
///
/// let upsert = Upsert::new("T_upsert_1").value("a", 1).conflict_on(["a"]);
/// let result = QueryBuilder::new(&Mssql).upsert(&upsert).unwrap();
/// assert_eq!(
///     result.sql,
///     "MERGE [T_upsert_1] WITH (HOLDLOCK) USING (VALUES (:qp0)) AS [EXCLUDED] ([a]) \
///      ON ([T_upsert_1].[a]=[EXCLUDED].[a]) WHEN NOT MATCHED THEN INSERT ([a]) \
///      VALUES ([EXCLUDED].[a]);"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Upsert {
    pub(crate) insert: Insert,
    pub(crate) conflict: Option<Vec<String>>,
    pub(crate) update: UpsertUpdate,
}

impl Upsert {
    /// Upsert into `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            insert: Insert::new(table),
            conflict: None,
            update: UpsertUpdate::Auto,
        }
    }

    /// Append one column with its value or expression.
    #[must_use]
    pub fn value(mut self, column: impl Into<String>, value: impl Into<Operand>) -> Self {
        self.insert = self.insert.value(column, value);
        self
    }

    /// Append several `(column, value)` pairs in order.
    #[must_use]
    pub fn values<I, K, V>(mut self, pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Operand>,
    {
        self.insert = self.insert.values(pairs);
        self
    }

    /// Use a sub-select as the row source.
    #[must_use]
    pub fn select(mut self, query: Query) -> Self {
        self.insert = self.insert.select(query);
        self
    }

    /// Explicit conflict key. Without it keys come from the table schema.
    #[must_use]
    pub fn conflict_on<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conflict = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    /// `true` keeps the automatic update set, `false` disables updates.
    #[must_use]
    pub fn update(mut self, enabled: bool) -> Self {
        self.update = if enabled {
            UpsertUpdate::Auto
        } else {
            UpsertUpdate::Disabled
        };
        self
    }

    /// Add an assignment to an explicit update list, replacing the
    /// automatic set.
    #[must_use]
    pub fn update_set(mut self, column: impl Into<String>, value: impl Into<Operand>) -> Self {
        let assignment = (column.into(), value.into());
        match &mut self.update {
            UpsertUpdate::Explicit(list) => list.push(assignment),
            _ => self.update = UpsertUpdate::Explicit(vec![assignment]),
        }
        self
    }

    /// Override one column of the automatic update set.
    #[must_use]
    pub fn update_merge(mut self, column: impl Into<String>, value: impl Into<Operand>) -> Self {
        let assignment = (column.into(), value.into());
        match &mut self.update {
            UpsertUpdate::Merge(list) => list.push(assignment),
            _ => self.update = UpsertUpdate::Merge(vec![assignment]),
        }
        self
    }

    /// The underlying insert.
    pub const fn as_insert(&self) -> &Insert {
        &self.insert
    }

    pub(crate) fn visit_params(&self, visit: &mut dyn FnMut(&str)) {
        self.insert.visit_params(visit);
        if let UpsertUpdate::Explicit(list) | UpsertUpdate::Merge(list) = &self.update {
            for (_, value) in list {
                value.visit_params(visit);
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CONVENIENCE CONSTRUCTORS
// ═══════════════════════════════════════════════════════════════════════════

/// Start a SELECT of the given columns.
pub fn select<I, S>(columns: I) -> Query
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Query::new().select(columns)
}

/// Start an INSERT into `table`.
pub fn insert_into(table: impl Into<String>) -> Insert {
    Insert::new(table)
}

/// Start an upsert into `table`.
pub fn upsert_into(table: impl Into<String>) -> Upsert {
    Upsert::new(table)
}

/// One row of literal values for a batch insert.
pub fn row<I, V>(values: I) -> Vec<Operand>
where
    I: IntoIterator<Item = V>,
    V: Into<Operand>,
{
    values.into_iter().map(Into::into).collect()
}
