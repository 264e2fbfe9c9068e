//! Condition tree and per-kind condition builders.
//!
//! Every condition renders into a [`RenderContext`], which quotes columns
//! for the active dialect and binds values through the render's binder.

use indexmap::IndexMap;

use crate::builder::RenderContext;
use crate::dialect::Dialect;
use crate::error::{SqlError, SqlResult};
use crate::value::{Expr, Operand, Value};

/// Rendered for an AND over nothing, a NOT IN over nothing, and similar.
pub const ALWAYS_TRUE: &str = "1=1";
/// Rendered for an OR over nothing, an IN over nothing, and similar.
pub const ALWAYS_FALSE: &str = "0=1";

/// Render one condition kind to an SQL fragment.
pub trait BuildCondition {
    /// Render, binding any values into `ctx`.
    fn build(&self, ctx: &mut RenderContext<'_>) -> SqlResult<String>;
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal: `=`
    Eq,
    /// Not equal: `<>`
    Ne,
    /// Greater than: `>`
    Gt,
    /// Greater than or equal: `>=`
    Gte,
    /// Less than: `<`
    Lt,
    /// Less than or equal: `<=`
    Lte,
}

impl CompareOp {
    /// SQL spelling.
    pub const fn as_sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

/// Logical operators for composite conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    /// All children must match: `AND`
    And,
    /// At least one child must match: `OR`
    Or,
}

impl LogicalOp {
    const fn as_sql(self) -> &'static str {
        match self {
            Self::And => " AND ",
            Self::Or => " OR ",
        }
    }

    const fn empty_marker(self) -> &'static str {
        match self {
            Self::And => ALWAYS_TRUE,
            Self::Or => ALWAYS_FALSE,
        }
    }
}

/// A filter predicate.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `col=value`, or `col IS NULL` for a null value.
    Eq { column: String, value: Operand },
    /// `col <op> value`.
    Compare {
        column: String,
        op: CompareOp,
        value: Operand,
    },
    /// `IN` over one column or a composite key.
    In(InCondition),
    /// Pattern match.
    Like(LikeCondition),
    /// `col BETWEEN low AND high`.
    Between {
        column: String,
        low: Operand,
        high: Operand,
        negate: bool,
    },
    /// AND / OR over children.
    Composite(CompositeCondition),
    /// `NOT (child)`.
    Not(Box<Condition>),
    /// Raw SQL, emitted verbatim.
    Raw(Expr),
}

impl Condition {
    /// Equality on one column.
    pub fn eq(column: impl Into<String>, value: impl Into<Operand>) -> Self {
        Self::Eq {
            column: column.into(),
            value: value.into(),
        }
    }

    /// Comparison on one column.
    pub fn compare(column: impl Into<String>, op: CompareOp, value: impl Into<Operand>) -> Self {
        Self::Compare {
            column: column.into(),
            op,
            value: value.into(),
        }
    }

    /// One equality per pair; several pairs are AND-ed.
    ///
    /// # Example
    /// ```
    /// use sqlweave::{Condition, Mssql, QueryBuilder};
    ///
    /// let cond = Condition::hash([("email", "a@b.c"), ("name", "oy")]);
    /// let result = QueryBuilder::new(&Mssql).build_condition(&cond).unwrap();
    /// assert_eq!(result.sql, "([email]=:qp0) AND ([name]=:qp1)");
    /// ```
    pub fn hash<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Operand>,
    {
        let mut children: Vec<Self> = pairs
            .into_iter()
            .map(|(column, value)| Self::eq(column, value))
            .collect();
        if children.len() == 1 {
            if let Some(only) = children.pop() {
                return only;
            }
        }
        Self::and(children)
    }

    /// `IN` over a single column.
    pub fn in_list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In(InCondition::list(column, values))
    }

    /// `BETWEEN` on one column.
    pub fn between(
        column: impl Into<String>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        Self::Between {
            column: column.into(),
            low: low.into(),
            high: high.into(),
            negate: false,
        }
    }

    /// `NOT BETWEEN` on one column.
    pub fn not_between(
        column: impl Into<String>,
        low: impl Into<Operand>,
        high: impl Into<Operand>,
    ) -> Self {
        Self::Between {
            column: column.into(),
            low: low.into(),
            high: high.into(),
            negate: true,
        }
    }

    /// AND over `children`.
    pub fn and(children: Vec<Self>) -> Self {
        Self::Composite(CompositeCondition {
            op: LogicalOp::And,
            children,
        })
    }

    /// OR over `children`.
    pub fn or(children: Vec<Self>) -> Self {
        Self::Composite(CompositeCondition {
            op: LogicalOp::Or,
            children,
        })
    }

    /// Negate `child`.
    pub fn not(child: Self) -> Self {
        Self::Not(Box::new(child))
    }

    /// Raw SQL condition.
    pub fn raw(expr: Expr) -> Self {
        Self::Raw(expr)
    }

    pub(crate) fn visit_params(&self, visit: &mut dyn FnMut(&str)) {
        match self {
            Self::Eq { value, .. } | Self::Compare { value, .. } => value.visit_params(visit),
            Self::In(_) => {},
            Self::Like(like) => {
                for pattern in &like.patterns {
                    pattern.visit_params(visit);
                }
            },
            Self::Between { low, high, .. } => {
                low.visit_params(visit);
                high.visit_params(visit);
            },
            Self::Composite(composite) => {
                for child in &composite.children {
                    child.visit_params(visit);
                }
            },
            Self::Not(child) => child.visit_params(visit),
            Self::Raw(expr) => expr.visit_params(visit),
        }
    }
}

impl From<InCondition> for Condition {
    fn from(c: InCondition) -> Self {
        Self::In(c)
    }
}

impl From<LikeCondition> for Condition {
    fn from(c: LikeCondition) -> Self {
        Self::Like(c)
    }
}

impl From<CompositeCondition> for Condition {
    fn from(c: CompositeCondition) -> Self {
        Self::Composite(c)
    }
}

impl From<Expr> for Condition {
    fn from(e: Expr) -> Self {
        Self::Raw(e)
    }
}

impl BuildCondition for Condition {
    fn build(&self, ctx: &mut RenderContext<'_>) -> SqlResult<String> {
        match self {
            Self::Eq { column, value } => build_equality(ctx, column, value),
            Self::Compare { column, op, value } => build_compare(ctx, column, *op, value),
            Self::In(c) => c.build(ctx),
            Self::Like(c) => c.build(ctx),
            Self::Between {
                column,
                low,
                high,
                negate,
            } => {
                let column = ctx.dialect().quote_column_name(column);
                let low = ctx.operand(low)?;
                let high = ctx.operand(high)?;
                let op = if *negate { "NOT BETWEEN" } else { "BETWEEN" };
                Ok(format!("{column} {op} {low} AND {high}"))
            },
            Self::Composite(c) => c.build(ctx),
            Self::Not(child) => Ok(format!("NOT ({})", child.build(ctx)?)),
            Self::Raw(expr) => ctx.expr(expr),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// EQUALITY AND COMPARISON
// ═══════════════════════════════════════════════════════════════════════════

fn build_equality(ctx: &mut RenderContext<'_>, column: &str, value: &Operand) -> SqlResult<String> {
    let column = ctx.dialect().quote_column_name(column);
    if value.is_null() {
        return Ok(format!("{column} IS NULL"));
    }
    let value = ctx.operand(value)?;
    Ok(format!("{column}={value}"))
}

fn build_compare(
    ctx: &mut RenderContext<'_>,
    column: &str,
    op: CompareOp,
    value: &Operand,
) -> SqlResult<String> {
    let column = ctx.dialect().quote_column_name(column);
    match op {
        CompareOp::Eq if value.is_null() => return Ok(format!("{column} IS NULL")),
        CompareOp::Ne if value.is_null() => return Ok(format!("{column} IS NOT NULL")),
        _ => {},
    }
    let value = ctx.operand(value)?;
    Ok(format!("{column} {} {value}", op.as_sql()))
}

// ═══════════════════════════════════════════════════════════════════════════
// IN
// ═══════════════════════════════════════════════════════════════════════════

/// Values of an `IN` condition.
#[derive(Debug, Clone, PartialEq)]
pub enum InValues {
    /// Flat list for a single column.
    List(Vec<Value>),
    /// One map per row, keyed by column name.
    Rows(Vec<IndexMap<String, Value>>),
}

/// `IN` / `NOT IN` over one column or a composite key.
///
/// # Example
/// ```
/// use sqlweave::{Condition, InCondition, Mssql, QueryBuilder, Value};
///
/// let cond = InCondition::rows(
///     ["id", "name"],
///     [
///         [("id", Value::from(1)), ("name", Value::from("oy"))],
///         [("id", Value::from(2)), ("name", Value::from("yo"))],
///     ],
/// );
/// let result = QueryBuilder::new(&Mssql)
///     .build_condition(&Condition::from(cond))
///     .unwrap();
/// assert_eq!(
///     result.sql,
///     "(([id] = :qp0 AND [name] = :qp1) OR ([id] = :qp2 AND [name] = :qp3))"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct InCondition {
    pub columns: Vec<String>,
    pub values: InValues,
    pub negate: bool,
}

impl InCondition {
    /// Single-column list.
    pub fn list<I, V>(column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            columns: vec![column.into()],
            values: InValues::List(values.into_iter().map(Into::into).collect()),
            negate: false,
        }
    }

    /// Rows keyed by column name.
    pub fn rows<C, S, I, R, K, V>(columns: C, rows: I) -> Self
    where
        C: IntoIterator<Item = S>,
        S: Into<String>,
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect::<IndexMap<String, Value>>()
            })
            .collect();
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            values: InValues::Rows(rows),
            negate: false,
        }
    }

    /// Turn into `NOT IN`.
    #[must_use]
    pub const fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    fn empty_marker(&self) -> &'static str {
        if self.negate {
            ALWAYS_TRUE
        } else {
            ALWAYS_FALSE
        }
    }

    fn build_single(
        &self,
        ctx: &mut RenderContext<'_>,
        column: &str,
        values: Vec<&Value>,
    ) -> SqlResult<String> {
        if values.is_empty() {
            return Ok(self.empty_marker().to_string());
        }
        let column = ctx.dialect().quote_column_name(column);
        let has_null = values.iter().any(|v| v.is_null());
        let mut placeholders = Vec::with_capacity(values.len());
        for value in values.into_iter().filter(|v| !v.is_null()) {
            placeholders.push(ctx.bind(value.clone())?);
        }

        let (in_op, null_test, join) = if self.negate {
            ("NOT IN", "IS NOT NULL", " AND ")
        } else {
            ("IN", "IS NULL", " OR ")
        };
        if placeholders.is_empty() {
            return Ok(format!("{column} {null_test}"));
        }
        let in_sql = format!("{column} {in_op} ({})", placeholders.join(", "));
        if has_null {
            Ok(format!("({in_sql}{join}{column} {null_test})"))
        } else {
            Ok(in_sql)
        }
    }

    fn build_composite(
        &self,
        ctx: &mut RenderContext<'_>,
        rows: &[IndexMap<String, Value>],
    ) -> SqlResult<String> {
        if rows.is_empty() {
            return Ok(self.empty_marker().to_string());
        }
        for (idx, row) in rows.iter().enumerate() {
            if let Some(column) = self.columns.iter().find(|c| !row.contains_key(*c)) {
                return Err(SqlError::malformed(format!(
                    "IN row {idx} has no value for column '{column}'"
                )));
            }
            if let Some(extra) = row.keys().find(|k| !self.columns.contains(*k)) {
                return Err(SqlError::malformed(format!(
                    "IN row {idx} has value for unlisted column '{extra}'"
                )));
            }
        }

        let (eq, null_test, inner, outer) = if self.negate {
            (" != ", " IS NOT NULL", " OR ", " AND ")
        } else {
            (" = ", " IS NULL", " AND ", " OR ")
        };
        let quoted: Vec<String> = self
            .columns
            .iter()
            .map(|c| ctx.dialect().quote_column_name(c))
            .collect();

        let mut branches = Vec::with_capacity(rows.len());
        for row in rows {
            let mut parts = Vec::with_capacity(self.columns.len());
            for (column, quoted) in self.columns.iter().zip(&quoted) {
                match row.get(column) {
                    Some(Value::Null) | None => parts.push(format!("{quoted}{null_test}")),
                    Some(value) => {
                        let placeholder = ctx.bind(value.clone())?;
                        parts.push(format!("{quoted}{eq}{placeholder}"));
                    },
                }
            }
            branches.push(format!("({})", parts.join(inner)));
        }
        Ok(format!("({})", branches.join(outer)))
    }
}

impl BuildCondition for InCondition {
    fn build(&self, ctx: &mut RenderContext<'_>) -> SqlResult<String> {
        match (self.columns.as_slice(), &self.values) {
            ([], _) => Err(SqlError::malformed("IN condition without columns")),
            ([column], InValues::List(values)) => {
                self.build_single(ctx, column, values.iter().collect())
            },
            ([column], InValues::Rows(rows)) => {
                let mut values = Vec::with_capacity(rows.len());
                for (idx, row) in rows.iter().enumerate() {
                    if row.len() != 1 {
                        return Err(SqlError::malformed(format!(
                            "IN row {idx} must hold exactly column '{column}'"
                        )));
                    }
                    let value = row.get(column).ok_or_else(|| {
                        SqlError::malformed(format!(
                            "IN row {idx} has no value for column '{column}'"
                        ))
                    })?;
                    values.push(value);
                }
                self.build_single(ctx, column, values)
            },
            (columns, InValues::List(_)) => Err(SqlError::malformed(format!(
                "IN over {} columns needs rows, not a flat list",
                columns.len()
            ))),
            (_, InValues::Rows(rows)) => self.build_composite(ctx, rows),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// LIKE
// ═══════════════════════════════════════════════════════════════════════════

/// Pattern match over one column.
///
/// String patterns are escaped with the dialect's table and wrapped in
/// `%..%` unless [`LikeCondition::without_escaping`] is used.
#[derive(Debug, Clone, PartialEq)]
pub struct LikeCondition {
    pub column: String,
    pub patterns: Vec<Operand>,
    pub negate: bool,
    pub case_insensitive: bool,
    /// Join several patterns with OR instead of AND.
    pub any: bool,
    pub escape: bool,
}

impl LikeCondition {
    /// `column LIKE %pattern%`.
    pub fn new(column: impl Into<String>, pattern: impl Into<Operand>) -> Self {
        Self::many(column, [pattern])
    }

    /// One LIKE per pattern, AND-ed by default.
    pub fn many<I, P>(column: impl Into<String>, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Operand>,
    {
        Self {
            column: column.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
            negate: false,
            case_insensitive: false,
            any: false,
            escape: true,
        }
    }

    /// `NOT LIKE`.
    #[must_use]
    pub const fn negated(mut self) -> Self {
        self.negate = true;
        self
    }

    /// Case-insensitive match.
    #[must_use]
    pub const fn case_insensitive(mut self) -> Self {
        self.case_insensitive = true;
        self
    }

    /// Match any of the patterns.
    #[must_use]
    pub const fn any(mut self) -> Self {
        self.any = true;
        self
    }

    /// Bind patterns exactly as given.
    #[must_use]
    pub const fn without_escaping(mut self) -> Self {
        self.escape = false;
        self
    }

    fn pattern_placeholder(
        &self,
        ctx: &mut RenderContext<'_>,
        pattern: &Operand,
    ) -> SqlResult<String> {
        match pattern {
            Operand::Value(Value::String(text)) if self.escape => {
                let escaped = ctx.dialect().escape_like(text);
                ctx.bind(Value::String(format!("%{escaped}%")))
            },
            other => ctx.operand(other),
        }
    }
}

impl BuildCondition for LikeCondition {
    fn build(&self, ctx: &mut RenderContext<'_>) -> SqlResult<String> {
        if self.patterns.is_empty() {
            let marker = if self.negate { ALWAYS_TRUE } else { ALWAYS_FALSE };
            return Ok(marker.to_string());
        }
        let column = ctx.dialect().quote_column_name(&self.column);
        let escape_clause = ctx.dialect().like_escape_clause.clone();
        let not = if self.negate { "NOT " } else { "" };
        let ilike = ctx
            .dialect()
            .ilike_operator
            .clone()
            .filter(|_| self.case_insensitive);

        let mut parts = Vec::with_capacity(self.patterns.len());
        for pattern in &self.patterns {
            let placeholder = self.pattern_placeholder(ctx, pattern)?;
            let part = match (&ilike, self.case_insensitive) {
                (Some(op), _) => format!("{column} {not}{op} {placeholder}{escape_clause}"),
                (None, true) => {
                    format!("LOWER({column}) {not}LIKE LOWER({placeholder}){escape_clause}")
                },
                (None, false) => format!("{column} {not}LIKE {placeholder}{escape_clause}"),
            };
            parts.push(part);
        }

        let join = if self.any { " OR " } else { " AND " };
        Ok(parts.join(join))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// COMPOSITE
// ═══════════════════════════════════════════════════════════════════════════

/// AND / OR over child conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeCondition {
    pub op: LogicalOp,
    pub children: Vec<Condition>,
}

impl BuildCondition for CompositeCondition {
    fn build(&self, ctx: &mut RenderContext<'_>) -> SqlResult<String> {
        build_junction(ctx, self.op, &self.children)
    }
}

/// Join `children` with `op`, parenthesizing each when there are several.
pub(crate) fn build_junction(
    ctx: &mut RenderContext<'_>,
    op: LogicalOp,
    children: &[Condition],
) -> SqlResult<String> {
    match children {
        [] => Ok(op.empty_marker().to_string()),
        [only] => only.build(ctx),
        children => {
            let mut parts = Vec::with_capacity(children.len());
            for child in children {
                parts.push(format!("({})", child.build(ctx)?));
            }
            Ok(parts.join(op.as_sql()))
        },
    }
}
