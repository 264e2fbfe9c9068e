//! Dialect-aware SQL rendering with SQL Server as the primary target.
//!
//! Statements are described as plain data ([`Query`], [`Insert`], [`Upsert`],
//! [`Condition`]) and rendered by a [`QueryBuilder`] bound to one dialect.
//! Every value becomes a named placeholder; the result is a
//! [`RenderResult`] holding the SQL and the parameter map.
//!
//! ## Dialects
//!
//! A dialect is a [`DialectConfig`]: quoting characters, LIMIT/OFFSET
//! syntax, LIKE escaping table, upsert strategy, comment style and so on.
//! Presets exist for SQL Server ([`Mssql`]), PostgreSQL ([`Postgres`]),
//! SQLite ([`Sqlite`]) and MySQL ([`MySql`]); custom ones can be loaded
//! with [`DialectConfig::from_toml_str`].
//!
//! ## Example
//!
//! ```
//! use sqlweave::{Condition, Mssql, Query, QueryBuilder, Value};
//!
//! let query = Query::new()
//!     .select(["id", "name"])
//!     .from("customer")
//!     .filter(Condition::eq("status", 1))
//!     .order_by("name", false)
//!     .limit(10);
//!
//! let result = QueryBuilder::new(&Mssql).build(&query).unwrap();
//! assert_eq!(
//!     result.sql,
//!     "SELECT [id], [name] FROM [customer] WHERE [status]=:qp0 \
//!      ORDER BY [name] OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
//! );
//! assert_eq!(result.params.get(":qp0"), Some(&Value::Int(1)));
//! ```
//!
//! ## Schema
//!
//! Capturing inserted rows and deriving upsert conflict keys need table
//! metadata. Attach any [`SchemaProvider`] (for instance a [`Catalog`])
//! with [`QueryBuilder::with_schema`]; without one those features fall back
//! to plain statements.
//!
//! ## Logging
//!
//! Rendering emits `tracing` events: `debug` per rendered statement and
//! `trace` per bound placeholder. No subscriber is installed by the crate.

mod builder;
mod comment;
mod condition;
mod dialect;
mod error;
mod params;
mod query;
mod schema;
mod validate;
mod value;

pub use builder::{QueryBuilder, RenderContext, RenderResult};
pub use condition::{
    ALWAYS_FALSE, ALWAYS_TRUE, BuildCondition, CompareOp, CompositeCondition, Condition,
    InCondition, InValues, LikeCondition, LogicalOp,
};
pub use dialect::{
    CommentStyle, Dialect, DialectConfig, LikeEscape, LimitOffsetSyntax, MySql, Mssql,
    Postgres, Sqlite, UpsertStrategy,
};
pub use error::{SqlError, SqlResult};
pub use params::{ParamBinder, Params};
pub use query::{
    Insert, OrderBy, OrderTarget, Query, SelectItem, Source, Union, Upsert, UpsertUpdate,
    insert_into, row, select, upsert_into,
};
pub use schema::{Catalog, ColumnSchema, SchemaProvider, TableSchema};
pub use validate::validate_identifier;
pub use value::{Expr, Operand, Value};
