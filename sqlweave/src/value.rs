//! Literal values, raw expressions and operands.

/// SQL parameter values.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    /// Whether this is SQL `NULL`.
    #[inline]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v.into())
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Float,
    f64 => Float,
    String => String,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// A raw SQL fragment emitted verbatim, carrying its own named parameters.
///
/// # Example
/// ```
/// use sqlweave::Expr;
///
/// let concat = Expr::new("CONCAT(:phFoo, :phBar)").bind(":phFoo", "foo");
/// assert_eq!(concat.sql(), "CONCAT(:phFoo, :phBar)");
/// assert_eq!(concat.params().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    sql: String,
    params: Vec<(String, Value)>,
}

impl Expr {
    /// Create an expression without parameters.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    /// Attach a named parameter. A missing leading `:` is added.
    #[must_use]
    pub fn bind(mut self, name: impl AsRef<str>, value: impl Into<Value>) -> Self {
        self.params
            .push((placeholder_name(name.as_ref()), value.into()));
        self
    }

    /// The SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The explicit parameters, in declaration order.
    pub fn params(&self) -> &[(String, Value)] {
        &self.params
    }

    pub(crate) fn visit_params(&self, visit: &mut dyn FnMut(&str)) {
        for (name, _) in &self.params {
            visit(name);
        }
    }
}

/// Normalize a placeholder so it always starts with `:`.
pub(crate) fn placeholder_name(name: &str) -> String {
    if name.starts_with(':') {
        name.to_string()
    } else {
        format!(":{name}")
    }
}

/// Either a bound value or a raw expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(Value),
    Expr(Expr),
}

impl Operand {
    pub(crate) fn visit_params(&self, visit: &mut dyn FnMut(&str)) {
        if let Self::Expr(expr) = self {
            expr.visit_params(visit);
        }
    }

    /// Whether this operand is a `NULL` literal.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Value(Value::Null))
    }
}

impl From<Value> for Operand {
    fn from(v: Value) -> Self {
        Self::Value(v)
    }
}

impl From<Expr> for Operand {
    fn from(e: Expr) -> Self {
        Self::Expr(e)
    }
}

macro_rules! operand_from {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Self::Value(v.into())
                }
            }
        )*
    };
}

operand_from!(bool, i8, i16, i32, i64, u8, u16, u32, f32, f64, String, &str);

impl<T: Into<Value>> From<Option<T>> for Operand {
    fn from(v: Option<T>) -> Self {
        Self::Value(v.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_from_primitives() {
        assert_eq!(Value::from(1), Value::Int(1));
        assert_eq!(Value::from(false), Value::Bool(false));
        assert_eq!(Value::from("oy"), Value::String("oy".into()));
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
    }

    #[test]
    fn test_expr_bind_normalizes_names() {
        let expr = Expr::new("CONCAT(:phFoo, :phBar)")
            .bind("phFoo", "foo")
            .bind(":phBar", "bar");
        assert_eq!(
            expr.params(),
            &[
                (":phFoo".to_string(), Value::from("foo")),
                (":phBar".to_string(), Value::from("bar")),
            ]
        );
    }

    #[test]
    fn test_operand_visit_params() {
        let mut seen = Vec::new();
        Operand::from(5).visit_params(&mut |name| seen.push(name.to_string()));
        assert!(seen.is_empty());

        let expr = Operand::from(Expr::new(":phEmail").bind(":phEmail", "a@b.c"));
        expr.visit_params(&mut |name| seen.push(name.to_string()));
        assert_eq!(seen, vec![":phEmail".to_string()]);
    }
}
