//! Placeholder allocation for a single render call.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::error::{SqlError, SqlResult};
use crate::value::{Value, placeholder_name};

/// Ordered placeholder map: key is the placeholder as written in SQL
/// (`":qp0"`), insertion order is first occurrence.
pub type Params = IndexMap<String, Value>;

/// Allocates placeholder names and collects their values.
///
/// Auto-generated names are `<prefix><n>`. Caller-supplied names are kept
/// verbatim and never renumbered. One binder lives for exactly one render.
///
/// # Example
/// ```
/// use sqlweave::{ParamBinder, Params, Value};
///
/// let mut seeded = Params::new();
/// seeded.insert(":phBar".into(), Value::from("bar"));
///
/// let mut binder = ParamBinder::with_params(":qp", seeded);
/// assert_eq!(binder.bind(Value::from(1)).unwrap(), ":qp1");
/// assert_eq!(binder.bind(Value::from(2)).unwrap(), ":qp2");
/// ```
#[derive(Debug, Clone)]
pub struct ParamBinder {
    prefix: String,
    params: Params,
    reserved: HashSet<String>,
    /// Next auto index; `None` once a caller name used the last one.
    floor: Option<usize>,
}

impl ParamBinder {
    /// Create an empty binder.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self::with_params(prefix, Params::new())
    }

    /// Create a binder seeded with caller parameters.
    pub fn with_params(prefix: impl Into<String>, params: Params) -> Self {
        let mut binder = Self {
            prefix: prefix.into(),
            params: Params::new(),
            reserved: HashSet::new(),
            floor: Some(0),
        };
        for (name, value) in params {
            let name = placeholder_name(&name);
            binder.bump_floor(&name);
            binder.params.insert(name, value);
        }
        binder
    }

    /// Reserve an explicit name that will be bound later in the render.
    ///
    /// Names sharing the auto prefix push the auto counter past them.
    pub fn reserve(&mut self, name: &str) {
        let name = placeholder_name(name);
        self.bump_floor(&name);
        self.reserved.insert(name);
    }

    /// Bind a value under the next free auto-generated name.
    pub fn bind(&mut self, value: Value) -> SqlResult<String> {
        let Some(floor) = self.floor else {
            return Err(SqlError::collision(format!("{}{}", self.prefix, usize::MAX)));
        };
        let idx = self.params.len().max(floor);
        let name = format!("{}{idx}", self.prefix);
        if self.params.contains_key(&name) || self.reserved.contains(&name) {
            return Err(SqlError::collision(name));
        }
        tracing::trace!(placeholder = %name, "bind");
        self.params.insert(name.clone(), value);
        self.floor = idx.checked_add(1);
        Ok(name)
    }

    /// Bind a caller-named parameter.
    ///
    /// Re-binding the same name with an equal value is a no-op; a different
    /// value is a collision.
    pub fn bind_named(&mut self, name: &str, value: &Value) -> SqlResult<()> {
        let name = placeholder_name(name);
        match self.params.get(&name) {
            Some(existing) if existing == value => Ok(()),
            Some(_) => Err(SqlError::collision(name)),
            None => {
                tracing::trace!(placeholder = %name, "bind named");
                self.bump_floor(&name);
                self.params.insert(name, value.clone());
                Ok(())
            },
        }
    }

    /// Number of bound parameters.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether nothing has been bound yet.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// The parameters bound so far.
    pub const fn params(&self) -> &Params {
        &self.params
    }

    /// Consume the binder and return the parameter map.
    pub fn into_params(self) -> Params {
        self.params
    }

    fn bump_floor(&mut self, name: &str) {
        let suffix = name
            .strip_prefix(self.prefix.as_str())
            .and_then(|rest| rest.parse::<usize>().ok());
        if let Some(n) = suffix {
            self.floor = match (self.floor, n.checked_add(1)) {
                (Some(floor), Some(next)) => Some(floor.max(next)),
                _ => None,
            };
        }
    }
}
