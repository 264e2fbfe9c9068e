//! Error types for sqlweave.

use thiserror::Error;

/// Result type alias for rendering operations.
pub type SqlResult<T> = Result<T, SqlError>;

/// Errors raised while rendering a statement.
///
/// Every error is a local rendering failure: no partial SQL is returned and
/// there is nothing to retry at this layer.
#[derive(Debug, Error)]
pub enum SqlError {
    /// A condition cannot be rendered as given (e.g. composite `IN` arity).
    #[error("Malformed condition: {0}")]
    MalformedCondition(String),

    /// The dialect configuration does not support the requested feature.
    #[error("Dialect '{dialect}' does not support {feature}")]
    UnsupportedDialectFeature { dialect: String, feature: String },

    /// An auto-generated or explicit placeholder would overwrite another one.
    #[error("Parameter collision on placeholder '{name}'")]
    ParameterCollision { name: String },

    /// An identifier cannot be used as a table or column name.
    #[error("Invalid identifier '{name}': {reason}")]
    InvalidIdentifier { name: String, reason: String },

    /// The statement model is inconsistent (arity, missing names, ...).
    #[error("Invalid statement: {0}")]
    InvalidStatement(String),

    /// Dialect or catalog configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),
}

impl SqlError {
    /// Create a malformed condition error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedCondition(message.into())
    }

    /// Create an unsupported feature error for the named dialect
    pub fn unsupported(dialect: impl Into<String>, feature: impl Into<String>) -> Self {
        Self::UnsupportedDialectFeature {
            dialect: dialect.into(),
            feature: feature.into(),
        }
    }

    /// Create a parameter collision error
    pub fn collision(name: impl Into<String>) -> Self {
        Self::ParameterCollision { name: name.into() }
    }

    /// Create an invalid statement error
    pub fn invalid_statement(message: impl Into<String>) -> Self {
        Self::InvalidStatement(message.into())
    }

    /// Check if this is a malformed condition error
    pub fn is_malformed_condition(&self) -> bool {
        matches!(self, Self::MalformedCondition(_))
    }

    /// Check if this is an unsupported dialect feature error
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::UnsupportedDialectFeature { .. })
    }

    /// Check if this is a parameter collision error
    pub fn is_collision(&self) -> bool {
        matches!(self, Self::ParameterCollision { .. })
    }
}
