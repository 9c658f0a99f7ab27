use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

/// Failures from role administration and id parsing.
///
/// Authorization denials are not errors at this level; see `AuthzError` in
/// `orgguard-auth`. Hierarchy failures carry their own `HierarchyError`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A role or permission document is structurally unacceptable.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A store could not keep its own guarantees (e.g. a poisoned lock).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("not found: {0}")]
    NotFound(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }
}
