//! Evaluation error types
//!
//! One error type flows through every lazy stream, because a failure raised
//! anywhere in an operator pipeline must surface unchanged at the consumer's
//! next pull. The three classes are deliberately distinct:
//!
//! - Permission: raised fail-fast when an operator is invoked
//! - Schema: structural problems, raised at the point of production
//! - Storage: backing store failures, surfaced through the stream
//!
//! All variants are `Clone`: a FAILED sequence re-raises the same error on
//! every subsequent pull instead of recomputing.

use thiserror::Error;

use crate::term::{FullyQualifiedClauseIndicator, Variable};

/// Result type for stream evaluation
pub type EvalResult<T> = Result<T, EvalError>;

/// Access mode named in a permission error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    Write,
}

impl std::fmt::Display for Access {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Access::Read => write!(f, "read"),
            Access::Write => write!(f, "write"),
        }
    }
}

/// Denied predicate access, annotated with the goal that required it
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{access} access to {indicator} denied (goal: {goal})")]
pub struct PermissionError {
    /// The predicate the check was performed against
    pub indicator: FullyQualifiedClauseIndicator,
    /// Which access mode was denied
    pub access: Access,
    /// Rendering of the goal whose evaluation required the access
    pub goal: String,
}

impl PermissionError {
    pub fn read(indicator: FullyQualifiedClauseIndicator, goal: impl Into<String>) -> Self {
        Self {
            indicator,
            access: Access::Read,
            goal: goal.into(),
        }
    }

    pub fn write(indicator: FullyQualifiedClauseIndicator, goal: impl Into<String>) -> Self {
        Self {
            indicator,
            access: Access::Write,
            goal: goal.into(),
        }
    }
}

/// Structural errors: the plan cannot be satisfied by the registered schema
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A point lookup was planned against a predicate with no fact store.
    /// Scans treat the same situation as "no facts"; lookups do not.
    #[error("no fact store registered for {0}")]
    NoFactStore(FullyQualifiedClauseIndicator),

    /// An index key left one of the index's variables unbound
    #[error("index key for {indicator} is not ground: {variable} is unbound")]
    InvalidIndexKey {
        indicator: FullyQualifiedClauseIndicator,
        variable: Variable,
    },

    /// The index exists but does not support the requested lookup shape
    #[error("index for {0} does not support range lookups")]
    IndexUnsupported(FullyQualifiedClauseIndicator),

    /// An invocation had no natively-implemented or resolved callable
    #[error("no callable resolved for {0}")]
    UnresolvedCallable(FullyQualifiedClauseIndicator),

    /// A term that is neither an atom nor a compound was used as a goal
    #[error("term cannot be used as a goal: {0}")]
    InvalidGoal(String),
}

/// Failures of the backing store, reported at the next pull of the
/// affected stream, never earlier.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    #[error("storage operation failed: {0}")]
    Failed(String),

    #[error("storage operation cancelled")]
    Cancelled,
}

/// Unified evaluation error carried by lazy sequences
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error(transparent)]
    Permission(#[from] PermissionError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl EvalError {
    /// Returns true for fail-fast permission denials
    pub fn is_permission(&self) -> bool {
        matches!(self, EvalError::Permission(_))
    }

    /// Returns true for structural schema errors
    pub fn is_schema(&self) -> bool {
        matches!(self, EvalError::Schema(_))
    }

    /// Returns true for backing-store failures
    pub fn is_storage(&self) -> bool {
        matches!(self, EvalError::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::term::ClauseIndicator;

    fn fqi(name: &str, arity: usize) -> FullyQualifiedClauseIndicator {
        FullyQualifiedClauseIndicator::new("user", ClauseIndicator::new(name, arity))
    }

    #[test]
    fn test_permission_error_names_goal() {
        let err = PermissionError::read(fqi("secret", 1), "secret(X)");
        let text = err.to_string();
        assert!(text.contains("read"));
        assert!(text.contains("user:secret/1"));
        assert!(text.contains("secret(X)"));
    }

    #[test]
    fn test_classification() {
        let p: EvalError = PermissionError::write(fqi("p", 0), "p").into();
        let s: EvalError = SchemaError::NoFactStore(fqi("p", 0)).into();
        let st: EvalError = StorageError::Cancelled.into();
        assert!(p.is_permission());
        assert!(s.is_schema());
        assert!(st.is_storage());
        assert!(!p.is_schema());
    }

    #[test]
    fn test_errors_clone_equal() {
        let err: EvalError = StorageError::Failed("disk".into()).into();
        assert_eq!(err.clone(), err);
    }
}
