//! Error type shared by the view compiler, the row decoder and the merged-relation facade.
//!
//! Compilation failures (`UnsupportedRelationKind`, `EmptyRelationSet`) are raised before any
//! DDL reaches the engine. Engine failures are passed through as-is and never retried.

use may_postgres::Error as PostgresError;
use std::fmt;

/// Result alias used throughout the crate
pub type MergeResult<T> = Result<T, MergeError>;

/// Merged-relation error type
#[derive(Debug)]
pub enum MergeError {
    /// A relation is none of the shapes that can be merged into a view
    UnsupportedRelationKind(String),
    /// A merged view was requested without any relation
    EmptyRelationSet,
    /// A row carried a type tag with no registered model factory
    UnknownModelType(String),
    /// `PostgreSQL` error from `may_postgres`
    PostgresError(PostgresError),
    /// Query execution error reported by a non-Postgres executor
    QueryError(String),
    /// Row parsing/conversion error
    ParseError(String),
    /// Other errors
    Other(String),
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeError::UnsupportedRelationKind(kind) => {
                write!(f, "Unsupported relation kind: {kind}")
            }
            MergeError::EmptyRelationSet => {
                write!(f, "A merged view needs at least one relation")
            }
            MergeError::UnknownModelType(tag) => {
                write!(f, "No model registered for type tag '{tag}'")
            }
            MergeError::PostgresError(e) => {
                write!(f, "PostgreSQL error: {e}")
            }
            MergeError::QueryError(s) => {
                write!(f, "Query error: {s}")
            }
            MergeError::ParseError(s) => {
                write!(f, "Parse error: {s}")
            }
            MergeError::Other(s) => {
                write!(f, "Execution error: {s}")
            }
        }
    }
}

impl std::error::Error for MergeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MergeError::PostgresError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PostgresError> for MergeError {
    fn from(err: PostgresError) -> Self {
        MergeError::PostgresError(err)
    }
}

impl MergeError {
    /// Whether this error was raised while compiling a view, before any engine call
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            MergeError::UnsupportedRelationKind(_) | MergeError::EmptyRelationSet
        )
    }
}
