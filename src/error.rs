//! Crate-level error taxonomy.

use std::fmt;

/// Failure modes surfaced by the traceability subsystem.
#[derive(Debug)]
pub enum TraceError {
    /// The caller supplied malformed input.
    Validation(String),
    /// A referenced entity does not exist.
    NotFound(String),
    /// The operation would violate a declared policy or constraint.
    Conflict(String),
    /// The external source host failed or returned an unusable response.
    Upstream(String),
    /// The persistence layer failed.
    Storage(rusqlite::Error),
}

impl fmt::Display for TraceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(msg) => write!(f, "invalid input: {msg}"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::Conflict(msg) => write!(f, "conflict: {msg}"),
            Self::Upstream(msg) => write!(f, "upstream: {msg}"),
            Self::Storage(err) => write!(f, "storage: {err}"),
        }
    }
}

impl std::error::Error for TraceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for TraceError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err)
    }
}
