use std::path::PathBuf;

use reseed_core::RetryExhausted;
use thiserror::Error;

/// Messages that identify a database file the server could not open, for
/// drivers that do not expose a structured code.
const CANNOT_OPEN_SIGNATURES: &[&str] = &["could not open new database", "unable to open database"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbErrorKind {
    /// The server could not open the data file; recoverable by a forced log
    /// rebuild.
    CannotOpenDatabase,
    /// Connecting to the server failed.
    Connection,
    /// The shared connection has been closed for shutdown.
    Closed,
    /// Any other statement failure.
    Query,
}

/// A failure reported by the database collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct DbError {
    pub kind: DbErrorKind,
    pub message: String,
}

impl DbError {
    /// Build an error, promoting `Query` to `CannotOpenDatabase` when the
    /// message carries a known signature.
    pub fn new(kind: DbErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        let kind = if kind == DbErrorKind::Query && matches_cannot_open(&message) {
            DbErrorKind::CannotOpenDatabase
        } else {
            kind
        };
        Self { kind, message }
    }

    pub fn closed() -> Self {
        Self::new(DbErrorKind::Closed, "database connection is closed")
    }

    pub fn is_cannot_open(&self) -> bool {
        self.kind == DbErrorKind::CannotOpenDatabase
    }
}

fn matches_cannot_open(message: &str) -> bool {
    let lower = message.to_lowercase();
    CANNOT_OPEN_SIGNATURES.iter().any(|s| lower.contains(s))
}

impl From<rusqlite::Error> for DbError {
    fn from(e: rusqlite::Error) -> Self {
        let kind = match e.sqlite_error_code() {
            Some(rusqlite::ErrorCode::CannotOpen) => DbErrorKind::CannotOpenDatabase,
            _ => DbErrorKind::Query,
        };
        DbError::new(kind, e.to_string())
    }
}

/// Errors surfaced by [`crate::controller::DatabaseController`].
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// The data file could not be read at attach time.
    #[error("Data file is not accessible: {}", path.display())]
    FileInaccessible { path: PathBuf },

    /// A catalog or DDL statement failed.
    #[error("Database query failed: {0}")]
    QueryFailed(#[from] DbError),

    /// A retried step gave up.
    #[error(transparent)]
    Retry(#[from] RetryExhausted),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_promotes_query_errors() {
        let e = DbError::new(
            DbErrorKind::Query,
            "Msg 1813: Could not open new database 'Reporting'. CREATE DATABASE is aborted.",
        );
        assert!(e.is_cannot_open());

        let e = DbError::new(DbErrorKind::Query, "syntax error near DROP");
        assert_eq!(e.kind, DbErrorKind::Query);
    }

    #[test]
    fn signature_does_not_rewrite_other_kinds() {
        let e = DbError::new(DbErrorKind::Connection, "unable to open database file");
        assert_eq!(e.kind, DbErrorKind::Connection);
    }
}
