//! Database error types.

use derive_more::{Display, Error};
use halloween_match3::{BackendError, BackendErrorKind};
use tracing::instrument;

/// What went wrong at the database layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DbErrorKind {
    /// Could not open the database.
    #[display("connection")]
    Connection,
    /// A query or migration failed.
    #[display("query")]
    Query,
    /// A row that must exist does not.
    #[display("not found")]
    NotFound,
    /// The mutation would break a balance rule.
    #[display("rejected")]
    Rejected,
}

/// Database error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Database {} error: {} at {}:{}", kind, message, file, line)]
pub struct DbError {
    /// Failure category.
    pub kind: DbErrorKind,
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl DbError {
    /// Creates a new query error with caller location tracking.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_kind(DbErrorKind::Query, message)
    }

    /// Creates an error of the given kind with caller location tracking.
    #[track_caller]
    pub fn with_kind(kind: DbErrorKind, message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// A required row is missing.
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::with_kind(DbErrorKind::NotFound, message)
    }

    /// A balance rule refused the mutation.
    #[track_caller]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::with_kind(DbErrorKind::Rejected, message)
    }
}

impl From<diesel::result::Error> for DbError {
    #[track_caller]
    fn from(err: diesel::result::Error) -> Self {
        match err {
            diesel::result::Error::NotFound => Self::not_found("Record not found"),
            other => Self::new(format!("Diesel error: {}", other)),
        }
    }
}

impl From<diesel::ConnectionError> for DbError {
    #[track_caller]
    fn from(err: diesel::ConnectionError) -> Self {
        Self::with_kind(DbErrorKind::Connection, format!("Connection error: {}", err))
    }
}

impl From<serde_json::Error> for DbError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::new(format!("JSON error: {}", err))
    }
}

impl From<DbError> for BackendError {
    #[track_caller]
    fn from(err: DbError) -> Self {
        let kind = match err.kind {
            DbErrorKind::Connection | DbErrorKind::Query => BackendErrorKind::Unavailable,
            DbErrorKind::NotFound => BackendErrorKind::NotFound,
            DbErrorKind::Rejected => BackendErrorKind::Rejected,
        };
        BackendError::new(kind, err.to_string())
    }
}
