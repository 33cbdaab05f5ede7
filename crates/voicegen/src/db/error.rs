//! Database error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// SQLite error from rusqlite.
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    /// The write lock could not be acquired within the busy timeout.
    #[error("Database is busy: {0}")]
    Busy(rusqlite::Error),

    /// IO error when creating directories or files.
    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A migration failed to apply.
    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    /// The database lock was poisoned.
    #[error("Database lock poisoned")]
    LockPoisoned,

    /// A completion targeted a job that is not in `processing`.
    #[error("Job {id} is not in processing state")]
    InvalidTransition { id: i64 },

    /// A stored value could not be decoded.
    #[error("Invalid value in column '{column}': {value}")]
    InvalidColumn { column: &'static str, value: String },
}

impl DatabaseError {
    /// Busy/locked errors are transient and worth retrying on the next poll.
    pub fn is_busy(&self) -> bool {
        matches!(self, DatabaseError::Busy(_))
    }
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
                DatabaseError::Busy(err)
            }
            _ => DatabaseError::Sqlite(err),
        }
    }
}
