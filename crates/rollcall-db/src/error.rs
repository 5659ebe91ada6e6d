//! Database errors

use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    /// SQLx error
    #[error("database error: {0}")]
    Sqlx(#[source] sqlx::Error),

    /// Record not found
    #[error("record not found")]
    NotFound,

    /// Uniqueness constraint violated (e.g. one attendance record per
    /// (session, participant) pair)
    #[error("unique constraint violated")]
    UniqueViolation,
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::UniqueViolation,
            _ => Self::Sqlx(err),
        }
    }
}

/// Result alias for database operations
pub type DbResult<T> = Result<T, DbError>;
