use deadpool_postgres::{BuildError, PoolError};
use thiserror::Error;

// DbError is the lowest level error type, wrapping errors from the database layer. It does not wrap
// any higher level errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Unique constraint violation
    #[error("unique violation")]
    UniqueViolation,

    /// Check constraint violation (e.g. a zero count row)
    #[error("check violation")]
    CheckViolation,

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Pg(tokio_postgres::Error),

    #[error(transparent)]
    Migrate(#[from] refinery::Error),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error("row decode error: {0}")]
    Decode(String),

    #[error("input error: {0}")]
    Validation(String),
}

impl From<tokio_postgres::Error> for DbError {
    fn from(e: tokio_postgres::Error) -> Self {
        use tokio_postgres::error::SqlState;

        match e.code() {
            Some(code) if *code == SqlState::UNIQUE_VIOLATION => DbError::UniqueViolation,
            Some(code) if *code == SqlState::CHECK_VIOLATION => DbError::CheckViolation,
            _ => DbError::Pg(e),
        }
    }
}
