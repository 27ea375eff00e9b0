//! Backend error types.

use querybench_core::QueryError;
use thiserror::Error;

/// Errors raised by the data-access backends.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Error from the sqlx (ORM-style) backend.
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Error from the rusqlite (micro-ORM) backend.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// The async runtime driving sqlx could not be created.
    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl From<BackendError> for QueryError {
    fn from(err: BackendError) -> Self {
        QueryError::from_source(err)
    }
}
