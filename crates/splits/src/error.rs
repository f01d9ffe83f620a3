use thiserror::Error;

/// Errors returned by splits operations.
#[derive(Debug, Error)]
pub enum SplitsError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("chain operation failed: {0}")]
    ChainFailed(String),

    #[error("misconfigured: {0}")]
    Misconfigured(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<rusqlite::Error> for SplitsError {
    fn from(e: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(ref err, _) = e {
            if err.extended_code == 2067 {
                // SQLITE_CONSTRAINT_UNIQUE
                return SplitsError::Conflict("unique constraint violated".to_string());
            }
        }
        SplitsError::Internal(format!("database error: {e}"))
    }
}
