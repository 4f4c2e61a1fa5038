use thiserror::Error;

/// Errors from the SQL storage layer.
#[derive(Error, Debug)]
pub enum SQLError {
    /// Failed to open or configure the database.
    #[error("connection error: {0}")]
    Connection(String),

    /// A query failed to prepare or run.
    #[error("query error: {0}")]
    Query(String),

    /// A statement (INSERT/UPDATE/DELETE) failed.
    #[error("execution error: {0}")]
    Execution(String),

    /// The database is busy or locked by a concurrent writer.
    ///
    /// Kept separate from [`SQLError::Execution`] so callers can map it to
    /// a retryable conflict instead of a hard storage failure.
    #[error("database busy: {0}")]
    Busy(String),

    /// Transaction control (BEGIN/COMMIT/ROLLBACK) failed.
    #[error("transaction error: {0}")]
    Transaction(String),
}

impl SQLError {
    /// Whether this failure is transient write contention.
    pub fn is_busy(&self) -> bool {
        matches!(self, SQLError::Busy(_))
    }
}
