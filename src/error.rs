use thiserror::Error;

/// Failures surfaced by the lifecycle manager, the search composer and the store.
///
/// Nothing here is retried or recovered locally; every variant reaches the
/// caller as-is.
#[derive(Debug, Error)]
pub enum ActivityError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{table} row '{name}' not found")]
    NotFound { table: &'static str, name: String },

    #[error("restricted operation: {0}")]
    RestrictedOperation(String),

    #[error("no matching search criteria found")]
    NoCriteria,

    #[error("unknown column '{column}' for table {table}")]
    UnknownColumn { table: &'static str, column: String },

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl ActivityError {
    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        ActivityError::Validation(msg.into())
    }
}

pub type Result<T, E = ActivityError> = std::result::Result<T, E>;
