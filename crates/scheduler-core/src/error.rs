use thiserror::Error;

use crate::cache::CacheError;
use crate::recurrence::RecurrenceError;

/// Coarse classification every caller-facing failure falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    Internal,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::NotFound => "not found",
            ErrorKind::Internal => "internal error",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),

    #[error("Migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("IO error")]
    Io(#[from] std::io::Error),

    #[error("Cache error")]
    Cache(#[from] CacheError),

    #[error("Serialization error")]
    Serialization(#[from] serde_json::Error),

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid task id: {0}")]
    InvalidTaskId(i64),

    #[error("Invalid recurrence input")]
    Recurrence(#[from] RecurrenceError),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::InvalidInput(_)
            | CoreError::InvalidTaskId(_)
            | CoreError::Recurrence(_) => ErrorKind::InvalidArgument,
            CoreError::Database(sqlx::Error::RowNotFound) => ErrorKind::NotFound,
            CoreError::Database(_)
            | CoreError::Migration(_)
            | CoreError::Io(_)
            | CoreError::Cache(_)
            | CoreError::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// Human-readable detail, including the first underlying cause.
    pub fn detail(&self) -> String {
        match std::error::Error::source(self) {
            Some(cause) => format!("{}: {}", self, cause),
            None => self.to_string(),
        }
    }
}
