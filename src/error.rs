//! Error types for orgfiles.

use thiserror::Error;

use crate::auth::SessionError;

/// Common error type for orgfiles.
#[derive(Error, Debug)]
pub enum FmsError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant unless they carry a
    /// more specific meaning (see [`crate::db::map_insert_error`]).
    #[error("database error: {0}")]
    Database(String),

    /// I/O error from the filesystem mirror.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// A name collision (username, organisation name, sibling name, invite).
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// The actor lacks the capability required for the operation.
    #[error("permission denied: {0}")]
    Forbidden(String),

    /// Missing, invalid or expired session, or bad credentials.
    #[error("unauthorized: {0}")]
    Unauthorized(#[from] SessionError),

    /// Structural conflict such as an ownership or membership limit.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal failure not otherwise classified.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for FmsError {
    fn from(e: sqlx::Error) -> Self {
        FmsError::Database(e.to_string())
    }
}

/// Result type alias for orgfiles operations.
pub type Result<T> = std::result::Result<T, FmsError>;
