//! Error types for the contacts service.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using the contacts service's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for contact operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Request shape is not allowed (e.g. a caller-supplied identifier)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// A field value failed validation
    #[error("Invalid value: {0}")]
    BadValue(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Storage backend failed for a reason other than a driver error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Not-found error for a contact scoped to a user.
    pub fn contact_not_found(user_id: &str, contact_id: &str) -> Self {
        Error::NotFound(format!("no contact {} for user {}", contact_id, user_id))
    }

    /// The wire-level code this error is reported under.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::BadRequest(_) => ErrorCode::BadRequest,
            Error::BadValue(_) => ErrorCode::BadValue,
            Error::NotFound(_) => ErrorCode::NotFound,
            Error::Database(_) | Error::Storage(_) => ErrorCode::StorageFailure,
            Error::Serialization(_) | Error::Config(_) | Error::Internal(_) => ErrorCode::Internal,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Machine-readable error codes carried in error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    BadRequest,
    BadValue,
    NotFound,
    StorageFailure,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::BadRequest => "BAD_REQUEST",
            ErrorCode::BadValue => "BAD_VALUE",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::StorageFailure => "STORAGE_FAILURE",
            ErrorCode::Internal => "INTERNAL",
        }
    }

    /// True for codes that indicate a server-side failure rather than a
    /// problem with the caller's request.
    pub fn is_server_failure(&self) -> bool {
        matches!(self, ErrorCode::StorageFailure | ErrorCode::Internal)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
