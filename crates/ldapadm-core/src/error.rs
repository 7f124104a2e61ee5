//! Error types for directory-management operations.
//!
//! Every failure in the workspace funnels into [`Error`]: the commands never
//! retry or recover, they annotate and propagate until the binary logs the
//! message and exits nonzero.

use thiserror::Error;

/// Main error type for directory-management operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Settings document could not be read or parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Directory URL is malformed
    #[error("Invalid directory endpoint: {0}")]
    InvalidEndpoint(String),

    /// Connecting or binding to the directory failed
    #[error("Directory connection failed: {0}")]
    Connection(String),

    /// Operation timed out
    #[error("Timeout waiting for the directory: {0}")]
    Timeout(String),

    /// Entry not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Entry already exists (duplicate create)
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// User is not a member of the group it should be removed from
    #[error("User `{user}` is not a member of group `{group}`")]
    NotMember {
        /// Username whose membership was checked
        user: String,
        /// Group the user was expected in
        group: String,
    },

    /// Malformed input or directory data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Directory operation failed for any other reason
    #[error("Directory operation failed: {operation}: {message}")]
    Operation {
        /// Short description of the failing operation
        operation: String,
        /// Error message reported by the directory server or client library
        message: String,
    },
}

/// Specialized result type for directory-management operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the error code for this error type.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG_ERROR",
            Self::InvalidEndpoint(_) => "INVALID_ENDPOINT",
            Self::Connection(_) => "CONNECTION_FAILED",
            Self::Timeout(_) => "TIMEOUT",
            Self::NotFound(_) => "NOT_FOUND",
            Self::AlreadyExists(_) => "ALREADY_EXISTS",
            Self::NotMember { .. } => "NOT_MEMBER",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::Operation { .. } => "OPERATION_FAILED",
        }
    }

    /// Returns true if the error reports a missing directory entry.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

// Conversions from external error types
impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidEndpoint(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Config(err.to_string())
    }
}
