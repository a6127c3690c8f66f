//! Structured error types for API responses.

use crate::db::StoreError;
use crate::propagation::PropagationError;
use serde::Serialize;
use std::fmt;

/// Fixed user-facing messages.
pub const MSG_NOT_LOGGED_IN: &str = "User not logged in";
pub const MSG_TASK_UNAVAILABLE: &str = "Task doesn't exist or not enough permissions";
pub const MSG_NOT_FOUND: &str = "Not found";
pub const MSG_ALREADY_EXISTS: &str = "Document already exists";
pub const MSG_INVALID_LOGIN: &str = "Invalid login";
pub const MSG_INTERNAL: &str = "Internal server error";

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Request errors
    InvalidFieldValue,
    NotLoggedIn,
    InvalidLogin,

    // Lookup errors. A missing task and a task owned by someone else are
    // reported identically.
    TaskUnavailable,
    NotFound,

    // Conflict errors
    AlreadyExists,

    // Server-side failures
    DatabaseError,
    PropagationFailed,
}

impl ErrorCode {
    /// HTTP status code for this error.
    pub fn status(self) -> u16 {
        match self {
            ErrorCode::InvalidFieldValue => 400,
            ErrorCode::NotLoggedIn | ErrorCode::TaskUnavailable => 401,
            ErrorCode::InvalidLogin => 403,
            ErrorCode::NotFound => 404,
            ErrorCode::AlreadyExists => 409,
            ErrorCode::DatabaseError | ErrorCode::PropagationFailed => 500,
        }
    }

    pub fn is_server_error(self) -> bool {
        self.status() >= 500
    }
}

/// Structured error returned by the lifecycle, account and guard layers.
#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Diagnostic detail for logs; never sent to clients.
    #[serde(skip)]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn missing_field(field: &str) -> Self {
        Self::invalid_value(field, format!("{} is required", field))
    }

    pub fn not_logged_in() -> Self {
        Self::new(ErrorCode::NotLoggedIn, MSG_NOT_LOGGED_IN)
    }

    pub fn task_unavailable() -> Self {
        Self::new(ErrorCode::TaskUnavailable, MSG_TASK_UNAVAILABLE)
    }

    pub fn not_found() -> Self {
        Self::new(ErrorCode::NotFound, MSG_NOT_FOUND)
    }

    pub fn already_exists() -> Self {
        Self::new(ErrorCode::AlreadyExists, MSG_ALREADY_EXISTS)
    }

    pub fn invalid_login() -> Self {
        Self::new(ErrorCode::InvalidLogin, MSG_INVALID_LOGIN)
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, MSG_INTERNAL).with_details(err.to_string())
    }

    pub fn propagation(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::PropagationFailed, MSG_INTERNAL).with_details(err.to_string())
    }

    pub fn status(&self) -> u16 {
        self.code.status()
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.details {
            Some(ref details) => write!(f, "{}: {}", self.message, details),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ApiError {}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::database(err)
    }
}

impl From<PropagationError> for ApiError {
    fn from(err: PropagationError) -> Self {
        match err {
            PropagationError::Store(store) => ApiError::database(store),
            other => ApiError::propagation(other),
        }
    }
}

/// Result type for API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
