//! Error types module
//!
//! Every failure the catalog core can report is an `AppError` variant. Errors surface
//! to the caller unchanged; the HTTP layer (outside this workspace) maps each kind to a
//! status code through `ErrorMetadata`.

use std::io;

use uuid::Uuid;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues like resource limits
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their HTTP response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "CAPACITY_EXCEEDED")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Object too large: {size} bytes exceeds the per-upload limit of {limit} bytes")]
    ObjectTooLarge { size: u64, limit: u64 },

    #[error("Storage capacity exceeded: {used} bytes used, {requested} bytes requested, limit {limit} bytes")]
    CapacityExceeded { used: u64, requested: u64, limit: u64 },

    #[error("Storage unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate media id: {0}")]
    DuplicateId(Uuid),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::UnsupportedMediaType(_) => (
            415,
            "UNSUPPORTED_MEDIA_TYPE",
            false,
            Some("Upload a JPEG, PNG, MP4, WebM, MP3 or WAV file"),
            false,
            LogLevel::Debug,
        ),
        AppError::ObjectTooLarge { .. } => (
            413,
            "OBJECT_TOO_LARGE",
            false,
            Some("Reduce file size"),
            false,
            LogLevel::Debug,
        ),
        AppError::CapacityExceeded { .. } => (
            413,
            "CAPACITY_EXCEEDED",
            false,
            Some("Delete unused media to free storage"),
            false,
            LogLevel::Warn,
        ),
        AppError::StoreUnavailable(_) => (
            503,
            "STORE_UNAVAILABLE",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::DuplicateId(_) => (
            409,
            "DUPLICATE_ID",
            true,
            Some("Retry the upload"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::UnsupportedMediaType(_) => "UnsupportedMediaType",
            AppError::ObjectTooLarge { .. } => "ObjectTooLarge",
            AppError::CapacityExceeded { .. } => "CapacityExceeded",
            AppError::StoreUnavailable(_) => "StoreUnavailable",
            AppError::NotFound(_) => "NotFound",
            AppError::DuplicateId(_) => "DuplicateId",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Internal(_) => "Internal",
        }
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::UnsupportedMediaType(ref content_type) => {
                format!("Unsupported media type: {}", content_type)
            }
            AppError::ObjectTooLarge { limit, .. } => format!(
                "File size exceeds maximum allowed size of {} MB",
                limit / 1024 / 1024
            ),
            AppError::CapacityExceeded { limit, .. } => format!(
                "Storage capacity of {} MB would be exceeded by this upload",
                limit / 1024 / 1024
            ),
            AppError::StoreUnavailable(_) => "Failed to access storage".to_string(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::DuplicateId(_) => "Internal server error".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Internal(_) => "Internal server error".to_string(),
        }
    }
}
