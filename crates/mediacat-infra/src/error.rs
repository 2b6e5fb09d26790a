//! Error response rendering
//!
//! This module provides the `ErrorResponse` body the transport layer returns for an
//! `AppError`, plus logging at the level each error kind asks for. The transport itself
//! (status line, framing) lives outside this workspace.

use mediacat_core::{AppError, ErrorMetadata, LogLevel};
use serde::Serialize;

/// Standard error response format
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    /// Machine-readable error code for programmatic handling
    pub code: String,
    /// Whether this error is recoverable (can be retried)
    pub recoverable: bool,
    /// Suggested action for the client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_action: Option<String>,
    #[serde(skip)]
    pub status: u16,
}

impl ErrorResponse {
    /// Build the response body for `error`.
    ///
    /// Details are hidden in production and for sensitive errors.
    pub fn from_app_error(error: &AppError, is_production: bool) -> Self {
        let expose_details = !is_production && !error.is_sensitive();

        Self {
            error: error.client_message(),
            details: expose_details.then(|| error.to_string()),
            error_type: expose_details.then(|| error.error_type().to_string()),
            code: error.error_code().to_string(),
            recoverable: error.is_recoverable(),
            suggested_action: error.suggested_action().map(String::from),
            status: error.http_status_code(),
        }
    }
}

/// Log `error` at the level its kind declares.
pub fn log_error(error: &AppError) {
    let error_type = error.error_type();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type = error_type, "Error occurred");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type = error_type, "Error occurred");
        }
    }
}
