//! Mediacat Infrastructure Library
//!
//! Shared infrastructure for the catalog's entry points:
//! - Telemetry initialization (tracing subscriber, pretty or JSON output)
//! - Error response rendering for the transport layer

#[cfg(feature = "observability-basic")]
pub mod telemetry;

pub mod error;

// Re-export commonly used types
#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat, TelemetryConfig};

pub use error::{log_error, ErrorResponse};
