//! Error types for seismomap.
//!
//! Uses `thiserror` for library-style error definitions.

use thiserror::Error;

use crate::models::Category;

/// Errors that can occur in seismomap operations.
#[derive(Error, Debug)]
pub enum SeismomapError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed
    #[error("Failed to parse JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Geocoding service returned an error status
    #[error("Geocoding API error ({status}): {message}")]
    Api { status: String, message: String },

    /// Invalid response structure
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Event or criteria validation failed
    #[error("Invalid data: {0}")]
    Validation(String),

    /// A category has no entry in the chart palette
    #[error("No palette color registered for category '{0}'")]
    UnknownCategoryColor(Category),

    /// Configuration could not be loaded
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The session loop is no longer receiving messages
    #[error("Session has shut down")]
    SessionClosed,

    /// Tracing subscriber could not be installed
    #[error("Failed to initialize tracing: {0}")]
    Telemetry(String),
}
