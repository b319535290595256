//! Error types for the inspector engine.

use thiserror::Error;

/// Boxed error used for body stream failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors produced while capturing or decoding a request.
///
/// None of these ever reach the instrumented request: the recorder logs
/// them and records whatever it could capture.
#[derive(Debug, Error)]
pub enum InspectorError {
    /// The request body stream failed before it was fully read.
    #[error("Failed to read request body: {0}")]
    BodyRead(#[source] BoxError),

    /// A `application/x-www-form-urlencoded` body could not be decoded.
    #[error("Invalid urlencoded form: {0}")]
    Form(#[from] serde_urlencoded::de::Error),

    /// A `multipart/form-data` body could not be parsed.
    #[error("Invalid multipart body: {0}")]
    Multipart(String),
}

/// Result type alias for inspector operations.
pub type Result<T, E = InspectorError> = std::result::Result<T, E>;
