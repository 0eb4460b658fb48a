//! Error types for upbox

use thiserror::Error;

/// Result type alias for upbox operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in upbox operations
///
/// `NotFound`, `TooLarge` and `Forbidden` are the caller-facing classes; every
/// other variant is an internal failure and maps to a 500.
#[derive(Error, Debug)]
pub enum Error {
    /// Unknown, malformed, or extension-mismatched public ID
    #[error("file {0} not found")]
    NotFound(String),

    /// Upload exceeded the configured ceiling (carries the ceiling in bytes)
    #[error("file exceeds maximum allowed size of {0} bytes")]
    TooLarge(u64),

    /// MIME type or extension rejected by the admission filter
    #[error("forbidden type: {0}")]
    Forbidden(String),

    #[error("internal storage error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status code the serving layer should answer with
    pub fn status_code(&self) -> u16 {
        match self {
            Error::NotFound(_) => 404,
            Error::TooLarge(_) => 413,
            Error::Forbidden(_) => 403,
            _ => 500,
        }
    }
}
