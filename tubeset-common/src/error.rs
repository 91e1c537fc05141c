//! Common error types for tubeset

use thiserror::Error;

/// Common result type for tubeset operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the dataset core and the app
#[derive(Error, Debug)]
pub enum Error {
    /// Expected store, archive, or file is missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Metadata document is not a valid JSON array of records
    #[error("Malformed metadata: {0}")]
    Malformed(String),

    /// Merge package lacks `metadata.json` or `images/`, or is not a readable zip
    #[error("Invalid package: {0}")]
    InvalidPackage(String),

    /// Target location is already occupied
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding error (wraps serde_json::Error)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
