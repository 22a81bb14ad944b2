//! Error types for satchel-core

use thiserror::Error;

/// Result type alias using satchel-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in satchel-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Upload or retrieval request failed at the transport layer
    #[error("Transport error: {0}")]
    Transport(String),

    /// HTTP client error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Image decode error
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// Upload was cancelled before the service acknowledged it
    #[error("Upload cancelled: {0}")]
    Cancelled(String),
}
