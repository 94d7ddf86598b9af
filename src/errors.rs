//! Error types for the Ollama client
//!
//! A single crate-wide error enum with context carried in each variant.

use crate::streaming::DecodeError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum OllamaError {
    /// Stream ended with bytes that do not form a JSON value
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The byte source failed mid-stream
    #[error("Streaming error: {0}")]
    Stream(String),

    /// Server reported an error inside a streamed response
    #[error("Ollama server error: {0}")]
    Server(String),

    /// Server answered with a non-success status
    #[error("Ollama API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication configured without the credentials it needs
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Image attachment could not be read
    #[error("Image file does not exist or is unreadable: {}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, OllamaError>;

impl OllamaError {
    /// True when the server reported the requested resource as missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, OllamaError::Api { status: 404, .. })
    }
}
