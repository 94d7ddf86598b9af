//! Request and response types
//!
//! Requests are plain values built with consuming `self -> Self` methods;
//! a request can be cloned and reused across concurrent calls.

pub mod chat;
pub mod generate;

// Re-export commonly used types
pub use chat::{ChatMessage, ChatRequest, ChatResponse, Role};
pub use generate::{Format, GenerateRequest, GenerateResponse, Metrics};

use crate::errors::{OllamaError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;

/// Read an image file and base64-encode it for the `images` field
pub fn encode_image(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|source| OllamaError::Image {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_encode_image() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x89PNG").unwrap();

        assert_eq!(encode_image(file.path()).unwrap(), "iVBORw==");
    }

    #[test]
    fn test_encode_missing_image() {
        let err = encode_image("/definitely/not/here.png").unwrap_err();
        assert!(matches!(err, OllamaError::Image { .. }));
    }
}
