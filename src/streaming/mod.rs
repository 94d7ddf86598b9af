//! Streaming response decoding
//!
//! Provides byte sources and the newline-delimited JSON decoder used for
//! streamed Ollama responses.

pub mod decoder;
pub mod source;

// Re-export commonly used types
pub use decoder::{DecodeError, StreamDecoder};
pub use source::{ByteSource, ChunkSource, ReaderSource, DEFAULT_CHUNK_SIZE, MAX_READ_SIZE};
