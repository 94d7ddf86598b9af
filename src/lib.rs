//! ollama-fluent - Ollama API client
//!
//! Typed access to an Ollama server: model management, embeddings, text
//! generation and chat, with streamed responses decoded incrementally from
//! newline-delimited JSON.
//!
//! # Architecture
//!
//! - **streaming**: byte sources and the NDJSON stream decoder
//! - **http / auth / config**: explicit configuration and request transport
//! - **types / models**: request builders and response types
//! - **client**: the public entry point

pub mod auth;
pub mod client;
pub mod config;
pub mod errors;
pub mod http;
pub mod models;
pub mod streaming;
pub mod types;

// CLI argument definitions for the bundled binary
pub mod cli;

// Re-export commonly used types
pub use client::OllamaClient;
pub use config::ClientConfig;
pub use errors::{OllamaError, Result};
pub use streaming::{ByteSource, DecodeError, StreamDecoder};
pub use types::{ChatMessage, ChatRequest, Format, GenerateRequest, Role};
