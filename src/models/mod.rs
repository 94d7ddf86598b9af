//! Ollama model management module
//!
//! This module provides functionality for managing Ollama models:
//! - Listing installed models
//! - Inspecting, copying and deleting models
//! - Downloading (pulling) models with streamed progress

pub mod client;
pub mod types;

// Re-export key types for convenience
pub use client::ModelClient;
pub use types::{format_size, EmbeddingResponse, ModelDetails, ModelInfo, PullProgress};
