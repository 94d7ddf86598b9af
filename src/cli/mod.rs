//! CLI module for ollama-fluent
//!
//! Handles command-line argument parsing for the bundled binary.

pub mod args;

pub use args::{Args, Commands, Verbosity};
