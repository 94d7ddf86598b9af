//! Command-line argument parsing for ollama-fluent
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use crate::config::ClientConfig;
use crate::streaming::DEFAULT_CHUNK_SIZE;
use crate::types::Format;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ollama-fluent - talk to an Ollama server from the terminal
#[derive(Parser, Debug)]
#[command(name = "ollama-fluent")]
#[command(version)]
#[command(about = "Query and manage models on an Ollama server", long_about = None)]
pub struct Args {
    /// Ollama base URL (overrides config file and OLLAMA_URL)
    #[arg(long, global = true)]
    pub url: Option<String>,

    /// Model to use (overrides config file and OLLAMA_MODEL)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: default (warnings), -v (info), -vv (debug), -vvv (trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List installed models
    Models,

    /// Show details of the selected model
    Show,

    /// Download the selected model
    Pull,

    /// Copy the selected model to a new name
    Copy {
        destination: String,
    },

    /// Delete the selected model
    Delete,

    /// Compute an embedding for a prompt
    Embed {
        prompt: String,
    },

    /// Generate a completion for a prompt
    Ask {
        prompt: String,

        /// System prompt
        #[arg(short, long)]
        system: Option<String>,

        /// "json" or an inline JSON schema
        #[arg(long, value_parser = parse_format)]
        format: Option<Format>,

        /// Print tokens as they arrive
        #[arg(long)]
        stream: bool,
    },

    /// Send a single chat message
    Chat {
        message: String,

        /// System message placed before the user message
        #[arg(short, long)]
        system: Option<String>,

        /// Print tokens as they arrive
        #[arg(long)]
        stream: bool,
    },

    /// Decode a recorded NDJSON stream ("-" reads stdin)
    Replay {
        file: PathBuf,

        /// Bytes requested per read
        #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
    },

    /// Display the effective configuration
    Config,
}

/// Verbosity level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    VeryVerbose,
    Trace,
}

impl Args {
    /// Get verbosity level based on flags
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                2 => Verbosity::VeryVerbose,
                _ => Verbosity::Trace,
            }
        }
    }

    /// Apply command-line overrides on top of a loaded configuration
    pub fn apply(&self, config: &mut ClientConfig) {
        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(model) = &self.model {
            config.model = model.clone();
        }
    }
}

impl Commands {
    /// Subcommand name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Models => "models",
            Commands::Show => "show",
            Commands::Pull => "pull",
            Commands::Copy { .. } => "copy",
            Commands::Delete => "delete",
            Commands::Embed { .. } => "embed",
            Commands::Ask { .. } => "ask",
            Commands::Chat { .. } => "chat",
            Commands::Replay { .. } => "replay",
            Commands::Config => "config",
        }
    }

    /// Whether the command talks to the Ollama server
    pub fn needs_server(&self) -> bool {
        !matches!(self, Commands::Replay { .. } | Commands::Config)
    }
}

impl Verbosity {
    /// Default `tracing` filter directive when RUST_LOG is unset
    pub fn filter_directive(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "warn",
            Verbosity::Verbose => "ollama_fluent=info,warn",
            Verbosity::VeryVerbose => "ollama_fluent=debug,info",
            Verbosity::Trace => "ollama_fluent=trace,debug",
        }
    }

    /// Check if should show progress bars
    pub fn show_progress(&self) -> bool {
        !matches!(self, Verbosity::Quiet)
    }
}

/// Parse `--format`: the literal `json`, or a JSON schema document
pub fn parse_format(raw: &str) -> Result<Format, String> {
    if raw == "json" {
        return Ok(Format::Json);
    }

    serde_json::from_str(raw)
        .map(Format::Schema)
        .map_err(|e| format!("expected \"json\" or a JSON schema: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(parse(&["ollama-fluent", "-q", "models"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["ollama-fluent", "models"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["ollama-fluent", "-v", "models"]).verbosity(), Verbosity::Verbose);
        assert_eq!(
            parse(&["ollama-fluent", "models", "-vv"]).verbosity(),
            Verbosity::VeryVerbose
        );
        assert_eq!(parse(&["ollama-fluent", "-vvvv", "models"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_ask_arguments() {
        let args = parse(&[
            "ollama-fluent",
            "ask",
            "Why is the sky blue?",
            "--system",
            "Answer in four words",
            "--format",
            "json",
            "--stream",
            "-m",
            "llama3",
        ]);

        match args.command {
            Commands::Ask {
                prompt,
                system,
                format,
                stream,
            } => {
                assert_eq!(prompt, "Why is the sky blue?");
                assert_eq!(system.as_deref(), Some("Answer in four words"));
                assert_eq!(format, Some(Format::Json));
                assert!(stream);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert_eq!(args.model.as_deref(), Some("llama3"));
    }

    #[test]
    fn test_replay_defaults() {
        match parse(&["ollama-fluent", "replay", "-"]).command {
            Commands::Replay { file, chunk_size } => {
                assert_eq!(file, PathBuf::from("-"));
                assert_eq!(chunk_size, DEFAULT_CHUNK_SIZE);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Args::try_parse_from(["ollama-fluent"]).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let args = parse(&["ollama-fluent", "--url", "http://gpu:11434", "-m", "phi3", "show"]);
        let mut config = ClientConfig::default();
        args.apply(&mut config);

        assert_eq!(config.url, "http://gpu:11434");
        assert_eq!(config.model, "phi3");
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format("json").unwrap(), Format::Json);
        assert_eq!(
            parse_format(r#"{"type":"object"}"#).unwrap(),
            Format::Schema(json!({"type": "object"}))
        );
        assert!(parse_format("yaml").is_err());
    }

    #[test]
    fn test_command_names() {
        assert_eq!(parse(&["ollama-fluent", "replay", "-"]).command.name(), "replay");
        assert_eq!(parse(&["ollama-fluent", "embed", "hi"]).command.name(), "embed");
        assert!(!parse(&["ollama-fluent", "config"]).command.needs_server());
        assert!(parse(&["ollama-fluent", "models"]).command.needs_server());
    }

    #[test]
    fn test_verbosity_methods() {
        assert!(!Verbosity::Quiet.show_progress());
        assert!(Verbosity::Normal.show_progress());
        assert_eq!(Verbosity::Quiet.filter_directive(), "error");
    }
}
