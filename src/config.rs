//! Client configuration
//!
//! TOML-backed configuration passed explicitly to [`crate::OllamaClient`].
//! Location: ~/.ollama-fluent/config.toml, overridable from the environment.

use crate::auth::{AuthConfig, AuthKind};
use crate::errors::{OllamaError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_URL: &str = "http://127.0.0.1:11434";
pub const DEFAULT_MODEL: &str = "llama2";
pub const DEFAULT_KEEP_ALIVE: &str = "5m";
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Connection and request defaults for one Ollama server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL, without trailing `/api`
    pub url: String,
    /// Model used when a request does not name one
    pub model: String,
    /// How long the server keeps a model loaded; `None` defers to the server
    pub keep_alive: Option<String>,
    pub timeout_secs: u64,
    pub verify_ssl: bool,
    /// Extra headers sent with every request
    pub headers: BTreeMap<String, String>,
    pub auth: AuthConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            keep_alive: Some(DEFAULT_KEEP_ALIVE.to_string()),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            verify_ssl: true,
            headers: BTreeMap::new(),
            auth: AuthConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from file or use defaults, then apply environment overrides
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let mut config = match path {
            Some(config_path) => Self::load_from_file(&config_path)?,
            None => Self::load_default()?,
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| OllamaError::Config(format!("Failed to read config: {}", e)))?;

        let config: ClientConfig = toml::from_str(&contents)
            .map_err(|e| OllamaError::Config(format!("Failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Load from the standard location, or built-in defaults
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(config_path) if config_path.exists() => Self::load_from_file(&config_path),
            _ => Ok(Self::default()),
        }
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".ollama-fluent").join("config.toml"))
    }

    /// Override fields from `OLLAMA_*` environment variables
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("OLLAMA_URL") {
            self.url = url;
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.model = model;
        }
        if let Some(keep_alive) = lookup("OLLAMA_KEEP_ALIVE") {
            self.keep_alive = Some(keep_alive).filter(|k| !k.is_empty());
        }
        if let Some(secs) = lookup("OLLAMA_CONNECTION_TIMEOUT").and_then(|s| s.parse().ok()) {
            self.timeout_secs = secs;
        }
        if let Some(token) = lookup("OLLAMA_API_KEY").filter(|t| !t.is_empty()) {
            self.auth.kind = AuthKind::Bearer;
            self.auth.token = Some(token);
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.url.trim().is_empty() {
            return Err(OllamaError::Config("url must not be empty".to_string()));
        }

        if !(self.url.starts_with("http://") || self.url.starts_with("https://")) {
            return Err(OllamaError::Config(format!(
                "url must start with http:// or https://, got {}",
                self.url
            )));
        }

        if self.model.trim().is_empty() {
            return Err(OllamaError::Config("model must not be empty".to_string()));
        }

        if self.timeout_secs == 0 {
            return Err(OllamaError::Config(
                "timeout_secs must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| OllamaError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| OllamaError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| OllamaError::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}
