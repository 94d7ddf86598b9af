//! Model management endpoints
//!
//! Listing, inspecting, copying, deleting and pulling models. Obtained from
//! [`crate::OllamaClient::models`].

use crate::errors::{OllamaError, Result};
use crate::http::{request_body, Transport};
use crate::models::types::{ModelInfo, ModelsResponse, PullProgress};
use crate::streaming::StreamDecoder;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info};

const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(2);

/// HTTP client for the model management API
#[derive(Debug, Clone)]
pub struct ModelClient {
    transport: Transport,
    decoder: StreamDecoder,
}

impl ModelClient {
    pub fn new(transport: Transport, decoder: StreamDecoder) -> Self {
        Self { transport, decoder }
    }

    /// List installed models (GET /api/tags)
    pub async fn list(&self) -> Result<Vec<ModelInfo>> {
        let response: ModelsResponse = self
            .transport
            .send_json(Method::GET, "/api/tags", None)
            .await?;

        debug!(count = response.models.len(), "listed models");
        Ok(response.models)
    }

    /// Modelfile, template, parameters and details (POST /api/show).
    ///
    /// The payload varies between server versions, so it is returned as-is.
    pub async fn show(&self, name: &str) -> Result<Value> {
        self.transport
            .send_json(Method::POST, "/api/show", Some(&json!({ "name": name })))
            .await
    }

    /// Copy `source` to a new name (POST /api/copy)
    pub async fn copy(&self, source: &str, destination: &str) -> Result<()> {
        let body = json!({ "source": source, "destination": destination });
        self.transport
            .send_empty(Method::POST, "/api/copy", Some(&body))
            .await?;

        info!(source, destination, "copied model");
        Ok(())
    }

    /// Remove a model and its data (DELETE /api/delete)
    pub async fn delete(&self, name: &str) -> Result<()> {
        self.transport
            .send_empty(Method::DELETE, "/api/delete", Some(&json!({ "name": name })))
            .await?;

        info!(name, "deleted model");
        Ok(())
    }

    /// Download a model and wait for the final status (POST /api/pull)
    pub async fn pull(&self, name: &str) -> Result<PullProgress> {
        let body = request_body(&json!({ "name": name }), false)?;
        let progress: PullProgress = self
            .transport
            .send_json(Method::POST, "/api/pull", Some(&body))
            .await?;

        match progress.error {
            Some(err) => Err(OllamaError::Server(err)),
            None => Ok(progress),
        }
    }

    /// Download a model, reporting each progress update as it streams in.
    ///
    /// An `{"error": ...}` line from the server ends the pull with
    /// [`OllamaError::Server`] after the stream is consumed.
    pub async fn pull_stream<F>(&self, name: &str, mut on_progress: F) -> Result<Vec<PullProgress>>
    where
        F: FnMut(&PullProgress),
    {
        let body = request_body(&json!({ "name": name }), true)?;
        let chunks = self
            .transport
            .send_stream(Method::POST, "/api/pull", Some(&body))
            .await?;

        let mut updates = Vec::new();
        let mut malformed = None;
        self.decoder
            .decode_stream(chunks, |value| match PullProgress::deserialize(value) {
                Ok(progress) => {
                    on_progress(&progress);
                    updates.push(progress);
                }
                Err(err) => {
                    malformed.get_or_insert(err);
                }
            })
            .await?;

        if let Some(err) = malformed {
            return Err(err.into());
        }

        if let Some(err) = updates.iter().find_map(|p| p.error.clone()) {
            return Err(OllamaError::Server(err));
        }

        info!(name, updates = updates.len(), "pulled model");
        Ok(updates)
    }

    /// Check whether a model is installed
    pub async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.list().await?.iter().any(|m| m.name == name))
    }

    /// Installed models whose name contains `pattern`
    pub async fn find(&self, pattern: &str) -> Result<Vec<ModelInfo>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|m| m.name.contains(pattern))
            .collect())
    }

    /// Check if the server answers at all
    pub async fn is_available(&self) -> bool {
        self.transport.ping("/api/tags", AVAILABILITY_TIMEOUT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;

    fn client() -> ModelClient {
        let transport = Transport::new(&ClientConfig::default()).unwrap();
        ModelClient::new(transport, StreamDecoder::new())
    }

    #[test]
    fn test_client_creation() {
        assert_eq!(client().transport.base_url(), "http://127.0.0.1:11434");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_unavailable() {
        let config = ClientConfig::default().with_url("http://127.0.0.1:9");
        let transport = Transport::new(&config).unwrap();
        let models = ModelClient::new(transport, StreamDecoder::new());
        assert!(!models.is_available().await);
    }

    #[tokio::test]
    #[ignore] // Requires Ollama running
    async fn test_list_models_integration() {
        let models = client().list().await;
        assert!(models.is_ok());
    }

    #[tokio::test]
    #[ignore] // Requires Ollama running
    async fn test_is_available_integration() {
        assert!(client().is_available().await);
    }
}
