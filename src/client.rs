//! Ollama API client
//!
//! Entry point of the library. Non-streaming calls parse the complete JSON
//! body; streaming calls feed the chunked body through [`StreamDecoder`] and
//! hand every decoded object to a callback as it arrives.

use crate::config::ClientConfig;
use crate::errors::Result;
use crate::http::{request_body, Transport};
use crate::models::{EmbeddingResponse, ModelClient};
use crate::streaming::StreamDecoder;
use crate::types::{ChatMessage, ChatRequest, ChatResponse, GenerateRequest, GenerateResponse};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

/// Client for one Ollama server
#[derive(Debug, Clone)]
pub struct OllamaClient {
    transport: Transport,
    config: ClientConfig,
    decoder: StreamDecoder,
}

impl OllamaClient {
    /// Build a client from an explicit configuration
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = Transport::new(&config)?;

        Ok(Self {
            transport,
            config,
            decoder: StreamDecoder::new(),
        })
    }

    /// Build a client from the config file and `OLLAMA_*` environment
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::load(None)?)
    }

    /// Replace the decoder used for streamed responses
    pub fn with_decoder(mut self, decoder: StreamDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Model management endpoints
    pub fn models(&self) -> ModelClient {
        ModelClient::new(self.transport.clone(), self.decoder)
    }

    /// A generation request seeded with the configured model and keep-alive
    pub fn generate_request(&self, prompt: impl Into<String>) -> GenerateRequest {
        let request = GenerateRequest::new(&self.config.model, prompt);
        match &self.config.keep_alive {
            Some(keep_alive) => request.keep_alive(keep_alive.clone()),
            None => request,
        }
    }

    /// A chat request seeded with the configured model and keep-alive
    pub fn chat_request(&self, messages: Vec<ChatMessage>) -> ChatRequest {
        let request = ChatRequest::new(&self.config.model, messages);
        match &self.config.keep_alive {
            Some(keep_alive) => request.keep_alive(keep_alive.clone()),
            None => request,
        }
    }

    /// POST /api/generate and wait for the complete response
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        debug!(model = %request.model, "generate");
        let body = request_body(request, false)?;
        self.transport
            .send_json(Method::POST, "/api/generate", Some(&body))
            .await
    }

    /// POST /api/generate with streaming; `on_object` sees each chunk in order
    pub async fn generate_stream<F>(&self, request: &GenerateRequest, on_object: F) -> Result<Vec<Value>>
    where
        F: FnMut(&Value),
    {
        debug!(model = %request.model, "generate (streaming)");
        let body = request_body(request, true)?;
        self.stream("/api/generate", &body, on_object).await
    }

    /// POST /api/chat and wait for the complete response
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        debug!(model = %request.model, messages = request.messages.len(), "chat");
        let body = request_body(request, false)?;
        self.transport
            .send_json(Method::POST, "/api/chat", Some(&body))
            .await
    }

    /// POST /api/chat with streaming
    pub async fn chat_stream<F>(&self, request: &ChatRequest, on_object: F) -> Result<Vec<Value>>
    where
        F: FnMut(&Value),
    {
        debug!(model = %request.model, messages = request.messages.len(), "chat (streaming)");
        let body = request_body(request, true)?;
        self.stream("/api/chat", &body, on_object).await
    }

    /// POST /api/embeddings for a single prompt
    pub async fn embeddings(&self, model: &str, prompt: &str) -> Result<EmbeddingResponse> {
        debug!(model, "embeddings");
        let body = json!({ "model": model, "prompt": prompt });
        self.transport
            .send_json(Method::POST, "/api/embeddings", Some(&body))
            .await
    }

    async fn stream<F>(&self, path: &str, body: &Value, on_object: F) -> Result<Vec<Value>>
    where
        F: FnMut(&Value),
    {
        let chunks = self.transport.send_stream(Method::POST, path, Some(body)).await?;
        let objects = self.decoder.decode_stream(chunks, on_object).await?;
        debug!(path, objects = objects.len(), "stream finished");
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::OllamaError;

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::new(ClientConfig::default()).unwrap();
        assert_eq!(client.config().model, "llama2");
        assert_eq!(client.transport().base_url(), "http://127.0.0.1:11434");
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = OllamaClient::new(ClientConfig::default().with_url("localhost"));
        assert!(matches!(result, Err(OllamaError::Config(_))));
    }

    #[test]
    fn test_seeded_requests() {
        let client = OllamaClient::new(ClientConfig::default().with_model("mistral")).unwrap();

        let generate = client.generate_request("hello");
        assert_eq!(generate.model, "mistral");
        assert_eq!(generate.keep_alive.as_deref(), Some("5m"));

        let chat = client.chat_request(vec![ChatMessage::user("hello")]);
        assert_eq!(chat.model, "mistral");
        assert_eq!(chat.messages.len(), 1);
    }

    #[test]
    fn test_no_keep_alive_when_unset() {
        let mut config = ClientConfig::default();
        config.keep_alive = None;
        let client = OllamaClient::new(config).unwrap();

        let body = request_body(&client.generate_request("hi"), false).unwrap();
        assert!(body.get("keep_alive").is_none());
        assert_eq!(body["stream"], false);
    }

    #[test]
    fn test_custom_decoder() {
        let client = OllamaClient::new(ClientConfig::default())
            .unwrap()
            .with_decoder(StreamDecoder::with_chunk_size(1024));
        assert_eq!(client.decoder.chunk_size(), 1024);
    }
}
