//! HTTP transport for the Ollama API
//!
//! Wraps a `reqwest` client configured from [`ClientConfig`]. Requests are
//! assembled with [`Transport::build_request`] so their method, URL, headers
//! and body can be inspected before anything touches the network.

use crate::config::ClientConfig;
use crate::errors::{OllamaError, Result};
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, Request, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Shared HTTP plumbing; cheap to clone
#[derive(Debug, Clone)]
pub struct Transport {
    client: Client,
    base_url: String,
    headers: HeaderMap,
}

impl Transport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let headers = build_headers(config)?;

        let client = Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(OllamaError::Http)?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Headers attached to every request
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Assemble a request without sending it
    pub fn build_request(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Request> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut builder = self
            .client
            .request(method, url)
            .headers(self.headers.clone());

        if let Some(body) = body {
            builder = builder.json(body);
        }

        builder.build().map_err(OllamaError::Http)
    }

    /// Send a request and reject non-success statuses
    pub async fn execute(&self, request: Request) -> Result<Response> {
        debug!(method = %request.method(), url = %request.url(), "sending request");

        let response = self.client.execute(request).await?;
        check_status(response).await
    }

    /// Send and parse the whole response body as `T`
    pub async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<T> {
        let response = self.execute(self.build_request(method, path, body)?).await?;
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Send, expecting a success status and ignoring the body
    pub async fn send_empty(&self, method: Method, path: &str, body: Option<&Value>) -> Result<()> {
        self.execute(self.build_request(method, path, body)?).await?;
        Ok(())
    }

    /// Send and hand back the body as a stream of chunks
    pub async fn send_stream(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<impl Stream<Item = Result<Bytes>>> {
        let response = self.execute(self.build_request(method, path, body)?).await?;

        Ok(response
            .bytes_stream()
            .map(|result| result.map_err(|e| OllamaError::Stream(e.to_string()))))
    }

    /// Quick reachability probe with its own short timeout
    pub async fn ping(&self, path: &str, timeout: Duration) -> bool {
        let Ok(mut request) = self.build_request(Method::GET, path, None) else {
            return false;
        };
        *request.timeout_mut() = Some(timeout);

        self.client
            .execute(request)
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}

/// Serialize a request and set its `stream` flag
pub fn request_body<T: Serialize>(request: &T, stream: bool) -> Result<Value> {
    let mut body = serde_json::to_value(request)?;
    if let Value::Object(ref mut map) = body {
        map.insert("stream".to_string(), Value::Bool(stream));
    }
    Ok(body)
}

fn build_headers(config: &ClientConfig) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(value) = config.auth.authorization()? {
        headers.insert(AUTHORIZATION, header_value(&value)?);
    }

    // Custom headers win over auth
    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| OllamaError::Config(format!("Invalid header name '{}': {}", name, e)))?;
        headers.insert(name, header_value(value)?);
    }

    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value)
        .map_err(|e| OllamaError::Config(format!("Invalid header value: {}", e)))?;
    value.set_sensitive(true);
    Ok(value)
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    Err(OllamaError::Api {
        status: status.as_u16(),
        message: error_message(&text, status.canonical_reason()),
    })
}

/// Ollama reports failures as `{"error": "..."}`; fall back to the raw body
fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        if let Some(Value::String(message)) = map.get("error") {
            return message.clone();
        }
    }

    if body.trim().is_empty() {
        reason.unwrap_or("Unknown error").to_string()
    } else {
        body.trim().to_string()
    }
}
