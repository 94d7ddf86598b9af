//! Types for POST /api/generate

use crate::errors::Result;
use crate::types::encode_image;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::path::Path;

/// Output format constraint
#[derive(Debug, Clone, PartialEq)]
pub enum Format {
    /// Any valid JSON, serialized as `"json"`
    Json,
    /// A JSON schema the output must follow
    Schema(Value),
}

impl Serialize for Format {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Format::Json => serializer.serialize_str("json"),
            Format::Schema(schema) => schema.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Format {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(s) if s == "json" => Format::Json,
            other => Format::Schema(other),
        })
    }
}

/// Text generation request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    /// System prompt overriding the one in the Modelfile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keep_alive: Option<String>,
    /// Base64-encoded images for multimodal models
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl GenerateRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            format: None,
            options: None,
            raw: None,
            keep_alive: None,
            images: Vec::new(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    /// Model parameters such as `temperature` or `num_ctx`
    pub fn options(mut self, options: Value) -> Self {
        self.options = Some(options);
        self
    }

    /// Skip prompt templating on the server
    pub fn raw(mut self, raw: bool) -> Self {
        self.raw = Some(raw);
        self
    }

    /// e.g. "5m", "1h", "0" to unload right after the request
    pub fn keep_alive(mut self, keep_alive: impl Into<String>) -> Self {
        self.keep_alive = Some(keep_alive.into());
        self
    }

    /// Attach an already base64-encoded image
    pub fn image_base64(mut self, encoded: impl Into<String>) -> Self {
        self.images.push(encoded.into());
        self
    }

    /// Attach an image file
    pub fn image(self, path: impl AsRef<Path>) -> Result<Self> {
        Ok(self.image_base64(encode_image(path)?))
    }

    /// Attach several image files, failing on the first unreadable one
    pub fn images<I, P>(mut self, paths: I) -> Result<Self>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        for path in paths {
            self = self.image(path)?;
        }
        Ok(self)
    }
}

/// Timing and token counts reported on the final response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(default)]
    pub total_duration: u64,
    #[serde(default)]
    pub load_duration: u64,
    #[serde(default)]
    pub prompt_eval_count: u64,
    #[serde(default)]
    pub prompt_eval_duration: u64,
    #[serde(default)]
    pub eval_count: u64,
    #[serde(default)]
    pub eval_duration: u64,
}

impl Metrics {
    /// Tokens generated per second
    pub fn tokens_per_sec(&self) -> f64 {
        if self.eval_duration == 0 {
            return 0.0;
        }
        self.eval_count as f64 / (self.eval_duration as f64 / 1_000_000_000.0)
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.total_duration / 1_000_000
    }

    pub fn load_duration_ms(&self) -> u64 {
        self.load_duration / 1_000_000
    }
}

/// Generation response, or one chunk of a streamed one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub done_reason: Option<String>,
    /// Conversation state to pass back for follow-up requests
    #[serde(default)]
    pub context: Option<Vec<i64>>,
    #[serde(flatten)]
    pub metrics: Metrics,
}

impl GenerateResponse {
    /// Join the text of streamed chunks, skipping objects of other shapes
    pub fn concat_stream(chunks: &[Value]) -> String {
        chunks
            .iter()
            .filter_map(|chunk| chunk.get("response").and_then(Value::as_str))
            .collect()
    }
}
