//! Local-runner (Ollama) wire types.
//!
//! Request types are lenient: missing fields deserialize to `None` so the
//! handlers can report a validation error instead of a parse failure.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use relaylm_core::{ChatMessage, EmbeddingInput, ModelDescriptor, Timings};

/// Plain-text body of `GET /`.
pub const OLLAMA_ROOT_RESPONSE: &str = "Ollama is running";

/// Version reported by `GET /api/version`. Some clients refuse to talk to
/// anything older than 0.6.4.
pub const OLLAMA_COMPAT_VERSION: &str = "0.6.4";

const fn default_true() -> bool {
    true
}

// ── Requests ───────────────────────────────────────────────────────────

/// Sampling options accepted under `options`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OllamaOptions {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<i64>,
    pub seed: Option<i64>,
    /// Maximum tokens to generate. `-1` and `-2` mean unlimited.
    pub num_predict: Option<i64>,
    /// A single stop string or a list of them.
    pub stop: Option<Value>,
}

impl OllamaOptions {
    /// Map options and `format` onto OpenAI-spelled extra parameters.
    pub fn to_extra_params(&self, format: Option<&Value>) -> Map<String, Value> {
        let mut extra = Map::new();
        if let Some(temperature) = self.temperature {
            extra.insert("temperature".into(), json!(temperature));
        }
        if let Some(top_p) = self.top_p {
            extra.insert("top_p".into(), json!(top_p));
        }
        if let Some(top_k) = self.top_k {
            extra.insert("top_k".into(), json!(top_k));
        }
        if let Some(seed) = self.seed {
            extra.insert("seed".into(), json!(seed));
        }
        match self.num_predict {
            Some(n) if n > 0 => {
                extra.insert("max_tokens".into(), json!(n));
            }
            Some(n) => debug!(num_predict = n, "Non-positive num_predict, leaving max_tokens unset"),
            None => {}
        }
        if let Some(stop) = self.stop.as_ref().filter(|s| !s.is_null()) {
            extra.insert("stop".into(), stop.clone());
        }

        match format {
            Some(Value::String(s)) if s == "json" => {
                extra.insert("response_format".into(), json!({"type": "json_object"}));
            }
            Some(other) if !other.is_null() => {
                debug!("Unsupported format value: {other}; ignoring");
            }
            _ => {}
        }
        extra
    }
}

/// Body of `POST /api/chat`. Streams unless told otherwise.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaChatRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default = "default_true")]
    pub stream: bool,
    #[serde(default)]
    pub options: OllamaOptions,
    #[serde(default)]
    pub format: Option<Value>,
}

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaGenerateRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default = "default_true")]
    pub stream: bool,
    #[serde(default)]
    pub options: OllamaOptions,
    #[serde(default)]
    pub format: Option<Value>,
}

/// Body of `POST /api/embed` and `POST /api/embeddings`. Newer clients send
/// `input`, older ones a single `prompt`.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaEmbedRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub input: Option<EmbeddingInput>,
    #[serde(default)]
    pub prompt: Option<String>,
}

impl OllamaEmbedRequest {
    /// `input` when it holds anything, otherwise `prompt`.
    pub fn into_input(self) -> Option<EmbeddingInput> {
        self.input
            .filter(|input| !input.is_empty())
            .or_else(|| self.prompt.map(EmbeddingInput::Single))
    }
}

/// Body of `POST /api/show`. Older clients send `name`, newer ones `model`.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaShowRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl OllamaShowRequest {
    pub fn effective_model(&self) -> Option<&str> {
        self.model
            .as_deref()
            .or(self.name.as_deref())
            .filter(|m| !m.trim().is_empty())
    }
}

// ── Responses ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct OllamaVersionResponse {
    pub version: String,
}

/// Synthetic counters attached to a finished generation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OllamaTimings {
    pub total_duration: u64,
    pub load_duration: u64,
    pub prompt_eval_count: u32,
    pub prompt_eval_duration: u64,
    pub eval_count: u32,
    pub eval_duration: u64,
}

impl From<Timings> for OllamaTimings {
    fn from(t: Timings) -> Self {
        Self {
            total_duration: t.total_duration,
            load_duration: t.load_duration,
            prompt_eval_count: t.prompt_eval_count,
            prompt_eval_duration: t.prompt_eval_duration,
            eval_count: t.eval_count,
            eval_duration: t.eval_duration,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OllamaChatMessage {
    pub role: String,
    pub content: String,
}

/// One `/api/chat` object, streamed or final.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaChatChunk {
    pub model: String,
    pub created_at: String,
    pub message: OllamaChatMessage,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    #[serde(flatten)]
    pub timings: Option<OllamaTimings>,
}

/// One `/api/generate` object, streamed or final.
#[derive(Debug, Clone, Serialize)]
pub struct OllamaGenerateChunk {
    pub model: String,
    pub created_at: String,
    pub response: String,
    pub done: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub done_reason: Option<String>,
    #[serde(flatten)]
    pub timings: Option<OllamaTimings>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OllamaEmbedResponse {
    pub model: String,
    pub embeddings: Vec<Vec<f64>>,
    pub total_duration: u64,
    pub load_duration: u64,
    pub prompt_eval_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OllamaModelDetails {
    pub parent_model: String,
    pub format: String,
    pub family: String,
    pub families: Vec<String>,
    pub parameter_size: String,
    pub quantization_level: String,
}

impl From<&ModelDescriptor> for OllamaModelDetails {
    fn from(d: &ModelDescriptor) -> Self {
        Self {
            parent_model: String::new(),
            format: "gguf".to_string(),
            family: d.family.clone(),
            families: vec![d.family.clone()],
            parameter_size: d.parameter_size.clone(),
            quantization_level: d.quantization_level.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OllamaModelEntry {
    pub name: String,
    pub model: String,
    pub modified_at: String,
    pub size: u64,
    pub digest: String,
    pub details: OllamaModelDetails,
}

impl From<&ModelDescriptor> for OllamaModelEntry {
    fn from(d: &ModelDescriptor) -> Self {
        Self {
            name: d.name.clone(),
            model: d.name.clone(),
            modified_at: d.modified_at.to_rfc3339(),
            size: d.size_bytes,
            digest: d.digest.clone(),
            details: OllamaModelDetails::from(d),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OllamaTagsResponse {
    pub models: Vec<OllamaModelEntry>,
}

impl OllamaTagsResponse {
    pub fn from_descriptors(descriptors: &[ModelDescriptor]) -> Self {
        Self {
            models: descriptors.iter().map(OllamaModelEntry::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OllamaShowResponse {
    pub modelfile: String,
    pub parameters: String,
    pub template: String,
    pub details: OllamaModelDetails,
    pub model_info: Value,
    pub modified_at: String,
}

impl From<&ModelDescriptor> for OllamaShowResponse {
    fn from(d: &ModelDescriptor) -> Self {
        Self {
            modelfile: format!("FROM {}", d.name),
            parameters: String::new(),
            template: "{{ .Prompt }}".to_string(),
            details: OllamaModelDetails::from(d),
            model_info: json!({ "general.architecture": d.family }),
            modified_at: d.modified_at.to_rfc3339(),
        }
    }
}
