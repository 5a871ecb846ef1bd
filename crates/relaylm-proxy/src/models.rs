//! OpenAI API data models for request/response handling.
//!
//! Domain types live in `relaylm-core`; this module handles the API layer
//! mapping for the `/v1` surface.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use relaylm_core::{ChatMessage, ModelDescriptor, RelayError, Timings};

/// Owner reported for every synthesized model.
pub const MODEL_OWNER: &str = "relaylm";

// =============================================================================
// Requests
// =============================================================================

/// Request to `/v1/chat/completions`.
///
/// Anything beyond the fields the relay reads is kept in `extra` and
/// forwarded to the upstream.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    #[serde(default)]
    pub stream: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Request to `/v1/completions`. `prompt` is a string or a list of strings.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub prompt: Option<Value>,
    #[serde(default)]
    pub stream: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// =============================================================================
// Chat Completion Responses
// =============================================================================

/// Assistant message in a non-streaming reply.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantMessage {
    pub role: String,
    pub content: String,
}

/// Response from `/v1/chat/completions` (non-streaming).
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatChoice {
    pub index: u32,
    pub message: AssistantMessage,
    pub finish_reason: Option<String>,
}

/// Streaming chunk from `/v1/chat/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChunkChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatChunkChoice {
    pub index: u32,
    pub delta: ChatDelta,
    pub finish_reason: Option<String>,
}

/// Delta content in a streaming chunk.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChatDelta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

// =============================================================================
// Text Completion Responses
// =============================================================================

/// Response (or streaming chunk) from `/v1/completions`.
#[derive(Debug, Clone, Serialize)]
pub struct TextCompletionResponse {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<TextChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TextChoice {
    pub index: u32,
    pub text: String,
    pub finish_reason: Option<String>,
}

/// Token usage statistics. Synthetic: the numbers come from the metadata
/// generator, not from the upstream.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl From<Timings> for Usage {
    fn from(t: Timings) -> Self {
        Self {
            prompt_tokens: t.prompt_eval_count,
            completion_tokens: t.eval_count,
            total_tokens: t.total_tokens(),
        }
    }
}

// =============================================================================
// Models Endpoint Types
// =============================================================================

/// Response from `/v1/models`.
#[derive(Debug, Clone, Serialize)]
pub struct ModelsResponse {
    pub object: String,
    pub data: Vec<ModelInfo>,
}

impl ModelsResponse {
    pub fn from_descriptors(descriptors: &[ModelDescriptor]) -> Self {
        Self {
            object: "list".to_string(),
            data: descriptors.iter().map(ModelInfo::from).collect(),
        }
    }
}

/// Information about a single model (OpenAI format).
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

impl From<&ModelDescriptor> for ModelInfo {
    fn from(d: &ModelDescriptor) -> Self {
        Self {
            id: d.name.clone(),
            object: "model".to_string(),
            created: d.modified_at.timestamp(),
            owned_by: MODEL_OWNER.to_string(),
        }
    }
}

// =============================================================================
// Error Response Types
// =============================================================================

/// Error response matching OpenAI format.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Error detail within an error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetail {
    pub message: String,
    pub r#type: String,
    pub code: Option<String>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(message: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                r#type: error_type.into(),
                code: None,
            },
        }
    }

    /// Create an error response with a code.
    pub fn with_code(
        message: impl Into<String>,
        error_type: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorDetail {
                message: message.into(),
                r#type: error_type.into(),
                code: Some(code.into()),
            },
        }
    }
}

impl From<&RelayError> for ErrorResponse {
    fn from(err: &RelayError) -> Self {
        let code = match err {
            RelayError::UpstreamRateLimited(_) => Some("rate_limit_exceeded"),
            RelayError::Upstream { .. } => Some("upstream_error"),
            _ => None,
        };
        let mut response = Self::new(err.to_string(), err.error_type());
        response.error.code = code.map(str::to_string);
        response
    }
}
