//! Request normalization per upstream style.
//!
//! Each [`UpstreamStyle`] has exactly one [`Dialect`] object that knows how
//! to shape chat, completion and embedding payloads for that upstream and
//! how to read its replies. The dialect is chosen once at startup; no other
//! component branches on the upstream style. Dialects perform no I/O.

mod content_generation;
mod openai;

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use relaylm_core::{
    ChatRequest, CompletionRequest, EmbeddingRequest, FinishReason, RelayConfig, RelayResult,
    UpstreamStyle,
};

pub use content_generation::ContentGenerationDialect;
pub use openai::OpenAiDialect;

/// How the upstream call authenticates.
#[derive(Clone, PartialEq, Eq)]
pub enum UpstreamAuth {
    None,
    /// `Authorization: Bearer <key>`.
    Bearer(String),
    /// `x-goog-api-key: <key>`.
    ApiKeyHeader(String),
}

impl fmt::Debug for UpstreamAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Bearer(_) => f.write_str("Bearer(***)"),
            Self::ApiKeyHeader(_) => f.write_str("ApiKeyHeader(***)"),
        }
    }
}

/// A fully shaped upstream HTTP call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamCall {
    pub url: String,
    pub body: Value,
    pub auth: UpstreamAuth,
    /// Whether the upstream is asked to stream its reply.
    pub stream: bool,
}

/// Text produced by a non-streamed generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    pub content: String,
    pub finish_reason: Option<FinishReason>,
}

/// Payload builder and reply reader for one upstream style.
pub trait Dialect: Send + Sync + fmt::Debug {
    fn style(&self) -> UpstreamStyle;

    /// Shape a chat call. `stream` is ignored by styles that cannot stream.
    fn chat(&self, config: &RelayConfig, request: &ChatRequest, stream: bool) -> UpstreamCall;

    /// Shape a completion call.
    ///
    /// Completions are sent as a single-turn chat by default.
    fn completion(
        &self,
        config: &RelayConfig,
        request: &CompletionRequest,
        stream: bool,
    ) -> UpstreamCall {
        let chat = ChatRequest {
            model: request.model.clone(),
            messages: request.to_messages(),
            stream: request.stream,
            extra_params: request.extra_params.clone(),
        };
        self.chat(config, &chat, stream)
    }

    /// Shape an embedding call.
    fn embedding(&self, config: &RelayConfig, request: &EmbeddingRequest) -> UpstreamCall;

    /// Extract the answer from a non-streamed generation reply.
    fn parse_generation(&self, body: &Value) -> RelayResult<Generation>;

    /// Convert an embedding reply into the OpenAI embeddings shape
    /// (`{"object":"list","data":[{"embedding":[...]}],...}`).
    fn parse_embeddings(&self, body: Value, model: &str) -> RelayResult<Value>;

    /// Whether calls through this dialect may stream.
    fn supports_streaming(&self) -> bool {
        self.style().supports_streaming()
    }
}

/// Select the dialect for a configured upstream style.
pub fn dialect_for(style: UpstreamStyle) -> Arc<dyn Dialect> {
    match style {
        UpstreamStyle::OpenAiCompatible => Arc::new(OpenAiDialect),
        UpstreamStyle::ContentGeneration => Arc::new(ContentGenerationDialect),
    }
}

/// Pull every embedding vector out of an OpenAI-shaped embeddings body.
pub fn embedding_vectors(body: &Value) -> Vec<Vec<f64>> {
    body["data"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| {
                    item["embedding"]
                        .as_array()
                        .map(|values| values.iter().filter_map(Value::as_f64).collect())
                        .unwrap_or_default()
                })
                .collect()
        })
        .unwrap_or_default()
}
