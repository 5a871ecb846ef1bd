//! Content-generation upstream payloads (`generateContent` / `embedContent`).
//!
//! This style has no system role and never streams. Sampling parameters
//! arrive in OpenAI spelling and are moved into `generationConfig`.

use serde_json::{Map, Value, json};
use tracing::warn;

use relaylm_core::{
    ChatRequest, EmbeddingInput, EmbeddingRequest, FinishReason, MessageRole, RelayConfig,
    RelayError, RelayResult, UpstreamStyle,
};

use super::{Dialect, Generation, UpstreamAuth, UpstreamCall};

#[derive(Debug, Clone, Copy, Default)]
pub struct ContentGenerationDialect;

impl ContentGenerationDialect {
    fn url(config: &RelayConfig, model: &str, operation: &str) -> String {
        format!(
            "{}/models/{}:{operation}",
            config.api_root("v1beta"),
            bare_model(model)
        )
    }

    fn auth(config: &RelayConfig) -> UpstreamAuth {
        config
            .api_key()
            .map_or(UpstreamAuth::None, |key| UpstreamAuth::ApiKeyHeader(key.to_string()))
    }
}

fn bare_model(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

const fn upstream_role(role: MessageRole) -> &'static str {
    match role {
        MessageRole::Assistant => "model",
        MessageRole::System | MessageRole::User => "user",
    }
}

/// Translate OpenAI-spelled parameters into a `generationConfig` object.
fn generation_config(extra: &Map<String, Value>) -> Map<String, Value> {
    let mut config = Map::new();
    for (key, value) in extra {
        match key.as_str() {
            "temperature" | "seed" => {
                config.insert(key.clone(), value.clone());
            }
            "top_p" => {
                config.insert("topP".into(), value.clone());
            }
            "top_k" => {
                config.insert("topK".into(), value.clone());
            }
            "max_tokens" => {
                config.insert("maxOutputTokens".into(), value.clone());
            }
            "stop" => {
                let stops = if value.is_string() {
                    json!([value])
                } else {
                    value.clone()
                };
                config.insert("stopSequences".into(), stops);
            }
            "response_format" => {
                if value["type"] == "json_object" {
                    config.insert("responseMimeType".into(), json!("application/json"));
                }
            }
            _ => {}
        }
    }
    config
}

impl Dialect for ContentGenerationDialect {
    fn style(&self) -> UpstreamStyle {
        UpstreamStyle::ContentGeneration
    }

    fn chat(&self, config: &RelayConfig, request: &ChatRequest, _stream: bool) -> UpstreamCall {
        let contents: Vec<Value> = request
            .messages
            .iter()
            .map(|message| {
                json!({
                    "role": upstream_role(message.role),
                    "parts": [{ "text": message.content.to_text() }],
                })
            })
            .collect();

        let mut body = json!({ "contents": contents });
        let generation = generation_config(&request.extra_params);
        if !generation.is_empty() {
            body["generationConfig"] = Value::Object(generation);
        }

        UpstreamCall {
            url: Self::url(config, &request.model, "generateContent"),
            body,
            auth: Self::auth(config),
            stream: false,
        }
    }

    fn embedding(&self, config: &RelayConfig, request: &EmbeddingRequest) -> UpstreamCall {
        if let EmbeddingInput::Batch(items) = &request.input {
            if items.len() > 1 {
                warn!(
                    inputs = items.len(),
                    "Batched embedding input is not supported by this upstream, using the first item"
                );
            }
        }
        let text = request.input.first().unwrap_or_default();

        UpstreamCall {
            url: Self::url(config, &request.model, "embedContent"),
            body: json!({
                "model": format!("models/{}", bare_model(&request.model)),
                "content": { "parts": [{ "text": text }] },
            }),
            auth: Self::auth(config),
            stream: false,
        }
    }

    fn parse_generation(&self, body: &Value) -> RelayResult<Generation> {
        let candidate = body["candidates"]
            .get(0)
            .ok_or_else(|| RelayError::upstream("upstream response contains no candidates"))?;

        let content = candidate["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|part| part["text"].as_str())
                    .collect::<String>()
            })
            .unwrap_or_default();

        Ok(Generation {
            content,
            finish_reason: candidate["finishReason"].as_str().map(FinishReason::parse),
        })
    }

    fn parse_embeddings(&self, body: Value, model: &str) -> RelayResult<Value> {
        let values = body["embedding"]["values"]
            .as_array()
            .cloned()
            .ok_or_else(|| RelayError::upstream("upstream embedding response contains no values"))?;

        Ok(json!({
            "object": "list",
            "data": [{ "object": "embedding", "index": 0, "embedding": values }],
            "model": model,
            "usage": { "prompt_tokens": 0, "total_tokens": 0 },
        }))
    }
}
