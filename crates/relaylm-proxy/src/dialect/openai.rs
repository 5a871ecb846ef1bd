//! OpenAI-compatible upstream payloads.

use serde_json::{Map, Value, json};

use relaylm_core::{
    ChatRequest, EmbeddingRequest, FinishReason, RelayConfig, RelayError, RelayResult,
    UpstreamStyle,
};

use super::{Dialect, Generation, UpstreamAuth, UpstreamCall};

/// `/chat/completions` and `/embeddings` with bearer auth.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenAiDialect;

impl OpenAiDialect {
    fn url(config: &RelayConfig, endpoint: &str) -> String {
        format!("{}/{endpoint}", config.api_root("v1"))
    }

    fn auth(config: &RelayConfig) -> UpstreamAuth {
        config
            .api_key()
            .map_or(UpstreamAuth::None, |key| UpstreamAuth::Bearer(key.to_string()))
    }
}

/// Merge extra parameters over a payload. Extras win, except for the keys
/// the relay owns.
fn merge_extra(body: &mut Value, extra: &Map<String, Value>) {
    const RESERVED: [&str; 3] = ["model", "messages", "stream"];
    if let Some(object) = body.as_object_mut() {
        for (key, value) in extra {
            if !RESERVED.contains(&key.as_str()) {
                object.insert(key.clone(), value.clone());
            }
        }
    }
}

impl Dialect for OpenAiDialect {
    fn style(&self) -> UpstreamStyle {
        UpstreamStyle::OpenAiCompatible
    }

    fn chat(&self, config: &RelayConfig, request: &ChatRequest, stream: bool) -> UpstreamCall {
        let mut body = json!({
            "model": request.model,
            "messages": request.messages,
            "stream": stream,
            "max_tokens": config.default_max_tokens(),
        });
        merge_extra(&mut body, &request.extra_params);

        UpstreamCall {
            url: Self::url(config, "chat/completions"),
            body,
            auth: Self::auth(config),
            stream,
        }
    }

    fn embedding(&self, config: &RelayConfig, request: &EmbeddingRequest) -> UpstreamCall {
        let mut body = json!({
            "model": request.model,
            "input": request.input,
        });
        merge_extra(&mut body, &request.extra_params);

        UpstreamCall {
            url: Self::url(config, "embeddings"),
            body,
            auth: Self::auth(config),
            stream: false,
        }
    }

    fn parse_generation(&self, body: &Value) -> RelayResult<Generation> {
        let choice = body["choices"]
            .get(0)
            .ok_or_else(|| RelayError::upstream("upstream response contains no choices"))?;

        let content = choice["message"]["content"]
            .as_str()
            .or_else(|| choice["text"].as_str())
            .unwrap_or_default()
            .to_string();

        Ok(Generation {
            content,
            finish_reason: choice["finish_reason"].as_str().map(FinishReason::parse),
        })
    }

    fn parse_embeddings(&self, mut body: Value, model: &str) -> RelayResult<Value> {
        if !body["data"].is_array() {
            return Err(RelayError::upstream(
                "upstream embedding response contains no data",
            ));
        }
        // Forwarded as-is apart from reporting the effective model.
        body["model"] = json!(model);
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaylm_core::{ChatMessage, EmbeddingInput, MessageRole};

    fn config() -> RelayConfig {
        RelayConfig::builder("https://api.example.com/v1")
            .with_api_key("sk-test")
            .build()
            .unwrap()
    }

    fn chat(extra: Map<String, Value>) -> ChatRequest {
        ChatRequest {
            model: "m1".into(),
            messages: vec![ChatMessage::new(MessageRole::User, "hi")],
            stream: true,
            extra_params: extra,
        }
    }

    #[test]
    fn chat_payload_has_defaults_and_bearer_auth() {
        let call = OpenAiDialect.chat(&config(), &chat(Map::new()), true);
        assert_eq!(call.url, "https://api.example.com/v1/chat/completions");
        assert_eq!(call.auth, UpstreamAuth::Bearer("sk-test".into()));
        assert!(call.stream);
        assert_eq!(call.body["model"], "m1");
        assert_eq!(call.body["stream"], true);
        assert_eq!(call.body["max_tokens"], 4096);
        assert_eq!(call.body["messages"][0]["role"], "user");
        assert_eq!(call.body["messages"][0]["content"], "hi");
    }

    #[test]
    fn extra_params_override_max_tokens_but_not_model() {
        let mut extra = Map::new();
        extra.insert("max_tokens".into(), json!(16));
        extra.insert("temperature".into(), json!(0.2));
        extra.insert("model".into(), json!("sneaky"));

        let call = OpenAiDialect.chat(&config(), &chat(extra), false);
        assert_eq!(call.body["max_tokens"], 16);
        assert_eq!(call.body["temperature"], 0.2);
        assert_eq!(call.body["model"], "m1");
        assert_eq!(call.body["stream"], false);
    }

    #[test]
    fn bare_host_gets_v1_root() {
        let config = RelayConfig::builder("http://localhost:8080").build().unwrap();
        let call = OpenAiDialect.chat(&config, &chat(Map::new()), false);
        assert_eq!(call.url, "http://localhost:8080/v1/chat/completions");
        assert_eq!(call.auth, UpstreamAuth::None);
    }

    #[test]
    fn embedding_forwards_batches() {
        let request = EmbeddingRequest {
            model: "embed".into(),
            input: EmbeddingInput::Batch(vec!["a".into(), "b".into()]),
            extra_params: Map::new(),
        };
        let call = OpenAiDialect.embedding(&config(), &request);
        assert_eq!(call.url, "https://api.example.com/v1/embeddings");
        assert_eq!(call.body["input"], json!(["a", "b"]));
    }

    #[test]
    fn parses_message_or_text_choices() {
        let chat = json!({"choices": [{"message": {"content": "hello"}, "finish_reason": "stop"}]});
        let generation = OpenAiDialect.parse_generation(&chat).unwrap();
        assert_eq!(generation.content, "hello");
        assert_eq!(generation.finish_reason, Some(FinishReason::Stop));

        let text = json!({"choices": [{"text": "legacy"}]});
        assert_eq!(OpenAiDialect.parse_generation(&text).unwrap().content, "legacy");

        assert!(OpenAiDialect.parse_generation(&json!({"error": "x"})).is_err());
    }

    #[test]
    fn embeddings_pass_through_with_effective_model() {
        let body = json!({"object": "list", "data": [{"embedding": [0.1]}], "model": "upstream"});
        let out = OpenAiDialect.parse_embeddings(body, "local").unwrap();
        assert_eq!(out["model"], "local");
        assert_eq!(out["data"][0]["embedding"][0], 0.1);
    }
}
