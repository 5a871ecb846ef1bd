//! Generic request records shared by both surface protocols.
//!
//! Handlers parse their surface-specific bodies into these types; the
//! upstream dialects only ever see these.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    /// Convert role to string representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Message content: plain text or any structured JSON (e.g. content parts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Structured(Value),
}

impl MessageContent {
    /// Render the content as a single text string.
    ///
    /// Structured content is serialized to its JSON text.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(Value::String(text)) => text.clone(),
            Self::Structured(value) => value.to_string(),
        }
    }
}

impl Default for MessageContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for MessageContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    #[serde(default)]
    pub content: MessageContent,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.into()),
        }
    }
}

/// A chat call after model resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    /// Effective model name sent upstream.
    pub model: String,
    /// Ordered, non-empty conversation.
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    /// Extra upstream parameters merged verbatim into the payload.
    pub extra_params: Map<String, Value>,
}

/// A single-prompt completion call after model resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub prompt: String,
    /// Optional system instruction placed before the prompt.
    pub system: Option<String>,
    pub stream: bool,
    pub extra_params: Map<String, Value>,
}

impl CompletionRequest {
    /// Expand the prompt into the equivalent chat conversation.
    #[must_use]
    pub fn to_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = self.system.as_deref().filter(|s| !s.is_empty()) {
            messages.push(ChatMessage::new(MessageRole::System, system));
        }
        messages.push(ChatMessage::new(MessageRole::User, self.prompt.clone()));
        messages
    }
}

/// Embedding input: one string or a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EmbeddingInput {
    Single(String),
    Batch(Vec<String>),
}

impl EmbeddingInput {
    /// The first (or only) input string.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            Self::Single(text) => Some(text),
            Self::Batch(items) => items.first().map(String::as_str),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(_) => false,
            Self::Batch(items) => items.is_empty(),
        }
    }
}

/// An embedding call after model resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingRequest {
    pub model: String,
    pub input: EmbeddingInput,
    pub extra_params: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn structured_content_renders_as_json_text() {
        let content: MessageContent =
            serde_json::from_value(json!([{"text": "hi"}])).unwrap();
        assert_eq!(content.to_text(), r#"[{"text":"hi"}]"#);

        let plain: MessageContent = serde_json::from_value(json!("hello")).unwrap();
        assert_eq!(plain, MessageContent::Text("hello".into()));
        assert_eq!(plain.to_text(), "hello");
    }

    #[test]
    fn unknown_role_is_rejected() {
        let result: Result<ChatMessage, _> =
            serde_json::from_value(json!({"role": "wizard", "content": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn completion_with_system_expands_to_two_messages() {
        let req = CompletionRequest {
            model: "m".into(),
            prompt: "why?".into(),
            system: Some("be brief".into()),
            stream: false,
            extra_params: Map::new(),
        };
        let messages = req.to_messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[1].content.to_text(), "why?");
    }

    #[test]
    fn embedding_input_accepts_string_or_list() {
        let single: EmbeddingInput = serde_json::from_value(json!("a")).unwrap();
        assert_eq!(single.first(), Some("a"));
        assert!(!single.is_empty());

        let batch: EmbeddingInput = serde_json::from_value(json!(["a", "b"])).unwrap();
        assert_eq!(batch.first(), Some("a"));
        assert!(!batch.is_empty());
        assert!(EmbeddingInput::Batch(vec![]).is_empty());
    }
}
