//! Internal stream frame, one per upstream delta chunk.

use std::fmt;

/// Why the upstream stopped generating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    Other(String),
}

impl FinishReason {
    /// Parse an upstream finish reason.
    ///
    /// Content-generation reasons (`STOP`, `MAX_TOKENS`, `SAFETY`) map onto
    /// the same variants as their OpenAI-style equivalents.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "stop" | "STOP" => Self::Stop,
            "length" | "MAX_TOKENS" => Self::Length,
            "content_filter" | "SAFETY" | "RECITATION" => Self::ContentFilter,
            "tool_calls" | "function_call" => Self::ToolCalls,
            other => Self::Other(other.to_string()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ContentFilter => "content_filter",
            Self::ToolCalls => "tool_calls",
            Self::Other(other) => other,
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded upstream delta.
///
/// Ephemeral: owned by the stream translator of a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamFrame {
    pub role: Option<String>,
    pub content_delta: String,
    pub finish_reason: Option<FinishReason>,
}

impl StreamFrame {
    #[must_use]
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            role: None,
            content_delta: text.into(),
            finish_reason: None,
        }
    }
}
