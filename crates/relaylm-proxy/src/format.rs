//! Surface response formatting.
//!
//! A [`SurfaceFormatter`] is created per request. It renders stream frames
//! and final bodies in the envelope of the surface the client called, and
//! fills in the timing and usage fields the upstream never supplies.

use std::sync::Arc;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use relaylm_core::{CallKind, FinishReason, StreamFrame, SurfaceProtocol, SyntheticMetadata};

use crate::dialect::Generation;
use crate::models::{
    AssistantMessage, ChatChoice, ChatChunkChoice, ChatCompletionChunk, ChatCompletionResponse,
    ChatDelta, TextChoice, TextCompletionResponse, Usage,
};
use crate::ollama_models::{OllamaChatChunk, OllamaChatMessage, OllamaGenerateChunk, OllamaTimings};

/// Literal end-of-stream sentinel of the SSE wire format.
pub const DONE_SENTINEL: &str = "[DONE]";

const ASSISTANT: &str = "assistant";

/// Renders frames and bodies for one request.
#[derive(Debug, Clone)]
pub struct SurfaceFormatter {
    surface: SurfaceProtocol,
    kind: CallKind,
    model: String,
    id: String,
    metadata: Arc<dyn SyntheticMetadata>,
}

impl SurfaceFormatter {
    pub fn new(
        surface: SurfaceProtocol,
        kind: CallKind,
        model: impl Into<String>,
        metadata: Arc<dyn SyntheticMetadata>,
    ) -> Self {
        Self {
            surface,
            kind,
            model: model.into(),
            id: metadata.completion_id(),
            metadata,
        }
    }

    pub const fn surface(&self) -> SurfaceProtocol {
        self.surface
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Content type of a streamed reply on this surface.
    pub const fn stream_content_type(&self) -> &'static str {
        match self.surface {
            SurfaceProtocol::LocalRunner => "application/x-ndjson",
            SurfaceProtocol::OpenAiCompatible => "text/event-stream",
        }
    }

    /// One frame for one upstream delta.
    pub fn delta_frame(&self, frame: &StreamFrame) -> Bytes {
        match self.surface {
            SurfaceProtocol::LocalRunner => self.local_frame(
                frame.role.as_deref().unwrap_or(ASSISTANT),
                &frame.content_delta,
                false,
                None,
                None,
            ),
            SurfaceProtocol::OpenAiCompatible => self.openai_frame(
                frame.role.clone(),
                Some(frame.content_delta.clone()),
                frame.finish_reason.as_ref().map(|r| r.as_str().to_string()),
                None,
            ),
        }
    }

    /// The single frame closing a stream, with synthetic counters.
    ///
    /// `reason` is the upstream's finish reason, `stop` when it gave none.
    /// On the OpenAI surface this also carries the `[DONE]` sentinel line;
    /// the local runner signals completion with `done: true` alone.
    pub fn terminal_frame(&self, reason: Option<&FinishReason>) -> Bytes {
        let reason = reason.unwrap_or(&FinishReason::Stop).as_str().to_string();
        let timings = self.metadata.timings();
        match self.surface {
            SurfaceProtocol::LocalRunner => self.local_frame(
                ASSISTANT,
                "",
                true,
                Some(reason),
                Some(timings.into()),
            ),
            SurfaceProtocol::OpenAiCompatible => {
                let chunk = self.openai_frame(
                    None,
                    None,
                    Some(reason),
                    Some(timings.into()),
                );
                let mut out = Vec::with_capacity(chunk.len() + 16);
                out.extend_from_slice(&chunk);
                out.extend_from_slice(format!("data: {DONE_SENTINEL}\n\n").as_bytes());
                Bytes::from(out)
            }
        }
    }

    /// Frames for a stream synthesized from a single non-streamed answer.
    pub fn one_shot_frames(&self, generation: &Generation) -> Vec<Bytes> {
        let delta = StreamFrame {
            role: Some(ASSISTANT.to_string()),
            content_delta: generation.content.clone(),
            finish_reason: None,
        };
        vec![
            self.delta_frame(&delta),
            self.terminal_frame(generation.finish_reason.as_ref()),
        ]
    }

    /// Complete non-streaming body.
    pub fn response_body(&self, generation: &Generation) -> Value {
        let timings = self.metadata.timings();
        let finish_reason = generation
            .finish_reason
            .as_ref()
            .unwrap_or(&FinishReason::Stop)
            .as_str()
            .to_string();
        let created_at = self.metadata.now().to_rfc3339();

        match (self.surface, self.kind) {
            (SurfaceProtocol::LocalRunner, CallKind::Chat) => to_value(&OllamaChatChunk {
                model: self.model.clone(),
                created_at,
                message: OllamaChatMessage {
                    role: ASSISTANT.to_string(),
                    content: generation.content.clone(),
                },
                done: true,
                done_reason: Some(finish_reason),
                timings: Some(timings.into()),
            }),
            (SurfaceProtocol::LocalRunner, CallKind::Completion) => to_value(&OllamaGenerateChunk {
                model: self.model.clone(),
                created_at,
                response: generation.content.clone(),
                done: true,
                done_reason: Some(finish_reason),
                timings: Some(timings.into()),
            }),
            (SurfaceProtocol::OpenAiCompatible, CallKind::Chat) => {
                to_value(&ChatCompletionResponse {
                    id: self.id.clone(),
                    object: "chat.completion".to_string(),
                    created: self.created(),
                    model: self.model.clone(),
                    choices: vec![ChatChoice {
                        index: 0,
                        message: AssistantMessage {
                            role: ASSISTANT.to_string(),
                            content: generation.content.clone(),
                        },
                        finish_reason: Some(finish_reason),
                    }],
                    usage: timings.into(),
                })
            }
            (SurfaceProtocol::OpenAiCompatible, CallKind::Completion) => {
                to_value(&TextCompletionResponse {
                    id: self.id.clone(),
                    object: "text_completion".to_string(),
                    created: self.created(),
                    model: self.model.clone(),
                    choices: vec![TextChoice {
                        index: 0,
                        text: generation.content.clone(),
                        finish_reason: Some(finish_reason),
                    }],
                    usage: Some(timings.into()),
                })
            }
        }
    }

    fn created(&self) -> i64 {
        self.metadata.now().timestamp()
    }

    fn local_frame(
        &self,
        role: &str,
        content: &str,
        done: bool,
        done_reason: Option<String>,
        timings: Option<OllamaTimings>,
    ) -> Bytes {
        let created_at = self.metadata.now().to_rfc3339();
        let line = match self.kind {
            CallKind::Chat => serde_json::to_string(&OllamaChatChunk {
                model: self.model.clone(),
                created_at,
                message: OllamaChatMessage {
                    role: role.to_string(),
                    content: content.to_string(),
                },
                done,
                done_reason,
                timings,
            }),
            CallKind::Completion => serde_json::to_string(&OllamaGenerateChunk {
                model: self.model.clone(),
                created_at,
                response: content.to_string(),
                done,
                done_reason,
                timings,
            }),
        };

        let mut out = line.unwrap_or_default();
        out.push('\n');
        Bytes::from(out)
    }

    fn openai_frame(
        &self,
        role: Option<String>,
        content: Option<String>,
        finish_reason: Option<String>,
        usage: Option<Usage>,
    ) -> Bytes {
        let json = match self.kind {
            CallKind::Chat => serde_json::to_string(&ChatCompletionChunk {
                id: self.id.clone(),
                object: "chat.completion.chunk".to_string(),
                created: self.created(),
                model: self.model.clone(),
                choices: vec![ChatChunkChoice {
                    index: 0,
                    delta: ChatDelta { role, content },
                    finish_reason,
                }],
                usage,
            }),
            CallKind::Completion => serde_json::to_string(&TextCompletionResponse {
                id: self.id.clone(),
                object: "text_completion".to_string(),
                created: self.created(),
                model: self.model.clone(),
                choices: vec![TextChoice {
                    index: 0,
                    text: content.unwrap_or_default(),
                    finish_reason,
                }],
                usage,
            }),
        };

        Bytes::from(format!("data: {}\n\n", json.unwrap_or_default()))
    }
}

fn to_value<T: Serialize>(body: &T) -> Value {
    serde_json::to_value(body).unwrap_or_else(|e| {
        warn!("Failed to serialize response body: {e}");
        Value::Null
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaylm_core::FixedMetadata;

    fn formatter(surface: SurfaceProtocol, kind: CallKind) -> SurfaceFormatter {
        SurfaceFormatter::new(surface, kind, "m1", Arc::new(FixedMetadata))
    }

    fn text(bytes: &Bytes) -> &str {
        std::str::from_utf8(bytes).unwrap()
    }

    #[test]
    fn local_delta_is_one_ndjson_line() {
        let f = formatter(SurfaceProtocol::LocalRunner, CallKind::Chat);
        let out = f.delta_frame(&StreamFrame::content("hel"));
        let line = text(&out);
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        let value: Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(value["message"]["content"], "hel");
        assert_eq!(value["message"]["role"], "assistant");
        assert_eq!(value["done"], false);
        assert_eq!(value["model"], "m1");
        assert_eq!(value["created_at"], "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn openai_delta_is_sse_chunk() {
        let f = formatter(SurfaceProtocol::OpenAiCompatible, CallKind::Chat);
        let out = f.delta_frame(&StreamFrame::content("hel"));
        let event = text(&out);
        assert!(event.starts_with("data: "));
        assert!(event.ends_with("\n\n"));

        let value: Value = serde_json::from_str(event.trim_start_matches("data: ").trim()).unwrap();
        assert_eq!(value["object"], "chat.completion.chunk");
        assert_eq!(value["id"], "chatcmpl-fixed");
        assert_eq!(value["choices"][0]["delta"]["content"], "hel");
        assert!(value["choices"][0]["finish_reason"].is_null());
    }

    #[test]
    fn local_terminal_frame_is_done_with_timings() {
        let f = formatter(SurfaceProtocol::LocalRunner, CallKind::Completion);
        let out = f.terminal_frame(None);
        assert!(!text(&out).contains(DONE_SENTINEL));

        let value: Value = serde_json::from_str(text(&out).trim()).unwrap();
        assert_eq!(value["done"], true);
        assert_eq!(value["done_reason"], "stop");
        assert_eq!(value["response"], "");
        assert_eq!(value["total_duration"], 2_000_000_000_u64);
        assert_eq!(value["eval_count"], 34);
    }

    #[test]
    fn openai_terminal_frame_ends_with_sentinel() {
        let f = formatter(SurfaceProtocol::OpenAiCompatible, CallKind::Chat);
        let out = f.terminal_frame(None);
        let body = text(&out);
        assert!(body.ends_with("data: [DONE]\n\n"));

        let first = body.split("\n\n").next().unwrap();
        let value: Value = serde_json::from_str(first.trim_start_matches("data: ")).unwrap();
        assert_eq!(value["choices"][0]["finish_reason"], "stop");
        assert_eq!(value["usage"]["total_tokens"], 46);
    }

    #[test]
    fn completion_chunks_use_text_field() {
        let f = formatter(SurfaceProtocol::OpenAiCompatible, CallKind::Completion);
        let out = f.delta_frame(&StreamFrame::content("abc"));
        let value: Value =
            serde_json::from_str(text(&out).trim_start_matches("data: ").trim()).unwrap();
        assert_eq!(value["object"], "text_completion");
        assert_eq!(value["choices"][0]["text"], "abc");
    }

    #[test]
    fn non_streaming_bodies_match_surface() {
        let generation = Generation {
            content: "hello".into(),
            finish_reason: Some(FinishReason::Length),
        };

        let local = formatter(SurfaceProtocol::LocalRunner, CallKind::Chat).response_body(&generation);
        assert_eq!(local["message"]["content"], "hello");
        assert_eq!(local["done"], true);
        assert_eq!(local["done_reason"], "length");
        assert!(local["total_duration"].as_u64().unwrap() > 0);

        let openai =
            formatter(SurfaceProtocol::OpenAiCompatible, CallKind::Chat).response_body(&generation);
        assert_eq!(openai["object"], "chat.completion");
        assert_eq!(openai["choices"][0]["message"]["content"], "hello");
        assert_eq!(openai["choices"][0]["finish_reason"], "length");
        assert_eq!(openai["usage"]["prompt_tokens"], 12);

        let generate =
            formatter(SurfaceProtocol::LocalRunner, CallKind::Completion).response_body(&generation);
        assert_eq!(generate["response"], "hello");
    }

    #[test]
    fn one_shot_is_delta_then_terminal() {
        let f = formatter(SurfaceProtocol::LocalRunner, CallKind::Chat);
        let frames = f.one_shot_frames(&Generation {
            content: "all at once".into(),
            finish_reason: None,
        });
        assert_eq!(frames.len(), 2);
        assert!(text(&frames[0]).contains("all at once"));
        assert!(text(&frames[1]).contains("\"done\":true"));
    }

    #[test]
    fn one_shot_terminal_keeps_upstream_finish_reason() {
        let truncated = Generation {
            content: "cut".into(),
            finish_reason: Some(FinishReason::parse("MAX_TOKENS")),
        };

        let local = formatter(SurfaceProtocol::LocalRunner, CallKind::Chat).one_shot_frames(&truncated);
        let value: Value = serde_json::from_str(text(&local[1]).trim()).unwrap();
        assert_eq!(value["done_reason"], "length");

        let openai =
            formatter(SurfaceProtocol::OpenAiCompatible, CallKind::Chat).one_shot_frames(&truncated);
        let first = text(&openai[1]).split("\n\n").next().unwrap();
        let value: Value = serde_json::from_str(first.trim_start_matches("data: ")).unwrap();
        assert_eq!(value["choices"][0]["finish_reason"], "length");
        assert!(text(&openai[1]).ends_with("data: [DONE]\n\n"));
    }
}
