//! Upstream style and surface protocol classification.

use std::fmt;

use url::Url;

/// Host serving the content-generation protocol.
pub const CONTENT_GENERATION_HOST: &str = "generativelanguage.googleapis.com";

/// Wire protocol spoken by the single configured upstream.
///
/// Derived once from the upstream base URL when the configuration is built
/// and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpstreamStyle {
    /// `/chat/completions`, `/embeddings` with bearer auth and SSE streaming.
    OpenAiCompatible,
    /// `models/{model}:generateContent` / `:embedContent`, never streamed.
    ContentGeneration,
}

impl UpstreamStyle {
    /// Classify an upstream by its host.
    #[must_use]
    pub fn from_base_url(url: &Url) -> Self {
        match url.host_str() {
            Some(host)
                if host.eq_ignore_ascii_case(CONTENT_GENERATION_HOST)
                    || host
                        .to_ascii_lowercase()
                        .ends_with(&format!(".{CONTENT_GENERATION_HOST}")) =>
            {
                Self::ContentGeneration
            }
            _ => Self::OpenAiCompatible,
        }
    }

    /// Whether this upstream can deliver incremental SSE chunks.
    #[must_use]
    pub const fn supports_streaming(self) -> bool {
        matches!(self, Self::OpenAiCompatible)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OpenAiCompatible => "openai",
            Self::ContentGeneration => "content-generation",
        }
    }

    /// Inverse of [`as_str`](Self::as_str), case-insensitive.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        [Self::OpenAiCompatible, Self::ContentGeneration]
            .into_iter()
            .find(|style| style.as_str().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for UpstreamStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wire contract the inbound client expects, chosen by the endpoint path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceProtocol {
    /// `/api/*` routes: NDJSON streaming, `done` flags, nanosecond timings.
    LocalRunner,
    /// `/v1/*` routes: SSE streaming, `chat.completion.chunk` objects.
    OpenAiCompatible,
}

impl SurfaceProtocol {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LocalRunner => "local-runner",
            Self::OpenAiCompatible => "openai",
        }
    }
}

impl fmt::Display for SurfaceProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of generation call, which decides the shape of emitted frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Chat,
    Completion,
}
