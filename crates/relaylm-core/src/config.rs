//! Immutable process configuration.
//!
//! Built once at startup from plain key/value inputs and shared behind an
//! `Arc` by every component. Nothing here is mutated after `build()`.
//!
//! # Example
//!
//! ```
//! use relaylm_core::{RelayConfig, UpstreamStyle};
//!
//! let config = RelayConfig::builder("https://generativelanguage.googleapis.com/v1beta")
//!     .with_api_key("secret")
//!     .with_models(vec!["gemini-1.5-flash".to_string()])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.upstream_style(), UpstreamStyle::ContentGeneration);
//! ```

use std::time::Duration;

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::domain::UpstreamStyle;
use crate::resolver::ModelResolver;

/// Default `max_tokens` sent to OpenAI-compatible upstreams.
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Bounded timeout for calls that do not stream.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Errors raised while building the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid upstream URL '{url}': {source}")]
    InvalidUpstreamUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Upstream URL must use http or https, got '{0}'")]
    UnsupportedScheme(String),
}

/// Bounded retry policy for upstream rate limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub max_attempts: u32,
    /// Fixed wait between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(5),
        }
    }
}

/// Process-wide configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    upstream_base_url: Url,
    upstream_style: UpstreamStyle,
    api_key: Option<String>,
    resolver: ModelResolver,
    models: Vec<String>,
    default_max_tokens: u32,
    request_timeout: Duration,
    retry: RetryPolicy,
}

impl RelayConfig {
    /// Start building a configuration for the given upstream.
    pub fn builder(upstream_base_url: impl Into<String>) -> RelayConfigBuilder {
        RelayConfigBuilder::new(upstream_base_url)
    }

    /// Upstream base URL without a trailing slash.
    #[must_use]
    pub fn upstream_base_url(&self) -> &str {
        self.upstream_base_url.as_str().trim_end_matches('/')
    }

    /// Root under which upstream endpoints live.
    ///
    /// A bare host (`https://api.example.com`) gets `default_version`
    /// appended; a URL that already carries a path is used as-is.
    #[must_use]
    pub fn api_root(&self, default_version: &str) -> String {
        let base = self.upstream_base_url();
        if self.upstream_base_url.path().trim_matches('/').is_empty() {
            format!("{base}/{}", default_version.trim_matches('/'))
        } else {
            base.to_string()
        }
    }

    #[must_use]
    pub const fn upstream_style(&self) -> UpstreamStyle {
        self.upstream_style
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    #[must_use]
    pub const fn resolver(&self) -> &ModelResolver {
        &self.resolver
    }

    /// Static catalog of model names.
    ///
    /// Falls back to the override and default model when no list was
    /// configured, so `/api/tags` is never empty for a usable setup.
    #[must_use]
    pub fn catalog(&self) -> Vec<String> {
        if !self.models.is_empty() {
            return self.models.clone();
        }
        let mut names = Vec::with_capacity(2);
        for name in [self.resolver.model_override(), self.resolver.default_model()]
            .into_iter()
            .flatten()
        {
            if !names.iter().any(|n| n == name) {
                names.push(name.to_string());
            }
        }
        names
    }

    /// Whether a model name is part of the catalog.
    #[must_use]
    pub fn has_model(&self, name: &str) -> bool {
        let name = crate::resolver::normalize_model_name(name);
        self.catalog().iter().any(|m| m == name)
    }

    #[must_use]
    pub const fn default_max_tokens(&self) -> u32 {
        self.default_max_tokens
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    #[must_use]
    pub const fn retry(&self) -> RetryPolicy {
        self.retry
    }
}

/// Builder for [`RelayConfig`].
#[derive(Debug, Clone)]
pub struct RelayConfigBuilder {
    upstream_base_url: String,
    api_key: Option<String>,
    model_override: Option<String>,
    default_model: Option<String>,
    models: Vec<String>,
    default_max_tokens: u32,
    request_timeout: Duration,
    retry: RetryPolicy,
    upstream_style: Option<UpstreamStyle>,
}

impl RelayConfigBuilder {
    fn new(upstream_base_url: impl Into<String>) -> Self {
        Self {
            upstream_base_url: upstream_base_url.into(),
            api_key: None,
            model_override: None,
            default_model: None,
            models: Vec::new(),
            default_max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            retry: RetryPolicy::default(),
            upstream_style: None,
        }
    }

    /// Set the upstream credential.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set an optional upstream credential.
    #[must_use]
    pub fn with_optional_api_key(mut self, key: Option<String>) -> Self {
        self.api_key = key.filter(|k| !k.is_empty());
        self
    }

    /// Force every request onto this model.
    #[must_use]
    pub fn with_model_override(mut self, model: Option<String>) -> Self {
        self.model_override = model.filter(|m| !m.is_empty());
        self
    }

    /// Model used when a request names none.
    #[must_use]
    pub fn with_default_model(mut self, model: Option<String>) -> Self {
        self.default_model = model.filter(|m| !m.is_empty());
        self
    }

    /// Static model catalog. Blank and duplicate names are dropped.
    #[must_use]
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        let mut unique: Vec<String> = Vec::with_capacity(models.len());
        for name in models {
            let name = name.trim().to_string();
            if !name.is_empty() && !unique.contains(&name) {
                unique.push(name);
            }
        }
        self.models = unique;
        self
    }

    /// Defaults to 4096.
    #[must_use]
    pub const fn with_default_max_tokens(mut self, max_tokens: u32) -> Self {
        self.default_max_tokens = max_tokens;
        self
    }

    /// Defaults to 60 seconds.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Defaults to 3 attempts, 5 seconds apart.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Pin the upstream style instead of deriving it from the host, for
    /// upstreams reached through a gateway or a local mirror.
    #[must_use]
    pub const fn with_upstream_style(mut self, style: Option<UpstreamStyle>) -> Self {
        self.upstream_style = style;
        self
    }

    /// Validate inputs and derive the upstream style.
    pub fn build(self) -> Result<RelayConfig, ConfigError> {
        let url = Url::parse(self.upstream_base_url.trim()).map_err(|source| {
            ConfigError::InvalidUpstreamUrl {
                url: self.upstream_base_url.clone(),
                source,
            }
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(url.scheme().to_string()));
        }

        let upstream_style = self
            .upstream_style
            .unwrap_or_else(|| UpstreamStyle::from_base_url(&url));
        debug!(upstream = %url, style = %upstream_style, "Upstream style selected");

        Ok(RelayConfig {
            upstream_base_url: url,
            upstream_style,
            api_key: self.api_key,
            resolver: ModelResolver::new(self.model_override, self.default_model),
            models: self.models,
            default_max_tokens: self.default_max_tokens,
            request_timeout: self.request_timeout,
            retry: self.retry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::builder("https://api.openai.com/v1/").build().unwrap();
        assert_eq!(config.upstream_base_url(), "https://api.openai.com/v1");
        assert_eq!(config.upstream_style(), UpstreamStyle::OpenAiCompatible);
        assert_eq!(config.default_max_tokens(), DEFAULT_MAX_TOKENS);
        assert_eq!(config.request_timeout(), Duration::from_secs(60));
        assert_eq!(config.retry(), RetryPolicy::default());
        assert!(config.api_key().is_none());
        assert!(config.catalog().is_empty());
    }

    #[test]
    fn test_api_root_appends_version_only_for_bare_hosts() {
        let bare = RelayConfig::builder("https://generativelanguage.googleapis.com")
            .build()
            .unwrap();
        assert_eq!(
            bare.api_root("v1beta"),
            "https://generativelanguage.googleapis.com/v1beta"
        );

        let versioned = RelayConfig::builder("http://127.0.0.1:8080/v1/").build().unwrap();
        assert_eq!(versioned.api_root("v1"), "http://127.0.0.1:8080/v1");
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let err = RelayConfig::builder("not a url").build().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUpstreamUrl { .. }));

        let err = RelayConfig::builder("ftp://example.com").build().unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme(_)));
    }

    #[test]
    fn test_catalog_falls_back_to_configured_models() {
        let config = RelayConfig::builder("http://localhost:8080")
            .with_model_override(Some("forced".into()))
            .with_default_model(Some("forced".into()))
            .build()
            .unwrap();
        assert_eq!(config.catalog(), vec!["forced".to_string()]);

        let config = RelayConfig::builder("http://localhost:8080")
            .with_models(vec![" a ".into(), "b".into(), "a".into(), String::new()])
            .with_default_model(Some("c".into()))
            .build()
            .unwrap();
        assert_eq!(config.catalog(), vec!["a".to_string(), "b".to_string()]);
        assert!(config.has_model("a:latest"));
        assert!(!config.has_model("c"));
    }

    #[test]
    fn test_pinned_style_overrides_host_detection() {
        let config = RelayConfig::builder("http://127.0.0.1:9000")
            .with_upstream_style(Some(UpstreamStyle::ContentGeneration))
            .build()
            .unwrap();
        assert_eq!(config.upstream_style(), UpstreamStyle::ContentGeneration);
        assert_eq!(config.api_root("v1beta"), "http://127.0.0.1:9000/v1beta");

        let derived = RelayConfig::builder("https://generativelanguage.googleapis.com")
            .with_upstream_style(None)
            .build()
            .unwrap();
        assert_eq!(derived.upstream_style(), UpstreamStyle::ContentGeneration);
    }

    #[test]
    fn test_empty_strings_are_treated_as_unset() {
        let config = RelayConfig::builder("http://localhost:8080")
            .with_optional_api_key(Some(String::new()))
            .with_model_override(Some(String::new()))
            .build()
            .unwrap();
        assert!(config.api_key().is_none());
        assert!(config.resolver().model_override().is_none());
    }
}
