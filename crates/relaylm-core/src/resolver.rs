//! Model identity resolution.
//!
//! Maps the model name a client asked for to the name actually sent
//! upstream.

/// Resolves requested model names against the process configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelResolver {
    model_override: Option<String>,
    default_model: Option<String>,
}

impl ModelResolver {
    #[must_use]
    pub const fn new(model_override: Option<String>, default_model: Option<String>) -> Self {
        Self {
            model_override,
            default_model,
        }
    }

    /// Resolve the effective upstream model.
    ///
    /// A configured override always wins and clients cannot opt out.
    /// Otherwise the requested name is sent as given (only surrounding
    /// whitespace is trimmed), falling back to the configured default.
    /// Returns `None` only when nothing is requested and no default exists.
    #[must_use]
    pub fn resolve(&self, requested: Option<&str>) -> Option<String> {
        if let Some(forced) = &self.model_override {
            return Some(forced.clone());
        }

        requested
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .or_else(|| self.default_model.clone())
    }

    #[must_use]
    pub fn model_override(&self) -> Option<&str> {
        self.model_override.as_deref()
    }

    #[must_use]
    pub fn default_model(&self) -> Option<&str> {
        self.default_model.as_deref()
    }
}

/// Strip the implicit `:latest` tag. Used for catalog lookups only; the
/// name sent upstream keeps its tag.
#[must_use]
pub fn normalize_model_name(name: &str) -> &str {
    let trimmed = name.trim();
    trimmed.strip_suffix(":latest").unwrap_or(trimmed)
}
