//! Domain error kinds.
//!
//! Every failure a request can hit maps onto one of these. The HTTP layer
//! decides how each is rendered for the surface protocol in use.

use thiserror::Error;

/// Result type alias for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Errors that can occur while relaying a request.
#[derive(Debug, Error)]
pub enum RelayError {
    /// A required request field is missing or malformed.
    /// Raised before any upstream call is made.
    #[error("{0}")]
    Validation(String),

    /// Unknown model or route.
    #[error("{0}")]
    NotFound(String),

    /// The upstream answered 429. Recovered by the retry controller until
    /// its bound is reached, then escalated to [`RelayError::Upstream`].
    #[error("Upstream rate limited: {0}")]
    UpstreamRateLimited(String),

    /// Any other non-2xx answer or transport failure.
    #[error("Upstream error{}: {message}", status.map(|s| format!(" {s}")).unwrap_or_default())]
    Upstream {
        status: Option<u16>,
        message: String,
    },

    /// A line inside an active stream could not be parsed.
    /// Logged and skipped by the translator, never surfaced to clients.
    #[error("Malformed upstream chunk: {0}")]
    MalformedChunk(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Convenience constructor for transport-level upstream failures.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            status: None,
            message: message.into(),
        }
    }

    /// Returns a suggested HTTP status code for this error.
    #[must_use]
    pub const fn suggested_status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::UpstreamRateLimited(_)
            | Self::Upstream { .. }
            | Self::MalformedChunk(_)
            | Self::Internal(_) => 500,
        }
    }

    /// Stable error type discriminant used in OpenAI-style error bodies.
    #[must_use]
    pub const fn error_type(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::NotFound(_) => "invalid_request_error",
            Self::UpstreamRateLimited(_) => "rate_limit_error",
            Self::Upstream { .. } | Self::MalformedChunk(_) | Self::Internal(_) => "server_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_and_not_found_are_client_errors() {
        let err = RelayError::Validation("model is required".into());
        assert_eq!(err.suggested_status_code(), 400);
        assert_eq!(err.error_type(), "invalid_request_error");
        assert_eq!(err.to_string(), "model is required");

        let err = RelayError::NotFound("no such model".into());
        assert_eq!(err.suggested_status_code(), 404);
        assert_eq!(err.error_type(), "invalid_request_error");
    }

    #[test]
    fn upstream_errors_are_server_errors() {
        let err = RelayError::Upstream {
            status: Some(502),
            message: "bad gateway".into(),
        };
        assert_eq!(err.suggested_status_code(), 500);
        assert_eq!(err.to_string(), "Upstream error 502: bad gateway");
        assert_eq!(
            RelayError::upstream("connection reset").to_string(),
            "Upstream error: connection reset"
        );
    }
}
