//! HTTP rendering of [`RelayError`] per surface.
//!
//! The local runner expects `{"error": "..."}`; OpenAI clients expect the
//! nested `{"error": {"message", "type", "code"}}` envelope.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use relaylm_core::{RelayError, SurfaceProtocol};

use crate::models::ErrorResponse;

/// A relay failure bound to the surface it will be reported on.
#[derive(Debug)]
pub struct ApiError {
    surface: SurfaceProtocol,
    error: RelayError,
    code: Option<&'static str>,
}

impl ApiError {
    pub const fn new(surface: SurfaceProtocol, error: RelayError) -> Self {
        Self {
            surface,
            error,
            code: None,
        }
    }

    /// 404 for a model missing from the catalog.
    pub fn model_not_found(surface: SurfaceProtocol, model: &str) -> Self {
        Self {
            surface,
            error: RelayError::NotFound(format!("Model '{model}' not found")),
            code: Some("model_not_found"),
        }
    }

    pub const fn local(error: RelayError) -> Self {
        Self::new(SurfaceProtocol::LocalRunner, error)
    }

    pub const fn openai(error: RelayError) -> Self {
        Self::new(SurfaceProtocol::OpenAiCompatible, error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.error.suggested_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        match self.surface {
            SurfaceProtocol::LocalRunner => {
                (status, Json(json!({ "error": self.error.to_string() }))).into_response()
            }
            SurfaceProtocol::OpenAiCompatible => {
                let mut body = ErrorResponse::from(&self.error);
                if let Some(code) = self.code {
                    body.error.code = Some(code.to_string());
                }
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Shorthand for handler results.
pub type ApiResult<T> = Result<T, ApiError>;
