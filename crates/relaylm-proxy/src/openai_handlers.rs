//! OpenAI-compatible (`/v1`) route handlers.
//!
//! Streams are SSE and default to off.

use axum::{
    Json,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde_json::Value;
use tracing::debug;

use relaylm_core::{
    ChatRequest, CompletionRequest, EmbeddingInput, EmbeddingRequest, RelayError, RelayResult,
    SurfaceProtocol, resolver::normalize_model_name,
};

use crate::error::{ApiError, ApiResult};
use crate::models::{self, ChatCompletionRequest, ModelInfo, ModelsResponse};
use crate::relay::{self, parse_body};
use crate::server::ProxyState;

const SURFACE: SurfaceProtocol = SurfaceProtocol::OpenAiCompatible;

/// `GET /v1/models`: a fresh synthetic entry per catalog name.
pub async fn list_models(State(state): State<ProxyState>) -> impl IntoResponse {
    debug!("GET /v1/models");
    Json(ModelsResponse::from_descriptors(&state.descriptors()))
}

/// `GET /v1/models/{model}`. Model names may contain slashes.
pub async fn get_model(
    State(state): State<ProxyState>,
    Path(model): Path<String>,
) -> ApiResult<Response> {
    let name = normalize_model_name(model.trim_start_matches('/'));
    debug!(model = %name, "GET /v1/models/{{model}}");

    if !state.config.has_model(name) {
        return Err(ApiError::model_not_found(SURFACE, name));
    }
    Ok(Json(ModelInfo::from(&state.metadata.descriptor(name))).into_response())
}

/// `POST /v1/chat/completions`.
pub async fn chat_completions(
    State(state): State<ProxyState>,
    body: Bytes,
) -> ApiResult<Response> {
    let req: ChatCompletionRequest =
        parse_body(&body, "/v1/chat/completions").map_err(ApiError::openai)?;
    let model = state
        .resolve_model(req.model.as_deref())
        .map_err(ApiError::openai)?;
    debug!(model = %model, streaming = req.stream, "POST /v1/chat/completions");

    let request = ChatRequest {
        model,
        messages: req.messages,
        stream: req.stream,
        extra_params: req.extra,
    };
    relay::chat(&state, SURFACE, request)
        .await
        .map_err(ApiError::openai)
}

/// `POST /v1/completions`.
pub async fn completions(State(state): State<ProxyState>, body: Bytes) -> ApiResult<Response> {
    let req: models::CompletionRequest =
        parse_body(&body, "/v1/completions").map_err(ApiError::openai)?;
    let model = state
        .resolve_model(req.model.as_deref())
        .map_err(ApiError::openai)?;
    let prompt = prompt_text(req.prompt).map_err(ApiError::openai)?;
    debug!(model = %model, streaming = req.stream, "POST /v1/completions");

    let request = CompletionRequest {
        model,
        prompt,
        system: None,
        stream: req.stream,
        extra_params: req.extra,
    };
    relay::completion(&state, SURFACE, request)
        .await
        .map_err(ApiError::openai)
}

/// `POST /v1/embeddings` (also served as `/v1/embed`).
///
/// Both `model` and `input` must be present in the body itself; a
/// configured override or default does not stand in for a missing field.
pub async fn embeddings(State(state): State<ProxyState>, body: Bytes) -> ApiResult<Response> {
    let raw: Value = parse_body(&body, "/v1/embeddings").map_err(ApiError::openai)?;
    let request = embedding_request(&state, raw).map_err(ApiError::openai)?;
    debug!(model = %request.model, "POST /v1/embeddings");

    let reply = relay::embed(&state, &request)
        .await
        .map_err(ApiError::openai)?;
    Ok(Json(reply).into_response())
}

fn embedding_request(state: &ProxyState, raw: Value) -> RelayResult<EmbeddingRequest> {
    let Value::Object(mut fields) = raw else {
        return Err(RelayError::Validation("request body must be a JSON object".into()));
    };

    let requested = fields
        .remove("model")
        .and_then(|m| m.as_str().map(str::to_string))
        .filter(|m| !m.trim().is_empty());
    let input = fields.remove("input").filter(|i| !i.is_null());
    let (Some(requested), Some(input)) = (requested, input) else {
        return Err(RelayError::Validation(
            "'model' and 'input' are required".to_string(),
        ));
    };

    let input: EmbeddingInput = serde_json::from_value(input).map_err(|_| {
        RelayError::Validation("'input' must be a string or an array of strings".to_string())
    })?;
    if input.is_empty() {
        return Err(RelayError::Validation("'input' must not be empty".to_string()));
    }

    Ok(EmbeddingRequest {
        model: state.resolve_model(Some(&requested))?,
        input,
        extra_params: fields,
    })
}

/// Accept a string prompt, or an array of strings joined by newlines.
fn prompt_text(prompt: Option<Value>) -> RelayResult<String> {
    match prompt {
        Some(Value::String(text)) => Ok(text),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| item.as_str())
            .collect::<Option<Vec<&str>>>()
            .map(|parts| parts.join("\n"))
            .ok_or_else(|| {
                RelayError::Validation("'prompt' array must contain only strings".to_string())
            }),
        None | Some(Value::Null) => Err(RelayError::Validation("prompt is required".to_string())),
        Some(_) => Err(RelayError::Validation(
            "'prompt' must be a string or an array of strings".to_string(),
        )),
    }
}
