//! Local-runner (Ollama) API route handlers.
//!
//! These handlers accept Ollama-format requests, translate them into the
//! internal request records, relay them upstream, and answer in Ollama
//! format. Streams are NDJSON and default to on.

use axum::{
    Json,
    extract::State,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use tracing::{debug, info};

use relaylm_core::{
    ChatRequest, CompletionRequest, EmbeddingRequest, RelayError, SurfaceProtocol,
    resolver::normalize_model_name,
};

use crate::dialect::embedding_vectors;
use crate::error::{ApiError, ApiResult};
use crate::ollama_models::{
    OLLAMA_COMPAT_VERSION, OLLAMA_ROOT_RESPONSE, OllamaChatRequest, OllamaEmbedRequest,
    OllamaEmbedResponse, OllamaGenerateRequest, OllamaShowRequest, OllamaShowResponse,
    OllamaTagsResponse, OllamaVersionResponse,
};
use crate::relay::{self, parse_body};
use crate::server::ProxyState;

const SURFACE: SurfaceProtocol = SurfaceProtocol::LocalRunner;

// ── GET / ──────────────────────────────────────────────────────────────

/// Root probe, plain text.
pub async fn ollama_root() -> impl IntoResponse {
    OLLAMA_ROOT_RESPONSE
}

// ── GET /api/version ───────────────────────────────────────────────────

pub async fn ollama_version() -> impl IntoResponse {
    Json(OllamaVersionResponse {
        version: OLLAMA_COMPAT_VERSION.to_string(),
    })
}

// ── GET /api/tags ──────────────────────────────────────────────────────

pub async fn ollama_tags(State(state): State<ProxyState>) -> impl IntoResponse {
    debug!("GET /api/tags");
    Json(OllamaTagsResponse::from_descriptors(&state.descriptors()))
}

// ── POST /api/show ─────────────────────────────────────────────────────

pub async fn ollama_show(State(state): State<ProxyState>, body: Bytes) -> ApiResult<Response> {
    let req: OllamaShowRequest = parse_body(&body, "/api/show").map_err(ApiError::local)?;
    let name = req
        .effective_model()
        .map(normalize_model_name)
        .ok_or_else(|| ApiError::local(RelayError::Validation("model is required".into())))?;
    debug!(model = %name, "POST /api/show");

    if !state.config.has_model(name) {
        return Err(ApiError::model_not_found(SURFACE, name));
    }
    let descriptor = state.metadata.descriptor(name);
    Ok(Json(OllamaShowResponse::from(&descriptor)).into_response())
}

// ── POST /api/chat ─────────────────────────────────────────────────────

pub async fn ollama_chat(State(state): State<ProxyState>, body: Bytes) -> ApiResult<Response> {
    let req: OllamaChatRequest = parse_body(&body, "/api/chat").map_err(ApiError::local)?;
    let model = state
        .resolve_model(req.model.as_deref())
        .map_err(ApiError::local)?;
    debug!(model = %model, streaming = req.stream, "POST /api/chat");

    let request = ChatRequest {
        model,
        extra_params: req.options.to_extra_params(req.format.as_ref()),
        messages: req.messages,
        stream: req.stream,
    };
    relay::chat(&state, SURFACE, request)
        .await
        .map_err(ApiError::local)
}

// ── POST /api/generate ─────────────────────────────────────────────────

pub async fn ollama_generate(State(state): State<ProxyState>, body: Bytes) -> ApiResult<Response> {
    let req: OllamaGenerateRequest = parse_body(&body, "/api/generate").map_err(ApiError::local)?;
    let model = state
        .resolve_model(req.model.as_deref())
        .map_err(ApiError::local)?;
    let prompt = req
        .prompt
        .ok_or_else(|| ApiError::local(RelayError::Validation("prompt is required".into())))?;
    debug!(model = %model, streaming = req.stream, "POST /api/generate");

    let request = CompletionRequest {
        model,
        prompt,
        system: req.system,
        stream: req.stream,
        extra_params: req.options.to_extra_params(req.format.as_ref()),
    };
    relay::completion(&state, SURFACE, request)
        .await
        .map_err(ApiError::local)
}

// ── POST /api/embed, POST /api/embeddings ──────────────────────────────

/// Both embedding paths take `input` or `prompt` and answer with `embeddings`.
pub async fn ollama_embed(State(state): State<ProxyState>, body: Bytes) -> ApiResult<Response> {
    let req: OllamaEmbedRequest = parse_body(&body, "/api/embed").map_err(ApiError::local)?;
    let model = state
        .resolve_model(req.model.as_deref())
        .map_err(ApiError::local)?;
    let input = req.into_input().ok_or_else(|| {
        ApiError::local(RelayError::Validation("input or prompt is required".into()))
    })?;
    info!(model = %model, "POST /api/embed");

    let request = EmbeddingRequest {
        model,
        input,
        extra_params: serde_json::Map::new(),
    };
    let reply = relay::embed(&state, &request)
        .await
        .map_err(ApiError::local)?;

    let timings = state.metadata.timings();
    Ok(Json(OllamaEmbedResponse {
        model: request.model,
        embeddings: embedding_vectors(&reply),
        total_duration: timings.total_duration,
        load_duration: timings.load_duration,
        prompt_eval_count: timings.prompt_eval_count,
    })
    .into_response())
}
