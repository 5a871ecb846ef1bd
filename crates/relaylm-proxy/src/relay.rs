//! The request pipeline shared by both surfaces.
//!
//! Handlers validate and resolve; everything after that (payload shaping,
//! the retried upstream call, stream translation or final formatting)
//! happens here.

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use relaylm_core::{
    CallKind, ChatRequest, CompletionRequest, EmbeddingRequest, RelayError, RelayResult,
    SurfaceProtocol,
};

use crate::dialect::UpstreamCall;
use crate::format::SurfaceFormatter;
use crate::server::ProxyState;
use crate::stream;

/// Decode a JSON request body, reporting failures as validation errors.
pub fn parse_body<T: DeserializeOwned>(body: &Bytes, route: &str) -> RelayResult<T> {
    serde_json::from_slice(body).map_err(|e| {
        warn!("Invalid {route} request: {e}");
        RelayError::Validation(format!("Invalid request body: {e}"))
    })
}

/// Relay a chat request.
pub async fn chat(
    state: &ProxyState,
    surface: SurfaceProtocol,
    request: ChatRequest,
) -> RelayResult<Response> {
    if request.messages.is_empty() {
        return Err(RelayError::Validation("messages must not be empty".to_string()));
    }

    let upstream_stream = request.stream && state.dialect.supports_streaming();
    let call = state.dialect.chat(&state.config, &request, upstream_stream);
    let formatter = state.formatter(surface, CallKind::Chat, &request.model);
    generate(state, call, formatter, request.stream).await
}

/// Relay a completion request.
pub async fn completion(
    state: &ProxyState,
    surface: SurfaceProtocol,
    request: CompletionRequest,
) -> RelayResult<Response> {
    let upstream_stream = request.stream && state.dialect.supports_streaming();
    let call = state.dialect.completion(&state.config, &request, upstream_stream);
    let formatter = state.formatter(surface, CallKind::Completion, &request.model);
    generate(state, call, formatter, request.stream).await
}

async fn generate(
    state: &ProxyState,
    call: UpstreamCall,
    formatter: SurfaceFormatter,
    client_stream: bool,
) -> RelayResult<Response> {
    info!(
        model = %formatter.model(),
        streaming = client_stream,
        style = %state.dialect.style(),
        "Relaying generation"
    );

    if call.stream {
        let response = state.retry.execute(|| state.upstream.send(&call)).await?;
        return Ok(stream::stream_response(response, formatter));
    }

    let body = state.retry.execute(|| state.upstream.send_json(&call)).await?;
    let generation = state.dialect.parse_generation(&body)?;

    if client_stream {
        debug!("Upstream does not stream, synthesizing a one-shot stream");
        Ok(stream::one_shot_response(&generation, &formatter))
    } else {
        Ok(Json(formatter.response_body(&generation)).into_response())
    }
}

/// Relay an embedding request. The reply is in the OpenAI embeddings shape.
pub async fn embed(state: &ProxyState, request: &EmbeddingRequest) -> RelayResult<Value> {
    info!(
        model = %request.model,
        style = %state.dialect.style(),
        "Relaying embedding"
    );

    let call = state.dialect.embedding(&state.config, request);
    let body = state.retry.execute(|| state.upstream.send_json(&call)).await?;
    state.dialect.parse_embeddings(body, &request.model)
}
