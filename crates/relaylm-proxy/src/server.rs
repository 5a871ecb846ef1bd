//! Axum HTTP server exposing both client surfaces.
//!
//! `serve()` runs the router on a pre-bound `TcpListener` until the
//! cancellation token fires.

use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use relaylm_core::{
    CallKind, ModelDescriptor, RandomMetadata, RelayConfig, RelayError, RelayResult,
    SurfaceProtocol, SyntheticMetadata,
};

use crate::dialect::{Dialect, dialect_for};
use crate::format::SurfaceFormatter;
use crate::models::ErrorResponse;
use crate::retry::RetryController;
use crate::upstream::UpstreamClient;
use crate::{ollama_handlers, openai_handlers};

/// Shared proxy state, injected via Axum `State`.
///
/// Used by both the OpenAI (`/v1/`) and local-runner (`/api/`) route
/// trees. Everything here is read-only after construction.
#[derive(Debug, Clone)]
pub struct ProxyState {
    pub config: Arc<RelayConfig>,
    pub dialect: Arc<dyn Dialect>,
    pub upstream: UpstreamClient,
    pub retry: RetryController,
    pub metadata: Arc<dyn SyntheticMetadata>,
}

impl ProxyState {
    /// Wire up the dialect, client and retry policy for `config`.
    pub fn new(config: RelayConfig, metadata: Arc<dyn SyntheticMetadata>) -> RelayResult<Self> {
        let upstream = UpstreamClient::new(config.request_timeout())?;
        Ok(Self {
            dialect: dialect_for(config.upstream_style()),
            retry: RetryController::new(config.retry()),
            config: Arc::new(config),
            upstream,
            metadata,
        })
    }

    /// Production state with randomized synthetic metadata.
    pub fn with_random_metadata(config: RelayConfig) -> RelayResult<Self> {
        Self::new(config, Arc::new(RandomMetadata))
    }

    /// Effective upstream model, or a validation error when there is none.
    pub fn resolve_model(&self, requested: Option<&str>) -> RelayResult<String> {
        self.config
            .resolver()
            .resolve(requested)
            .ok_or_else(|| RelayError::Validation("model is required".to_string()))
    }

    pub fn formatter(&self, surface: SurfaceProtocol, kind: CallKind, model: &str) -> SurfaceFormatter {
        SurfaceFormatter::new(surface, kind, model, Arc::clone(&self.metadata))
    }

    /// A freshly synthesized descriptor for every catalog entry.
    pub fn descriptors(&self) -> Vec<ModelDescriptor> {
        self.config
            .catalog()
            .iter()
            .map(|name| self.metadata.descriptor(name))
            .collect()
    }
}

/// Build the router for every surface endpoint.
pub fn create_router(state: ProxyState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ollama_handlers::ollama_root))
        .route("/health", get(health_check))
        // Local-runner surface
        .route("/api/version", get(ollama_handlers::ollama_version))
        .route("/api/tags", get(ollama_handlers::ollama_tags))
        .route("/api/show", post(ollama_handlers::ollama_show))
        .route("/api/chat", post(ollama_handlers::ollama_chat))
        .route("/api/generate", post(ollama_handlers::ollama_generate))
        .route("/api/embed", post(ollama_handlers::ollama_embed))
        .route("/api/embeddings", post(ollama_handlers::ollama_embed))
        // OpenAI-compatible surface
        .route("/v1/models", get(openai_handlers::list_models))
        .route("/v1/models/{*model}", get(openai_handlers::get_model))
        .route("/v1/chat/completions", post(openai_handlers::chat_completions))
        .route("/v1/completions", post(openai_handlers::completions))
        .route("/v1/embeddings", post(openai_handlers::embeddings))
        .route("/v1/embed", post(openai_handlers::embeddings))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Start the proxy server with a pre-bound listener.
///
/// Returns `Ok(())` on clean shutdown, or an error if the server fails.
pub async fn serve(
    listener: TcpListener,
    state: ProxyState,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    info!(
        upstream = %state.config.upstream_base_url(),
        style = %state.config.upstream_style(),
        "Proxy server starting on {addr}"
    );

    let app = create_router(state);

    info!("Local-runner clients: http://{addr}  OpenAI clients: http://{addr}/v1");

    axum::serve(listener, app)
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;

    info!("Proxy server shut down");
    Ok(())
}

/// Health check endpoint.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

async fn not_found(uri: axum::http::Uri) -> impl IntoResponse {
    debug!(path = %uri.path(), "No route");
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::with_code(
            "Not found",
            "invalid_request_error",
            "not_found",
        )),
    )
}
