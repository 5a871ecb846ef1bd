//! Shared fixtures for relaylm-proxy integration tests.
//!
//! `StubUpstream` is a tiny server bound to an ephemeral port. It speaks the
//! OpenAI-compatible routes and the content-generation `generateContent` /
//! `embedContent` actions, records every request body, and can be told to
//! answer the first N calls with 429.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower::ServiceExt;

use relaylm_core::{FixedMetadata, RelayConfig, RelayConfigBuilder, RetryPolicy, UpstreamStyle};
use relaylm_proxy::{ProxyState, create_router};

/// Model name every test catalog contains.
pub const TEST_MODEL: &str = "m1";

/// Answer text of the non-streaming stub reply.
pub const STUB_ANSWER: &str = "hello";

/// SSE body sent for streaming chat requests.
pub const STUB_SSE: &str = concat!(
    ": keep-alive\n\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\"},\"finish_reason\":null}]}\n\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hel\"},\"finish_reason\":null}]}\n\n",
    "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"lo\"},\"finish_reason\":null}]}\n\n",
    "data: [DONE]\n\n",
);

#[derive(Debug, Default)]
struct StubInner {
    calls: AtomicUsize,
    rate_limited_calls: AtomicUsize,
    failure: Mutex<Option<(StatusCode, String)>>,
    bodies: Mutex<Vec<Value>>,
    actions: Mutex<Vec<String>>,
}

/// Handle to a running stub upstream.
#[derive(Debug, Clone)]
pub struct StubUpstream {
    pub base_url: String,
    inner: Arc<StubInner>,
}

impl StubUpstream {
    pub async fn start() -> Self {
        let inner = Arc::new(StubInner::default());
        let app = Router::new()
            .route("/v1/chat/completions", post(stub_chat))
            .route("/v1/embeddings", post(stub_embeddings))
            .route("/v1beta/models/{action}", post(stub_content_generation))
            .with_state(Arc::clone(&inner));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            inner,
        }
    }

    /// Answer the next `n` calls with 429.
    pub fn rate_limit_next(&self, n: usize) {
        self.inner.rate_limited_calls.store(n, Ordering::SeqCst);
    }

    /// Answer every call with `status`.
    pub fn fail_with(&self, status: StatusCode, body: &str) {
        *self.inner.failure.lock().unwrap() = Some((status, body.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.inner.calls.load(Ordering::SeqCst)
    }

    /// Body of the most recent upstream request.
    pub fn last_body(&self) -> Value {
        self.inner
            .bodies
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Content-generation actions called so far, e.g. `m1:generateContent`.
    pub fn actions(&self) -> Vec<String> {
        self.inner.actions.lock().unwrap().clone()
    }

    /// Config builder pointed at this stub, with a fast retry policy.
    pub fn config(&self) -> RelayConfigBuilder {
        RelayConfig::builder(self.base_url.clone())
            .with_models(vec![TEST_MODEL.to_string()])
            .with_retry(RetryPolicy {
                max_attempts: 3,
                delay: Duration::from_millis(10),
            })
    }

    pub fn router(&self) -> Router {
        router_for(self.config().build().unwrap())
    }

    /// Router that talks to this stub as a content-generation upstream.
    pub fn content_generation_router(&self) -> Router {
        let config = self
            .config()
            .with_upstream_style(Some(UpstreamStyle::ContentGeneration))
            .build()
            .unwrap();
        router_for(config)
    }
}

pub fn router_for(config: RelayConfig) -> Router {
    let state = ProxyState::new(config, Arc::new(FixedMetadata)).unwrap();
    create_router(state)
}

/// Returns `Some(response)` when the call should not succeed.
fn record(inner: &StubInner, body: Value) -> Option<Response> {
    inner.calls.fetch_add(1, Ordering::SeqCst);
    inner.bodies.lock().unwrap().push(body);

    if let Some((status, message)) = inner.failure.lock().unwrap().clone() {
        return Some((status, message).into_response());
    }

    let limited = inner.rate_limited_calls.load(Ordering::SeqCst);
    if limited > 0 {
        inner.rate_limited_calls.store(limited - 1, Ordering::SeqCst);
        return Some((StatusCode::TOO_MANY_REQUESTS, "slow down").into_response());
    }
    None
}

async fn stub_chat(State(inner): State<Arc<StubInner>>, Json(body): Json<Value>) -> Response {
    let streaming = body["stream"].as_bool().unwrap_or(false);
    let model = body["model"].clone();
    if let Some(rejection) = record(&inner, body) {
        return rejection;
    }

    if streaming {
        return ([(header::CONTENT_TYPE, "text/event-stream")], STUB_SSE).into_response();
    }

    Json(json!({
        "id": "upstream-1",
        "object": "chat.completion",
        "model": model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": STUB_ANSWER},
            "finish_reason": "stop"
        }]
    }))
    .into_response()
}

async fn stub_embeddings(State(inner): State<Arc<StubInner>>, Json(body): Json<Value>) -> Response {
    let model = body["model"].clone();
    if let Some(rejection) = record(&inner, body) {
        return rejection;
    }

    Json(json!({
        "object": "list",
        "data": [{"object": "embedding", "index": 0, "embedding": [0.1, 0.2, 0.3]}],
        "model": model,
        "usage": {"prompt_tokens": 2, "total_tokens": 2}
    }))
    .into_response()
}

async fn stub_content_generation(
    State(inner): State<Arc<StubInner>>,
    Path(action): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    inner.actions.lock().unwrap().push(action.clone());
    if let Some(rejection) = record(&inner, body) {
        return rejection;
    }

    match action.rsplit_once(':').map(|(_, verb)| verb) {
        Some("generateContent") => Json(json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": STUB_ANSWER}]},
                "finishReason": "STOP"
            }]
        }))
        .into_response(),
        Some("embedContent") => Json(json!({"embedding": {"values": [0.1, 0.2, 0.3]}})).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Send a request through `app` and return status and body bytes.
pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, bytes::Bytes) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, body)
}

pub async fn get(app: Router, uri: &str) -> (StatusCode, bytes::Bytes) {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, bytes::Bytes) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub fn json_body(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}
