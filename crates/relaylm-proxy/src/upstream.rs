//! HTTP transport to the configured upstream.
//!
//! Sends calls shaped by a [`Dialect`](crate::dialect::Dialect) and maps
//! non-success statuses onto [`RelayError`]. Only non-streaming calls carry
//! a timeout; an established stream runs until the upstream closes it or
//! the client goes away.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, error};

use relaylm_core::{RelayError, RelayResult};

use crate::dialect::{UpstreamAuth, UpstreamCall};

/// Header used by the content-generation style for its API key.
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Shared, connection-pooling upstream client.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: Client,
    request_timeout: Duration,
}

impl UpstreamClient {
    /// Create a client whose non-streaming calls time out after
    /// `request_timeout`.
    pub fn new(request_timeout: Duration) -> RelayResult<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| RelayError::Internal(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            request_timeout,
        })
    }

    /// Send one call and return the successful response, body unread.
    ///
    /// 429 becomes [`RelayError::UpstreamRateLimited`] so the retry
    /// controller can pick it up; every other failure is final.
    pub async fn send(&self, call: &UpstreamCall) -> RelayResult<Response> {
        debug!(url = %call.url, streaming = call.stream, "Sending upstream request");

        let mut request = self.client.post(&call.url).json(&call.body);
        request = match &call.auth {
            UpstreamAuth::None => request,
            UpstreamAuth::Bearer(token) => request.bearer_auth(token),
            UpstreamAuth::ApiKeyHeader(key) => request.header(API_KEY_HEADER, key),
        };
        if !call.stream {
            request = request.timeout(self.request_timeout);
        }

        let response = request.send().await.map_err(|e| {
            error!("Failed to reach upstream: {e}");
            RelayError::upstream(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(RelayError::UpstreamRateLimited(body));
        }

        error!(status = status.as_u16(), "Upstream returned an error: {body}");
        Err(RelayError::Upstream {
            status: Some(status.as_u16()),
            message: body,
        })
    }

    /// Send a non-streaming call and decode its JSON body.
    pub async fn send_json(&self, call: &UpstreamCall) -> RelayResult<Value> {
        let response = self.send(call).await?;
        read_json(response).await
    }
}

/// Read a whole response body as JSON.
pub async fn read_json(response: Response) -> RelayResult<Value> {
    let bytes = response.bytes().await.map_err(|e| {
        error!("Failed to read upstream response: {e}");
        RelayError::upstream(e.to_string())
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|e| RelayError::upstream(format!("Upstream returned invalid JSON: {e}")))
}
