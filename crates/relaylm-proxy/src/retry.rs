//! Bounded retry for rate-limited upstream calls.
//!
//! Wraps only the call that starts a request. Once a response body is
//! being relayed to the client nothing is retried.

use std::future::Future;

use tracing::{error, warn};

use relaylm_core::{RelayError, RelayResult, RetryPolicy};

/// Retries [`RelayError::UpstreamRateLimited`] with a fixed delay.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryController {
    policy: RetryPolicy,
}

impl RetryController {
    #[must_use]
    pub const fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    /// Run `attempt` until it succeeds, fails with anything other than a
    /// rate limit, or the attempt bound is reached.
    ///
    /// Exhaustion escalates to [`RelayError::Upstream`] with status 429.
    pub async fn execute<T, F, Fut>(&self, mut attempt: F) -> RelayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RelayResult<T>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut current = 1;

        loop {
            match attempt().await {
                Err(RelayError::UpstreamRateLimited(message)) => {
                    if current >= max_attempts {
                        error!(attempts = current, "Upstream still rate limited, giving up");
                        return Err(RelayError::Upstream {
                            status: Some(429),
                            message: format!(
                                "Rate limited after {current} attempts: {message}"
                            ),
                        });
                    }

                    warn!(
                        attempt = current,
                        max_attempts,
                        delay_ms = u64::try_from(self.policy.delay.as_millis()).unwrap_or(u64::MAX),
                        "Upstream rate limited, retrying"
                    );
                    tokio::time::sleep(self.policy.delay).await;
                    current += 1;
                }
                other => return other,
            }
        }
    }
}
