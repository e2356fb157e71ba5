//! Retrying call engine with exponential backoff and jitter.
//!
//! Every remote request in the pipeline (upload, generation, speech
//! synthesis) is executed through [`call_with_retry`]. Transient failures
//! are retried with capped exponential backoff plus jitter; fatal failures
//! propagate on first occurrence.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{GenAiError, GenAiResult};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Base backoff delay in seconds (doubles each attempt).
    pub base_delay_secs: f64,
    /// Cap on the deterministic part of the backoff delay, in seconds.
    pub max_delay_secs: f64,
    /// Operation name for logging and exhaustion errors.
    pub operation_name: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay_secs: 1.0,
            max_delay_secs: 20.0,
            operation_name: "remote_call".to_string(),
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with the given operation name.
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    /// Set the maximum number of retries.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base backoff delay.
    pub fn with_base_delay_secs(mut self, base_delay_secs: f64) -> Self {
        self.base_delay_secs = base_delay_secs;
        self
    }

    /// Set the backoff cap.
    pub fn with_max_delay_secs(mut self, max_delay_secs: f64) -> Self {
        self.max_delay_secs = max_delay_secs;
        self
    }

    /// Backoff delay for a given 0-based attempt index.
    ///
    /// Computed as `min(cap, base * 2^i)` plus up to one second of uniform
    /// jitter, so concurrent callers do not retry in lockstep.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self.base_delay_secs * 2f64.powi(attempt as i32);
        let capped = exp.min(self.max_delay_secs);
        Duration::from_secs_f64(capped + rand::random::<f64>())
    }
}

/// Execute an async operation with retry, backoff, and client reset.
///
/// `op` issues one attempt; `reset` is invoked before each retry so the
/// caller can rebuild its underlying HTTP client (recovers broken-connection
/// states that a plain retry would not). Errors whose
/// [`GenAiError::is_retryable`] is false propagate immediately; once the
/// budget is spent the last failure is wrapped in [`GenAiError::Exhausted`].
pub async fn call_with_retry<T, F, Fut, R>(
    config: &RetryConfig,
    reset: R,
    op: F,
) -> GenAiResult<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = GenAiResult<T>>,
    R: Fn(),
{
    let mut last_err: Option<GenAiError> = None;

    for attempt in 0..=config.max_retries {
        match op().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(
                        operation = %config.operation_name,
                        attempt,
                        "succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(e) if !e.is_retryable() => return Err(e),
            Err(e) => {
                if attempt < config.max_retries {
                    let delay = config.backoff_delay(attempt);
                    warn!(
                        operation = %config.operation_name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, backing off"
                    );
                    last_err = Some(e);
                    reset();
                    tokio::time::sleep(delay).await;
                } else {
                    last_err = Some(e);
                }
            }
        }
    }

    let last = last_err.unwrap_or_else(|| GenAiError::config("retry budget of zero attempts"));
    Err(GenAiError::exhausted(
        &config.operation_name,
        config.max_retries + 1,
        last,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn transient() -> GenAiError {
        GenAiError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "overloaded".to_string(),
        }
    }

    fn fatal() -> GenAiError {
        GenAiError::Status {
            status: StatusCode::UNAUTHORIZED,
            body: "bad key".to_string(),
        }
    }

    #[test]
    fn test_backoff_delay_bounds() {
        let config = RetryConfig::default();
        for attempt in 0..10 {
            let floor = (1.0 * 2f64.powi(attempt)).min(20.0);
            let delay = config.backoff_delay(attempt as u32).as_secs_f64();
            assert!(delay >= floor, "attempt {attempt}: {delay} < {floor}");
            assert!(delay < floor + 1.0, "attempt {attempt}: {delay} >= {}", floor + 1.0);
        }
    }

    #[test]
    fn test_backoff_delay_caps_at_max() {
        let config = RetryConfig::default().with_max_delay_secs(4.0);
        let delay = config.backoff_delay(10).as_secs_f64();
        assert!(delay < 5.0);
    }

    #[tokio::test]
    async fn test_immediate_success_skips_reset() {
        let resets = AtomicU32::new(0);
        let result = call_with_retry(
            &RetryConfig::new("test"),
            || {
                resets.fetch_add(1, Ordering::SeqCst);
            },
            || async { Ok::<_, GenAiError>(7) },
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(resets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_transient_errors_retry_then_succeed() {
        let calls = AtomicU32::new(0);
        let resets = AtomicU32::new(0);
        let config = RetryConfig::new("test").with_base_delay_secs(0.001);

        let result = call_with_retry(
            &config,
            || {
                resets.fetch_add(1, Ordering::SeqCst);
            },
            || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(transient())
                    } else {
                        Ok(42)
                    }
                }
            },
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(resets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fatal_error_propagates_immediately() {
        let calls = AtomicU32::new(0);
        let result: GenAiResult<()> = call_with_retry(
            &RetryConfig::new("test"),
            || {},
            || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(fatal()) }
            },
        )
        .await;

        assert!(matches!(
            result,
            Err(GenAiError::Status { status, .. }) if status == StatusCode::UNAUTHORIZED
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_wraps_last_error() {
        let config = RetryConfig::new("upload")
            .with_max_retries(2)
            .with_base_delay_secs(0.001);
        let calls = AtomicU32::new(0);

        let result: GenAiResult<()> = call_with_retry(&config, || {}, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;

        match result {
            Err(GenAiError::Exhausted {
                operation,
                attempts,
                source,
            }) => {
                assert_eq!(operation, "upload");
                assert_eq!(attempts, 3);
                assert!(matches!(*source, GenAiError::Status { .. }));
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
