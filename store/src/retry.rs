//! Bounded transport retry with exponential backoff.
//!
//! The engine itself never retries; this module gives the REST client a
//! small, jittered retry budget for the failures a remote store produces
//! routinely (429 rate limits, 5xx blips, dropped connections). Every
//! command issued here is idempotent - `HSET`/`ZADD` upsert the same value,
//! `DEL`/`ZREM` converge on removal - so replaying a request is safe.
//!
//! # Policy
//!
//! - Max retries: 2 (3 total attempts)
//! - Initial delay: 250ms, doubling per attempt, capped at 4 seconds
//! - Down-jitter up to 25% (multiplier in [0.75, 1.0])
//! - `Retry-After` honored when present and under 30 seconds

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode, header::HeaderMap};

/// Retry configuration for the REST client.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries (not counting the initial request).
    pub max_retries: u32,
    /// Backoff delay before the first retry.
    pub initial_delay: Duration,
    /// Backoff ceiling.
    pub max_delay: Duration,
    /// Down-jitter factor (0.25 = up to 25% reduction).
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
            jitter_factor: 0.25,
        }
    }
}

/// Parse a `Retry-After` header (integer seconds form).
///
/// Returns `Some(duration)` only for values in `(0, 30s)`; anything else
/// falls back to computed backoff.
#[must_use]
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs = headers.get("retry-after")?.to_str().ok()?.parse::<u64>().ok()?;
    let duration = Duration::from_secs(secs);
    if duration > Duration::ZERO && duration < Duration::from_secs(30) {
        Some(duration)
    } else {
        None
    }
}

/// Whether a response status is worth retrying.
#[must_use]
pub fn should_retry(status: StatusCode) -> bool {
    matches!(status.as_u16(), 408 | 429 | 500..=599)
}

/// Delay before the retry following `backoff_step` (0 before the first
/// retry, 1 before the second, ...). `Retry-After` wins when valid.
#[must_use]
pub fn retry_delay(backoff_step: u32, config: &RetryConfig, headers: Option<&HeaderMap>) -> Duration {
    if let Some(headers) = headers
        && let Some(delay) = parse_retry_after(headers)
    {
        return delay;
    }

    let base = config.initial_delay.as_secs_f64() * 2.0_f64.powi(backoff_step as i32);
    let capped = base.min(config.max_delay.as_secs_f64());
    let jitter = 1.0 - rand::random::<f64>() * config.jitter_factor;
    Duration::from_secs_f64(capped * jitter)
}

/// Outcome of a retried request.
///
/// Structurally distinguishes success from failure so callers cannot treat
/// an error response as data.
#[derive(Debug)]
pub enum RetryOutcome {
    /// 2xx response.
    Success(Response),
    /// Non-retryable HTTP status, or a retryable one after the budget ran out.
    HttpError(Response),
    /// Transport failure that survived the retry budget.
    Failed {
        attempts: u32,
        source: reqwest::Error,
    },
}

fn is_retryable_error(error: &reqwest::Error) -> bool {
    error.is_connect() || error.is_timeout() || error.is_request()
}

/// Send a request with automatic retries.
///
/// `build_request` is called once per attempt; the closure must produce an
/// equivalent request each time.
pub async fn send_with_retry<F>(build_request: F, config: &RetryConfig) -> RetryOutcome
where
    F: Fn() -> RequestBuilder,
{
    let mut attempts = 0u32;
    loop {
        let is_last = attempts >= config.max_retries;
        match build_request().send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return RetryOutcome::Success(response);
                }
                if is_last || !should_retry(status) {
                    return RetryOutcome::HttpError(response);
                }
                let delay = retry_delay(attempts, config, Some(response.headers()));
                tracing::debug!(
                    status = %status,
                    retry = attempts + 1,
                    delay_ms = delay.as_millis(),
                    "Retrying storage request after error status"
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if is_last || !is_retryable_error(&e) {
                    return RetryOutcome::Failed {
                        attempts: attempts + 1,
                        source: e,
                    };
                }
                let delay = retry_delay(attempts, config, None);
                tracing::debug!(
                    error = %e,
                    retry = attempts + 1,
                    delay_ms = delay.as_millis(),
                    "Retrying storage request after transport error"
                );
                tokio::time::sleep(delay).await;
            }
        }
        attempts += 1;
    }
}
