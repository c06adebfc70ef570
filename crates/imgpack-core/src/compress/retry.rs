//! Retry utilities for transient compression failures.
//!
//! Provides classification of retryable errors and exponential backoff.

use crate::error::PipelineError;
use std::time::Duration;

/// Message tag for requests that never reached the service.
pub(crate) const CONNECT_FAILED: &str = "connection failed";

/// Message tag for requests the HTTP client gave up on.
pub(crate) const TIMED_OUT: &str = "request timed out";

/// Determine whether a pipeline error is worth retrying.
///
/// Retryable errors: timeouts, rate limits (429), server errors (5xx).
/// Non-retryable: auth failures, bad requests, unsupported input.
pub fn is_retryable(error: &PipelineError) -> bool {
    match error {
        PipelineError::Timeout { .. } => true,
        PipelineError::Compression {
            status_code,
            message,
            ..
        } => {
            if let Some(code) = status_code {
                return *code == 429 || (500..=599).contains(code);
            }
            // Transport failures carry no status; backends tag them instead
            message.contains(CONNECT_FAILED) || message.contains(TIMED_OUT)
        }
        _ => false,
    }
}

/// Calculate exponential backoff duration for a given attempt.
///
/// Uses `base_delay * 2^attempt` with a cap at 30 seconds.
pub fn backoff_duration(attempt: u32, base_delay_ms: u64) -> Duration {
    let delay = base_delay_ms.saturating_mul(2u64.saturating_pow(attempt));
    Duration::from_millis(delay.min(30_000))
}
