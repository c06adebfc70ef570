//! Optional external compression pass.
//!
//! Encoded buffers can be sent to a remote compression service. The call is
//! best effort: it is bounded by a timeout, retried on transient failures,
//! and a final failure leaves the uncompressed buffer in place.

pub(crate) mod provider;
pub(crate) mod retry;
pub(crate) mod tinify;

pub use provider::{resolve_env_var, Compressor, CompressorFactory};
pub use tinify::TinifyCompressor;

use crate::error::PipelineError;
use std::path::Path;
use std::time::Duration;

/// Timeout and retry policy for one compression call.
#[derive(Debug, Clone)]
pub struct CompressOptions {
    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
    /// Maximum retries after the first attempt
    pub retry_attempts: u32,
    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            retry_attempts: 2,
            retry_delay_ms: 500,
        }
    }
}

/// Compress `bytes`, retrying transient failures with exponential backoff.
pub async fn compress_with_retry(
    compressor: &dyn Compressor,
    bytes: &[u8],
    path: &Path,
    options: &CompressOptions,
) -> Result<Vec<u8>, PipelineError> {
    let mut last_error = None;

    for attempt in 0..=options.retry_attempts {
        if attempt > 0 {
            let delay = retry::backoff_duration(attempt - 1, options.retry_delay_ms);
            tracing::debug!(
                "Retry {attempt}/{} compressing {:?} after {delay:?}",
                options.retry_attempts,
                path
            );
            tokio::time::sleep(delay).await;
        }

        let err = match tokio::time::timeout(
            Duration::from_millis(options.timeout_ms),
            compressor.compress(bytes, path),
        )
        .await
        {
            Ok(Ok(compressed)) => return Ok(compressed),
            Ok(Err(e)) => e,
            Err(_) => PipelineError::Timeout {
                path: path.to_path_buf(),
                stage: "compress".to_string(),
                timeout_ms: options.timeout_ms,
            },
        };

        let retryable = retry::is_retryable(&err);
        last_error = Some(err);
        if !retryable {
            break;
        }
    }

    Err(last_error.unwrap_or_else(|| PipelineError::Compression {
        path: path.to_path_buf(),
        message: "no compression attempt was made".to_string(),
        status_code: None,
    }))
}
