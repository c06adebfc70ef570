//! TinyPNG-compatible compression backend.
//!
//! Uploads the encoded image to `/shrink`, then downloads the compressed
//! result from the URL the service returns.

use super::provider::Compressor;
use super::retry;
use crate::error::PipelineError;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

/// Compressor backed by the Tinify HTTP API.
pub struct TinifyCompressor {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl TinifyCompressor {
    pub fn new(endpoint: &str, api_key: &str) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn shrink_url(&self) -> String {
        format!("{}/shrink", self.endpoint)
    }
}

// --- Response types ---

#[derive(Deserialize)]
struct ShrinkResponse {
    output: ShrinkOutput,
}

#[derive(Deserialize)]
struct ShrinkOutput {
    url: String,
}

/// Map a transport error, tagging connect failures and client timeouts so
/// the retry policy can recognize them.
fn request_error(path: &Path, context: &str, e: reqwest::Error) -> PipelineError {
    let kind = if e.is_connect() {
        retry::CONNECT_FAILED
    } else if e.is_timeout() {
        retry::TIMED_OUT
    } else {
        "request failed"
    };
    PipelineError::Compression {
        path: path.to_path_buf(),
        message: format!("{context}: {kind}: {}", error_chain(&e)),
        status_code: e.status().map(|s| s.as_u16()),
    }
}

/// An error and its sources, joined with `: `.
fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[async_trait]
impl Compressor for TinifyCompressor {
    fn name(&self) -> &str {
        "tinify"
    }

    async fn compress(&self, bytes: &[u8], path: &Path) -> Result<Vec<u8>, PipelineError> {
        let resp = self
            .client
            .post(self.shrink_url())
            .basic_auth("api", Some(&self.api_key))
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| request_error(path, "Tinify upload failed", e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::Compression {
                path: path.to_path_buf(),
                message: format!("Tinify HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }

        let location = resp
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let output_url = match resp.json::<ShrinkResponse>().await {
            Ok(body) => body.output.url,
            Err(e) => location.ok_or_else(|| PipelineError::Compression {
                path: path.to_path_buf(),
                message: format!("Failed to parse Tinify response: {e}"),
                status_code: None,
            })?,
        };

        let resp = self
            .client
            .get(&output_url)
            .basic_auth("api", Some(&self.api_key))
            .send()
            .await
            .map_err(|e| request_error(path, "Tinify download failed", e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::Compression {
                path: path.to_path_buf(),
                message: format!("Tinify download HTTP {status}"),
                status_code: Some(status.as_u16()),
            });
        }

        let compressed = resp
            .bytes()
            .await
            .map_err(|e| request_error(path, "Tinify download failed", e))?;
        if compressed.is_empty() {
            return Err(PipelineError::Compression {
                path: path.to_path_buf(),
                message: "Tinify returned an empty image".to_string(),
                status_code: None,
            });
        }

        Ok(compressed.to_vec())
    }
}
