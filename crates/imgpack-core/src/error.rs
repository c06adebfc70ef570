//! Error types for the imgpack asset pipeline.
//!
//! Errors are organized by stage so that every message carries the offending
//! path and the stage that produced it.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for imgpack operations.
#[derive(Error, Debug)]
pub enum ImgpackError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline errors, organized by stage.
///
/// Only [`PipelineError::Scan`] aborts a run. Everything else is recorded
/// against the single file that produced it.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A source directory could not be read
    #[error("Scan error for {path}: {message}")]
    Scan { path: PathBuf, message: String },

    /// Image decoding failed
    #[error("Decode error for {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Resizing or serializing the image failed
    #[error("Encode error for {path}: {message}")]
    Encode { path: PathBuf, message: String },

    /// The external compression service rejected or failed the request
    #[error("Compression error for {path}: {message}")]
    Compression {
        path: PathBuf,
        message: String,
        /// HTTP status code when the failure came from a response
        status_code: Option<u16>,
    },

    /// Operation timed out
    #[error("Timeout in {stage} stage for {path} after {timeout_ms}ms")]
    Timeout {
        path: PathBuf,
        stage: String,
        timeout_ms: u64,
    },

    /// The dependency watcher could not be created or extended
    #[error("Watch error for {path}: {message}")]
    Watch { path: PathBuf, message: String },
}

impl PipelineError {
    /// Path of the file or directory the error refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Scan { path, .. }
            | Self::Decode { path, .. }
            | Self::Encode { path, .. }
            | Self::Compression { path, .. }
            | Self::Timeout { path, .. }
            | Self::Watch { path, .. } => path,
        }
    }
}

/// Convenience type alias for imgpack results.
pub type Result<T> = std::result::Result<T, ImgpackError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
