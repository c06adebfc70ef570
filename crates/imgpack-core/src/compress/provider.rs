//! Compressor trait and factory.
//!
//! Defines the interface every external compression backend implements,
//! plus the factory that creates the configured backend.

use crate::config::Config;
use crate::error::{ConfigError, PipelineError};
use async_trait::async_trait;
use std::path::Path;

/// Trait that all compression backends implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Arc<dyn Compressor>` for dynamic dispatch).
#[async_trait]
pub trait Compressor: Send + Sync {
    /// Backend name for logging (e.g., "tinify").
    fn name(&self) -> &str;

    /// Compress an encoded image. `path` identifies the source in errors.
    async fn compress(&self, bytes: &[u8], path: &Path) -> Result<Vec<u8>, PipelineError>;
}

/// Expand `$VAR` / `${VAR}` references in a config string.
///
/// Returns `None` when a referenced variable is unset or the result is empty.
pub fn resolve_env_var(value: &str) -> Option<String> {
    shellexpand::env(value)
        .ok()
        .map(|expanded| expanded.into_owned())
        .filter(|v| !v.is_empty())
}

/// Factory that creates the configured compression backend.
pub struct CompressorFactory;

impl CompressorFactory {
    /// Create the compressor described by `config`.
    ///
    /// Returns `Ok(None)` when the compression pass is disabled.
    pub fn create(config: &Config) -> Result<Option<Box<dyn Compressor>>, ConfigError> {
        let tinify = &config.options.tinify;
        if !tinify.enabled {
            return Ok(None);
        }
        let api_key = resolve_env_var(&tinify.api_key).ok_or_else(|| {
            ConfigError::ValidationError(
                "Tinify API key not set. Set TINIFY_API_KEY env var or options.tinify.api_key."
                    .to_string(),
            )
        })?;
        Ok(Some(Box::new(super::tinify::TinifyCompressor::new(
            &config.compression.endpoint,
            &api_key,
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_env_var() {
        // Non-env-var strings pass through
        assert_eq!(resolve_env_var("plain-key"), Some("plain-key".to_string()));
        // Empty returns None
        assert_eq!(resolve_env_var(""), None);
        // Unset env var returns None
        assert_eq!(resolve_env_var("${DEFINITELY_NOT_SET_XYZ_123}"), None);
    }

    #[test]
    fn test_resolve_env_var_expands_embedded_references() {
        std::env::set_var("IMGPACK_TEST_TINIFY_KEY", "abc123");
        assert_eq!(
            resolve_env_var("${IMGPACK_TEST_TINIFY_KEY}"),
            Some("abc123".to_string())
        );
        assert_eq!(
            resolve_env_var("prefix-${IMGPACK_TEST_TINIFY_KEY}"),
            Some("prefix-abc123".to_string())
        );
        assert_eq!(resolve_env_var("key-${IMGPACK_TEST_UNSET_VAR_789}"), None);
    }

    #[test]
    fn test_factory_disabled_returns_none() {
        let config = Config::default();
        assert!(CompressorFactory::create(&config).unwrap().is_none());
    }

    #[test]
    fn test_factory_requires_key_when_enabled() {
        let mut config = Config::default();
        config.options.tinify.enabled = true;
        config.options.tinify.api_key = "${DEFINITELY_NOT_SET_XYZ_456}".to_string();
        let err = match CompressorFactory::create(&config) {
            Err(e) => e,
            Ok(_) => panic!("expected missing key error"),
        };
        assert!(err.to_string().contains("API key not set"));
    }

    #[test]
    fn test_factory_builds_tinify() {
        let mut config = Config::default();
        config.options.tinify.enabled = true;
        config.options.tinify.api_key = "literal".to_string();
        let compressor = CompressorFactory::create(&config).unwrap().unwrap();
        assert_eq!(compressor.name(), "tinify");
    }
}
