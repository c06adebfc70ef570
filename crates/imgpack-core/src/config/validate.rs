//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    ///
    /// An unknown `options.format` is not an error here: it is coerced to
    /// `"*"` when the pipeline is constructed.
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.options.quality == 0 || self.options.quality > 100 {
            return Err(ConfigError::ValidationError(
                "options.quality must be between 1 and 100".into(),
            ));
        }
        if self.limits.max_image_dimension == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_image_dimension must be > 0".into(),
            ));
        }
        if self.limits.decode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.decode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.encode_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.encode_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.compression_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.compression_timeout_ms must be > 0".into(),
            ));
        }
        if self.options.tinify.enabled && self.compression.endpoint.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "compression.endpoint must be set when options.tinify.enabled".into(),
            ));
        }
        for (i, spec) in self.images.iter().enumerate() {
            if spec.dest.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "images[{i}].dest must not be empty"
                )));
            }
            if spec.src.as_os_str().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "images[{i}].src must not be empty"
                )));
            }
        }
        Ok(())
    }
}
