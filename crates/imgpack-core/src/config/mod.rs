//! Configuration management for imgpack.
//!
//! Configuration is loaded from a TOML file (by default in the platform config
//! directory) with sensible defaults for every section.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration structure for imgpack.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Transform options applied to every image
    pub options: OptionsConfig,

    /// Stage timeouts
    pub limits: LimitsConfig,

    /// Compression service settings
    pub compression: CompressionConfig,

    /// Output settings for the CLI host
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingConfig,

    /// Declared image sources
    pub images: Vec<ImageSpec>,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    ///
    /// Relative image sources and output paths are resolved against the
    /// directory containing the config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.imgpack.imgpack/config.toml
    /// - Linux: ~/.config/imgpack/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\imgpack\config\config.toml
    ///
    /// Falls back to ~/.imgpack/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "imgpack", "imgpack")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".imgpack").join("config.toml")
            })
    }

    /// Expand `~` in image sources and output paths, and anchor relative
    /// ones at `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        for spec in &mut self.images {
            spec.src = resolve_path(base, &spec.src);
        }
        self.output.dir = resolve_path(base, &self.output.dir);
        if let Some(manifest) = self.output.manifest.take() {
            self.output.manifest = Some(resolve_path(base, &manifest));
        }
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

fn resolve_path(base: &Path, path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = PathBuf::from(shellexpand::tilde(&path_str).into_owned());
    if expanded.is_absolute() {
        expanded
    } else {
        base.join(expanded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.options.format, "*");
        assert_eq!(config.options.quality, 100);
        assert_eq!(config.limits.compression_timeout_ms, 30000);
        assert!(config.images.is_empty());
    }

    #[test]
    fn test_config_to_toml() {
        let mut config = Config::default();
        config.images.push(ImageSpec::new("/assets/dir", "assets/dir"));
        let toml = config.to_toml().unwrap();
        assert!(toml.contains("[options]"));
        assert!(toml.contains("[[images]]"));
    }

    #[test]
    fn test_load_from_resolves_relative_sources() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imgpack.toml");
        std::fs::write(
            &path,
            r#"
[options]
width = "50%"
no_crop = true

[output]
dir = "build"

[[images]]
src = "assets/1.png"
dest = "assets/1.png"

[[images]]
src = "/abs/dir"
dest = "assets/dir"
format = "png"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.options.width, Dimension::Percent(50));
        assert!(config.options.no_crop);
        assert_eq!(config.images[0].src, dir.path().join("assets/1.png"));
        assert_eq!(config.images[1].src, PathBuf::from("/abs/dir"));
        assert_eq!(config.images[1].format.as_deref(), Some("png"));
        assert_eq!(config.output.dir, dir.path().join("build"));
    }

    #[test]
    fn test_load_from_rejects_invalid_quality() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("imgpack.toml");
        std::fs::write(&path, "[options]\nquality = 0\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
