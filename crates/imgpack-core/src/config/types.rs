//! Sub-configuration structs and their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// A configured target dimension.
///
/// Accepts an integer (`120`), a percentage of the natural size (`"50%"`) or
/// the automatic marker (`"auto"`). Zero is treated as automatic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawDimension", into = "RawDimension")]
pub enum Dimension {
    /// Derived from the other axis, preserving the aspect ratio
    #[default]
    Auto,
    /// Exact pixel count
    Pixels(u32),
    /// Percentage of the natural dimension
    Percent(u32),
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        if let Some(pct) = s.strip_suffix('%') {
            return pct
                .trim()
                .parse::<u32>()
                .map(Self::Percent)
                .map_err(|_| format!("invalid percentage dimension '{s}'"));
        }
        s.parse::<u32>()
            .map(|px| if px == 0 { Self::Auto } else { Self::Pixels(px) })
            .map_err(|_| format!("invalid dimension '{s}' (expected pixels, \"N%\" or \"auto\")"))
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Pixels(px) => write!(f, "{px}"),
            Self::Percent(pct) => write!(f, "{pct}%"),
        }
    }
}

/// On-disk shape of a [`Dimension`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum RawDimension {
    Number(u32),
    Text(String),
}

impl TryFrom<RawDimension> for Dimension {
    type Error = String;

    fn try_from(raw: RawDimension) -> Result<Self, Self::Error> {
        match raw {
            RawDimension::Number(0) => Ok(Self::Auto),
            RawDimension::Number(px) => Ok(Self::Pixels(px)),
            RawDimension::Text(s) => s.parse(),
        }
    }
}

impl From<Dimension> for RawDimension {
    fn from(dim: Dimension) -> Self {
        match dim {
            Dimension::Pixels(px) => RawDimension::Number(px),
            other => RawDimension::Text(other.to_string()),
        }
    }
}

/// Transform options applied to every image.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsConfig {
    /// Output format: png, jpg, jpeg, gif, bmp or "*" (keep each file's own)
    pub format: String,

    /// Target width
    pub width: Dimension,

    /// Target height
    pub height: Dimension,

    /// Never crop non-square images: only the long axis takes its configured value
    pub no_crop: bool,

    /// Encoder quality, 1..=100
    pub quality: u8,

    /// External compression pass
    pub tinify: TinifyConfig,
}

impl Default for OptionsConfig {
    fn default() -> Self {
        Self {
            format: "*".to_string(),
            width: Dimension::Auto,
            height: Dimension::Auto,
            no_crop: false,
            quality: 100,
            tinify: TinifyConfig::default(),
        }
    }
}

/// External compression (TinyPNG-compatible) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TinifyConfig {
    /// Whether to run the compression pass
    pub enabled: bool,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,
}

impl Default for TinifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: "${TINIFY_API_KEY}".to_string(),
        }
    }
}

/// One declared source-to-destination mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    /// Source file or directory
    pub src: PathBuf,

    /// Logical output path (asset name, or asset directory for a source directory)
    pub dest: String,

    /// Per-spec format override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl ImageSpec {
    pub fn new(src: impl Into<PathBuf>, dest: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            dest: dest.into(),
            format: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// Stage timeouts and size limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum output dimension (width or height)
    pub max_image_dimension: u32,

    /// Decode timeout in milliseconds
    pub decode_timeout_ms: u64,

    /// Resize + encode timeout in milliseconds
    pub encode_timeout_ms: u64,

    /// External compression round-trip timeout in milliseconds
    pub compression_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_image_dimension: 10000,
            decode_timeout_ms: 5000,
            encode_timeout_ms: 10000,
            compression_timeout_ms: 30000,
        }
    }
}

/// Compression service endpoint and retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Service base URL
    pub endpoint: String,

    /// Max retry attempts for transient failures
    pub retry_attempts: u32,

    /// Base delay between retries in milliseconds
    pub retry_delay_ms: u64,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.tinify.com".to_string(),
            retry_attempts: 2,
            retry_delay_ms: 500,
        }
    }
}

/// Where the CLI host writes emitted assets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Output directory for emitted assets
    pub dir: PathBuf,

    /// Optional manifest file listing emitted assets
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manifest: Option<PathBuf>,

    /// Pretty-print the manifest
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("dist"),
            manifest: None,
            pretty: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize, Serialize)]
    struct Probe {
        value: Dimension,
    }

    fn parse(value: &str) -> Result<Dimension, toml::de::Error> {
        toml::from_str::<Probe>(&format!("value = {value}")).map(|p| p.value)
    }

    #[test]
    fn test_dimension_from_toml() {
        assert_eq!(parse("120").unwrap(), Dimension::Pixels(120));
        assert_eq!(parse("\"50%\"").unwrap(), Dimension::Percent(50));
        assert_eq!(parse("\"auto\"").unwrap(), Dimension::Auto);
        assert_eq!(parse("\"AUTO\"").unwrap(), Dimension::Auto);
        assert_eq!(parse("0").unwrap(), Dimension::Auto);
        assert_eq!(parse("\"64\"").unwrap(), Dimension::Pixels(64));
        assert!(parse("\"wide\"").is_err());
        assert!(parse("\"x%\"").is_err());
    }

    #[test]
    fn test_dimension_serializes_back() {
        let toml = toml::to_string(&Probe {
            value: Dimension::Percent(25),
        })
        .unwrap();
        assert!(toml.contains("\"25%\""));

        let toml = toml::to_string(&Probe {
            value: Dimension::Pixels(300),
        })
        .unwrap();
        assert!(toml.contains("value = 300"));
    }

    #[test]
    fn test_options_defaults() {
        let options = OptionsConfig::default();
        assert_eq!(options.format, "*");
        assert_eq!(options.width, Dimension::Auto);
        assert_eq!(options.quality, 100);
        assert!(!options.no_crop);
        assert!(!options.tinify.enabled);
    }

    #[test]
    fn test_image_spec_format_is_optional() {
        let spec: ImageSpec = toml::from_str("src = \"assets/1.png\"\ndest = \"a/1.png\"").unwrap();
        assert_eq!(spec, ImageSpec::new("assets/1.png", "a/1.png"));
    }
}
