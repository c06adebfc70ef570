//! Core data types shared by the pipeline stages.

use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::PipelineError;

/// Encoding formats the pipeline can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodeFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

/// Extensions accepted as image sources and as explicit format names.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp"];

impl EncodeFormat {
    /// Parse an explicit format name (case-insensitive).
    ///
    /// Returns `None` for anything outside [`SUPPORTED_EXTENSIONS`].
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            "bmp" => Some(Self::Bmp),
            _ => None,
        }
    }

    /// Map a file extension to its encoding format.
    ///
    /// Unrecognized extensions fall back to JPEG.
    pub fn from_extension(ext: &str) -> Self {
        Self::parse(ext).unwrap_or(Self::Jpeg)
    }

    /// Matching `image` crate format.
    pub fn image_format(&self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Gif => image::ImageFormat::Gif,
            Self::Bmp => image::ImageFormat::Bmp,
        }
    }
}

impl std::fmt::Display for EncodeFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Gif => "gif",
            Self::Bmp => "bmp",
        };
        f.write_str(name)
    }
}

/// Progress of a single file through the pipeline stages.
///
/// Each stage inspects the previous stage's state before acting, so a
/// failure is carried forward instead of being inferred from missing fields.
#[derive(Debug)]
pub enum FileState {
    /// Not yet decoded
    Pending,
    /// Raster loaded from disk
    Decoded(DynamicImage),
    /// Encoded bytes ready for emission
    Encoded {
        format: EncodeFormat,
        buffer: Vec<u8>,
        /// Whether the external compression pass replaced the buffer
        compressed: bool,
    },
    /// A stage failed; the file is excluded from emission
    Failed(PipelineError),
}

/// A concrete source file resolved from an [`crate::config::ImageSpec`].
///
/// Created fresh on every run and discarded after emission.
#[derive(Debug)]
pub struct ResolvedFile {
    /// Path relative to the image spec root, with `/` separators
    pub name: String,
    /// Absolute path of the source image
    pub source_path: PathBuf,
    /// Destination asset name handed to the host
    pub destination: String,
    /// Per-spec format override, if any
    pub format_override: Option<EncodeFormat>,
    /// Stage state
    pub state: FileState,
}

impl ResolvedFile {
    pub fn new(
        name: impl Into<String>,
        source_path: impl Into<PathBuf>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_path: source_path.into(),
            destination: destination.into(),
            format_override: None,
            state: FileState::Pending,
        }
    }

    /// Encoded buffer, if the file made it through encoding.
    pub fn buffer(&self) -> Option<&[u8]> {
        match &self.state {
            FileState::Encoded { buffer, .. } => Some(buffer),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, FileState::Failed(_))
    }
}

/// Manifest entry describing one emitted asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedAsset {
    /// Destination asset name (forward slashes)
    pub destination: String,
    /// Absolute source path
    pub source: PathBuf,
    /// Encoded format
    pub format: EncodeFormat,
    /// Byte length of the emitted buffer
    pub size: usize,
    /// Whether the external compression pass succeeded
    pub compressed: bool,
}

/// Statistics for a completed run.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RunStats {
    /// Files resolved from the image specs
    pub resolved: usize,

    /// Assets emitted to the host
    pub emitted: usize,

    /// Files excluded from emission after a stage failure
    pub failed: usize,

    /// Assets whose buffer was replaced by the compression pass
    pub compressed: usize,

    /// Total run time in seconds
    pub total_seconds: f64,
}

/// Result of a single pipeline invocation.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Nothing changed since the previous run; no work was done
    Skipped,
    /// All three stages ran
    Completed(RunStats),
}

impl RunOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}
