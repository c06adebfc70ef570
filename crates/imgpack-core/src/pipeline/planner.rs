//! Transform planning: target size, format and quality for one image.
//!
//! Planning is pure: it needs only the image's natural dimensions, its
//! source path and the options, so it can be tested without any pixels.

use std::path::Path;

use crate::config::{Dimension, OptionsConfig};
use crate::types::EncodeFormat;

use super::path::get_extension;

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatOption {
    /// Keep each file's own format, inferred from its extension
    Any,
    /// Re-encode every file to this format
    Fixed(EncodeFormat),
}

impl FormatOption {
    /// Parse a configured format. `"*"` and anything unsupported become
    /// [`FormatOption::Any`].
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        match EncodeFormat::parse(s) {
            Some(format) => Self::Fixed(format),
            None => {
                if s != "*" && !s.is_empty() {
                    tracing::warn!(
                        "Unsupported output format '{s}', keeping each file's own format"
                    );
                }
                Self::Any
            }
        }
    }
}

/// Validated transform options, built once when the pipeline is constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOptions {
    pub format: FormatOption,
    pub width: Dimension,
    pub height: Dimension,
    pub no_crop: bool,
    pub quality: u8,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self::from_config(&OptionsConfig::default())
    }
}

impl TransformOptions {
    pub fn from_config(config: &OptionsConfig) -> Self {
        Self {
            format: FormatOption::parse(&config.format),
            width: config.width,
            height: config.height,
            no_crop: config.no_crop,
            quality: config.quality.clamp(1, 100),
        }
    }
}

/// A planned target for one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSize {
    /// Derived from the other axis to preserve the aspect ratio
    Auto,
    Exact(u32),
}

/// Everything the encoder needs to know about one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformPlan {
    pub width: TargetSize,
    pub height: TargetSize,
    pub format: EncodeFormat,
    pub quality: u8,
}

impl TransformPlan {
    /// Concrete output dimensions for an image of the given natural size.
    ///
    /// An automatic axis follows the other axis' scale factor; when both are
    /// automatic the natural size is kept.
    pub fn output_dimensions(&self, natural_width: u32, natural_height: u32) -> (u32, u32) {
        let scaled = |value: u32, from: u32, to: u32| -> u32 {
            if from == 0 {
                return value.max(1);
            }
            ((value as f64 * to as f64 / from as f64).round() as u32).max(1)
        };

        match (self.width, self.height) {
            (TargetSize::Exact(w), TargetSize::Exact(h)) => (w, h),
            (TargetSize::Exact(w), TargetSize::Auto) => {
                (w, scaled(natural_height, natural_width, w))
            }
            (TargetSize::Auto, TargetSize::Exact(h)) => {
                (scaled(natural_width, natural_height, h), h)
            }
            (TargetSize::Auto, TargetSize::Auto) => (natural_width, natural_height),
        }
    }
}

/// Computes transform plans.
pub struct TransformPlanner;

impl TransformPlanner {
    /// Plan the transform for one image.
    ///
    /// `format_override` comes from the image spec and wins over the global
    /// format option.
    pub fn plan(
        options: &TransformOptions,
        natural_width: u32,
        natural_height: u32,
        source: &Path,
        format_override: Option<EncodeFormat>,
    ) -> TransformPlan {
        let (width, height) = Self::target_dimensions(options, natural_width, natural_height);
        TransformPlan {
            width,
            height,
            format: format_override.unwrap_or_else(|| Self::target_format(options, source)),
            quality: options.quality,
        }
    }

    /// Output format for a source file.
    pub fn target_format(options: &TransformOptions, source: &Path) -> EncodeFormat {
        match options.format {
            FormatOption::Fixed(format) => format,
            FormatOption::Any => EncodeFormat::from_extension(&get_extension(source)),
        }
    }

    /// Target dimensions.
    ///
    /// With `no_crop` on a non-square image only the long axis keeps its
    /// configured value; the short axis becomes automatic so the image is
    /// scaled, never cropped. Otherwise each axis resolves independently.
    pub fn target_dimensions(
        options: &TransformOptions,
        natural_width: u32,
        natural_height: u32,
    ) -> (TargetSize, TargetSize) {
        if options.no_crop && natural_width != natural_height {
            if natural_width > natural_height {
                (resolve(options.width, natural_width), TargetSize::Auto)
            } else {
                (TargetSize::Auto, resolve(options.height, natural_height))
            }
        } else {
            (
                resolve(options.width, natural_width),
                resolve(options.height, natural_height),
            )
        }
    }
}

fn resolve(dimension: Dimension, natural: u32) -> TargetSize {
    match dimension {
        Dimension::Auto => TargetSize::Auto,
        Dimension::Pixels(px) => TargetSize::Exact(px),
        // floor(natural * pct / 100), but never a zero-pixel axis
        Dimension::Percent(pct) => {
            let px = u32::try_from(natural as u64 * pct as u64 / 100).unwrap_or(u32::MAX);
            TargetSize::Exact(px.max(1))
        }
    }
}
