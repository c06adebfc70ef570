//! Resizing and re-encoding.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};
use std::io::Cursor;
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::PipelineError;
use crate::types::EncodeFormat;

use super::planner::TransformPlan;

/// Applies a [`TransformPlan`] to a decoded image and serializes the result.
pub struct ImageEncoder {
    limits: LimitsConfig,
}

impl ImageEncoder {
    /// Create a new encoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Resize and encode off the async runtime, bounded by the encode timeout.
    ///
    /// A plan whose output exceeds `max_image_dimension` on either axis fails
    /// before any pixels are allocated.
    pub async fn encode(
        &self,
        image: DynamicImage,
        plan: TransformPlan,
        path: &Path,
    ) -> Result<Vec<u8>, PipelineError> {
        let (natural_width, natural_height) = image.dimensions();
        let (width, height) = plan.output_dimensions(natural_width, natural_height);
        let max_dim = self.limits.max_image_dimension;
        if width > max_dim || height > max_dim {
            return Err(PipelineError::Encode {
                path: path.to_path_buf(),
                message: format!(
                    "Planned output {width}x{height} exceeds the {max_dim}px dimension limit"
                ),
            });
        }

        let path_owned = path.to_path_buf();
        let timeout_duration = Duration::from_millis(self.limits.encode_timeout_ms);

        let result = timeout(timeout_duration, async {
            tokio::task::spawn_blocking(move || Self::encode_sync(&image, &plan, &path_owned))
                .await
        })
        .await;

        match result {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(PipelineError::Encode {
                path: path.to_path_buf(),
                message: format!("Task join error: {}", e),
            }),
            Err(_) => Err(PipelineError::Timeout {
                path: path.to_path_buf(),
                stage: "encode".to_string(),
                timeout_ms: self.limits.encode_timeout_ms,
            }),
        }
    }

    /// Resize to the planned dimensions and serialize to the planned format.
    ///
    /// Quality only affects JPEG output; the other formats are lossless.
    pub fn encode_sync(
        image: &DynamicImage,
        plan: &TransformPlan,
        path: &Path,
    ) -> Result<Vec<u8>, PipelineError> {
        let (natural_width, natural_height) = image.dimensions();
        let (width, height) = plan.output_dimensions(natural_width, natural_height);

        let resized;
        let image = if (width, height) == (natural_width, natural_height) {
            image
        } else {
            resized = image.resize_exact(width, height, FilterType::Triangle);
            &resized
        };

        let mut buffer = Cursor::new(Vec::new());
        let result = match plan.format {
            EncodeFormat::Jpeg => {
                let rgb = DynamicImage::ImageRgb8(image.to_rgb8());
                let encoder = JpegEncoder::new_with_quality(&mut buffer, plan.quality);
                rgb.write_with_encoder(encoder)
            }
            EncodeFormat::Gif | EncodeFormat::Bmp => {
                let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
                rgba.write_to(&mut buffer, plan.format.image_format())
            }
            EncodeFormat::Png => match image {
                DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_) => {
                    DynamicImage::ImageRgba8(image.to_rgba8())
                        .write_to(&mut buffer, plan.format.image_format())
                }
                _ => image.write_to(&mut buffer, plan.format.image_format()),
            },
        };

        result.map_err(|e| PipelineError::Encode {
            path: path.to_path_buf(),
            message: format!("Cannot encode {}: {}", plan.format, e),
        })?;
        Ok(buffer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::planner::TargetSize;

    fn plan(width: TargetSize, height: TargetSize, format: EncodeFormat) -> TransformPlan {
        TransformPlan {
            width,
            height,
            format,
            quality: 90,
        }
    }

    fn decode(bytes: &[u8]) -> DynamicImage {
        image::load_from_memory(bytes).unwrap()
    }

    #[test]
    fn test_resize_to_exact_png() {
        let img = DynamicImage::new_rgb8(200, 100);
        let p = plan(TargetSize::Exact(100), TargetSize::Exact(50), EncodeFormat::Png);
        let bytes = ImageEncoder::encode_sync(&img, &p, Path::new("a.png")).unwrap();

        assert_eq!(&bytes[1..4], b"PNG");
        assert_eq!(decode(&bytes).dimensions(), (100, 50));
    }

    #[test]
    fn test_auto_height_preserves_aspect() {
        let img = DynamicImage::new_rgba8(300, 100);
        let p = plan(TargetSize::Exact(150), TargetSize::Auto, EncodeFormat::Png);
        let bytes = ImageEncoder::encode_sync(&img, &p, Path::new("a.png")).unwrap();
        assert_eq!(decode(&bytes).dimensions(), (150, 50));
    }

    #[test]
    fn test_jpeg_from_rgba_source() {
        let img = DynamicImage::new_rgba8(40, 40);
        let p = plan(TargetSize::Auto, TargetSize::Auto, EncodeFormat::Jpeg);
        let bytes = ImageEncoder::encode_sync(&img, &p, Path::new("a.png")).unwrap();
        // JPEG SOI marker
        assert_eq!(&bytes[0..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_lower_quality_shrinks_jpeg() {
        let mut img = image::RgbImage::new(64, 64);
        for (x, y, px) in img.enumerate_pixels_mut() {
            *px = image::Rgb([(x * 4) as u8, (y * 4) as u8, ((x ^ y) * 4) as u8]);
        }
        let img = DynamicImage::ImageRgb8(img);

        let high = TransformPlan {
            quality: 100,
            ..plan(TargetSize::Auto, TargetSize::Auto, EncodeFormat::Jpeg)
        };
        let low = TransformPlan { quality: 10, ..high };

        let high = ImageEncoder::encode_sync(&img, &high, Path::new("a.jpg")).unwrap();
        let low = ImageEncoder::encode_sync(&img, &low, Path::new("a.jpg")).unwrap();
        assert!(low.len() < high.len());
    }

    #[test]
    fn test_gif_and_bmp_signatures() {
        let img = DynamicImage::new_rgb8(16, 8);
        let gif = ImageEncoder::encode_sync(
            &img,
            &plan(TargetSize::Auto, TargetSize::Auto, EncodeFormat::Gif),
            Path::new("a.gif"),
        )
        .unwrap();
        assert_eq!(&gif[0..4], b"GIF8");

        let bmp = ImageEncoder::encode_sync(
            &img,
            &plan(TargetSize::Auto, TargetSize::Auto, EncodeFormat::Bmp),
            Path::new("a.bmp"),
        )
        .unwrap();
        assert_eq!(&bmp[0..2], b"BM");
    }

    #[tokio::test]
    async fn test_async_encode() {
        let encoder = ImageEncoder::new(LimitsConfig::default());
        let bytes = encoder
            .encode(
                DynamicImage::new_rgb8(10, 10),
                plan(TargetSize::Exact(5), TargetSize::Exact(5), EncodeFormat::Png),
                Path::new("a.png"),
            )
            .await
            .unwrap();
        assert_eq!(decode(&bytes).dimensions(), (5, 5));
    }

    #[tokio::test]
    async fn test_oversized_plan_is_rejected() {
        let encoder = ImageEncoder::new(LimitsConfig {
            max_image_dimension: 1000,
            ..LimitsConfig::default()
        });
        let err = encoder
            .encode(
                DynamicImage::new_rgb8(200, 100),
                plan(TargetSize::Exact(u32::MAX), TargetSize::Auto, EncodeFormat::Png),
                Path::new("huge.png"),
            )
            .await
            .unwrap_err();
        match err {
            PipelineError::Encode { path, message } => {
                assert_eq!(path, Path::new("huge.png"));
                assert!(message.contains("1000px"));
            }
            other => panic!("expected encode error, got {other}"),
        }
    }
}
