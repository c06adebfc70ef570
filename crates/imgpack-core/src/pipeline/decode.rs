//! Image decoding with format detection and timeout support.

use image::{DynamicImage, ImageFormat};
use std::path::Path;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::PipelineError;

/// Image decoder with a configurable timeout.
pub struct ImageDecoder {
    limits: LimitsConfig,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Read and decode an image from disk.
    pub async fn decode(&self, path: &Path) -> Result<DynamicImage, PipelineError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot read file: {}", e),
            })?;
        self.decode_from_bytes(bytes, path).await
    }

    /// Decode an image from an in-memory byte buffer with timeout.
    pub async fn decode_from_bytes(
        &self,
        bytes: Vec<u8>,
        path: &Path,
    ) -> Result<DynamicImage, PipelineError> {
        let path_owned = path.to_path_buf();
        let timeout_duration = Duration::from_millis(self.limits.decode_timeout_ms);

        let decode_result = timeout(timeout_duration, async {
            tokio::task::spawn_blocking(move || Self::decode_bytes_sync(bytes, &path_owned)).await
        })
        .await;

        match decode_result {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Task join error: {}", e),
            }),
            Err(_) => Err(PipelineError::Timeout {
                path: path.to_path_buf(),
                stage: "decode".to_string(),
                timeout_ms: self.limits.decode_timeout_ms,
            }),
        }
    }

    /// Synchronous decode from bytes (runs in spawn_blocking).
    ///
    /// The format is sniffed from the content first and only then guessed
    /// from the extension.
    fn decode_bytes_sync(bytes: Vec<u8>, path: &Path) -> Result<DynamicImage, PipelineError> {
        use std::io::Cursor;

        let mut reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::Decode {
                path: path.to_path_buf(),
                message: format!("Cannot detect image format: {}", e),
            })?;
        if reader.format().is_none() {
            match ImageFormat::from_path(path) {
                Ok(format) => reader.set_format(format),
                Err(_) => {
                    return Err(PipelineError::Decode {
                        path: path.to_path_buf(),
                        message: "Unrecognized image format".to_string(),
                    })
                }
            }
        }
        reader.decode().map_err(|e| PipelineError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn write_png(path: &Path, width: u32, height: u32) {
        DynamicImage::new_rgb8(width, height).save(path).unwrap();
    }

    #[test]
    fn test_format_detected_by_content() {
        // A PNG saved under a .jpg name still decodes
        let dir = tempfile::tempdir().unwrap();
        let png = dir.path().join("test.png");
        write_png(&png, 8, 4);
        let misnamed = dir.path().join("test_misnamed.jpg");
        std::fs::copy(&png, &misnamed).unwrap();

        let bytes = std::fs::read(&misnamed).unwrap();
        let image = ImageDecoder::decode_bytes_sync(bytes, &misnamed).unwrap();
        assert_eq!(image.dimensions(), (8, 4));
    }

    #[tokio::test]
    async fn test_decode_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        write_png(&path, 20, 10);

        let decoder = ImageDecoder::new(LimitsConfig::default());
        let image = decoder.decode(&path).await.unwrap();
        assert_eq!(image.dimensions(), (20, 10));
    }

    #[tokio::test]
    async fn test_decode_garbage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();

        let decoder = ImageDecoder::new(LimitsConfig::default());
        let err = decoder.decode(&path).await.unwrap_err();
        assert!(matches!(err, PipelineError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_decode_missing_file_fails() {
        let decoder = ImageDecoder::new(LimitsConfig::default());
        let err = decoder
            .decode(Path::new("/definitely/missing.png"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Cannot read file"));
    }
}
