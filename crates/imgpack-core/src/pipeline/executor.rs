//! Per-file transform operations.
//!
//! Each operation takes a [`ResolvedFile`], advances its [`FileState`] by one
//! stage and hands it back. Failures are logged with the offending path and
//! recorded on that file only.

use image::GenericImageView;
use std::sync::Arc;

use crate::compress::{compress_with_retry, CompressOptions, Compressor};
use crate::config::LimitsConfig;
use crate::types::{FileState, ResolvedFile};

use super::decode::ImageDecoder;
use super::encode::ImageEncoder;
use super::planner::{TransformOptions, TransformPlanner};

/// Runs decode, resize+encode and compression for individual files.
pub struct TransformExecutor {
    options: TransformOptions,
    decoder: ImageDecoder,
    encoder: ImageEncoder,
    compressor: Option<Arc<dyn Compressor>>,
    compress_options: CompressOptions,
}

impl TransformExecutor {
    pub fn new(options: TransformOptions, limits: LimitsConfig) -> Self {
        Self {
            options,
            decoder: ImageDecoder::new(limits.clone()),
            encoder: ImageEncoder::new(limits.clone()),
            compressor: None,
            compress_options: CompressOptions {
                timeout_ms: limits.compression_timeout_ms,
                ..CompressOptions::default()
            },
        }
    }

    /// Enable the external compression pass.
    pub fn with_compressor(
        mut self,
        compressor: Arc<dyn Compressor>,
        options: CompressOptions,
    ) -> Self {
        self.compressor = Some(compressor);
        self.compress_options = options;
        self
    }

    /// Stage 1: load the raster from disk.
    pub async fn decode(&self, mut file: ResolvedFile) -> ResolvedFile {
        if !matches!(file.state, FileState::Pending) {
            return file;
        }
        file.state = match self.decoder.decode(&file.source_path).await {
            Ok(image) => FileState::Decoded(image),
            Err(e) => {
                tracing::error!("Error reading {:?}: {e}", file.source_path);
                FileState::Failed(e)
            }
        };
        file
    }

    /// Stage 2: resize to the planned size and serialize.
    ///
    /// Files that failed to decode pass through untouched.
    pub async fn encode(&self, mut file: ResolvedFile) -> ResolvedFile {
        let image = match std::mem::replace(&mut file.state, FileState::Pending) {
            FileState::Decoded(image) => image,
            other => {
                file.state = other;
                return file;
            }
        };

        let (width, height) = image.dimensions();
        let plan = TransformPlanner::plan(
            &self.options,
            width,
            height,
            &file.source_path,
            file.format_override,
        );
        tracing::debug!(
            "Encoding {:?}: {}x{} -> {:?}x{:?} as {}",
            file.source_path,
            width,
            height,
            plan.width,
            plan.height,
            plan.format
        );

        file.state = match self.encoder.encode(image, plan, &file.source_path).await {
            Ok(buffer) => FileState::Encoded {
                format: plan.format,
                buffer,
                compressed: false,
            },
            Err(e) => {
                tracing::error!("Error encoding {:?}: {e}", file.source_path);
                FileState::Failed(e)
            }
        };
        file
    }

    /// Stage 3: run the external compression pass, if enabled.
    ///
    /// On failure the uncompressed buffer is kept.
    pub async fn compress(&self, mut file: ResolvedFile) -> ResolvedFile {
        let Some(compressor) = self.compressor.as_deref() else {
            return file;
        };
        let FileState::Encoded {
            buffer, compressed, ..
        } = &mut file.state
        else {
            return file;
        };

        match compress_with_retry(compressor, buffer, &file.source_path, &self.compress_options)
            .await
        {
            Ok(result) => {
                tracing::debug!(
                    "Compressed {:?}: {} -> {} bytes",
                    file.source_path,
                    buffer.len(),
                    result.len()
                );
                *buffer = result;
                *compressed = true;
            }
            Err(e) => {
                tracing::warn!(
                    "Compression via {} failed for {:?}, keeping encoded output: {e}",
                    compressor.name(),
                    file.source_path
                );
            }
        }
        file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::tests::MockCompressor;
    use crate::error::PipelineError;
    use crate::types::EncodeFormat;
    use image::DynamicImage;
    use std::path::Path;

    fn executor() -> TransformExecutor {
        TransformExecutor::new(TransformOptions::default(), LimitsConfig::default())
    }

    fn encoded(bytes: Vec<u8>) -> ResolvedFile {
        let mut file = ResolvedFile::new("a.png", "/src/a.png", "out/a.png");
        file.state = FileState::Encoded {
            format: EncodeFormat::Png,
            buffer: bytes,
            compressed: false,
        };
        file
    }

    fn fast_compress() -> CompressOptions {
        CompressOptions {
            timeout_ms: 1000,
            retry_attempts: 0,
            retry_delay_ms: 1,
        }
    }

    #[tokio::test]
    async fn test_decode_then_encode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.gif");
        DynamicImage::new_rgb8(12, 6).save(&path).unwrap();

        let exec = executor();
        let file = exec.decode(ResolvedFile::new("a.gif", &path, "out/a.gif")).await;
        assert!(matches!(file.state, FileState::Decoded(_)));

        let file = exec.encode(file).await;
        match &file.state {
            FileState::Encoded { format, buffer, .. } => {
                assert_eq!(*format, EncodeFormat::Gif);
                assert_eq!(&buffer[0..4], b"GIF8");
            }
            other => panic!("expected encoded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_failed_decode_skips_encode() {
        let exec = executor();
        let file = exec
            .decode(ResolvedFile::new("x.png", "/missing/x.png", "out/x.png"))
            .await;
        assert!(file.is_failed());

        let file = exec.encode(file).await;
        assert!(matches!(
            file.state,
            FileState::Failed(PipelineError::Decode { .. })
        ));
        assert!(file.buffer().is_none());
    }

    #[tokio::test]
    async fn test_format_override_applies() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        DynamicImage::new_rgb8(4, 4).save(&path).unwrap();

        let exec = executor();
        let mut file = ResolvedFile::new("a.png", &path, "out/a.png");
        file.format_override = Some(EncodeFormat::Bmp);
        let file = exec.encode(exec.decode(file).await).await;
        assert_eq!(&file.buffer().unwrap()[0..2], b"BM");
    }

    #[tokio::test]
    async fn test_compress_disabled_is_pass_through() {
        let file = executor().compress(encoded(vec![1, 2, 3, 4])).await;
        assert_eq!(file.buffer(), Some(&[1u8, 2, 3, 4][..]));
    }

    #[tokio::test]
    async fn test_compress_replaces_buffer() {
        let exec = executor().with_compressor(Arc::new(MockCompressor::halving()), fast_compress());
        let file = exec.compress(encoded(vec![1, 2, 3, 4])).await;
        match file.state {
            FileState::Encoded {
                buffer, compressed, ..
            } => {
                assert_eq!(buffer, vec![1, 2]);
                assert!(compressed);
            }
            other => panic!("expected encoded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_compress_failure_keeps_encoded_bytes() {
        let exec = executor().with_compressor(
            Arc::new(MockCompressor::failing(Some(401), "Unauthorized")),
            fast_compress(),
        );
        let file = exec.compress(encoded(vec![7, 7, 7])).await;
        match file.state {
            FileState::Encoded {
                buffer, compressed, ..
            } => {
                assert_eq!(buffer, vec![7, 7, 7]);
                assert!(!compressed);
            }
            other => panic!("expected encoded, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_compress_skips_failed_files() {
        let mock = MockCompressor::halving();
        let calls = mock.call_count_handle();
        let exec = executor().with_compressor(Arc::new(mock), fast_compress());

        let mut file = ResolvedFile::new("a.png", Path::new("/a.png"), "a.png");
        file.state = FileState::Failed(PipelineError::Decode {
            path: "/a.png".into(),
            message: "bad".to_string(),
        });
        let file = exec.compress(file).await;
        assert!(file.is_failed());
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 0);
    }
}
