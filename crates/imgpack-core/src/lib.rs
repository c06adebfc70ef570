//! imgpack core - incremental image transform pipeline.
//!
//! imgpack takes declared image sources (single files or directories),
//! resizes and re-encodes them, optionally sends them through an external
//! compression service, and emits the results as named assets into a host
//! build. Every source is registered with the host as a dependency and
//! watched; a pass with no observed changes is skipped.
//!
//! # Architecture
//!
//! ```text
//! Specs → Scan → [Decode] → [Resize+Encode] → [Compress] → Emit
//! ```
//!
//! Each bracketed stage runs concurrently across files and finishes for all
//! files before the next one starts.
//!
//! # Usage
//!
//! ```rust,ignore
//! use imgpack_core::{Compilation, Config, ImagePipeline};
//!
//! #[tokio::main]
//! async fn main() -> imgpack_core::Result<()> {
//!     let config = Config::load()?;
//!     let mut pipeline = ImagePipeline::new(&config)?;
//!
//!     let mut compilation = Compilation::new();
//!     let outcome = pipeline.run(&mut compilation).await?;
//!     println!("{outcome:?}: {} assets", compilation.assets.len());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod compress;
pub mod config;
pub mod error;
pub mod host;
pub mod output;
pub mod pipeline;
pub mod types;

// Re-exports for convenient access
pub use compress::{Compressor, CompressorFactory};
pub use config::{Config, ImageSpec};
pub use error::{ConfigError, ImgpackError, PipelineError, PipelineResult, Result};
pub use host::{Asset, BuildContext, Compilation, DependencySink};
pub use output::ManifestFormat;
pub use pipeline::{DependencyTracker, Emission, ImagePipeline, TransformOptions};
pub use types::{EmittedAsset, EncodeFormat, RunOutcome, RunStats};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[tokio::test]
    async fn test_pipeline_from_default_config() {
        let config = Config::default();
        let mut pipeline = ImagePipeline::new(&config).unwrap();

        let mut compilation = Compilation::new();
        let outcome = pipeline.run(&mut compilation).await.unwrap();
        assert!(!outcome.is_skipped());
        assert!(compilation.assets.is_empty());
        assert!(pipeline.run(&mut compilation).await.unwrap().is_skipped());
    }
}
