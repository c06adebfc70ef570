//! Pipeline orchestration - wires together all processing stages.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use crate::compress::{CompressOptions, Compressor, CompressorFactory};
use crate::config::{Config, ImageSpec, LimitsConfig};
use crate::error::{PipelineResult, Result};
use crate::host::{Asset, BuildContext};
use crate::types::{EmittedAsset, EncodeFormat, FileState, ResolvedFile, RunOutcome, RunStats};

use super::discovery::SourceExpander;
use super::executor::TransformExecutor;
use super::path::{is_exists, is_folder, normalize_separators};
use super::planner::TransformOptions;
use super::stage::barrier;
use super::tracker::DependencyTracker;

/// Output of the last completed run, kept so hosts can recover it after a
/// skipped pass.
#[derive(Debug, Clone, Default)]
pub struct Emission {
    pub assets: BTreeMap<String, Asset>,
    pub manifest: Vec<EmittedAsset>,
}

/// The incremental image pipeline.
///
/// Constructed once per host process. Each [`ImagePipeline::run`] is one
/// build pass: scan the image specs, skip if nothing changed, otherwise decode,
/// encode and compress every file in barrier-separated stages and emit the
/// results.
pub struct ImagePipeline {
    specs: Vec<ImageSpec>,
    expander: SourceExpander,
    tracker: Arc<DependencyTracker>,
    executor: TransformExecutor,
    last_emission: Emission,
}

impl ImagePipeline {
    /// Create a pipeline from configuration.
    ///
    /// Builds the compression backend when `options.tinify.enabled` is set.
    pub fn new(config: &Config) -> Result<Self> {
        let mut pipeline = Self::with_options(
            config.images.clone(),
            TransformOptions::from_config(&config.options),
            config.limits.clone(),
        );
        if let Some(compressor) = CompressorFactory::create(config)? {
            tracing::debug!("External compression enabled via {}", compressor.name());
            let options = CompressOptions {
                timeout_ms: config.limits.compression_timeout_ms,
                retry_attempts: config.compression.retry_attempts,
                retry_delay_ms: config.compression.retry_delay_ms,
            };
            pipeline = pipeline.with_compressor(Arc::from(compressor), options);
        }
        Ok(pipeline)
    }

    /// Create a pipeline from already-validated parts, without compression.
    pub fn with_options(
        specs: Vec<ImageSpec>,
        options: TransformOptions,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            specs,
            expander: SourceExpander::default(),
            tracker: Arc::new(DependencyTracker::new()),
            executor: TransformExecutor::new(options, limits),
            last_emission: Emission::default(),
        }
    }

    /// Enable the external compression pass.
    pub fn with_compressor(
        mut self,
        compressor: Arc<dyn Compressor>,
        options: CompressOptions,
    ) -> Self {
        self.executor = self.executor.with_compressor(compressor, options);
        self
    }

    /// Shared handle to the dependency tracker (for hosts waiting on changes).
    pub fn tracker(&self) -> Arc<DependencyTracker> {
        Arc::clone(&self.tracker)
    }

    /// Output of the most recent completed run.
    pub fn last_emission(&self) -> &Emission {
        &self.last_emission
    }

    /// Run one build pass against the host context.
    ///
    /// Only a directory scan failure aborts the pass; per-file failures are
    /// logged and the file is left out of the emission.
    pub async fn run(&mut self, ctx: &mut dyn BuildContext) -> PipelineResult<RunOutcome> {
        let start = Instant::now();

        let files = self.scan(ctx)?;

        if self.tracker.can_skip() {
            tracing::debug!("No changes since last run, skipping {} files", files.len());
            return Ok(RunOutcome::Skipped);
        }
        self.tracker.begin_run();

        let resolved = files.len();
        let executor = &self.executor;

        let stage_start = Instant::now();
        let files = barrier(files, |file| executor.decode(file)).await;
        tracing::trace!("  Decode stage: {:?}", stage_start.elapsed());

        let stage_start = Instant::now();
        let files = barrier(files, |file| executor.encode(file)).await;
        tracing::trace!("  Encode stage: {:?}", stage_start.elapsed());

        let stage_start = Instant::now();
        let files = barrier(files, |file| executor.compress(file)).await;
        tracing::trace!("  Compress stage: {:?}", stage_start.elapsed());

        let mut stats = RunStats {
            resolved,
            ..RunStats::default()
        };
        let mut emission = Emission::default();

        for file in files {
            match file.state {
                FileState::Encoded {
                    format,
                    buffer,
                    compressed,
                } => {
                    let asset = Asset::new(buffer);
                    emission.manifest.push(EmittedAsset {
                        destination: file.destination.clone(),
                        source: file.source_path,
                        format,
                        size: asset.size(),
                        compressed,
                    });
                    ctx.emit_asset(file.destination.clone(), asset.clone());
                    emission.assets.insert(file.destination, asset);
                    stats.emitted += 1;
                    if compressed {
                        stats.compressed += 1;
                    }
                }
                _ => stats.failed += 1,
            }
        }

        self.last_emission = emission;
        self.tracker.finish_run();

        stats.total_seconds = start.elapsed().as_secs_f64();
        tracing::info!(
            "Emitted {} of {} images ({} failed, {} compressed) in {:.2}s",
            stats.emitted,
            stats.resolved,
            stats.failed,
            stats.compressed,
            stats.total_seconds
        );
        Ok(RunOutcome::Completed(stats))
    }

    /// Resolve every spec to concrete files and register dependencies.
    fn scan(&self, ctx: &mut dyn BuildContext) -> PipelineResult<Vec<ResolvedFile>> {
        let mut files = Vec::new();

        for spec in &self.specs {
            let src = spec.src.as_path();
            let format_override = spec.format.as_deref().and_then(|f| {
                let parsed = EncodeFormat::parse(f);
                if parsed.is_none() {
                    tracing::warn!(
                        "Ignoring unsupported format override '{f}' for {:?}",
                        src
                    );
                }
                parsed
            });

            if is_folder(src) {
                if is_exists(src) {
                    let dest_root = normalize_separators(&spec.dest);
                    let dest_root = dest_root.trim_end_matches('/');
                    for entry in self.expander.expand_files(src)? {
                        let mut file = ResolvedFile::new(
                            entry.name.clone(),
                            entry.path,
                            format!("{}/{}", dest_root, entry.name),
                        );
                        file.format_override = format_override;
                        files.push(file);
                    }
                }

                self.tracker
                    .add_dependency(ctx.context_dependencies(), src);
                if is_exists(src) {
                    for folder in self.expander.expand_subfolders(src)? {
                        self.tracker
                            .add_dependency(ctx.context_dependencies(), &folder);
                    }
                }
            } else {
                if is_exists(src) {
                    let mut file =
                        ResolvedFile::new(file_name(src), src, normalize_separators(&spec.dest));
                    file.format_override = format_override;
                    files.push(file);
                }

                self.tracker.add_dependency(ctx.file_dependencies(), src);
            }
        }

        tracing::debug!("Resolved {} files from {} specs", files.len(), self.specs.len());
        Ok(files)
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unknown".to_string())
}
