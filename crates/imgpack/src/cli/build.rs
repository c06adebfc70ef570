//! The `imgpack build` command: one pass, written to disk.

use clap::Args;
use imgpack_core::output::{write_assets, write_manifest};
use imgpack_core::{Compilation, Config, ImagePipeline, RunOutcome};
use std::path::{Path, PathBuf};

/// Arguments for the `build` command.
#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Output directory (overrides `output.dir`)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Manifest file, `.json` or `.jsonl` (overrides `output.manifest`)
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,
}

impl BuildArgs {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut Config) {
        if let Some(out) = &self.out {
            config.output.dir = out.clone();
        }
        if let Some(manifest) = &self.manifest {
            config.output.manifest = Some(manifest.clone());
        }
    }
}

/// Execute the build command.
pub async fn execute(args: BuildArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;
    args.apply(&mut config);

    if config.images.is_empty() {
        tracing::warn!("No [[images]] declared in config; nothing to build");
    }

    let mut pipeline = ImagePipeline::new(&config)?;
    run_pass(&mut pipeline, &config).await?;
    Ok(())
}

/// Run one pass and write its emission under the configured output dir.
///
/// Returns `false` when the pass was skipped and nothing was written.
pub async fn run_pass(pipeline: &mut ImagePipeline, config: &Config) -> anyhow::Result<bool> {
    let mut compilation = Compilation::new();
    let stats = match pipeline.run(&mut compilation).await? {
        RunOutcome::Skipped => {
            tracing::debug!("Sources unchanged, output left as is");
            return Ok(false);
        }
        RunOutcome::Completed(stats) => stats,
    };

    let emission = pipeline.last_emission();
    let written = write_assets(&config.output.dir, emission)?;
    tracing::info!(
        "Wrote {} assets to {}",
        written.len(),
        config.output.dir.display()
    );

    if let Some(manifest) = &config.output.manifest {
        write_manifest(manifest, &emission.manifest, config.output.pretty)?;
        tracing::info!("Manifest written to {}", manifest.display());
    }

    if stats.failed > 0 {
        tracing::warn!("{} images failed; see errors above", stats.failed);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use imgpack_core::ImageSpec;

    #[tokio::test]
    async fn test_run_pass_writes_assets_and_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src/logo.png");
        std::fs::create_dir_all(src.parent().unwrap()).unwrap();
        image::DynamicImage::new_rgb8(4, 4).save(&src).unwrap();

        let mut config = Config::default();
        config.images.push(ImageSpec::new(&src, "img/logo.png"));
        BuildArgs {
            out: Some(dir.path().join("dist")),
            manifest: Some(dir.path().join("dist/manifest.jsonl")),
        }
        .apply(&mut config);

        let mut pipeline = ImagePipeline::new(&config).unwrap();
        assert!(run_pass(&mut pipeline, &config).await.unwrap());
        assert!(dir.path().join("dist/img/logo.png").exists());

        let manifest = std::fs::read_to_string(dir.path().join("dist/manifest.jsonl")).unwrap();
        assert!(manifest.contains("\"destination\":\"img/logo.png\""));

        // Nothing changed, so the second pass writes nothing
        assert!(!run_pass(&mut pipeline, &config).await.unwrap());
    }
}
