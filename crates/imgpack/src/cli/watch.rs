//! The `imgpack watch` command: rebuild on every source change.

use clap::Args;
use imgpack_core::ImagePipeline;
use std::path::Path;
use std::time::Duration;

use super::build::{run_pass, BuildArgs};

/// Arguments for the `watch` command.
#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub build: BuildArgs,

    /// How often to check for changes, in milliseconds
    #[arg(long, default_value = "500")]
    pub interval_ms: u64,

    /// Quiet period after a change before rebuilding, in milliseconds
    #[arg(long, default_value = "100")]
    pub debounce_ms: u64,
}

/// Execute the watch command.
///
/// Runs until interrupted. A failing pass is logged and the loop keeps
/// waiting for the next change.
pub async fn execute(args: WatchArgs, config_path: Option<&Path>) -> anyhow::Result<()> {
    let mut config = super::load_config(config_path)?;
    args.build.apply(&mut config);

    let mut pipeline = ImagePipeline::new(&config)?;
    let tracker = pipeline.tracker();
    let interval = Duration::from_millis(args.interval_ms.max(1));
    let debounce = Duration::from_millis(args.debounce_ms);

    run_logged(&mut pipeline, &config).await;
    tracing::info!(
        "Watching {} paths for changes (Ctrl-C to stop)",
        tracker.watched_count()
    );

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, stopping watch");
                break;
            }
            _ = tracker.changed() => {}
            _ = ticker.tick() => {}
        }

        if !tracker.is_dirty() {
            continue;
        }

        // Let editors finish writing before reading the sources back
        tokio::time::sleep(debounce).await;
        tracing::info!("Change detected, rebuilding");
        run_logged(&mut pipeline, &config).await;
    }

    Ok(())
}

async fn run_logged(pipeline: &mut ImagePipeline, config: &imgpack_core::Config) {
    if let Err(e) = run_pass(pipeline, config).await {
        tracing::error!("Build failed: {e:#}");
    }
}
