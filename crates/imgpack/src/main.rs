//! imgpack CLI - incremental image asset pipeline.
//!
//! imgpack resizes and re-encodes the images declared in its config, writes
//! them to an output directory, and can keep doing so whenever a source
//! changes.
//!
//! # Usage
//!
//! ```bash
//! # One build pass
//! imgpack build --config imgpack.toml --out dist/
//!
//! # Rebuild on every source change until Ctrl-C
//! imgpack watch --config imgpack.toml
//!
//! # View configuration
//! imgpack config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// imgpack - resize, re-encode and compress image assets on change.
#[derive(Parser, Debug)]
#[command(name = "imgpack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true, env = "IMGPACK_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one build pass and write the emitted assets
    Build(cli::build::BuildArgs),

    /// Build, then rebuild whenever a source changes
    Watch(cli::watch::WatchArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so use eprintln for config warnings.
    let config = match cli::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `imgpack config path`."
            );
            imgpack_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("imgpack v{}", imgpack_core::VERSION);

    let config_path = cli.config;
    match cli.command {
        Commands::Build(args) => cli::build::execute(args, config_path.as_deref()).await,
        Commands::Watch(args) => cli::watch::execute(args, config_path.as_deref()).await,
        Commands::Config(args) => cli::config::execute(args, config_path.as_deref()).await,
    }
}
