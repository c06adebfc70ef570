//! Logging initialization.
//!
//! Logs go to stderr through `tracing-subscriber`, either human-readable or
//! as JSON lines. `RUST_LOG` overrides the configured level.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global subscriber.
///
/// `level` is any `EnvFilter` directive (`info`, `debug`, `imgpack_core=trace`).
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` config section, with CLI overrides.
pub fn init_from_config(config: &imgpack_core::Config, verbose: bool, json_logs: bool) {
    let level = effective_level(&config.logging.level, verbose);
    let json_format = json_logs || config.logging.format == "json";
    init(level, json_format);
}

/// `--verbose` raises the level to at least debug.
fn effective_level(configured: &str, verbose: bool) -> &str {
    if verbose && configured != "trace" {
        "debug"
    } else {
        configured
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_level() {
        assert_eq!(effective_level("info", false), "info");
        assert_eq!(effective_level("info", true), "debug");
        assert_eq!(effective_level("trace", true), "trace");
    }
}
