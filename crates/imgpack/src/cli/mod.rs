//! Command implementations.

pub mod build;
pub mod config;
pub mod watch;

use imgpack_core::{Config, ConfigError};
use std::path::Path;

/// Load the config from `path`, or from the default location when unset.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}
