//! CLI command implementations.

pub mod decide;
pub mod probe;
pub mod version;

use anyhow::{Context, Result};
use pitlane_host::config::HostConfig;

/// Load the host configuration from `path`, or production defaults.
pub fn load_config(path: Option<&str>) -> Result<HostConfig> {
    match path {
        Some(path) => {
            HostConfig::from_file(path).with_context(|| format!("Failed to load config: {}", path))
        }
        None => Ok(HostConfig::production()),
    }
}
