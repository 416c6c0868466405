//! Host configuration.
//!
//! One YAML document configures the runtime, loader and adapters. Every
//! section and field is optional:
//!
//! ```yaml
//! runtime:
//!   max_memory_pages: 256
//!   fuel_enabled: true
//!   fuel_per_call: 5000000
//! loader:
//!   fetch_timeout_ms: 10000
//!   allow_file_urls: false
//! adapter:
//!   fixed_output_offset: null   # reject scalar-pointer modules without `allocate`
//! ```

use crate::adapter::AdapterConfig;
use crate::loader::LoaderConfig;
use crate::wasm::WasmRuntimeConfig;
use pitlane_core::{PitlaneError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete host configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HostConfig {
    /// Engine and resource limits.
    pub runtime: WasmRuntimeConfig,
    /// Fetching.
    pub loader: LoaderConfig,
    /// ABI adapters.
    pub adapter: AdapterConfig,
}

impl HostConfig {
    /// Defaults for game sessions.
    pub fn production() -> Self {
        Self {
            runtime: WasmRuntimeConfig::production(),
            ..Self::default()
        }
    }

    /// Tight limits for tests.
    pub fn testing() -> Self {
        Self {
            runtime: WasmRuntimeConfig::testing(),
            ..Self::default()
        }
    }

    /// Parse a YAML document.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| PitlaneError::Config {
            cause: e.to_string(),
        })
    }

    /// Read and parse a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| PitlaneError::Config {
            cause: format!("failed to read '{}': {}", path.display(), e),
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Render as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| PitlaneError::Config {
            cause: e.to_string(),
        })
    }

    /// Replace the runtime section.
    pub fn with_runtime(mut self, runtime: WasmRuntimeConfig) -> Self {
        self.runtime = runtime;
        self
    }

    /// Replace the loader section.
    pub fn with_loader(mut self, loader: LoaderConfig) -> Self {
        self.loader = loader;
        self
    }

    /// Replace the adapter section.
    pub fn with_adapter(mut self, adapter: AdapterConfig) -> Self {
        self.adapter = adapter;
        self
    }
}
