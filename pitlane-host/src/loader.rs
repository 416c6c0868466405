//! ModuleLoader - fetches, compiles and instantiates modules by URL.

use crate::wasm::{ForeignModule, WasmRuntime};
use dashmap::DashMap;
use pitlane_core::fetch::{DefaultFetcher, HttpFetcher, ModuleFetcher};
use pitlane_core::{PitlaneError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Default fetch timeout.
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 30_000;

/// Configuration for the module loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Timeout for one HTTP fetch, in milliseconds.
    pub fetch_timeout_ms: u64,
    /// Whether `file://` URLs and bare paths may be loaded.
    pub allow_file_urls: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
            allow_file_urls: true,
        }
    }
}

impl LoaderConfig {
    /// Set the fetch timeout.
    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Allow or forbid local files.
    pub fn with_file_urls(mut self, allow: bool) -> Self {
        self.allow_file_urls = allow;
        self
    }

    /// Fetch timeout as a duration.
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Build the scheme-routing fetcher this configuration describes.
    pub fn fetcher(&self) -> DefaultFetcher {
        DefaultFetcher::new(
            HttpFetcher::with_timeout(self.fetch_timeout()),
            self.allow_file_urls,
        )
    }
}

type ModuleCell = Arc<OnceCell<Arc<ForeignModule>>>;

/// Loads modules by URL, at most once per URL.
///
/// Concurrent loads of one URL share a single fetch, compile and
/// instantiate. A failed load leaves its cell empty; the next caller
/// retries on the same cell.
pub struct ModuleLoader {
    runtime: Arc<WasmRuntime>,
    fetcher: Arc<dyn ModuleFetcher>,
    modules: DashMap<String, ModuleCell>,
}

impl ModuleLoader {
    /// Create a loader using `fetcher` for module bytes.
    pub fn new(runtime: Arc<WasmRuntime>, fetcher: Arc<dyn ModuleFetcher>) -> Self {
        Self {
            runtime,
            fetcher,
            modules: DashMap::new(),
        }
    }

    /// Create a loader with the default fetcher for `config`.
    pub fn from_config(runtime: Arc<WasmRuntime>, config: &LoaderConfig) -> Self {
        Self::new(runtime, Arc::new(config.fetcher()))
    }

    /// Load the module behind `url`, reusing a cached instance.
    pub async fn load(&self, url: &str) -> Result<Arc<ForeignModule>> {
        let cell = Arc::clone(self.modules.entry(url.to_string()).or_default().value());

        match cell.get_or_try_init(|| self.load_uncached(url)).await {
            Ok(module) => Ok(Arc::clone(module)),
            Err(e) => {
                tracing::warn!(url, code = e.code(), error = %e, "Module load failed");
                Err(e)
            }
        }
    }

    async fn load_uncached(&self, url: &str) -> Result<Arc<ForeignModule>> {
        tracing::debug!(url, "Fetching module");
        let response = self
            .fetcher
            .fetch(url)
            .await
            .map_err(|e| PitlaneError::Fetch {
                url: url.to_string(),
                cause: e.to_string(),
            })?;

        if !response.is_success() {
            return Err(PitlaneError::Fetch {
                url: url.to_string(),
                cause: format!("HTTP status {}", response.status),
            });
        }

        let runtime = Arc::clone(&self.runtime);
        let owned_url = url.to_string();
        let bytes = response.body;
        let size = bytes.len();

        let module = tokio::task::spawn_blocking(move || {
            let compiled = runtime.compile(&owned_url, &bytes)?;
            ForeignModule::instantiate(runtime, &owned_url, &compiled)
        })
        .await
        .map_err(|e| PitlaneError::Runtime {
            component: "loader".to_string(),
            cause: e.to_string(),
        })??;

        tracing::info!(url, size, "Module loaded");
        Ok(Arc::new(module))
    }

    /// Drop the cached instance for `url`. Returns whether one was cached.
    ///
    /// A cell with a load still in flight is left alone.
    pub fn evict(&self, url: &str) -> bool {
        let evicted = self
            .modules
            .remove_if(url, |_, cell| cell.initialized())
            .is_some();
        if evicted {
            tracing::debug!(url, "Module evicted");
        }
        evicted
    }

    /// Whether a loaded instance for `url` is cached.
    pub fn is_cached(&self, url: &str) -> bool {
        self.modules.get(url).is_some_and(|c| c.initialized())
    }

    /// Number of loaded instances.
    pub fn len(&self) -> usize {
        self.modules.iter().filter(|c| c.initialized()).count()
    }

    /// Whether no instance is loaded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The runtime modules are compiled with.
    pub fn runtime(&self) -> &Arc<WasmRuntime> {
        &self.runtime
    }
}

impl std::fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleLoader")
            .field("modules", &self.len())
            .field("mock_fetcher", &self.fetcher.is_mock())
            .finish()
    }
}
