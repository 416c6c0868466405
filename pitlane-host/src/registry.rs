//! DecisionRegistry - URL-keyed cache of initialized adapters.
//!
//! The registry is the only entry point consumers need: `get(url)` returns an
//! initialized [`DecisionAdapter`], loading and initializing it on first use.
//!
//! ```text
//! get(url) ──► cached? ──yes──► adapter
//!                 │
//!                 no (one attempt per URL at a time; others wait)
//!                 ▼
//!   ModuleLoader::load ─► DecisionAdapter::wrap ─► initialize ─► cache
//!                 │
//!              failure ─► evict loader entry, nothing cached
//! ```

use crate::adapter::{AdapterConfig, DecisionAdapter};
use crate::config::HostConfig;
use crate::loader::ModuleLoader;
use crate::wasm::WasmRuntime;
use dashmap::DashMap;
use parking_lot::RwLock;
use pitlane_core::fetch::ModuleFetcher;
use pitlane_core::{PitlaneError, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::OnceCell;

type AdapterCell = Arc<OnceCell<Arc<DecisionAdapter>>>;

/// Cache of initialized decision adapters keyed by module URL.
pub struct DecisionRegistry {
    loader: ModuleLoader,
    adapter_config: AdapterConfig,
    adapters: DashMap<String, AdapterCell>,
    /// Human-readable aliases for URLs.
    names: RwLock<HashMap<String, String>>,
}

impl DecisionRegistry {
    /// Create a registry over an existing loader.
    pub fn new(loader: ModuleLoader, adapter_config: AdapterConfig) -> Self {
        Self {
            loader,
            adapter_config,
            adapters: DashMap::new(),
            names: RwLock::new(HashMap::new()),
        }
    }

    /// Build the runtime, loader and registry described by `config`.
    pub fn from_config(config: &HostConfig) -> Result<Self> {
        let runtime = Arc::new(WasmRuntime::new(config.runtime.clone())?);
        let loader = ModuleLoader::from_config(runtime, &config.loader);
        Ok(Self::new(loader, config.adapter.clone()))
    }

    /// Build a registry from `config` that fetches through `fetcher`.
    pub fn with_fetcher(config: &HostConfig, fetcher: Arc<dyn ModuleFetcher>) -> Result<Self> {
        let runtime = Arc::new(WasmRuntime::new(config.runtime.clone())?);
        let loader = ModuleLoader::new(runtime, fetcher);
        Ok(Self::new(loader, config.adapter.clone()))
    }

    /// Get the initialized adapter for `url`, loading it on first use.
    ///
    /// Concurrent calls for one URL perform one load at a time. A failed
    /// attempt is returned to its caller only and leaves the cell empty, so
    /// the next waiter (or a later call) retries on the same cell.
    pub async fn get(&self, url: &str) -> Result<Arc<DecisionAdapter>> {
        if let Some(adapter) = self.cached(url) {
            return Ok(adapter);
        }

        let cell = Arc::clone(self.adapters.entry(url.to_string()).or_default().value());
        let adapter = cell.get_or_try_init(|| self.create(url)).await?;
        Ok(Arc::clone(adapter))
    }

    async fn create(&self, url: &str) -> Result<Arc<DecisionAdapter>> {
        let module = self.loader.load(url).await?;

        let adapter = DecisionAdapter::wrap(module, self.adapter_config.clone())
            .and_then(|adapter| adapter.initialize().map(|_| adapter));

        match adapter {
            Ok(adapter) => Ok(Arc::new(adapter)),
            Err(e) => {
                // The instance may have run partway through initialization;
                // the next attempt starts from fresh bytes.
                self.loader.evict(url);
                tracing::warn!(url, code = e.code(), error = %e, "Adapter initialization failed");
                Err(e)
            }
        }
    }

    /// Record `name` as an alias for `url`, replacing any previous mapping.
    pub fn register(&self, name: impl Into<String>, url: impl Into<String>) {
        let (name, url) = (name.into(), url.into());
        tracing::debug!(name = %name, url = %url, "Registered decision module");
        self.names.write().insert(name, url);
    }

    /// Resolve an alias and [`get`](Self::get) its adapter.
    pub async fn get_named(&self, name: &str) -> Result<Arc<DecisionAdapter>> {
        let url = self.resolve(name)?;
        self.get(&url).await
    }

    /// URL registered for `name`.
    pub fn resolve(&self, name: &str) -> Result<String> {
        self.names
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| PitlaneError::UnknownModule {
                name: name.to_string(),
            })
    }

    /// Registered aliases, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.names.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// The adapter for `url` if it is already initialized. Never loads.
    pub fn cached(&self, url: &str) -> Option<Arc<DecisionAdapter>> {
        self.adapters
            .get(url)
            .and_then(|cell| cell.get().map(Arc::clone))
    }

    /// Number of initialized adapters.
    pub fn len(&self) -> usize {
        self.adapters.iter().filter(|c| c.initialized()).count()
    }

    /// Whether no adapter is initialized.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The underlying loader.
    pub fn loader(&self) -> &ModuleLoader {
        &self.loader
    }
}

impl std::fmt::Debug for DecisionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionRegistry")
            .field("adapters", &self.len())
            .field("names", &self.names())
            .finish()
    }
}
