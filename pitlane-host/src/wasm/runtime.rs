//! WASM runtime management using Wasmtime.
//!
//! Owns the engine, compiles module bytes (sharing compiled code between
//! byte-identical artifacts) and creates resource-limited stores.

use super::host::HostState;
use dashmap::DashMap;
use pitlane_core::{PitlaneError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use wasmtime::{Config, Engine, Module, Store, StoreLimitsBuilder};

/// Size of one WebAssembly page.
pub const WASM_PAGE_SIZE: u64 = 64 * 1024;

/// Default maximum memory pages.
const DEFAULT_MAX_MEMORY_PAGES: u32 = 1024; // 64 MB

/// Default fuel granted to each foreign call.
const DEFAULT_FUEL_PER_CALL: u64 = 10_000_000;

/// Configuration for the WASM runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WasmRuntimeConfig {
    /// Maximum linear memory pages per module (64 KB per page).
    pub max_memory_pages: u32,
    /// Whether to meter execution with fuel.
    pub fuel_enabled: bool,
    /// Fuel granted before every foreign call when metering is on.
    pub fuel_per_call: u64,
    /// Whether to share compiled code between byte-identical modules.
    pub cache_modules: bool,
    /// Enable debug info in compiled modules.
    pub debug_info: bool,
}

impl Default for WasmRuntimeConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl WasmRuntimeConfig {
    /// Configuration for game sessions.
    pub fn production() -> Self {
        Self {
            max_memory_pages: DEFAULT_MAX_MEMORY_PAGES,
            fuel_enabled: true,
            fuel_per_call: DEFAULT_FUEL_PER_CALL,
            cache_modules: true,
            debug_info: false,
        }
    }

    /// Configuration for tests: small memory ceiling, tight fuel budget.
    pub fn testing() -> Self {
        Self {
            max_memory_pages: 256, // 16 MB
            fuel_enabled: true,
            fuel_per_call: 1_000_000,
            cache_modules: false,
            debug_info: true,
        }
    }

    /// Set maximum memory pages.
    pub fn with_max_memory_pages(mut self, pages: u32) -> Self {
        self.max_memory_pages = pages;
        self
    }

    /// Enable or disable fuel metering.
    pub fn with_fuel(mut self, enabled: bool, per_call: u64) -> Self {
        self.fuel_enabled = enabled;
        self.fuel_per_call = per_call;
        self
    }

    /// Enable or disable compiled-module sharing.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache_modules = enabled;
        self
    }

    /// Maximum linear memory in bytes.
    pub fn max_memory_bytes(&self) -> usize {
        usize::try_from(u64::from(self.max_memory_pages) * WASM_PAGE_SIZE).unwrap_or(usize::MAX)
    }

    /// Create a Wasmtime Config from this configuration.
    fn to_wasmtime_config(&self) -> Config {
        let mut config = Config::new();
        config.consume_fuel(self.fuel_enabled);
        config.debug_info(self.debug_info);
        config.strategy(wasmtime::Strategy::Cranelift);
        config
    }
}

/// WASM runtime managing the Wasmtime engine and compiled modules.
pub struct WasmRuntime {
    /// The Wasmtime engine (thread-safe, can be shared).
    engine: Engine,
    /// Configuration for this runtime.
    config: WasmRuntimeConfig,
    /// Compiled modules by content hash.
    module_cache: DashMap<u64, Module>,
}

impl WasmRuntime {
    /// Create a new WASM runtime with the given configuration.
    pub fn new(config: WasmRuntimeConfig) -> Result<Self> {
        let engine =
            Engine::new(&config.to_wasmtime_config()).map_err(|e| PitlaneError::Runtime {
                component: "engine".to_string(),
                cause: e.to_string(),
            })?;

        Ok(Self {
            engine,
            config,
            module_cache: DashMap::new(),
        })
    }

    /// Create a new runtime with default configuration.
    pub fn with_defaults() -> Result<Self> {
        Self::new(WasmRuntimeConfig::default())
    }

    /// Get the Wasmtime engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Get the runtime configuration.
    pub fn config(&self) -> &WasmRuntimeConfig {
        &self.config
    }

    /// Compile module bytes fetched from `url`.
    ///
    /// Compilation is CPU-bound; async callers should run this on the
    /// blocking pool.
    pub fn compile(&self, url: &str, wasm_bytes: &[u8]) -> Result<Module> {
        let hash = hash_bytes(wasm_bytes);

        if self.config.cache_modules {
            if let Some(cached) = self.module_cache.get(&hash) {
                tracing::debug!(url, hash, "Reusing compiled module");
                return Ok(cached.clone());
            }
        }

        let module = Module::new(&self.engine, wasm_bytes).map_err(|e| PitlaneError::Compile {
            url: url.to_string(),
            cause: format!("{:#}", e),
        })?;

        if self.config.cache_modules {
            self.module_cache.insert(hash, module.clone());
        }

        Ok(module)
    }

    /// Create a store for one module instance, with the memory ceiling applied.
    pub fn new_store(&self, url: &str) -> Store<HostState> {
        let limits = StoreLimitsBuilder::new()
            .memory_size(self.config.max_memory_bytes())
            .instances(1)
            .build();
        let mut store = Store::new(&self.engine, HostState::new(url, limits));
        store.limiter(|state| &mut state.limits);
        store
    }

    /// Top the store up to the per-call fuel budget.
    pub fn refuel(&self, store: &mut Store<HostState>) -> Result<()> {
        if !self.config.fuel_enabled {
            return Ok(());
        }
        store
            .set_fuel(self.config.fuel_per_call)
            .map_err(|e| PitlaneError::Runtime {
                component: "fuel".to_string(),
                cause: e.to_string(),
            })
    }

    /// Drop all shared compiled code.
    pub fn clear_cache(&self) {
        self.module_cache.clear();
    }

    /// Number of distinct compiled artifacts held.
    pub fn cache_size(&self) -> usize {
        self.module_cache.len()
    }
}

impl std::fmt::Debug for WasmRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasmRuntime")
            .field("config", &self.config)
            .field("cached_modules", &self.module_cache.len())
            .finish()
    }
}

/// Compute a hash of bytes (for cache key).
fn hash_bytes(bytes: &[u8]) -> u64 {
    use std::hash::{Hash, Hasher};

    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    bytes.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY_MODULE: &str = "(module (memory (export \"memory\") 1))";

    #[test]
    fn runtime_config_default() {
        let config = WasmRuntimeConfig::default();
        assert_eq!(config.max_memory_pages, DEFAULT_MAX_MEMORY_PAGES);
        assert!(config.fuel_enabled);
        assert!(config.cache_modules);
    }

    #[test]
    fn runtime_config_testing() {
        let config = WasmRuntimeConfig::testing();
        assert!(config.fuel_enabled);
        assert!(config.debug_info);
        assert!(!config.cache_modules);
    }

    #[test]
    fn runtime_config_yaml_defaults() {
        let config: WasmRuntimeConfig = serde_yaml::from_str("max_memory_pages: 16").unwrap();
        assert_eq!(config.max_memory_pages, 16);
        assert_eq!(config.fuel_per_call, DEFAULT_FUEL_PER_CALL);
        assert_eq!(config.max_memory_bytes(), 16 * 64 * 1024);
    }

    #[test]
    fn runtime_creation() {
        let runtime = WasmRuntime::with_defaults().expect("Failed to create runtime");
        assert_eq!(runtime.cache_size(), 0);
    }

    #[test]
    fn identical_bytes_share_compiled_code() {
        let runtime = WasmRuntime::with_defaults().unwrap();
        let bytes = wat::parse_str(EMPTY_MODULE).unwrap();
        runtime.compile("a.wasm", &bytes).unwrap();
        runtime.compile("b.wasm", &bytes).unwrap();
        assert_eq!(runtime.cache_size(), 1);

        runtime.clear_cache();
        assert_eq!(runtime.cache_size(), 0);
    }

    #[test]
    fn invalid_bytes_fail_to_compile() {
        let runtime = WasmRuntime::new(WasmRuntimeConfig::testing()).unwrap();
        let err = runtime.compile("junk.wasm", b"not a module").unwrap_err();
        assert_eq!(err.code(), "E201");
        assert_eq!(err.url(), Some("junk.wasm"));
    }

    #[test]
    fn refuel_sets_budget() {
        let runtime = WasmRuntime::new(WasmRuntimeConfig::testing()).unwrap();
        let mut store = runtime.new_store("x.wasm");
        runtime.refuel(&mut store).unwrap();
        assert_eq!(store.get_fuel().unwrap(), 1_000_000);
    }

    #[test]
    fn hash_bytes_consistency() {
        let data = b"test data for hashing";
        assert_eq!(hash_bytes(data), hash_bytes(data));
        assert_ne!(hash_bytes(data), hash_bytes(b"different data"));
    }
}
