//! Pitlane Host - sandboxed WebAssembly decision modules.
//!
//! This crate provides:
//! - Module loading by URL with per-URL caching
//! - The sandboxed import surface modules are linked against
//! - ABI adapters for the three decision conventions, probed at load time
//! - Wire codecs for each convention
//! - A registry handing out initialized adapters by URL or alias
//! - YAML host configuration and logging setup
//!
//! # Example
//!
//! ```no_run
//! use pitlane_core::DecisionRequest;
//! use pitlane_host::prelude::*;
//!
//! # async fn run() -> pitlane_core::Result<()> {
//! let registry = DecisionRegistry::from_config(&HostConfig::production())?;
//! registry.register("rival", "https://example.com/ai/rival.wasm");
//!
//! let adapter = registry.get_named("rival").await?;
//! let response = adapter.decide(&DecisionRequest::new(123.0, 45.0).with_speed(10.0))?;
//! println!("accelerate={} steering={}", response.accelerate, response.steering.as_scalar());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapter;
pub mod codec;
pub mod config;
pub mod loader;
pub mod observability;
pub mod registry;
pub mod wasm;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::adapter::{AdapterConfig, AdapterKind, DecisionAdapter};
    pub use crate::codec::ScalarWidth;
    pub use crate::config::HostConfig;
    pub use crate::loader::{LoaderConfig, ModuleLoader};
    pub use crate::observability::{LogFormat, TracingConfig, init_tracing};
    pub use crate::registry::DecisionRegistry;
    pub use crate::wasm::{Capabilities, ForeignModule, ProcessShape, WasmRuntime, WasmRuntimeConfig};
}
