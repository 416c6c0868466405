//! Logging setup.
//!
//! The library itself only emits `tracing` events. Binaries and tests that
//! want them printed call [`init_tracing`] once.
//!
//! Format and filter come from the environment via
//! [`TracingConfig::from_env`]:
//! - `PITLANE_LOG_FORMAT`: `json`, `pretty` or `compact`
//! - `PITLANE_LOG_LEVEL` or `RUST_LOG`: filter directives, e.g.
//!   `info,pitlane_host=debug`
//! - `PITLANE_LOG_LOCATION`: `true` to include file and line
//!
//! Output written by modules (`fd_write`, `env.consoleLog`) is logged at
//! debug level with a `[WASM]` prefix.

mod config;
mod setup;

pub use config::{LogFormat, TracingConfig};
pub use setup::init_tracing;
