//! WebAssembly execution layer.
//!
//! - **WasmRuntime**: owns the Wasmtime engine, compiles module bytes and
//!   creates resource-limited stores
//! - **HostState / create_linker**: the sandboxed import surface
//! - **LinearMemory / MemoryView**: generation-checked windows into a
//!   module's memory
//! - **ForeignModule**: one instantiated module plus its detected
//!   [`Capabilities`]
//!
//! # Import surface
//!
//! ```text
//! wasi_snapshot_preview1:
//!   proc_exit(code)                                  no-op
//!   fd_write(fd, iovs, iovs_len, nwritten) -> errno  logged at debug
//!   fd_read / fd_seek / fd_close                     succeed, no data
//!   environ_sizes_get / environ_get                  empty environment
//!   clock_time_get / random_get                      zero
//!   sched_yield                                      no-op
//!
//! env:
//!   consoleLog(...)                                  logged at debug
//!   sin cos sqrt abs (f64) -> f64
//!   atan2 pow min max (f64, f64) -> f64
//! ```

mod host;
mod memory;
mod module;
mod runtime;

pub use host::{ENV_MODULE, HostState, WASI_MODULE, create_linker};
pub use memory::{LinearMemory, MemoryAccessError, MemoryView};
pub use module::{Capabilities, ForeignModule, ModuleInstance, ProcessShape};
pub use runtime::{WASM_PAGE_SIZE, WasmRuntime, WasmRuntimeConfig};
