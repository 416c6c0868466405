//! ABI adapters.
//!
//! A [`DecisionAdapter`] turns a [`ForeignModule`] into a typed
//! `decide(request) -> response` call. The variant is probed once, during
//! [`DecisionAdapter::initialize`], from the module's capabilities:
//!
//! | Variant | Required exports |
//! |:--------|:-----------------|
//! | [`AdapterKind::BufferShared`] | memory, `allocate_input() -> i32`, `allocate_output() -> i32`, `process()` |
//! | [`AdapterKind::ScalarPointer`] | memory, `process(9 x f64/f32, i32)` |
//! | [`AdapterKind::ScalarPacked`] | `process(9 x f64/f32) -> i32` |
//!
//! Lifecycle: `wrap` -> `initialize` -> `decide`* -> `dispose`. Calling
//! `decide` outside the initialized state fails with
//! [`PitlaneError::NotInitialized`].

mod buffer;
mod packed;
mod pointer;

use crate::codec::{ScalarArg, ScalarWidth};
use crate::wasm::{
    Capabilities, ForeignModule, HostState, LinearMemory, MemoryAccessError, MemoryView,
    ModuleInstance, ProcessShape,
};
use parking_lot::Mutex;
use pitlane_core::{DecisionRequest, DecisionResponse, PitlaneError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use wasmtime::{Store, Val};

/// Fixed output offset used by scalar-pointer modules without `allocate`.
pub const DEFAULT_FIXED_OUTPUT_OFFSET: u32 = 1024;

/// Adapter configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Output region for scalar-pointer modules that export no `allocate`.
    ///
    /// Nothing checks that the module leaves this region alone. `None`
    /// rejects such modules instead.
    pub fixed_output_offset: Option<u32>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            fixed_output_offset: Some(DEFAULT_FIXED_OUTPUT_OFFSET),
        }
    }
}

impl AdapterConfig {
    /// Set or disable the fixed output offset.
    pub fn with_fixed_output_offset(mut self, offset: Option<u32>) -> Self {
        self.fixed_output_offset = offset;
        self
    }
}

/// The ABI convention an adapter speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdapterKind {
    /// Shared float buffers in linear memory.
    BufferShared,
    /// Scalar arguments, 12-byte record at an output pointer.
    ScalarPointer,
    /// Scalar arguments, packed i32 return.
    ScalarPacked,
}

impl AdapterKind {
    /// Select a variant from a module's capabilities, trying A, B, then C.
    pub fn probe(caps: &Capabilities) -> Option<Self> {
        let has_memory = caps.memory.is_some();
        match &caps.process {
            Some(ProcessShape::Nullary)
                if has_memory && caps.allocate_input && caps.allocate_output =>
            {
                Some(Self::BufferShared)
            }
            Some(ProcessShape::ScalarsToPointer { .. }) if has_memory => Some(Self::ScalarPointer),
            Some(ProcessShape::ScalarsToPacked { .. }) => Some(Self::ScalarPacked),
            _ => None,
        }
    }

    /// Short name used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BufferShared => "buffer_shared",
            Self::ScalarPointer => "scalar_pointer",
            Self::ScalarPacked => "scalar_packed",
        }
    }
}

impl fmt::Display for AdapterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-variant state established at initialization.
#[derive(Debug)]
enum Binding {
    Buffer {
        input: MemoryView,
        output: MemoryView,
    },
    Pointer {
        width: ScalarWidth,
        output: MemoryView,
        allocated: bool,
    },
    Packed {
        width: ScalarWidth,
    },
}

impl Binding {
    fn kind(&self) -> AdapterKind {
        match self {
            Self::Buffer { .. } => AdapterKind::BufferShared,
            Self::Pointer { .. } => AdapterKind::ScalarPointer,
            Self::Packed { .. } => AdapterKind::ScalarPacked,
        }
    }
}

#[derive(Debug)]
enum AdapterState {
    Wrapped,
    Ready(Binding),
    Disposed,
}

/// Typed decision interface over one foreign module.
pub struct DecisionAdapter {
    module: Arc<ForeignModule>,
    config: AdapterConfig,
    state: Mutex<AdapterState>,
}

impl DecisionAdapter {
    /// Wrap a module. A module can be wrapped by one adapter at a time.
    pub fn wrap(module: Arc<ForeignModule>, config: AdapterConfig) -> Result<Self> {
        module.claim()?;
        Ok(Self {
            module,
            config,
            state: Mutex::new(AdapterState::Wrapped),
        })
    }

    /// Probe the variant and establish its memory regions.
    ///
    /// Idempotent once it has succeeded. A failed attempt leaves the adapter
    /// wrapped but uninitialized.
    pub fn initialize(&self) -> Result<AdapterKind> {
        let mut state = self.state.lock();
        match &*state {
            AdapterState::Ready(binding) => return Ok(binding.kind()),
            AdapterState::Disposed => return Err(self.not_initialized()),
            AdapterState::Wrapped => {}
        }

        let caps = self.module.capabilities();
        let kind = AdapterKind::probe(caps).ok_or_else(|| PitlaneError::MissingExports {
            url: self.url().to_string(),
            cause: describe_missing(caps),
        })?;

        let mut instance = self.module.lock();
        let binding = match kind {
            AdapterKind::BufferShared => buffer::bind(&mut instance, self.url())?,
            AdapterKind::ScalarPointer => {
                pointer::bind(&mut instance, caps, &self.config, self.url())?
            }
            AdapterKind::ScalarPacked => packed::bind(caps, self.url())?,
        };

        tracing::info!(url = %self.url(), variant = %kind, "Decision module initialized");
        *state = AdapterState::Ready(binding);
        Ok(kind)
    }

    /// Run one decision.
    pub fn decide(&self, request: &DecisionRequest) -> Result<DecisionResponse> {
        let mut state = self.state.lock();
        let AdapterState::Ready(binding) = &mut *state else {
            return Err(self.not_initialized());
        };

        let mut instance = self.module.lock();
        let url = self.url();
        match binding {
            Binding::Buffer { input, output } => {
                buffer::decide(&mut instance, input, output, request, url)
            }
            Binding::Pointer { width, output, .. } => {
                pointer::decide(&mut instance, *width, output, request, url)
            }
            Binding::Packed { width } => packed::decide(&mut instance, *width, request),
        }
    }

    /// Release module-side resources. The adapter is unusable afterwards.
    ///
    /// Calls `deallocate` for an allocated scalar-pointer output region and
    /// `cleanup` for shared-buffer modules, when exported.
    pub fn dispose(&self) -> Result<()> {
        let previous = std::mem::replace(&mut *self.state.lock(), AdapterState::Disposed);
        let AdapterState::Ready(binding) = previous else {
            return Ok(());
        };

        let caps = self.module.capabilities();
        let mut instance = self.module.lock();
        match binding {
            Binding::Pointer {
                output,
                allocated: true,
                ..
            } if caps.deallocate => {
                let params = [Val::I32(output.offset as i32), Val::I32(output.len as i32)];
                instance.call("deallocate", &params, &mut [])?;
            }
            Binding::Buffer { .. } if caps.cleanup => {
                instance.call("cleanup", &[], &mut [])?;
            }
            _ => {}
        }

        tracing::debug!(url = %self.url(), "Decision module disposed");
        Ok(())
    }

    /// The selected variant, once initialized.
    pub fn variant(&self) -> Option<AdapterKind> {
        match &*self.state.lock() {
            AdapterState::Ready(binding) => Some(binding.kind()),
            _ => None,
        }
    }

    /// Whether `decide` may be called.
    pub fn is_initialized(&self) -> bool {
        matches!(&*self.state.lock(), AdapterState::Ready(_))
    }

    /// Module URL.
    pub fn url(&self) -> &str {
        self.module.url()
    }

    /// The wrapped module.
    pub fn module(&self) -> &Arc<ForeignModule> {
        &self.module
    }

    /// Current linear-memory generation, if the module exports memory.
    pub fn memory_generation(&self) -> Option<u64> {
        self.module.lock().memory().map(|m| m.generation())
    }

    fn not_initialized(&self) -> PitlaneError {
        PitlaneError::NotInitialized {
            url: self.url().to_string(),
        }
    }
}

impl Drop for DecisionAdapter {
    fn drop(&mut self) {
        self.module.release();
    }
}

impl fmt::Debug for DecisionAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionAdapter")
            .field("url", &self.url())
            .field("variant", &self.variant())
            .finish()
    }
}

fn describe_missing(caps: &Capabilities) -> String {
    let process = match &caps.process {
        None => "no 'process' export".to_string(),
        Some(ProcessShape::Unrecognised { signature }) => {
            format!("'process' has unrecognised signature {}", signature)
        }
        Some(shape) => format!("'process' is {:?}", shape),
    };
    format!(
        "{}; memory={:?} allocate_input={} allocate_output={}",
        process, caps.memory, caps.allocate_input, caps.allocate_output
    )
}

fn memory_fault(url: &str) -> impl FnOnce(MemoryAccessError) -> PitlaneError + '_ {
    move |e| PitlaneError::ForeignTrap {
        url: url.to_string(),
        cause: e.to_string(),
    }
}

fn missing_memory(url: &str) -> PitlaneError {
    PitlaneError::MissingExports {
        url: url.to_string(),
        cause: "no linear memory export".to_string(),
    }
}

fn scalar_val(arg: ScalarArg) -> Val {
    match arg {
        ScalarArg::F64(v) => Val::F64(v.to_bits()),
        ScalarArg::F32(v) => Val::F32(v.to_bits()),
    }
}

fn scalar_width(caps: &Capabilities, url: &str) -> Result<ScalarWidth> {
    caps.scalar_width().ok_or_else(|| PitlaneError::MissingExports {
        url: url.to_string(),
        cause: "'process' takes no scalar arguments".to_string(),
    })
}

/// Memory access on a locked instance.
fn with_memory<R>(
    instance: &mut ModuleInstance,
    url: &str,
    f: impl FnOnce(
        &mut Store<HostState>,
        &mut LinearMemory,
    ) -> std::result::Result<R, MemoryAccessError>,
) -> Result<R> {
    let (store, memory) = instance.store_and_memory();
    let memory = memory.ok_or_else(|| missing_memory(url))?;
    f(store, memory).map_err(memory_fault(url))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(process: Option<ProcessShape>) -> Capabilities {
        Capabilities {
            memory: Some("memory".to_string()),
            allocate_input: true,
            allocate_output: true,
            process,
            allocate: false,
            deallocate: false,
            cleanup: false,
        }
    }

    #[test]
    fn probe_prefers_buffer_variant() {
        assert_eq!(
            AdapterKind::probe(&caps(Some(ProcessShape::Nullary))),
            Some(AdapterKind::BufferShared)
        );
    }

    #[test]
    fn probe_scalar_variants() {
        let width = ScalarWidth::F64;
        assert_eq!(
            AdapterKind::probe(&caps(Some(ProcessShape::ScalarsToPointer { width }))),
            Some(AdapterKind::ScalarPointer)
        );
        assert_eq!(
            AdapterKind::probe(&caps(Some(ProcessShape::ScalarsToPacked { width }))),
            Some(AdapterKind::ScalarPacked)
        );
    }

    #[test]
    fn probe_requires_memory_for_pointer_variant() {
        let mut c = caps(Some(ProcessShape::ScalarsToPointer {
            width: ScalarWidth::F32,
        }));
        c.memory = None;
        assert_eq!(AdapterKind::probe(&c), None);
    }

    #[test]
    fn probe_requires_allocators_for_buffer_variant() {
        let mut c = caps(Some(ProcessShape::Nullary));
        c.allocate_output = false;
        assert_eq!(AdapterKind::probe(&c), None);
        assert!(describe_missing(&c).contains("allocate_output=false"));
    }

    #[test]
    fn probe_without_process() {
        assert_eq!(AdapterKind::probe(&caps(None)), None);
    }

    #[test]
    fn config_yaml_null_disables_fixed_offset() {
        let config: AdapterConfig = serde_yaml::from_str("fixed_output_offset: null").unwrap();
        assert_eq!(config.fixed_output_offset, None);

        let config: AdapterConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.fixed_output_offset, Some(DEFAULT_FIXED_OUTPUT_OFFSET));
    }

    #[test]
    fn kind_names() {
        assert_eq!(AdapterKind::ScalarPacked.to_string(), "scalar_packed");
    }
}
