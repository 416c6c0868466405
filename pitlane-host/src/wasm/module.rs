//! Instantiated decision modules and their export capabilities.

use super::host::{HostState, create_linker};
use super::memory::LinearMemory;
use super::runtime::WasmRuntime;
use crate::codec::ScalarWidth;
use parking_lot::{Mutex, MutexGuard};
use pitlane_core::types::WIRE_FIELD_COUNT;
use pitlane_core::{PitlaneError, Result};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use wasmtime::{Extern, ExternType, FuncType, Instance, Module, Store, Trap, Val, ValType};

/// Memory export names, in lookup order.
const MEMORY_EXPORTS: [&str; 2] = ["memory", "__wasm_memory"];

/// Shape of a module's `process` export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ProcessShape {
    /// `process()`: reads and writes shared buffers.
    Nullary,
    /// `process(9 scalars, out_ptr: i32)`: writes a record at `out_ptr`.
    ScalarsToPointer {
        /// Scalar precision.
        width: ScalarWidth,
    },
    /// `process(9 scalars) -> i32`: returns a packed bitfield.
    ScalarsToPacked {
        /// Scalar precision.
        width: ScalarWidth,
    },
    /// Any other signature.
    Unrecognised {
        /// The signature as declared.
        signature: String,
    },
}

/// What a compiled module exports, detected once before instantiation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    /// Name of the exported linear memory.
    pub memory: Option<String>,
    /// `allocate_input() -> i32`.
    pub allocate_input: bool,
    /// `allocate_output() -> i32`.
    pub allocate_output: bool,
    /// The `process` export, if any.
    pub process: Option<ProcessShape>,
    /// `allocate(size: i32) -> i32`.
    pub allocate: bool,
    /// `deallocate(ptr: i32, size: i32)`.
    pub deallocate: bool,
    /// `cleanup()`.
    pub cleanup: bool,
}

impl Capabilities {
    /// Inspect a compiled module's export table.
    pub fn detect(module: &Module) -> Self {
        let mut caps = Self {
            memory: None,
            allocate_input: false,
            allocate_output: false,
            process: None,
            allocate: false,
            deallocate: false,
            cleanup: false,
        };

        for export in module.exports() {
            match export.ty() {
                ExternType::Memory(_) => {
                    let name = export.name();
                    let preferred = MEMORY_EXPORTS.iter().position(|m| *m == name);
                    let current = caps
                        .memory
                        .as_deref()
                        .and_then(|cur| MEMORY_EXPORTS.iter().position(|m| *m == cur));
                    if preferred.is_some() && (current.is_none() || preferred < current) {
                        caps.memory = Some(name.to_string());
                    }
                }
                ExternType::Func(ty) => {
                    let params: Vec<ValType> = ty.params().collect();
                    let results: Vec<ValType> = ty.results().collect();
                    match export.name() {
                        "allocate_input" => {
                            caps.allocate_input = is_i32s(&params, 0) && is_i32s(&results, 1)
                        }
                        "allocate_output" => {
                            caps.allocate_output = is_i32s(&params, 0) && is_i32s(&results, 1)
                        }
                        "allocate" => caps.allocate = is_i32s(&params, 1) && is_i32s(&results, 1),
                        "deallocate" => caps.deallocate = is_i32s(&params, 2) && results.is_empty(),
                        "cleanup" => caps.cleanup = params.is_empty() && results.is_empty(),
                        "process" => caps.process = Some(ProcessShape::from_signature(&ty)),
                        _ => {}
                    }
                }
                _ => {}
            }
        }

        caps
    }

    /// Scalar precision of `process`, when it takes scalars.
    pub fn scalar_width(&self) -> Option<ScalarWidth> {
        match self.process {
            Some(ProcessShape::ScalarsToPointer { width })
            | Some(ProcessShape::ScalarsToPacked { width }) => Some(width),
            _ => None,
        }
    }
}

impl ProcessShape {
    fn from_signature(ty: &FuncType) -> Self {
        let params: Vec<ValType> = ty.params().collect();
        let results: Vec<ValType> = ty.results().collect();

        if params.is_empty() && results.is_empty() {
            return Self::Nullary;
        }

        let width = scalar_width(&params[..params.len().min(WIRE_FIELD_COUNT)]);
        let extra = params.len().saturating_sub(WIRE_FIELD_COUNT);
        match (width, extra, results.as_slice()) {
            (Some(width), 1, []) if matches!(params[WIRE_FIELD_COUNT], ValType::I32) => {
                Self::ScalarsToPointer { width }
            }
            (Some(width), 0, [ValType::I32]) => Self::ScalarsToPacked { width },
            _ => Self::Unrecognised {
                signature: format!("{:?} -> {:?}", params, results),
            },
        }
    }
}

/// Width shared by exactly nine float parameters.
fn scalar_width(params: &[ValType]) -> Option<ScalarWidth> {
    if params.len() != WIRE_FIELD_COUNT {
        return None;
    }
    if params.iter().all(|p| matches!(p, ValType::F64)) {
        Some(ScalarWidth::F64)
    } else if params.iter().all(|p| matches!(p, ValType::F32)) {
        Some(ScalarWidth::F32)
    } else {
        None
    }
}

fn is_i32s(types: &[ValType], count: usize) -> bool {
    types.len() == count && types.iter().all(|t| matches!(t, ValType::I32))
}

/// The store, instance and memory of one module.
pub struct ModuleInstance {
    url: String,
    runtime: Arc<WasmRuntime>,
    store: Store<HostState>,
    instance: Instance,
    memory: Option<LinearMemory>,
}

impl ModuleInstance {
    /// Call an export, refuelling first and mapping traps to
    /// [`PitlaneError::ForeignTrap`].
    pub fn call(&mut self, name: &str, params: &[Val], results: &mut [Val]) -> Result<()> {
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| PitlaneError::MissingExports {
                url: self.url.clone(),
                cause: format!("export '{}' disappeared", name),
            })?;

        self.runtime.refuel(&mut self.store)?;
        func.call(&mut self.store, params, results)
            .map_err(|e| PitlaneError::ForeignTrap {
                url: self.url.clone(),
                cause: describe_trap(name, &e),
            })
    }

    /// Call an export taking no arguments and returning one i32.
    pub fn call_i32(&mut self, name: &str) -> Result<i32> {
        let mut results = [Val::I32(0)];
        self.call(name, &[], &mut results)?;
        results[0].i32().ok_or_else(|| PitlaneError::ForeignTrap {
            url: self.url.clone(),
            cause: format!("'{}' did not return an i32", name),
        })
    }

    /// The store.
    pub fn store(&self) -> &Store<HostState> {
        &self.store
    }

    /// The store and memory, borrowed together for transfers.
    pub fn store_and_memory(&mut self) -> (&mut Store<HostState>, Option<&mut LinearMemory>) {
        (&mut self.store, self.memory.as_mut())
    }

    /// The tracked linear memory, if the module exports one.
    pub fn memory(&self) -> Option<&LinearMemory> {
        self.memory.as_ref()
    }
}

fn describe_trap(name: &str, error: &wasmtime::Error) -> String {
    match error.downcast_ref::<Trap>() {
        Some(Trap::OutOfFuel) => format!("'{}' exhausted its fuel budget", name),
        Some(trap) => format!("'{}' trapped: {}", name, trap),
        None => format!("'{}' failed: {:#}", name, error),
    }
}

/// One instantiated decision module.
///
/// The instance is exclusively owned; all access goes through a mutex so the
/// module can be shared between tasks. A module is wrapped by at most one
/// adapter.
pub struct ForeignModule {
    url: String,
    capabilities: Capabilities,
    inner: Mutex<ModuleInstance>,
    wrapped: AtomicBool,
}

impl ForeignModule {
    /// Instantiate a compiled module against the host imports.
    ///
    /// Runs the start function, if any, under the per-call fuel budget.
    pub fn instantiate(runtime: Arc<WasmRuntime>, url: &str, module: &Module) -> Result<Self> {
        let capabilities = Capabilities::detect(module);
        let linker = create_linker(runtime.engine(), module)?;
        let mut store = runtime.new_store(url);
        runtime.refuel(&mut store)?;

        let instance =
            linker
                .instantiate(&mut store, module)
                .map_err(|e| PitlaneError::Instantiate {
                    url: url.to_string(),
                    cause: format!("{:#}", e),
                })?;

        let memory = capabilities
            .memory
            .as_deref()
            .and_then(|name| match instance.get_export(&mut store, name) {
                Some(Extern::Memory(m)) => Some(m),
                _ => None,
            })
            .map(|m| LinearMemory::new(&store, m));

        tracing::debug!(
            url,
            memory = ?capabilities.memory,
            process = ?capabilities.process,
            "Module instantiated"
        );

        Ok(Self {
            url: url.to_string(),
            capabilities,
            inner: Mutex::new(ModuleInstance {
                url: url.to_string(),
                runtime,
                store,
                instance,
                memory,
            }),
            wrapped: AtomicBool::new(false),
        })
    }

    /// Source URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Export capabilities.
    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Mark this module as wrapped; fails if it already was.
    pub fn claim(&self) -> Result<()> {
        if self.wrapped.swap(true, Ordering::AcqRel) {
            return Err(PitlaneError::AlreadyWrapped {
                url: self.url.clone(),
            });
        }
        Ok(())
    }

    /// Release a claim so another adapter may wrap the module.
    pub fn release(&self) {
        self.wrapped.store(false, Ordering::Release);
    }

    /// Whether an adapter currently wraps this module.
    pub fn is_wrapped(&self) -> bool {
        self.wrapped.load(Ordering::Acquire)
    }

    /// Lock the instance for a call.
    pub fn lock(&self) -> MutexGuard<'_, ModuleInstance> {
        self.inner.lock()
    }
}

impl fmt::Debug for ForeignModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignModule")
            .field("url", &self.url)
            .field("capabilities", &self.capabilities)
            .field("wrapped", &self.is_wrapped())
            .finish()
    }
}
