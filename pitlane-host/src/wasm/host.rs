//! Host function bindings for decision modules.
//!
//! Provides the `wasi_snapshot_preview1` stubs that toolchain runtimes pull
//! in and the `env` helpers some sample modules import. None of them give the
//! guest access to the outside world: clocks and entropy read as zero and
//! output is only forwarded to the debug log.

use pitlane_core::{PitlaneError, Result};
use wasmtime::{
    Caller, Engine, Extern, ExternType, FuncType, Linker, Memory, Module, StoreLimits, Val, ValType,
};

/// WASI namespace.
pub const WASI_MODULE: &str = "wasi_snapshot_preview1";

/// Namespace for game-specific helpers.
pub const ENV_MODULE: &str = "env";

/// WASI success errno.
const ERRNO_SUCCESS: i32 = 0;

/// WASI "bad file descriptor" errno.
const ERRNO_BADF: i32 = 8;
const ERRNO_FAULT: i32 = 21;

/// State owned by each module's store.
pub struct HostState {
    /// URL of the module running in this store, for log context.
    pub url: String,
    /// Resource limits enforced by the store limiter.
    pub limits: StoreLimits,
}

impl HostState {
    /// Create new host state.
    pub fn new(url: impl Into<String>, limits: StoreLimits) -> Self {
        Self {
            url: url.into(),
            limits,
        }
    }
}

/// Create a linker resolving every import the host supports for `module`.
///
/// The linker is built per module because `env.consoleLog` is bound to the
/// signature that module declares.
pub fn create_linker(engine: &Engine, module: &Module) -> Result<Linker<HostState>> {
    let mut linker = Linker::new(engine);
    register_wasi_functions(&mut linker)?;
    register_math_functions(&mut linker)?;

    for import in module.imports() {
        if import.module() != ENV_MODULE || import.name() != "consoleLog" {
            continue;
        }
        if let ExternType::Func(ty) = import.ty() {
            register_console_log(&mut linker, ty)?;
        }
    }

    Ok(linker)
}

fn host_error(function: &str) -> impl FnOnce(wasmtime::Error) -> PitlaneError + '_ {
    move |e| PitlaneError::Runtime {
        component: format!("host function {}", function),
        cause: e.to_string(),
    }
}

/// Resolve the guest's exported memory.
fn guest_memory(caller: &mut Caller<'_, HostState>) -> Option<Memory> {
    ["memory", "__wasm_memory"]
        .into_iter()
        .find_map(|name| match caller.get_export(name) {
            Some(Extern::Memory(m)) => Some(m),
            _ => None,
        })
}

fn write_bytes(caller: &mut Caller<'_, HostState>, ptr: i32, bytes: &[u8]) -> bool {
    let Some(memory) = guest_memory(caller) else {
        return false;
    };
    let start = ptr as u32 as usize;
    match memory.data_mut(caller).get_mut(start..start + bytes.len()) {
        Some(dest) => {
            dest.copy_from_slice(bytes);
            true
        }
        None => false,
    }
}

/// Zero `len` guest bytes at `ptr` in place. False if the range is outside
/// memory.
fn zero_bytes(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> bool {
    let Some(memory) = guest_memory(caller) else {
        return false;
    };
    let start = ptr as u32 as usize;
    let end = start.saturating_add(len as u32 as usize);
    match memory.data_mut(caller).get_mut(start..end) {
        Some(dest) => {
            dest.fill(0);
            true
        }
        None => false,
    }
}

fn read_u32(data: &[u8], ptr: usize) -> Option<u32> {
    let bytes = data.get(ptr..ptr + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_string(caller: &mut Caller<'_, HostState>, ptr: i32, len: i32) -> Option<String> {
    let memory = guest_memory(caller)?;
    let start = ptr as u32 as usize;
    let bytes = memory.data(&*caller).get(start..start + len as u32 as usize)?;
    Some(String::from_utf8_lossy(bytes).into_owned())
}

/// Register the WASI preview1 stubs.
fn register_wasi_functions(linker: &mut Linker<HostState>) -> Result<()> {
    linker
        .func_wrap(
            WASI_MODULE,
            "proc_exit",
            |caller: Caller<'_, HostState>, code: i32| {
                tracing::debug!(url = %caller.data().url, code, "Module called proc_exit; ignoring");
            },
        )
        .map_err(host_error("proc_exit"))?;

    // fd_write(fd, iovs, iovs_len, nwritten) -> errno
    // Reports every byte as written and forwards the text to the debug log.
    linker
        .func_wrap(
            WASI_MODULE,
            "fd_write",
            |mut caller: Caller<'_, HostState>, fd: i32, iovs: i32, iovs_len: i32, nwritten: i32| -> i32 {
                let Some(memory) = guest_memory(&mut caller) else {
                    return ERRNO_BADF;
                };
                let data = memory.data(&caller);
                let mut text = Vec::new();
                let mut total: u32 = 0;
                for i in 0..iovs_len.max(0) as usize {
                    let iov = iovs as u32 as usize + i * 8;
                    let (Some(ptr), Some(len)) = (read_u32(data, iov), read_u32(data, iov + 4)) else {
                        return ERRNO_BADF;
                    };
                    let Some(chunk) = data.get(ptr as usize..ptr as usize + len as usize) else {
                        return ERRNO_BADF;
                    };
                    text.extend_from_slice(chunk);
                    total = total.wrapping_add(len);
                }

                let text = String::from_utf8_lossy(&text);
                let text = text.trim_end();
                if !text.is_empty() {
                    tracing::debug!(url = %caller.data().url, fd, "[WASM] {}", text);
                }

                if write_bytes(&mut caller, nwritten, &total.to_le_bytes()) {
                    ERRNO_SUCCESS
                } else {
                    ERRNO_BADF
                }
            },
        )
        .map_err(host_error("fd_write"))?;

    // fd_read(fd, iovs, iovs_len, nread) -> errno; always end of file.
    linker
        .func_wrap(
            WASI_MODULE,
            "fd_read",
            |mut caller: Caller<'_, HostState>, _fd: i32, _iovs: i32, _iovs_len: i32, nread: i32| -> i32 {
                write_bytes(&mut caller, nread, &0u32.to_le_bytes());
                ERRNO_SUCCESS
            },
        )
        .map_err(host_error("fd_read"))?;

    linker
        .func_wrap(
            WASI_MODULE,
            "fd_seek",
            |mut caller: Caller<'_, HostState>, _fd: i32, _offset: i64, _whence: i32, new_offset: i32| -> i32 {
                write_bytes(&mut caller, new_offset, &0u64.to_le_bytes());
                ERRNO_SUCCESS
            },
        )
        .map_err(host_error("fd_seek"))?;

    linker
        .func_wrap(WASI_MODULE, "fd_close", |_fd: i32| -> i32 { ERRNO_SUCCESS })
        .map_err(host_error("fd_close"))?;

    linker
        .func_wrap(
            WASI_MODULE,
            "environ_sizes_get",
            |mut caller: Caller<'_, HostState>, count: i32, buf_size: i32| -> i32 {
                write_bytes(&mut caller, count, &0u32.to_le_bytes());
                write_bytes(&mut caller, buf_size, &0u32.to_le_bytes());
                ERRNO_SUCCESS
            },
        )
        .map_err(host_error("environ_sizes_get"))?;

    linker
        .func_wrap(WASI_MODULE, "environ_get", |_environ: i32, _buf: i32| -> i32 {
            ERRNO_SUCCESS
        })
        .map_err(host_error("environ_get"))?;

    linker
        .func_wrap(
            WASI_MODULE,
            "clock_time_get",
            |mut caller: Caller<'_, HostState>, _id: i32, _precision: i64, time: i32| -> i32 {
                write_bytes(&mut caller, time, &0u64.to_le_bytes());
                ERRNO_SUCCESS
            },
        )
        .map_err(host_error("clock_time_get"))?;

    linker
        .func_wrap(
            WASI_MODULE,
            "random_get",
            |mut caller: Caller<'_, HostState>, buf: i32, len: i32| -> i32 {
                if zero_bytes(&mut caller, buf, len) {
                    ERRNO_SUCCESS
                } else {
                    ERRNO_FAULT
                }
            },
        )
        .map_err(host_error("random_get"))?;

    linker
        .func_wrap(WASI_MODULE, "sched_yield", || -> i32 { ERRNO_SUCCESS })
        .map_err(host_error("sched_yield"))?;

    Ok(())
}

/// Register the `env` math helpers.
fn register_math_functions(linker: &mut Linker<HostState>) -> Result<()> {
    let unary: [(&str, fn(f64) -> f64); 4] = [
        ("sin", f64::sin),
        ("cos", f64::cos),
        ("sqrt", f64::sqrt),
        ("abs", f64::abs),
    ];
    for (name, f) in unary {
        linker
            .func_wrap(ENV_MODULE, name, move |x: f64| -> f64 { f(x) })
            .map_err(host_error(name))?;
    }

    let binary: [(&str, fn(f64, f64) -> f64); 4] = [
        ("atan2", f64::atan2),
        ("pow", f64::powf),
        ("min", f64::min),
        ("max", f64::max),
    ];
    for (name, f) in binary {
        linker
            .func_wrap(ENV_MODULE, name, move |a: f64, b: f64| -> f64 { f(a, b) })
            .map_err(host_error(name))?;
    }

    Ok(())
}

/// Bind `env.consoleLog` to the signature the module declared.
///
/// `(i32 ptr, i32 len)` logs a UTF-8 string from linear memory; any other
/// parameter list logs the raw values.
fn register_console_log(linker: &mut Linker<HostState>, ty: FuncType) -> Result<()> {
    let params: Vec<ValType> = ty.params().collect();
    let is_string = params.len() == 2 && params.iter().all(|p| matches!(p, ValType::I32));
    let results = ty
        .results()
        .map(|r| match r {
            ValType::I32 => Ok(Val::I32(0)),
            ValType::I64 => Ok(Val::I64(0)),
            ValType::F32 => Ok(Val::F32(0)),
            ValType::F64 => Ok(Val::F64(0)),
            other => Err(PitlaneError::Runtime {
                component: "host function consoleLog".to_string(),
                cause: format!("unsupported result type {:?}", other),
            }),
        })
        .collect::<Result<Vec<Val>>>()?;

    linker
        .func_new(
            ENV_MODULE,
            "consoleLog",
            ty,
            move |mut caller: Caller<'_, HostState>, args: &[Val], out: &mut [Val]| {
                let string_args = match args {
                    [Val::I32(ptr), Val::I32(len)] if is_string => Some((*ptr, *len)),
                    _ => None,
                };
                if let Some((ptr, len)) = string_args {
                    let text = read_string(&mut caller, ptr, len).unwrap_or_default();
                    tracing::debug!(url = %caller.data().url, "[WASM] {}", text);
                } else {
                    let values: Vec<String> = args.iter().map(format_val).collect();
                    tracing::debug!(url = %caller.data().url, "[WASM] {}", values.join(" "));
                }
                for (slot, value) in out.iter_mut().zip(&results) {
                    *slot = value.clone();
                }
                Ok(())
            },
        )
        .map_err(host_error("consoleLog"))?;

    Ok(())
}

fn format_val(val: &Val) -> String {
    match val {
        Val::I32(v) => v.to_string(),
        Val::I64(v) => v.to_string(),
        Val::F32(bits) => f32::from_bits(*bits).to_string(),
        Val::F64(bits) => f64::from_bits(*bits).to_string(),
        other => format!("{:?}", other),
    }
}
