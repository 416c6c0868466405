//! Shared fixtures for integration tests.
//!
//! Every fixture is a small hand-written module in WAT, compiled with the
//! `wat` crate and served through a `MockFetcher` under
//! `https://modules.test/<name>.wasm`.

#![allow(dead_code)]

use pitlane_core::DecisionRequest;
use pitlane_core::fetch::MockFetcher;
use pitlane_host::prelude::*;
use std::sync::Arc;
use std::time::Duration;

/// Shared-buffer module. Input at 256, output at 512.
///
/// Accelerates below speed 20, never brakes, steers towards the horizontal
/// centre of the environment. `read_field(i)` exposes the raw input buffer.
pub const BUFFER: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "allocate_input") (result i32) (i32.const 256))
  (func (export "allocate_output") (result i32) (i32.const 512))
  (func (export "read_field") (param $i i32) (result f64)
    (f64.load (i32.add (i32.const 256) (i32.mul (local.get $i) (i32.const 8)))))
  (func (export "process")
    (f64.store (i32.const 512) (f64.sub (f64.const 20) (f64.load (i32.const 272))))
    (f64.store (i32.const 520) (f64.const 0))
    (f64.store (i32.const 528)
      (f64.sub (f64.load (i32.const 256)) (f64.mul (f64.load (i32.const 304)) (f64.const 0.5))))
    (f64.store (i32.const 536)
      (f64.sub (f64.mul (f64.load (i32.const 304)) (f64.const 0.5)) (f64.load (i32.const 256)))))
  (func (export "cleanup")))
"#;

/// Shared-buffer module whose `process` grows memory by one page and then
/// writes accelerate=1, brake=1 as a sentinel.
pub const GROWING_BUFFER: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "allocate_input") (result i32) (i32.const 0))
  (func (export "allocate_output") (result i32) (i32.const 128))
  (func (export "process")
    (drop (memory.grow (i32.const 1)))
    (f64.store (i32.const 128) (f64.const 1))
    (f64.store (i32.const 136) (f64.const 1))
    (f64.store (i32.const 144) (f64.const 0))
    (f64.store (i32.const 152) (f64.const 0))))
"#;

/// Scalar-pointer module with f32 parameters and its own allocator.
///
/// `allocate` always returns 2048; `freed()` reports the last pointer passed
/// to `deallocate`.
pub const POINTER_F32: &str = r#"
(module
  (memory (export "memory") 1)
  (global $freed (mut i32) (i32.const 0))
  (func (export "allocate") (param i32) (result i32) (i32.const 2048))
  (func (export "deallocate") (param i32 i32) (global.set $freed (local.get 0)))
  (func (export "freed") (result i32) (global.get $freed))
  (func (export "process")
    (param $x f32) (param $y f32) (param $speed f32) (param $heading f32)
    (param f32 f32 f32 f32 f32) (param $out i32)
    (i32.store (local.get $out) (f32.lt (local.get $speed) (f32.const 20)))
    (i32.store offset=4 (local.get $out) (i32.const 0))
    (f32.store offset=8 (local.get $out) (f32.const -0.5))))
"#;

/// Scalar-pointer module with f64 parameters and no allocator. Writes an
/// out-of-range steering value of 2.5.
pub const POINTER_FIXED: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "process")
    (param f64 f64 f64 f64 f64 f64 f64 f64 f64) (param $out i32)
    (i32.store (local.get $out) (i32.const 1))
    (i32.store offset=4 (local.get $out) (i32.const 7))
    (f32.store offset=8 (local.get $out) (f32.const 2.5))))
"#;

/// Packed-return module: `0x80000000` below speed 20, `0xC0008000` otherwise.
pub const PACKED: &str = r#"
(module
  (func (export "process")
    (param f64 f64 f64 f64 f64 f64 f64 f64 f64) (result i32)
    (select
      (i32.const -2147483648)
      (i32.const -1073709056)
      (f64.lt (local.get 2) (f64.const 20)))))
"#;

/// Packed-return module with f32 parameters that steers half right and
/// writes a line through WASI on every call.
pub const PACKED_F32_WASI: &str = r#"
(module
  (import "wasi_snapshot_preview1" "fd_write"
    (func $fd_write (param i32 i32 i32 i32) (result i32)))
  (import "env" "consoleLog" (func $log (param f64)))
  (memory (export "memory") 1)
  (data (i32.const 64) "tick\n")
  (func (export "process")
    (param f32 f32 f32 f32 f32 f32 f32 f32 f32) (result i32)
    (i32.store (i32.const 0) (i32.const 64))
    (i32.store (i32.const 4) (i32.const 5))
    (drop (call $fd_write (i32.const 1) (i32.const 0) (i32.const 1) (i32.const 16)))
    (call $log (f64.promote_f32 (local.get 2)))
    (i32.const 16384)))
"#;

/// Packed-return module whose `process` traps.
pub const TRAPPING: &str = r#"
(module
  (func (export "process")
    (param f64 f64 f64 f64 f64 f64 f64 f64 f64) (result i32)
    unreachable))
"#;

/// Packed-return module whose `process` never returns.
pub const SPINNING: &str = r#"
(module
  (func (export "process")
    (param f64 f64 f64 f64 f64 f64 f64 f64 f64) (result i32)
    (loop $forever (br $forever))
    (i32.const 0)))
"#;

/// Valid module matching no decision ABI.
pub const NO_ABI: &str = r#"
(module
  (memory (export "memory") 1)
  (func (export "tick")))
"#;

/// Module importing a function the host does not provide.
pub const UNKNOWN_IMPORT: &str = r#"
(module
  (import "env" "fopen" (func (param i32) (result i32)))
  (func (export "process")
    (param f64 f64 f64 f64 f64 f64 f64 f64 f64) (result i32)
    (i32.const 0)))
"#;

/// Compile WAT to module bytes.
pub fn wasm(wat: &str) -> Vec<u8> {
    wat::parse_str(wat).expect("fixture must be valid WAT")
}

/// URL a fixture is served under.
pub fn url(name: &str) -> String {
    format!("https://modules.test/{}.wasm", name)
}

/// A fetcher serving every fixture, plus `missing` (404) and `garbage`.
pub fn fixtures() -> MockFetcher {
    fixtures_with_latency(Duration::ZERO)
}

/// Like [`fixtures`], with simulated transport latency.
pub fn fixtures_with_latency(latency: Duration) -> MockFetcher {
    let served = [
        ("buffer", BUFFER),
        ("growing", GROWING_BUFFER),
        ("pointer-f32", POINTER_F32),
        ("pointer-fixed", POINTER_FIXED),
        ("packed", PACKED),
        ("packed-f32", PACKED_F32_WASI),
        ("trapping", TRAPPING),
        ("spinning", SPINNING),
        ("no-abi", NO_ABI),
        ("unknown-import", UNKNOWN_IMPORT),
    ];

    let mut fetcher = MockFetcher::new()
        .on_url("/missing\\.wasm$")
        .respond_status(404)
        .on_url("/garbage\\.wasm$")
        .respond_bytes(b"\0asm but not really".to_vec());

    for (name, wat) in served {
        fetcher = fetcher
            .on_url(&format!("/{}\\.wasm$", name))
            .with_latency(latency)
            .respond_bytes(wasm(wat));
    }
    fetcher
}

/// Registry over the fixture fetcher with test limits.
pub fn registry(fetcher: MockFetcher) -> (DecisionRegistry, Arc<MockFetcher>) {
    registry_with(HostConfig::testing(), fetcher)
}

/// Registry over `fetcher` with an explicit configuration.
pub fn registry_with(
    config: HostConfig,
    fetcher: MockFetcher,
) -> (DecisionRegistry, Arc<MockFetcher>) {
    let fetcher = Arc::new(fetcher);
    let registry =
        DecisionRegistry::with_fetcher(&config, fetcher.clone()).expect("registry construction");
    (registry, fetcher)
}

/// Instantiate a fixture directly, bypassing loader and registry.
pub fn instantiate(name: &str, wat: &str) -> Arc<ForeignModule> {
    let runtime = Arc::new(WasmRuntime::new(WasmRuntimeConfig::testing()).expect("runtime"));
    let module = runtime.compile(&url(name), &wasm(wat)).expect("compile");
    Arc::new(ForeignModule::instantiate(runtime, &url(name), &module).expect("instantiate"))
}

/// The reference request: (123, 45), speed 10, heading 0, 50x20 body,
/// 800x600 environment, 16 ms tick.
pub fn reference_request() -> DecisionRequest {
    DecisionRequest::new(123.0, 45.0)
        .with_speed(10.0)
        .with_heading(0.0)
        .with_body(50.0, 20.0)
        .with_environment(800.0, 600.0)
        .with_elapsed_time(0.016)
}
