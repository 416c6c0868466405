//! Scalar-in, pointer-out variant.

use super::{AdapterConfig, Binding, scalar_val, scalar_width, with_memory};
use crate::codec::pointer::{OUTPUT_RECORD_LEN, decode_record};
use crate::codec::{ScalarWidth, scalar_args};
use crate::wasm::{Capabilities, MemoryView, ModuleInstance};
use pitlane_core::{DecisionRequest, DecisionResponse, PitlaneError, Result};
use wasmtime::Val;

/// Establish the output record region: `allocate(12)` when exported,
/// otherwise the configured fixed offset.
pub(super) fn bind(
    instance: &mut ModuleInstance,
    caps: &Capabilities,
    config: &AdapterConfig,
    url: &str,
) -> Result<Binding> {
    let width = scalar_width(caps, url)?;

    let (offset, allocated) = if caps.allocate {
        let mut results = [Val::I32(0)];
        instance.call(
            "allocate",
            &[Val::I32(OUTPUT_RECORD_LEN as i32)],
            &mut results,
        )?;
        (results[0].i32().unwrap_or_default() as u32, true)
    } else if let Some(fixed) = config.fixed_output_offset {
        tracing::warn!(
            url,
            offset = fixed,
            "Module exports no 'allocate'; writing output at a fixed offset it may also use"
        );
        (fixed, false)
    } else {
        return Err(PitlaneError::MissingExports {
            url: url.to_string(),
            cause: "no 'allocate' export and the fixed output offset is disabled".to_string(),
        });
    };

    let output = with_memory(instance, url, |store, memory| {
        memory.view(&*store, offset, OUTPUT_RECORD_LEN)
    })?;

    tracing::debug!(url, offset, ?width, allocated, "Output record bound");
    Ok(Binding::Pointer {
        width,
        output,
        allocated,
    })
}

pub(super) fn decide(
    instance: &mut ModuleInstance,
    width: ScalarWidth,
    output: &mut MemoryView,
    request: &DecisionRequest,
    url: &str,
) -> Result<DecisionResponse> {
    let mut params: Vec<Val> = scalar_args(request, width)
        .into_iter()
        .map(scalar_val)
        .collect();
    params.push(Val::I32(output.offset as i32));

    instance.call("process", &params, &mut [])?;

    let record: [u8; OUTPUT_RECORD_LEN] =
        with_memory(instance, url, |store, memory| memory.read(&*store, output))?;
    Ok(decode_record(&record))
}
