//! Shared float-buffer variant.

use super::{Binding, with_memory};
use crate::codec::buffer::{INPUT_LEN, OUTPUT_LEN, decode_response, encode_request};
use crate::wasm::{MemoryView, ModuleInstance};
use pitlane_core::{DecisionRequest, DecisionResponse, Result};

/// Ask the module for its two buffers. The offsets stay valid for the
/// module's lifetime; only the views over them are refreshed.
pub(super) fn bind(instance: &mut ModuleInstance, url: &str) -> Result<Binding> {
    let input_offset = instance.call_i32("allocate_input")? as u32;
    let output_offset = instance.call_i32("allocate_output")? as u32;

    let (input, output) = with_memory(instance, url, |store, memory| {
        let input = memory.view(&*store, input_offset, INPUT_LEN)?;
        let output = memory.view(&*store, output_offset, OUTPUT_LEN)?;
        Ok((input, output))
    })?;

    tracing::debug!(
        url,
        input_offset,
        output_offset,
        "Shared buffers allocated"
    );
    Ok(Binding::Buffer { input, output })
}

pub(super) fn decide(
    instance: &mut ModuleInstance,
    input: &mut MemoryView,
    output: &mut MemoryView,
    request: &DecisionRequest,
    url: &str,
) -> Result<DecisionResponse> {
    let bytes = encode_request(request);
    with_memory(instance, url, |store, memory| {
        memory.write(store, input, &bytes)
    })?;

    instance.call("process", &[], &mut [])?;

    // process() may have grown memory; read revalidates the view first.
    let flags: [u8; OUTPUT_LEN] =
        with_memory(instance, url, |store, memory| memory.read(&*store, output))?;
    Ok(decode_response(&flags))
}
