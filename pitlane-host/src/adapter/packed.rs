//! Packed-return variant. Needs no shared memory.

use super::{Binding, scalar_val, scalar_width};
use crate::codec::{ScalarWidth, packed, scalar_args};
use crate::wasm::{Capabilities, ModuleInstance};
use pitlane_core::{DecisionRequest, DecisionResponse, Result};
use wasmtime::Val;

pub(super) fn bind(caps: &Capabilities, url: &str) -> Result<Binding> {
    Ok(Binding::Packed {
        width: scalar_width(caps, url)?,
    })
}

pub(super) fn decide(
    instance: &mut ModuleInstance,
    width: ScalarWidth,
    request: &DecisionRequest,
) -> Result<DecisionResponse> {
    let params: Vec<Val> = scalar_args(request, width)
        .into_iter()
        .map(scalar_val)
        .collect();
    let mut results = [Val::I32(0)];

    instance.call("process", &params, &mut results)?;

    let raw = results[0].i32().unwrap_or_default() as u32;
    Ok(packed::decode(raw))
}
