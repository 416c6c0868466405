//! Shared float-buffer convention.
//!
//! The module exposes two regions of linear memory. The host writes the
//! request as nine little-endian f64 values at 8-byte strides into the input
//! region, calls `process()`, then reads four f64 flags from the output
//! region. A flag is set when its value is strictly greater than zero.

use pitlane_core::types::WIRE_FIELD_COUNT;
use pitlane_core::{DecisionRequest, DecisionResponse, Steering};

/// Size of one field on the wire.
pub const FIELD_STRIDE: usize = 8;

/// Byte length of the input region.
pub const INPUT_LEN: usize = WIRE_FIELD_COUNT * FIELD_STRIDE;

/// Number of f64 flags in the output region.
pub const OUTPUT_FIELD_COUNT: usize = 4;

/// Byte length of the output region.
pub const OUTPUT_LEN: usize = OUTPUT_FIELD_COUNT * FIELD_STRIDE;

/// Encode a request into the input region layout.
pub fn encode_request(request: &DecisionRequest) -> [u8; INPUT_LEN] {
    let mut buf = [0u8; INPUT_LEN];
    for (chunk, value) in buf
        .chunks_exact_mut(FIELD_STRIDE)
        .zip(request.wire_fields())
    {
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    buf
}

/// Decode the input region back into a request.
pub fn decode_request(bytes: &[u8; INPUT_LEN]) -> DecisionRequest {
    let mut fields = [0f64; WIRE_FIELD_COUNT];
    for (field, chunk) in fields.iter_mut().zip(bytes.chunks_exact(FIELD_STRIDE)) {
        *field = read_f64(chunk);
    }
    DecisionRequest::from_wire_fields(fields)
}

/// Decode the output region: accelerate, brake, turn left, turn right.
pub fn decode_response(bytes: &[u8; OUTPUT_LEN]) -> DecisionResponse {
    let mut flags = [false; OUTPUT_FIELD_COUNT];
    for (flag, chunk) in flags.iter_mut().zip(bytes.chunks_exact(FIELD_STRIDE)) {
        // NaN compares false, so a NaN flag reads as unset.
        *flag = read_f64(chunk) > 0.0;
    }
    let [accelerate, brake, turn_left, turn_right] = flags;
    DecisionResponse::new(accelerate, brake, Steering::digital(turn_left, turn_right))
}

/// Encode a response in the output region layout, as a module would.
pub fn encode_response(response: &DecisionResponse) -> [u8; OUTPUT_LEN] {
    let (turn_left, turn_right) = response.steering.as_flags();
    let flags = [response.accelerate, response.brake, turn_left, turn_right];
    let mut buf = [0u8; OUTPUT_LEN];
    for (chunk, flag) in buf.chunks_exact_mut(FIELD_STRIDE).zip(flags) {
        let value: f64 = if flag { 1.0 } else { 0.0 };
        chunk.copy_from_slice(&value.to_le_bytes());
    }
    buf
}

fn read_f64(chunk: &[u8]) -> f64 {
    let mut raw = [0u8; FIELD_STRIDE];
    raw.copy_from_slice(chunk);
    f64::from_le_bytes(raw)
}
