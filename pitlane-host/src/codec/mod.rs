//! Wire codecs for the three decision ABI conventions.
//!
//! The codecs are pure byte/integer transforms with no knowledge of the
//! execution engine. The adapter moves bytes between them and linear memory.
//!
//! | Convention | Request | Response |
//! |:-----------|:--------|:---------|
//! | [`buffer`] | 9 x f64 LE in shared memory | 4 x f64 LE flags in shared memory |
//! | [`pointer`] | 9 scalar arguments | 12-byte record at an output pointer |
//! | [`packed`] | 9 scalar arguments | one i32 bitfield return value |

pub mod buffer;
pub mod packed;
pub mod pointer;

use pitlane_core::{DecisionRequest, types::WIRE_FIELD_COUNT};
use serde::{Deserialize, Serialize};

/// Precision of the scalar arguments a module's `process` export takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarWidth {
    /// 64-bit floats.
    F64,
    /// 32-bit floats (as emitted by most C, C++, Rust and Go sample modules).
    F32,
}

/// One scalar argument, ready to hand to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScalarArg {
    /// A 64-bit float argument.
    F64(f64),
    /// A 32-bit float argument.
    F32(f32),
}

impl ScalarArg {
    /// The raw bit pattern, widened to 64 bits.
    pub fn to_bits(self) -> u64 {
        match self {
            Self::F64(v) => v.to_bits(),
            Self::F32(v) => u64::from(v.to_bits()),
        }
    }
}

/// Encode a request as scalar call arguments in wire order.
///
/// f64 arguments are passed through bit-for-bit. f32 arguments are rounded
/// with `as`, which keeps NaN and infinities intact.
pub fn scalar_args(request: &DecisionRequest, width: ScalarWidth) -> [ScalarArg; WIRE_FIELD_COUNT] {
    request.wire_fields().map(|v| match width {
        ScalarWidth::F64 => ScalarArg::F64(v),
        ScalarWidth::F32 => ScalarArg::F32(v as f32),
    })
}
