//! Packed-integer return convention.
//!
//! `process` returns a single 32-bit integer:
//!
//! ```text
//! bit 31     accelerate
//! bit 30     brake
//! bits 29-16 unused
//! bits 15-0  steering, signed 16-bit, value / 32767 clamped to [-1.0, 1.0]
//! ```

use pitlane_core::{DecisionResponse, Steering};

/// Accelerate flag.
pub const ACCELERATE_BIT: u32 = 1 << 31;

/// Brake flag.
pub const BRAKE_BIT: u32 = 1 << 30;

/// Mask for the steering field.
pub const STEERING_MASK: u32 = 0xFFFF;

/// Full-scale steering magnitude.
pub const STEERING_SCALE: f32 = 32767.0;

/// Decode a packed return value.
pub fn decode(raw: u32) -> DecisionResponse {
    let accelerate = raw & ACCELERATE_BIT != 0;
    let brake = raw & BRAKE_BIT != 0;
    // Truncating to i16 sign-extends bit 15.
    let steering = (raw & STEERING_MASK) as u16 as i16;
    DecisionResponse::new(
        accelerate,
        brake,
        Steering::analog(f32::from(steering) / STEERING_SCALE),
    )
}

/// Encode a response as a packed value, as a module would.
pub fn encode(response: &DecisionResponse) -> u32 {
    let mut raw = 0;
    if response.accelerate {
        raw |= ACCELERATE_BIT;
    }
    if response.brake {
        raw |= BRAKE_BIT;
    }
    let steering = (response.steering.as_scalar() * STEERING_SCALE).round() as i16;
    raw | (steering as u16 as u32)
}
