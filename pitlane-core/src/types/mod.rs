//! Core types for Pitlane.
//!
//! - `DecisionRequest`: per-tick car kinematics and environment snapshot
//! - `DecisionResponse`: control signals produced by a decision module
//! - `Steering`: digital (two flags) or analog (clamped scalar) steering

mod request;
mod response;

pub use request::{DecisionRequest, Vec2, WIRE_FIELD_COUNT};
pub use response::{DecisionResponse, STEERING_DEAD_ZONE, Steering};
