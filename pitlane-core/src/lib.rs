//! Pitlane Core Library
//!
//! Foundational types shared by every part of the Pitlane decision-module
//! host.
//!
//! # Overview
//!
//! Pitlane hosts sandboxed WebAssembly "decision modules" that drive a car in
//! a racing simulation. Once per tick the simulation hands the host a
//! [`DecisionRequest`] and receives a [`DecisionResponse`] back.
//!
//! # Key Components
//!
//! - **Types**: the request/response value types and their wire ordering
//! - **Error**: the [`PitlaneError`] taxonomy with stable error codes
//! - **Fetch**: transports that retrieve module bytes from a URL
//!
//! # Example
//!
//! ```
//! use pitlane_core::{DecisionRequest, DecisionResponse};
//!
//! let request = DecisionRequest::new(123.0, 45.0)
//!     .with_speed(10.0)
//!     .with_body(50.0, 20.0)
//!     .with_environment(800.0, 600.0)
//!     .with_elapsed_time(0.016);
//! assert_eq!(request.wire_fields()[0], 123.0);
//!
//! let neutral = DecisionResponse::neutral();
//! assert!(!neutral.accelerate);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod fetch;
pub mod types;

pub use error::{PitlaneError, Result};
pub use types::{DecisionRequest, DecisionResponse, Steering, Vec2};
