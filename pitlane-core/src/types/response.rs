//! The decision response and steering representations.

use serde::{Deserialize, Serialize};

/// Scalar magnitude below which analog steering maps to "no turn" when
/// converted to digital flags.
pub const STEERING_DEAD_ZONE: f32 = 0.1;

/// Steering output of a decision module.
///
/// Which representation a response carries depends on the module's ABI
/// variant: the shared-buffer variant reports two flags, the scalar variants
/// report a single signed value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Steering {
    /// Independent left/right flags.
    #[serde(rename_all = "camelCase")]
    Digital {
        /// Turn left this tick.
        turn_left: bool,
        /// Turn right this tick.
        turn_right: bool,
    },
    /// Signed steering in [-1.0, 1.0]; negative is left.
    Analog {
        /// The clamped steering value.
        value: f32,
    },
}

impl Steering {
    /// Straight ahead.
    pub const fn straight() -> Self {
        Self::Digital {
            turn_left: false,
            turn_right: false,
        }
    }

    /// Create analog steering, clamped to [-1.0, 1.0].
    ///
    /// NaN maps to 0.0 and infinities saturate.
    pub fn analog(value: f32) -> Self {
        Self::Analog {
            value: clamp_steering(value),
        }
    }

    /// Create digital steering.
    pub const fn digital(turn_left: bool, turn_right: bool) -> Self {
        Self::Digital {
            turn_left,
            turn_right,
        }
    }

    /// Steering as a scalar in [-1.0, 1.0].
    ///
    /// Digital flags map to -1.0 (left), 1.0 (right) or 0.0 (neither, or both).
    pub fn as_scalar(&self) -> f32 {
        match *self {
            Self::Analog { value } => value,
            Self::Digital {
                turn_left,
                turn_right,
            } => match (turn_left, turn_right) {
                (true, false) => -1.0,
                (false, true) => 1.0,
                _ => 0.0,
            },
        }
    }

    /// Steering as `(turn_left, turn_right)` flags.
    ///
    /// Analog values inside the dead zone map to neither flag.
    pub fn as_flags(&self) -> (bool, bool) {
        match *self {
            Self::Digital {
                turn_left,
                turn_right,
            } => (turn_left, turn_right),
            Self::Analog { value } => (
                value <= -STEERING_DEAD_ZONE,
                value >= STEERING_DEAD_ZONE,
            ),
        }
    }
}

impl Default for Steering {
    fn default() -> Self {
        Self::straight()
    }
}

/// Control signals for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DecisionResponse {
    /// Apply throttle.
    pub accelerate: bool,
    /// Apply brake.
    pub brake: bool,
    /// Steering command.
    pub steering: Steering,
}

impl DecisionResponse {
    /// Create a response.
    pub const fn new(accelerate: bool, brake: bool, steering: Steering) -> Self {
        Self {
            accelerate,
            brake,
            steering,
        }
    }

    /// No throttle, no brake, straight ahead.
    ///
    /// Consumers substitute this when a tick's decision fails.
    pub const fn neutral() -> Self {
        Self::new(false, false, Steering::straight())
    }
}

fn clamp_steering(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analog_is_clamped() {
        assert_eq!(Steering::analog(2.5), Steering::Analog { value: 1.0 });
        assert_eq!(Steering::analog(-7.0), Steering::Analog { value: -1.0 });
        assert_eq!(Steering::analog(0.25), Steering::Analog { value: 0.25 });
        assert_eq!(Steering::analog(f32::INFINITY).as_scalar(), 1.0);
        assert_eq!(Steering::analog(f32::NAN).as_scalar(), 0.0);
    }

    #[test]
    fn digital_to_scalar() {
        assert_eq!(Steering::digital(true, false).as_scalar(), -1.0);
        assert_eq!(Steering::digital(false, true).as_scalar(), 1.0);
        assert_eq!(Steering::digital(true, true).as_scalar(), 0.0);
        assert_eq!(Steering::straight().as_scalar(), 0.0);
    }

    #[test]
    fn analog_to_flags() {
        assert_eq!(Steering::analog(-0.5).as_flags(), (true, false));
        assert_eq!(Steering::analog(0.5).as_flags(), (false, true));
        assert_eq!(Steering::analog(0.05).as_flags(), (false, false));
    }

    #[test]
    fn neutral_response() {
        let neutral = DecisionResponse::neutral();
        assert!(!neutral.accelerate);
        assert!(!neutral.brake);
        assert_eq!(neutral.steering.as_scalar(), 0.0);
        assert_eq!(neutral, DecisionResponse::default());
    }
}
