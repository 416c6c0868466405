//! The per-tick decision request.

use serde::{Deserialize, Serialize};

/// Number of scalar fields a request occupies on the wire.
pub const WIRE_FIELD_COUNT: usize = 9;

/// A 2D position in world units.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Vec2 {
    /// Create a new position.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Car kinematics and environment snapshot for one simulation tick.
///
/// Constructed fresh by the simulation loop for every tick. All fields are
/// expected to be finite; the codecs pass non-finite values through
/// bit-for-bit rather than sanitizing them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequest {
    /// Car position.
    pub position: Vec2,
    /// Speed, non-negative.
    pub speed: f64,
    /// Heading in radians.
    pub heading: f64,
    /// Car body width, positive.
    pub body_width: f64,
    /// Car body height, positive.
    pub body_height: f64,
    /// Track/environment width, positive.
    pub environment_width: f64,
    /// Track/environment height, positive.
    pub environment_height: f64,
    /// Seconds elapsed since the previous tick, positive.
    pub elapsed_time: f64,
}

impl DecisionRequest {
    /// Create a request at the given position with a stationary default car.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            position: Vec2::new(x, y),
            ..Self::default()
        }
    }

    /// Set the speed.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    /// Set the heading in radians.
    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = heading;
        self
    }

    /// Set the car body dimensions.
    pub fn with_body(mut self, width: f64, height: f64) -> Self {
        self.body_width = width;
        self.body_height = height;
        self
    }

    /// Set the environment dimensions.
    pub fn with_environment(mut self, width: f64, height: f64) -> Self {
        self.environment_width = width;
        self.environment_height = height;
        self
    }

    /// Set the elapsed time since the previous tick.
    pub fn with_elapsed_time(mut self, seconds: f64) -> Self {
        self.elapsed_time = seconds;
        self
    }

    /// The fields in wire order: x, y, speed, heading, body width, body
    /// height, environment width, environment height, elapsed time.
    pub fn wire_fields(&self) -> [f64; WIRE_FIELD_COUNT] {
        [
            self.position.x,
            self.position.y,
            self.speed,
            self.heading,
            self.body_width,
            self.body_height,
            self.environment_width,
            self.environment_height,
            self.elapsed_time,
        ]
    }

    /// Rebuild a request from fields in wire order.
    pub fn from_wire_fields(fields: [f64; WIRE_FIELD_COUNT]) -> Self {
        let [x, y, speed, heading, body_width, body_height, env_width, env_height, elapsed] =
            fields;
        Self {
            position: Vec2::new(x, y),
            speed,
            heading,
            body_width,
            body_height,
            environment_width: env_width,
            environment_height: env_height,
            elapsed_time: elapsed,
        }
    }

    /// Check that every field is finite.
    pub fn is_finite(&self) -> bool {
        self.wire_fields().iter().all(|v| v.is_finite())
    }
}

impl Default for DecisionRequest {
    fn default() -> Self {
        Self {
            position: Vec2::default(),
            speed: 0.0,
            heading: 0.0,
            body_width: 50.0,
            body_height: 20.0,
            environment_width: 800.0,
            environment_height: 600.0,
            elapsed_time: 1.0 / 60.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_order() {
        let request = DecisionRequest::new(1.0, 2.0)
            .with_speed(3.0)
            .with_heading(4.0)
            .with_body(5.0, 6.0)
            .with_environment(7.0, 8.0)
            .with_elapsed_time(9.0);

        assert_eq!(
            request.wire_fields(),
            [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]
        );
        assert_eq!(DecisionRequest::from_wire_fields(request.wire_fields()), request);
    }

    #[test]
    fn finiteness() {
        assert!(DecisionRequest::default().is_finite());
        assert!(!DecisionRequest::new(f64::NAN, 0.0).is_finite());
        assert!(!DecisionRequest::default().with_speed(f64::INFINITY).is_finite());
    }

    #[test]
    fn serde_uses_camel_case() {
        let json = serde_json::to_value(DecisionRequest::default()).unwrap();
        assert!(json.get("bodyWidth").is_some());
        assert!(json.get("elapsedTime").is_some());
        assert_eq!(json["position"]["x"], 0.0);
    }
}
