//! Scalar-in, pointer-out convention.
//!
//! `process` receives the nine request scalars plus an i32 pointer and writes
//! a 12-byte little-endian record there:
//!
//! ```text
//! offset 0: u32 accelerate (0 = false, nonzero = true)
//! offset 4: u32 brake
//! offset 8: f32 steering in [-1.0, 1.0]
//! ```

use pitlane_core::{DecisionResponse, Steering};

/// Size of the output record in bytes.
pub const OUTPUT_RECORD_LEN: usize = 12;

/// Decode the output record.
///
/// Steering is clamped to [-1.0, 1.0] regardless of what the module wrote.
pub fn decode_record(bytes: &[u8; OUTPUT_RECORD_LEN]) -> DecisionResponse {
    let accelerate = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) != 0;
    let brake = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) != 0;
    let steering = f32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
    DecisionResponse::new(accelerate, brake, Steering::analog(steering))
}

/// Encode a response as an output record, as a module would.
pub fn encode_record(response: &DecisionResponse) -> [u8; OUTPUT_RECORD_LEN] {
    let mut buf = [0u8; OUTPUT_RECORD_LEN];
    buf[0..4].copy_from_slice(&u32::from(response.accelerate).to_le_bytes());
    buf[4..8].copy_from_slice(&u32::from(response.brake).to_le_bytes());
    buf[8..12].copy_from_slice(&response.steering.as_scalar().to_le_bytes());
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(accelerate: u32, brake: u32, steering: f32) -> [u8; OUTPUT_RECORD_LEN] {
        let mut buf = [0u8; OUTPUT_RECORD_LEN];
        buf[0..4].copy_from_slice(&accelerate.to_le_bytes());
        buf[4..8].copy_from_slice(&brake.to_le_bytes());
        buf[8..12].copy_from_slice(&steering.to_le_bytes());
        buf
    }

    #[test]
    fn decodes_flags_and_steering() {
        let response = decode_record(&record(1, 0, -0.25));
        assert!(response.accelerate);
        assert!(!response.brake);
        assert_eq!(response.steering, Steering::Analog { value: -0.25 });
    }

    #[test]
    fn any_nonzero_word_is_true() {
        let response = decode_record(&record(0xFFFF_FFFF, 2, 0.0));
        assert!(response.accelerate);
        assert!(response.brake);
    }

    #[test]
    fn out_of_range_steering_is_clamped() {
        assert_eq!(decode_record(&record(0, 0, 2.5)).steering.as_scalar(), 1.0);
        assert_eq!(decode_record(&record(0, 0, -9.0)).steering.as_scalar(), -1.0);
        assert_eq!(decode_record(&record(0, 0, f32::NAN)).steering.as_scalar(), 0.0);
    }

    #[test]
    fn encoded_record_decodes_back() {
        let response = DecisionResponse::new(false, true, Steering::analog(0.75));
        assert_eq!(decode_record(&encode_record(&response)), response);
    }
}
