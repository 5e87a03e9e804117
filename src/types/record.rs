//! A single gaze telemetry sample

use serde::{Deserialize, Serialize};

/// One eye-tracking sample as produced by a tracker.
///
/// Ranges noted on the fields are advisory. Values outside them travel through the
/// codec unchanged so borderline sensor data is never rejected.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GazeRecord {
    /// Producer-assigned sequence number, zero when the producer does not track it
    pub sequence_number: u64,

    /// Whole-second capture timestamp
    pub capture_time_seconds: u64,

    /// Sub-second part of the capture timestamp, see [`SubsecondUnit`](super::SubsecondUnit)
    pub capture_time_subsecond: u32,

    /// Which eye (channel) the sample belongs to
    pub eye_id: bool,

    /// Tracker confidence, nominally in [0.0, 1.0]
    pub confidence: f32,

    /// Normalized horizontal gaze position, nominally in [0.0, 1.0]
    pub gaze_x: f32,

    /// Normalized vertical gaze position, nominally in [0.0, 1.0]
    pub gaze_y: f32,

    /// Pupil size in instrument units
    pub pupil_diameter: u32,
}

impl GazeRecord {
    /// Bitwise equality, treating identical NaN payloads as equal.
    ///
    /// `PartialEq` follows IEEE float comparison; this is what a lossless
    /// transport has to preserve.
    pub fn bit_eq(&self, other: &Self) -> bool {
        self.sequence_number == other.sequence_number
            && self.capture_time_seconds == other.capture_time_seconds
            && self.capture_time_subsecond == other.capture_time_subsecond
            && self.eye_id == other.eye_id
            && self.confidence.to_bits() == other.confidence.to_bits()
            && self.gaze_x.to_bits() == other.gaze_x.to_bits()
            && self.gaze_y.to_bits() == other.gaze_y.to_bits()
            && self.pupil_diameter == other.pupil_diameter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bit_eq_distinguishes_nan_payloads_and_signed_zero() {
        let a = GazeRecord { gaze_x: f32::NAN, ..Default::default() };
        let b = GazeRecord { gaze_x: f32::NAN, ..Default::default() };
        assert_ne!(a, b);
        assert!(a.bit_eq(&b));

        let pos = GazeRecord { gaze_y: 0.0, ..Default::default() };
        let neg = GazeRecord { gaze_y: -0.0, ..Default::default() };
        assert_eq!(pos, neg);
        assert!(!pos.bit_eq(&neg));
    }
}
