//! Synthetic hand poses.
//!
//! Used by the keyboard/mouse simulation source to stand in for a camera, and
//! by tests.  Offsets are hand-tuned against the default thresholds and are
//! expressed relative to the middle-finger base knuckle.

use crate::landmarks::{Landmark, JOINT_COUNT};

/// Poses the simulator can hold up in front of the "camera".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyntheticPose {
    OpenPalm,
    Fist,
    Pinch,
    /// Index + middle up, the rest curled: classifies as no gesture.
    Relaxed,
}

type Offsets = [(f32, f32); JOINT_COUNT];

const OPEN_PALM: Offsets = [
    ( 0.000,  0.200),
    (-0.080,  0.150), (-0.120,  0.100), (-0.160,  0.050), (-0.200,  0.000),
    (-0.050,  0.000), (-0.060, -0.080), (-0.065, -0.120), (-0.070, -0.160),
    ( 0.000,  0.000), ( 0.000, -0.090), ( 0.000, -0.130), ( 0.000, -0.170),
    ( 0.045,  0.005), ( 0.050, -0.070), ( 0.055, -0.110), ( 0.060, -0.150),
    ( 0.085,  0.020), ( 0.095, -0.040), ( 0.100, -0.070), ( 0.105, -0.100),
];

const FIST: Offsets = [
    ( 0.000,  0.200),
    (-0.080,  0.150), (-0.090,  0.100), (-0.040,  0.070), ( 0.020,  0.080),
    (-0.050,  0.000), (-0.050, -0.040), (-0.045, -0.010), (-0.050,  0.020),
    ( 0.000,  0.000), ( 0.000, -0.040), ( 0.005, -0.010), ( 0.000,  0.020),
    ( 0.045,  0.005), ( 0.045, -0.035), ( 0.050, -0.005), ( 0.045,  0.025),
    ( 0.085,  0.020), ( 0.085, -0.015), ( 0.090,  0.010), ( 0.085,  0.040),
];

const PINCH: Offsets = [
    ( 0.000,  0.200),
    (-0.080,  0.150), (-0.110,  0.080), (-0.100, -0.040), (-0.075, -0.140),
    (-0.050,  0.000), (-0.060, -0.080), (-0.065, -0.120), (-0.070, -0.160),
    ( 0.000,  0.000), ( 0.000, -0.090), ( 0.000, -0.130), ( 0.000, -0.170),
    ( 0.045,  0.005), ( 0.050, -0.070), ( 0.055, -0.110), ( 0.060, -0.150),
    ( 0.085,  0.020), ( 0.095, -0.040), ( 0.100, -0.070), ( 0.105, -0.100),
];

const RELAXED: Offsets = [
    ( 0.000,  0.200),
    (-0.080,  0.150), (-0.090,  0.100), (-0.040,  0.070), ( 0.020,  0.080),
    (-0.050,  0.000), (-0.060, -0.080), (-0.065, -0.120), (-0.070, -0.160),
    ( 0.000,  0.000), ( 0.000, -0.090), ( 0.000, -0.130), ( 0.000, -0.170),
    ( 0.045,  0.005), ( 0.045, -0.035), ( 0.050, -0.005), ( 0.045,  0.025),
    ( 0.085,  0.020), ( 0.085, -0.015), ( 0.090,  0.010), ( 0.085,  0.040),
];

/// Lay out a pose with its palm anchor (joint 9) at raw image position
/// `(anchor_x, anchor_y)`.  The anchor is clamped so every joint stays in
/// the normalized range.
pub fn pose_landmarks(pose: SyntheticPose, anchor_x: f32, anchor_y: f32) -> Vec<Landmark> {
    let offsets = match pose {
        SyntheticPose::OpenPalm => &OPEN_PALM,
        SyntheticPose::Fist     => &FIST,
        SyntheticPose::Pinch    => &PINCH,
        SyntheticPose::Relaxed  => &RELAXED,
    };
    let ax = anchor_x.clamp(0.25, 0.75);
    let ay = anchor_y.clamp(0.25, 0.75);
    offsets.iter().map(|&(dx, dy)| Landmark::new(ax + dx, ay + dy)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{HandFrame, PALM_ANCHOR};

    #[test]
    fn poses_stay_in_range_at_extremes() {
        for pose in [SyntheticPose::OpenPalm, SyntheticPose::Fist, SyntheticPose::Pinch, SyntheticPose::Relaxed] {
            for &(x, y) in &[(0.0, 0.0), (1.0, 1.0), (0.0, 1.0), (1.0, 0.0)] {
                let raw = pose_landmarks(pose, x, y);
                assert!(HandFrame::from_landmarks(&raw).is_ok(), "{:?} at ({}, {})", pose, x, y);
            }
        }
    }

    #[test]
    fn anchor_lands_on_palm_joint() {
        let raw = pose_landmarks(SyntheticPose::Fist, 0.4, 0.6);
        assert!((raw[PALM_ANCHOR].x - 0.4).abs() < 1e-6);
        assert!((raw[PALM_ANCHOR].y - 0.6).abs() < 1e-6);
    }
}
