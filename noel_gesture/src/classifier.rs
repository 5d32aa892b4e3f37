//! Per-frame gesture classification.
//!
//! Stateless and deterministic: the same 21 joints always yield the same
//! [`Gesture`].  Temporal smoothing is the debouncer's job.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::landmarks::{
    HandFrame, Landmark, FINGER_TIP_KNUCKLE, INDEX_TIP, PINKY_MCP, THUMB_TIP,
};

// ════════════════════════════════════════════════════════════════════════════
// Gesture
// ════════════════════════════════════════════════════════════════════════════

/// The four-word gesture vocabulary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Gesture {
    /// No hand, or a transitional pose.
    #[default]
    None,
    Fist,
    OpenPalm,
    Pinch,
}

impl Gesture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::None     => "none",
            Gesture::Fist     => "fist",
            Gesture::OpenPalm => "open-palm",
            Gesture::Pinch    => "pinch",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Thresholds
// ════════════════════════════════════════════════════════════════════════════

/// Geometric thresholds, all in normalized image units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureThresholds {
    /// Thumb tip to index tip distance below which the pose is a pinch.
    pub pinch_distance: f32,
    /// Thumb tip to pinky base distance above which the thumb is extended.
    pub thumb_extension: f32,
    /// Minimum extended digits (out of 5) for an open palm.
    pub open_palm_min_extended: u8,
    /// Maximum extended digits (out of 5) for a fist.
    pub fist_max_extended: u8,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        GestureThresholds {
            pinch_distance:         0.05,
            thumb_extension:        0.15,
            open_palm_min_extended: 4,
            fist_max_extended:      1,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// classify
// ════════════════════════════════════════════════════════════════════════════

/// Count extended digits: four fingers by tip-above-knuckle, the thumb by its
/// reach away from the pinky base (thumb flexion is mostly sideways).
pub fn extended_digits(frame: &HandFrame, th: &GestureThresholds) -> u8 {
    let mut count = FINGER_TIP_KNUCKLE
        .iter()
        .filter(|&&(tip, knuckle)| frame.joint(tip).is_above(frame.joint(knuckle)))
        .count() as u8;

    if frame.joint(THUMB_TIP).distance_2d(frame.joint(PINKY_MCP)) > th.thumb_extension {
        count += 1;
    }
    count
}

/// Classify one validated frame.  First match wins: pinch, open palm, fist.
pub fn classify(frame: &HandFrame, th: &GestureThresholds) -> Gesture {
    // Pinch first: a pinching hand otherwise reads as a partial fist.
    let pinch = frame.joint(THUMB_TIP).distance_2d(frame.joint(INDEX_TIP));
    if pinch < th.pinch_distance {
        return Gesture::Pinch;
    }

    let extended = extended_digits(frame, th);
    if extended >= th.open_palm_min_extended {
        Gesture::OpenPalm
    } else if extended <= th.fist_max_extended {
        Gesture::Fist
    } else {
        Gesture::None
    }
}

/// Classify a raw detector result.  No hand, too few joints, or out-of-range
/// coordinates all classify as [`Gesture::None`].
pub fn classify_landmarks(raw: Option<&[Landmark]>, th: &GestureThresholds) -> Gesture {
    let Some(raw) = raw else { return Gesture::None };
    match HandFrame::from_landmarks(raw) {
        Ok(frame) => classify(&frame, th),
        Err(e) => {
            trace!("malformed hand frame: {}", e);
            Gesture::None
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{JOINT_COUNT, THUMB_IP};
    use crate::pose::{pose_landmarks, SyntheticPose};

    fn th() -> GestureThresholds { GestureThresholds::default() }

    fn frame(pose: SyntheticPose) -> HandFrame {
        HandFrame::from_landmarks(&pose_landmarks(pose, 0.5, 0.5)).unwrap()
    }

    #[test]
    fn open_palm_pose() {
        let f = frame(SyntheticPose::OpenPalm);
        assert_eq!(extended_digits(&f, &th()), 5);
        assert_eq!(classify(&f, &th()), Gesture::OpenPalm);
    }

    #[test]
    fn fist_pose() {
        let f = frame(SyntheticPose::Fist);
        assert_eq!(extended_digits(&f, &th()), 0);
        assert_eq!(classify(&f, &th()), Gesture::Fist);
    }

    #[test]
    fn pinch_pose() {
        assert_eq!(classify(&frame(SyntheticPose::Pinch), &th()), Gesture::Pinch);
    }

    #[test]
    fn relaxed_pose_is_ambiguous() {
        let f = frame(SyntheticPose::Relaxed);
        assert_eq!(extended_digits(&f, &th()), 2);
        assert_eq!(classify(&f, &th()), Gesture::None);
    }

    #[test]
    fn pinch_wins_over_open_palm() {
        // Four fingers up, thumb far from the pinky base, yet thumb touching index.
        let mut raw = pose_landmarks(SyntheticPose::OpenPalm, 0.5, 0.5);
        raw[THUMB_TIP] = raw[INDEX_TIP];
        raw[THUMB_TIP].x += 0.01;
        let f = HandFrame::from_landmarks(&raw).unwrap();
        assert_eq!(classify(&f, &th()), Gesture::Pinch);
    }

    #[test]
    fn four_of_five_is_still_open_palm() {
        // Fold the thumb onto the pinky base; four fingers remain up.
        let mut raw = pose_landmarks(SyntheticPose::OpenPalm, 0.5, 0.5);
        raw[THUMB_TIP] = raw[PINKY_MCP];
        raw[THUMB_TIP].y += 0.02;
        raw[THUMB_IP] = raw[THUMB_TIP];
        let f = HandFrame::from_landmarks(&raw).unwrap();
        assert_eq!(extended_digits(&f, &th()), 4);
        assert_eq!(classify(&f, &th()), Gesture::OpenPalm);
    }

    #[test]
    fn no_hand_is_none() {
        assert_eq!(classify_landmarks(None, &th()), Gesture::None);
    }

    #[test]
    fn truncated_frames_are_none() {
        let full = pose_landmarks(SyntheticPose::Fist, 0.5, 0.5);
        for n in 0..JOINT_COUNT {
            assert_eq!(classify_landmarks(Some(&full[..n]), &th()), Gesture::None);
        }
        assert_eq!(classify_landmarks(Some(&full), &th()), Gesture::Fist);
    }

    #[test]
    fn out_of_range_frame_is_none() {
        let mut raw = pose_landmarks(SyntheticPose::Fist, 0.5, 0.5);
        raw[0].x = -0.3;
        assert_eq!(classify_landmarks(Some(&raw), &th()), Gesture::None);
    }

    #[test]
    fn tighter_pinch_threshold_rejects_pinch() {
        let mut strict = th();
        strict.pinch_distance = 0.001;
        assert_ne!(classify(&frame(SyntheticPose::Pinch), &strict), Gesture::Pinch);
    }
}
