//! Classifier + debouncer + hand position, as one per-tick pipeline stage.

use serde::{Deserialize, Serialize};

use crate::classifier::{classify, Gesture, GestureThresholds};
use crate::debounce::GestureDebouncer;
use crate::landmarks::{FrameError, HandFrame, Landmark};

/// Normalized screen position of the palm anchor, already mirrored.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HandPosition {
    pub x: f32,
    pub y: f32,
}

impl Default for HandPosition {
    fn default() -> Self {
        HandPosition { x: 0.5, y: 0.5 }
    }
}

impl HandPosition {
    /// Signed offset from the image centre, each axis in `-0.5..=0.5`.
    pub fn offset_from_center(&self) -> (f32, f32) {
        (self.x - 0.5, self.y - 0.5)
    }
}

/// Owns all gesture-side state for the single tracked hand.
///
/// Hand position is only written when a valid frame arrives; when tracking
/// drops out it keeps its last value so the camera does not snap back.
#[derive(Clone, Debug)]
pub struct GestureTracker {
    thresholds: GestureThresholds,
    debouncer:  GestureDebouncer,
    hand:       HandPosition,
    last_frame: Option<HandFrame>,
    last_raw:   Gesture,
    /// Why the most recent frame was rejected, if it was.
    last_error: Option<FrameError>,
}

impl GestureTracker {
    pub fn new(thresholds: GestureThresholds, confidence_frames: u32) -> Self {
        GestureTracker {
            thresholds,
            debouncer:  GestureDebouncer::new(confidence_frames),
            hand:       HandPosition::default(),
            last_frame: None,
            last_raw:   Gesture::None,
            last_error: None,
        }
    }

    /// Process one detector tick.  `None` means no hand was visible.
    ///
    /// Returns the new stable gesture when it changed on this tick.
    pub fn observe(&mut self, landmarks: Option<&[Landmark]>) -> Option<Gesture> {
        self.last_error = None;
        let Some(raw) = landmarks else {
            // Losing the hand clears the stable gesture at once; the
            // debounce run is left alone.
            self.last_frame = None;
            self.last_raw = Gesture::None;
            return self.debouncer.force_stable(Gesture::None).then_some(Gesture::None);
        };

        let gesture = match HandFrame::from_landmarks(raw) {
            Ok(frame) => {
                let (x, y) = frame.palm_anchor();
                self.hand = HandPosition { x, y };
                let g = classify(&frame, &self.thresholds);
                self.last_frame = Some(frame);
                g
            }
            Err(e) => {
                tracing::trace!("ignoring malformed hand frame: {}", e);
                self.last_frame = None;
                self.last_error = Some(e);
                Gesture::None
            }
        };
        self.last_raw = gesture;
        self.debouncer.push(gesture)
    }

    /// The detector went away for good: freeze input at `None`.
    pub fn detector_lost(&mut self) -> Option<Gesture> {
        self.last_error = None;
        self.last_frame = None;
        self.last_raw = Gesture::None;
        self.debouncer.force_stable(Gesture::None).then_some(Gesture::None)
    }

    pub fn stable(&self) -> Gesture { self.debouncer.stable() }
    pub fn raw(&self) -> Gesture { self.last_raw }
    pub fn hand(&self) -> HandPosition { self.hand }
    pub fn last_frame(&self) -> Option<&HandFrame> { self.last_frame.as_ref() }
    pub fn thresholds(&self) -> &GestureThresholds { &self.thresholds }
    pub fn last_error(&self) -> Option<&FrameError> { self.last_error.as_ref() }
}

impl Default for GestureTracker {
    fn default() -> Self {
        GestureTracker::new(GestureThresholds::default(), crate::debounce::DEFAULT_CONFIDENCE_FRAMES)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pose::{pose_landmarks, SyntheticPose};

    fn hold(t: &mut GestureTracker, pose: SyntheticPose, x: f32, y: f32, n: usize) -> Vec<Gesture> {
        let raw = pose_landmarks(pose, x, y);
        (0..n).filter_map(|_| t.observe(Some(&raw))).collect()
    }

    #[test]
    fn held_fist_becomes_stable() {
        let mut t = GestureTracker::default();
        assert_eq!(hold(&mut t, SyntheticPose::Fist, 0.5, 0.5, 30), vec![Gesture::Fist]);
        assert_eq!(t.stable(), Gesture::Fist);
        assert_eq!(t.raw(), Gesture::Fist);
    }

    #[test]
    fn hand_position_tracks_mirrored_anchor() {
        let mut t = GestureTracker::default();
        hold(&mut t, SyntheticPose::OpenPalm, 0.3, 0.6, 1);
        assert!((t.hand().x - 0.7).abs() < 1e-5);
        assert!((t.hand().y - 0.6).abs() < 1e-5);
    }

    #[test]
    fn hand_position_survives_tracking_loss() {
        let mut t = GestureTracker::default();
        hold(&mut t, SyntheticPose::OpenPalm, 0.3, 0.6, 10);
        let before = t.hand();
        t.observe(None);
        t.observe(None);
        assert_eq!(t.hand(), before);
        assert!(t.last_frame().is_none());
    }

    #[test]
    fn losing_hand_clears_stable_gesture_immediately() {
        let mut t = GestureTracker::default();
        hold(&mut t, SyntheticPose::OpenPalm, 0.5, 0.5, 10);
        assert_eq!(t.observe(None), Some(Gesture::None));
        assert_eq!(t.stable(), Gesture::None);
        // already none: no second edge
        assert_eq!(t.observe(None), None);
    }

    #[test]
    fn malformed_frame_does_not_move_hand() {
        let mut t = GestureTracker::default();
        hold(&mut t, SyntheticPose::Fist, 0.5, 0.5, 1);
        let before = t.hand();
        let short = pose_landmarks(SyntheticPose::Fist, 0.3, 0.3);
        t.observe(Some(&short[..10]));
        assert_eq!(t.hand(), before);
        assert_eq!(t.raw(), Gesture::None);
        assert_eq!(t.last_error(), Some(&FrameError::TooFewJoints { found: 10 }));
        hold(&mut t, SyntheticPose::Fist, 0.5, 0.5, 1);
        assert!(t.last_error().is_none());
    }

    #[test]
    fn detector_lost_freezes_none() {
        let mut t = GestureTracker::default();
        hold(&mut t, SyntheticPose::Fist, 0.5, 0.5, 10);
        assert_eq!(t.detector_lost(), Some(Gesture::None));
        assert_eq!(t.stable(), Gesture::None);
    }
}
