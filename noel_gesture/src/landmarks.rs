//! Hand landmark layout and the validated [`HandFrame`].
//!
//! The detector reports 21 joints per hand in a fixed order (wrist, then
//! four joints per digit from base to tip).  Coordinates are normalized to
//! `0.0..=1.0` per axis; `z` is carried but never read.

use std::fmt;

use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════
// Joint indices
// ════════════════════════════════════════════════════════════════════════════

pub const JOINT_COUNT: usize = 21;

pub const WRIST:      usize = 0;
pub const THUMB_CMC:  usize = 1;
pub const THUMB_MCP:  usize = 2;
pub const THUMB_IP:   usize = 3;
pub const THUMB_TIP:  usize = 4;
pub const INDEX_MCP:  usize = 5;
pub const INDEX_PIP:  usize = 6;
pub const INDEX_DIP:  usize = 7;
pub const INDEX_TIP:  usize = 8;
pub const MIDDLE_MCP: usize = 9;
pub const MIDDLE_PIP: usize = 10;
pub const MIDDLE_DIP: usize = 11;
pub const MIDDLE_TIP: usize = 12;
pub const RING_MCP:   usize = 13;
pub const RING_PIP:   usize = 14;
pub const RING_DIP:   usize = 15;
pub const RING_TIP:   usize = 16;
pub const PINKY_MCP:  usize = 17;
pub const PINKY_PIP:  usize = 18;
pub const PINKY_DIP:  usize = 19;
pub const PINKY_TIP:  usize = 20;

/// (tip, mid-knuckle) pairs for the four non-thumb fingers.
pub const FINGER_TIP_KNUCKLE: [(usize, usize); 4] = [
    (INDEX_TIP,  INDEX_PIP),
    (MIDDLE_TIP, MIDDLE_PIP),
    (RING_TIP,   RING_PIP),
    (PINKY_TIP,  PINKY_PIP),
];

/// Bone connections, used by the debug overlay.
pub const HAND_SKELETON: [(usize, usize); 21] = [
    (WRIST, THUMB_CMC), (THUMB_CMC, THUMB_MCP), (THUMB_MCP, THUMB_IP), (THUMB_IP, THUMB_TIP),
    (WRIST, INDEX_MCP), (INDEX_MCP, INDEX_PIP), (INDEX_PIP, INDEX_DIP), (INDEX_DIP, INDEX_TIP),
    (WRIST, MIDDLE_MCP), (MIDDLE_MCP, MIDDLE_PIP), (MIDDLE_PIP, MIDDLE_DIP), (MIDDLE_DIP, MIDDLE_TIP),
    (WRIST, RING_MCP), (RING_MCP, RING_PIP), (RING_PIP, RING_DIP), (RING_DIP, RING_TIP),
    (WRIST, PINKY_MCP), (PINKY_MCP, PINKY_PIP), (PINKY_PIP, PINKY_DIP), (PINKY_DIP, PINKY_TIP),
    (INDEX_MCP, MIDDLE_MCP),
];

/// Joint whose position drives camera parallax (base of the middle finger,
/// roughly the palm centre).
pub const PALM_ANCHOR: usize = MIDDLE_MCP;

/// Image-space convention of the detector: `y` grows downward, so "higher on
/// screen" means a numerically smaller `y`.
pub const Y_AXIS_POINTS_DOWN: bool = true;

// ════════════════════════════════════════════════════════════════════════════
// Landmark
// ════════════════════════════════════════════════════════════════════════════

/// One tracked joint in normalized image coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    /// Relative depth reported by the detector; unused by classification.
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub const fn new(x: f32, y: f32) -> Self {
        Landmark { x, y, z: 0.0 }
    }

    /// Planar (x, y) distance; depth is ignored.
    pub fn distance_2d(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// True when `self` sits higher on screen than `other`.
    pub fn is_above(&self, other: &Landmark) -> bool {
        if Y_AXIS_POINTS_DOWN {
            self.y < other.y
        } else {
            self.y > other.y
        }
    }

    fn in_unit_range(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// FrameError
// ════════════════════════════════════════════════════════════════════════════

/// Why a raw landmark list was rejected.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameError {
    /// Fewer than [`JOINT_COUNT`] joints were supplied.
    TooFewJoints { found: usize },
    /// A joint's x or y lies outside `0.0..=1.0` (NaN included).
    OutOfRange { joint: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::TooFewJoints { found } => {
                write!(f, "hand frame has {} joints, expected {}", found, JOINT_COUNT)
            }
            FrameError::OutOfRange { joint } => {
                write!(f, "joint {} lies outside the normalized 0..1 range", joint)
            }
        }
    }
}

impl std::error::Error for FrameError {}

// ════════════════════════════════════════════════════════════════════════════
// HandFrame
// ════════════════════════════════════════════════════════════════════════════

/// A complete, range-checked set of 21 joints for one hand on one tick.
#[derive(Clone, Debug, PartialEq)]
pub struct HandFrame {
    joints: [Landmark; JOINT_COUNT],
}

impl HandFrame {
    /// Validate a raw landmark list.  Extra joints beyond the 21st are ignored.
    pub fn from_landmarks(raw: &[Landmark]) -> Result<Self, FrameError> {
        if raw.len() < JOINT_COUNT {
            return Err(FrameError::TooFewJoints { found: raw.len() });
        }
        let mut joints = [Landmark::default(); JOINT_COUNT];
        for (i, lm) in raw.iter().take(JOINT_COUNT).enumerate() {
            if !lm.in_unit_range() {
                return Err(FrameError::OutOfRange { joint: i });
            }
            joints[i] = *lm;
        }
        Ok(HandFrame { joints })
    }

    pub fn joint(&self, index: usize) -> &Landmark {
        &self.joints[index]
    }

    pub fn joints(&self) -> &[Landmark; JOINT_COUNT] {
        &self.joints
    }

    /// Palm anchor mirrored horizontally: the camera feed is a selfie view,
    /// so moving the hand to the user's right lowers the raw `x`.
    pub fn palm_anchor(&self) -> (f32, f32) {
        let a = &self.joints[PALM_ANCHOR];
        (1.0 - a.x, a.y)
    }
}

impl TryFrom<&[Landmark]> for HandFrame {
    type Error = FrameError;

    fn try_from(raw: &[Landmark]) -> Result<Self, Self::Error> {
        HandFrame::from_landmarks(raw)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
