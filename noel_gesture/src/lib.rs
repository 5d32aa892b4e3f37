//! # noel_gesture
//!
//! Turns one tracked hand (21 normalized landmarks per detector tick) into a
//! stable, debounced [`Gesture`] signal.
//!
//! ```text
//! landmarks ──▶ classify() ──▶ GestureDebouncer ──▶ stable Gesture edge
//!     │
//!     └──────▶ HandPosition (joint 9, mirrored)
//! ```
//!
//! ## Gesture vocabulary
//!
//! | Gesture | Pose |
//! |---|---|
//! | `Pinch` | thumb tip within 0.05 of index tip (checked first) |
//! | `OpenPalm` | at least 4 of 5 digits extended |
//! | `Fist` | at most 1 digit extended |
//! | `None` | anything in between, or no hand |
//!
//! ## Coordinate contract
//!
//! Landmarks arrive in image space with the origin at the top-left, so a
//! numerically *smaller* `y` is higher on screen.  Everything that relies on
//! that lives behind [`landmarks::Y_AXIS_POINTS_DOWN`].

pub mod landmarks;
pub mod classifier;
pub mod debounce;
pub mod tracker;
pub mod pose;

pub use landmarks::{FrameError, HandFrame, Landmark, JOINT_COUNT};
pub use classifier::{classify, classify_landmarks, Gesture, GestureThresholds};
pub use debounce::GestureDebouncer;
pub use tracker::{GestureTracker, HandPosition};
pub use pose::{pose_landmarks, SyntheticPose};
