//! Camera parallax controller and the projection the visualizer uses.
//!
//! The camera always looks at the origin.  Its distance eases toward a
//! per-mode value; its x/y offset follows the hand only while the cloud is
//! scattered and the palm is held open, and otherwise eases back to zero.

use glam::{Mat4, Vec3};

use noel_formation::Easing;
use noel_gesture::{Gesture, HandPosition};

use crate::config::CameraConfig;
use crate::mode::DisplayMode;

// ════════════════════════════════════════════════════════════════════════════
// CameraRig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug)]
pub struct CameraRig {
    cfg:      CameraConfig,
    easing:   Easing,
    position: Vec3,
}

impl CameraRig {
    pub fn new(cfg: CameraConfig, easing: Easing) -> Self {
        let position = Vec3::new(0.0, 0.0, cfg.assembled_distance);
        CameraRig { cfg, easing, position }
    }

    /// Where the camera is heading this frame.
    pub fn target(&self, mode: DisplayMode, gesture: Gesture, hand: HandPosition) -> Vec3 {
        let z = match mode {
            DisplayMode::Assembled  => self.cfg.assembled_distance,
            DisplayMode::Scattered  => self.cfg.scattered_distance,
            DisplayMode::Focused(_) => self.cfg.focused_distance,
        };
        if mode == DisplayMode::Scattered && gesture == Gesture::OpenPalm {
            let (dx, dy) = hand.offset_from_center();
            Vec3::new(dx * self.cfg.horizontal_gain, dy * self.cfg.vertical_gain, z)
        } else {
            Vec3::new(0.0, 0.0, z)
        }
    }

    pub fn update(&mut self, mode: DisplayMode, gesture: Gesture, hand: HandPosition, dt: f32) {
        let target = self.target(mode, gesture, hand);
        let k = self.easing.factor(self.cfg.rate, dt);
        self.position += (target - self.position) * k;
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn projector(&self, width: usize, height: usize) -> Projector {
        Projector::new(self.position, self.cfg.fov_degrees, width, height)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Projector
// ════════════════════════════════════════════════════════════════════════════

const NEAR: f32 = 0.1;
const FAR:  f32 = 200.0;

/// World → pixel mapping for one frame.
#[derive(Clone, Debug)]
pub struct Projector {
    view_proj: Mat4,
    width:     f32,
    height:    f32,
    /// `height / (2 · tan(fov / 2))`: pixels per world unit at depth 1.
    focal_px:  f32,
}

/// A projected point: pixel coordinates plus view-space depth.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPoint {
    pub x:     f32,
    pub y:     f32,
    pub depth: f32,
}

impl Projector {
    pub fn new(eye: Vec3, fov_degrees: f32, width: usize, height: usize) -> Self {
        let (w, h) = (width.max(1) as f32, height.max(1) as f32);
        let fov = fov_degrees.to_radians();
        let view = Mat4::look_at_rh(eye, Vec3::ZERO, Vec3::Y);
        let proj = Mat4::perspective_rh(fov, w / h, NEAR, FAR);
        Projector {
            view_proj: proj * view,
            width:     w,
            height:    h,
            focal_px:  h / (2.0 * (fov / 2.0).tan()),
        }
    }

    /// `None` when the point is behind the camera or outside the depth range.
    pub fn project(&self, p: Vec3) -> Option<ScreenPoint> {
        let clip = self.view_proj * p.extend(1.0);
        if clip.w <= NEAR || clip.w >= FAR {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(ScreenPoint {
            x:     (ndc.x + 1.0) * 0.5 * self.width,
            y:     (1.0 - ndc.y) * 0.5 * self.height,
            depth: clip.w,
        })
    }

    /// On-screen size in pixels of a world length at `depth`.
    pub fn pixels(&self, world: f32, depth: f32) -> f32 {
        world * self.focal_px / depth.max(NEAR)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
