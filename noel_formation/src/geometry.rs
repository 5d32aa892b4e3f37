//! Random point distributions for both formations.
//!
//! * **Assembled**: a cone (the tree) standing on the origin's vertical axis,
//!   centred vertically so `y ∈ [-height/2, height/2]`.
//! * **Scattered**: a ball (or box) around the origin.
//!
//! The weighting functions matter: `sqrt(u)` for the in-disk radius because
//! disk area grows with r², `cbrt(u)` for the ball radius because volume
//! grows with r³, and `acos(2v - 1)` for the polar angle so directions are
//! not bunched at the poles.

use std::f32::consts::TAU;

use glam::Vec3;
use rand::Rng;
use serde::{Deserialize, Serialize};

// ════════════════════════════════════════════════════════════════════════════
// TreeShape
// ════════════════════════════════════════════════════════════════════════════

/// The assembled silhouette: a linearly tapering cone.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeShape {
    pub height: f32,
    /// Radius at the base (`h = 0`); zero at the apex (`h = 1`).
    pub radius: f32,
}

impl Default for TreeShape {
    fn default() -> Self {
        TreeShape { height: 18.0, radius: 8.0 }
    }
}

impl TreeShape {
    /// Cone radius at normalized height `h ∈ [0, 1]`.
    pub fn radius_at(&self, h: f32) -> f32 {
        self.radius * (1.0 - h)
    }

    /// World `y` for normalized height `h`.
    pub fn y_at(&self, h: f32) -> f32 {
        h * self.height - self.height / 2.0
    }

    /// Inverse of [`TreeShape::y_at`].
    pub fn height_fraction(&self, y: f32) -> f32 {
        (y + self.height / 2.0) / self.height
    }

    pub fn apex(&self) -> Vec3 {
        Vec3::new(0.0, self.height / 2.0, 0.0)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Samplers
// ════════════════════════════════════════════════════════════════════════════

/// Uniform-by-volume point inside the cone.
pub fn sample_cone_volume<R: Rng + ?Sized>(rng: &mut R, tree: &TreeShape) -> Vec3 {
    let h: f32 = rng.random();
    let max_r = tree.radius_at(h);
    let r = max_r * rng.random::<f32>().sqrt();
    let theta = rng.random::<f32>() * TAU;
    Vec3::new(r * theta.cos(), tree.y_at(h), r * theta.sin())
}

/// Point near the cone's surface, as ornaments hang: the local radius is
/// scaled by `radius_modifier` and jittered by up to `±jitter`.
pub fn sample_cone_shell<R: Rng + ?Sized>(
    rng: &mut R,
    tree: &TreeShape,
    radius_modifier: f32,
    y_offset: f32,
    jitter: f32,
) -> Vec3 {
    let h: f32 = rng.random();
    let y = tree.y_at(h) + y_offset;
    let r = tree.radius_at(h) * radius_modifier + (rng.random::<f32>() * 2.0 - 1.0) * jitter;
    let theta = rng.random::<f32>() * TAU;
    Vec3::new(r * theta.cos(), y, r * theta.sin())
}

/// Uniform-by-volume point inside a ball of radius `bounds`.
pub fn sample_sphere_volume<R: Rng + ?Sized>(rng: &mut R, bounds: f32) -> Vec3 {
    let u: f32 = rng.random();
    let v: f32 = rng.random();
    let theta = TAU * u;
    let phi = (2.0 * v - 1.0).clamp(-1.0, 1.0).acos();
    let r = bounds * rng.random::<f32>().cbrt();
    Vec3::new(
        r * phi.sin() * theta.cos(),
        r * phi.sin() * theta.sin(),
        r * phi.cos(),
    )
}

/// Uniform point in an axis-aligned box.
pub fn sample_box<R: Rng + ?Sized>(rng: &mut R, half_extents: Vec3, center: Vec3) -> Vec3 {
    let mut axis = |h: f32| (rng.random::<f32>() * 2.0 - 1.0) * h;
    center + Vec3::new(axis(half_extents.x), axis(half_extents.y), axis(half_extents.z))
}

/// Deterministic spiral down the outside of the cone: `index` of `total`
/// items, `turns` full revolutions, `outset` beyond the surface.
pub fn cone_spiral(index: usize, total: usize, tree: &TreeShape, turns: f32, outset: f32) -> Vec3 {
    let h = if total == 0 { 0.0 } else { index as f32 / total as f32 };
    let theta = h * turns * TAU;
    let r = tree.radius_at(h) + outset;
    Vec3::new(r * theta.cos(), tree.y_at(h), r * theta.sin())
}

// ════════════════════════════════════════════════════════════════════════════
// Per-layer placement rules
// ════════════════════════════════════════════════════════════════════════════

/// Where a layer's instances sit in the assembled formation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "placement", rename_all = "snake_case")]
pub enum AssemblePlacement {
    /// Filling the cone's volume (foliage).
    Volume,
    /// Hanging on the cone's surface (ornaments).
    Shell { radius_modifier: f32, y_offset: f32, jitter: f32 },
    /// Evenly spaced along a spiral outside the surface (photo frames).
    Spiral { turns: f32, outset: f32 },
    /// A single point above the apex (the topper).
    Apex { lift: f32 },
}

/// Where a layer's instances sit in the scattered formation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum ScatterShape {
    Sphere { radius: f32 },
    Box { half_extents: [f32; 3], center: [f32; 3] },
    Point { at: [f32; 3] },
}

impl ScatterShape {
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec3 {
        match self {
            ScatterShape::Sphere { radius } => sample_sphere_volume(rng, *radius),
            ScatterShape::Box { half_extents, center } => {
                sample_box(rng, Vec3::from_array(*half_extents), Vec3::from_array(*center))
            }
            ScatterShape::Point { at } => Vec3::from_array(*at),
        }
    }
}

impl AssemblePlacement {
    /// Sample the assembled target for instance `index` of `total`.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        tree: &TreeShape,
        index: usize,
        total: usize,
    ) -> Vec3 {
        match self {
            AssemblePlacement::Volume => sample_cone_volume(rng, tree),
            AssemblePlacement::Shell { radius_modifier, y_offset, jitter } => {
                sample_cone_shell(rng, tree, *radius_modifier, *y_offset, *jitter)
            }
            AssemblePlacement::Spiral { turns, outset } => {
                cone_spiral(index, total, tree, *turns, *outset)
            }
            AssemblePlacement::Apex { lift } => tree.apex() + Vec3::Y * *lift,
        }
    }

    /// Whether targets depend on the instance count (and must be re-laid out
    /// when instances come and go).
    pub fn depends_on_count(&self) -> bool {
        matches!(self, AssemblePlacement::Spiral { .. })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
