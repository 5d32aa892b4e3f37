//! Formation morph engine.
//!
//! Every frame each instance's `current` position takes one exponential
//! step toward the target of the active formation:
//!
//! ```text
//! current ← current + (target − current) · k
//! ```
//!
//! where `k` is the layer's rate (optionally rescaled for the frame's `dt`).
//! The step always starts from `current`, so a formation switch half-way
//! through a morph just bends the path; nothing snaps.
//!
//! Secondary motion (bobbing, tumbling, outward orientation, the topper's
//! wobble) is written to the rendered transform only and never feeds back
//! into `current`.

use glam::{Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::TreeShape;
use crate::layer::{InstanceId, Layer, LayerKind, LayerSpec, Transform};

// ════════════════════════════════════════════════════════════════════════════
// Formation / Easing
// ════════════════════════════════════════════════════════════════════════════

/// The target arrangement the engine is easing toward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Formation {
    Assembled,
    Scattered,
    /// Scattered, with one focusable instance pulled in front of the camera.
    Focused(InstanceId),
}

impl Formation {
    pub fn is_assembled(&self) -> bool {
        matches!(self, Formation::Assembled)
    }

    pub fn focused(&self) -> Option<InstanceId> {
        match self {
            Formation::Focused(id) => Some(*id),
            _ => None,
        }
    }
}

/// How a per-frame rate is turned into a step fraction.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Easing {
    /// `rate` every call, whatever the frame time.
    PerFrame,
    /// `1 − (1 − rate)^(dt · reference_hz)`; equal to `PerFrame` when
    /// `dt = 1 / reference_hz`.
    TimeScaled { reference_hz: f32 },
}

impl Default for Easing {
    fn default() -> Self {
        Easing::TimeScaled { reference_hz: 60.0 }
    }
}

impl Easing {
    /// Reference frames elapsed in `dt` seconds.
    pub fn frames(&self, dt: f32) -> f32 {
        match self {
            Easing::PerFrame => 1.0,
            Easing::TimeScaled { reference_hz } => (dt * reference_hz).max(0.0),
        }
    }

    /// Step fraction for a layer rate over `dt` seconds, in `[0, 1]`.
    pub fn factor(&self, rate: f32, dt: f32) -> f32 {
        let rate = rate.clamp(0.0, 1.0);
        match self {
            Easing::PerFrame => rate,
            Easing::TimeScaled { .. } => 1.0 - (1.0 - rate).powf(self.frames(dt)),
        }
    }
}

/// One exponential step from `current` toward `target`.
#[inline]
pub fn ease_toward(current: Vec3, target: Vec3, k: f32) -> Vec3 {
    current + (target - current) * k
}

// ════════════════════════════════════════════════════════════════════════════
// Focus / photo-frame poses
// ════════════════════════════════════════════════════════════════════════════

/// Where and how large the focused instance is shown, plus the photo-frame
/// scale in the other two formations.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FocusPose {
    pub position:        [f32; 3],
    pub focused_scale:   f32,
    pub assembled_scale: f32,
    pub scattered_scale: f32,
}

impl Default for FocusPose {
    fn default() -> Self {
        FocusPose {
            position:        [0.0, 0.0, 12.0],
            focused_scale:   4.0,
            assembled_scale: 1.2,
            scattered_scale: 1.5,
        }
    }
}

/// Radians per reference frame.
const STAR_YAW: f32 = 0.01;
const TOPPER_YAW: f32 = 0.01;
const TOPPER_ROLL: f32 = 0.1;
/// Topper scale swings `1 ± TOPPER_PULSE` at `TOPPER_PULSE_RATE` rad/s.
const TOPPER_PULSE: f32 = 0.05;
const TOPPER_PULSE_RATE: f32 = 3.0;

/// Camera eye assumed until the first `set_viewer`.
pub const DEFAULT_VIEWER: Vec3 = Vec3::new(0.0, 0.0, 26.0);

// ════════════════════════════════════════════════════════════════════════════
// MorphEngine
// ════════════════════════════════════════════════════════════════════════════

pub struct MorphEngine {
    tree:    TreeShape,
    layers:  Vec<Layer>,
    easing:  Easing,
    focus:   FocusPose,
    elapsed: f32,
    /// Accumulated topper yaw.
    yaw:     f32,
    /// Camera eye that loose photo frames turn toward.
    viewer:  Vec3,
}

impl MorphEngine {
    pub fn new(tree: TreeShape, layers: Vec<Layer>, easing: Easing) -> Self {
        MorphEngine {
            tree,
            layers,
            easing,
            focus: FocusPose::default(),
            elapsed: 0.0,
            yaw: 0.0,
            viewer: DEFAULT_VIEWER,
        }
    }

    /// Sample every layer once; targets are fixed from here on.
    pub fn from_specs<R: Rng + ?Sized>(
        tree: TreeShape,
        specs: Vec<LayerSpec>,
        easing: Easing,
        rng: &mut R,
    ) -> Self {
        let layers: Vec<Layer> = specs.into_iter().map(|s| Layer::generate(s, &tree, rng)).collect();
        tracing::debug!(
            "generated {} layers, {} instances",
            layers.len(),
            layers.iter().map(Layer::len).sum::<usize>()
        );
        MorphEngine::new(tree, layers, easing)
    }

    pub fn with_focus(mut self, focus: FocusPose) -> Self {
        self.focus = focus;
        self
    }

    /// Where the camera is this frame.
    pub fn set_viewer(&mut self, eye: Vec3) {
        self.viewer = eye;
    }

    /// Advance one rendered frame of `dt` seconds toward `formation`.
    pub fn step(&mut self, formation: &Formation, dt: f32) {
        self.elapsed += dt;
        let frames = self.easing.frames(dt);
        self.yaw += TOPPER_YAW * frames;

        let focused = formation.focused();
        for (li, layer) in self.layers.iter_mut().enumerate() {
            let k = self.easing.factor(layer.rate(), dt);
            let focused_slot = focused.filter(|id| id.layer == li).map(|id| id.slot);
            let ctx = StepContext {
                formation,
                focused_slot,
                k,
                frames,
                elapsed: self.elapsed,
                yaw: self.yaw,
                viewer: self.viewer,
                focus: &self.focus,
            };
            step_layer(layer, &ctx);
        }
    }

    // ── Instances ─────────────────────────────────────────────────────────

    pub fn contains(&self, id: InstanceId) -> bool {
        self.layers.get(id.layer).is_some_and(|l| l.index_of(id.slot).is_some())
    }

    pub fn is_focusable(&self, id: InstanceId) -> bool {
        self.layers.get(id.layer).is_some_and(|l| l.kind().focusable() && l.index_of(id.slot).is_some())
    }

    /// Every focusable instance with its rendered transform.
    pub fn focusable_instances(&self) -> Vec<(InstanceId, Transform)> {
        let mut out = Vec::new();
        for (li, layer) in self.layers.iter().enumerate() {
            if !layer.kind().focusable() {
                continue;
            }
            for (i, &slot) in layer.slots().iter().enumerate() {
                out.push((InstanceId { layer: li, slot }, layer.transforms()[i]));
            }
        }
        out
    }

    /// Index of the first layer of `kind`.
    pub fn find_layer(&self, kind: LayerKind) -> Option<usize> {
        self.layers.iter().position(|l| l.kind() == kind)
    }

    pub fn add_instance<R: Rng + ?Sized>(
        &mut self,
        layer: usize,
        aspect: f32,
        rng: &mut R,
    ) -> Option<InstanceId> {
        let l = self.layers.get_mut(layer)?;
        let slot = l.push_instance(rng, &self.tree, aspect);
        tracing::debug!("added instance {} to {}", slot, l.name());
        Some(InstanceId { layer, slot })
    }

    pub fn remove_instance<R: Rng + ?Sized>(&mut self, id: InstanceId, rng: &mut R) -> bool {
        match self.layers.get_mut(id.layer) {
            Some(l) => l.remove_instance(rng, &self.tree, id.slot),
            None => false,
        }
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn layers(&self) -> &[Layer] { &self.layers }
    pub fn layer(&self, i: usize) -> Option<&Layer> { self.layers.get(i) }
    pub fn layer_mut(&mut self, i: usize) -> Option<&mut Layer> { self.layers.get_mut(i) }
    pub fn tree(&self) -> &TreeShape { &self.tree }
    pub fn easing(&self) -> Easing { self.easing }
    pub fn focus(&self) -> &FocusPose { &self.focus }
    pub fn elapsed(&self) -> f32 { self.elapsed }
    pub fn viewer(&self) -> Vec3 { self.viewer }

    pub fn instance_count(&self) -> usize {
        self.layers.iter().map(Layer::len).sum()
    }

    pub fn transform(&self, id: InstanceId) -> Option<Transform> {
        let layer = self.layers.get(id.layer)?;
        layer.index_of(id.slot).map(|i| layer.transforms()[i])
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Per-layer step
// ════════════════════════════════════════════════════════════════════════════

struct StepContext<'a> {
    formation:    &'a Formation,
    focused_slot: Option<u32>,
    k:            f32,
    frames:       f32,
    elapsed:      f32,
    yaw:          f32,
    viewer:       Vec3,
    focus:        &'a FocusPose,
}

fn step_layer(layer: &mut Layer, ctx: &StepContext<'_>) {
    let kind = layer.kind();
    let bob = layer.spec().bob;
    let assembled = ctx.formation.is_assembled();
    let focus_at = Vec3::from_array(ctx.focus.position);
    let scale_base = layer.spec().scale_base;

    for i in 0..layer.len() {
        let is_focused = ctx.focused_slot == Some(layer.slots[i]);

        // Position
        let target = if is_focused {
            focus_at
        } else if assembled {
            layer.assembled[i]
        } else {
            layer.scattered[i]
        };
        let current = ease_toward(layer.current[i], target, ctx.k);
        layer.current[i] = current;

        // Spin
        if layer.spin_rate[i] != 0.0 {
            let d = Quat::from_axis_angle(layer.axis[i], layer.spin_rate[i] * ctx.frames);
            layer.spin[i] = (d * layer.spin[i]).normalize();
        }
        if kind == LayerKind::Star {
            layer.spin[i] = (Quat::from_rotation_y(STAR_YAW * ctx.frames) * layer.spin[i]).normalize();
        }

        // Scale
        let target_scale = match kind {
            LayerKind::PhotoFrame => {
                let s = if is_focused {
                    ctx.focus.focused_scale
                } else if assembled {
                    ctx.focus.assembled_scale
                } else {
                    ctx.focus.scattered_scale
                };
                Vec3::new(s * layer.aspect[i], s, 1.0)
            }
            LayerKind::Topper => {
                Vec3::splat(scale_base * (1.0 + (ctx.elapsed * TOPPER_PULSE_RATE).sin() * TOPPER_PULSE))
            }
            _ => Vec3::splat(layer.scale[i]),
        };
        layer.current_scale[i] = match kind {
            LayerKind::Topper => target_scale,
            _ => ease_toward(layer.current_scale[i], target_scale, ctx.k),
        };

        // Rotation
        let rotation = match kind {
            LayerKind::Foliage | LayerKind::Light => Quat::IDENTITY,
            LayerKind::Bauble => layer.spin[i],
            LayerKind::GiftBox | LayerKind::Star => {
                if assembled {
                    outward(current) * layer.spin[i]
                } else {
                    layer.spin[i]
                }
            }
            LayerKind::PhotoFrame => {
                if assembled && !is_focused {
                    outward(current)
                } else {
                    toward(current, ctx.viewer)
                }
            }
            LayerKind::Topper => {
                Quat::from_rotation_y(ctx.yaw) * Quat::from_rotation_z(ctx.elapsed.sin() * TOPPER_ROLL)
            }
        };

        // Idle float only while loose, and never on the focused instance.
        let position = if assembled || is_focused {
            current
        } else {
            current + bob.offset(ctx.elapsed, layer.freq[i], layer.phase[i])
        };

        layer.rendered[i] = Transform { position, rotation, scale: layer.current_scale[i] };
    }
}

/// Rotation taking +Z to the horizontal direction away from the trunk.
fn outward(p: Vec3) -> Quat {
    let dir = Vec3::new(p.x, 0.0, p.z).normalize_or_zero();
    if dir == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_arc(Vec3::Z, dir)
}

/// Rotation taking +Z from `p` to the camera eye.
fn toward(p: Vec3, eye: Vec3) -> Quat {
    let dir = (eye - p).normalize_or_zero();
    if dir == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_arc(Vec3::Z, dir)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::LayerSpec;
    use rand::{rngs::StdRng, SeedableRng};

    fn rng() -> StdRng { StdRng::seed_from_u64(99) }

    fn engine_with(spec: LayerSpec) -> MorphEngine {
        MorphEngine::from_specs(TreeShape::default(), vec![spec], Easing::PerFrame, &mut rng())
    }

    fn baubles(rate: f32) -> LayerSpec {
        LayerSpec::ornament(LayerKind::Bauble, 64, rate, 1.0, 0.4, 40.0)
    }

    fn photo_engine() -> MorphEngine {
        engine_with(LayerSpec::photo_frames(4, 0.05, 40.0))
    }

    #[test]
    fn one_step_is_one_lerp() {
        let mut e = engine_with(baubles(0.25));
        let a = Vec3::new(1.0, 2.0, 3.0);
        e.layer_mut(0).unwrap().place(0, a);
        e.step(&Formation::Assembled, 1.0 / 60.0);
        let l = e.layer(0).unwrap();
        let b = l.assembled_target(0);
        let expected = a + (b - a) * 0.25;
        assert!((l.current_position(0) - expected).length() < 1e-5);
    }

    #[test]
    fn converges_monotonically_without_overshoot() {
        let mut e = engine_with(baubles(0.1));
        let l = e.layer(0).unwrap();
        let n = l.len();
        let mut prev: Vec<f32> =
            (0..n).map(|i| (l.current_position(i) - l.assembled_target(i)).length()).collect();
        for _ in 0..120 {
            e.step(&Formation::Assembled, 1.0 / 60.0);
            let l = e.layer(0).unwrap();
            for i in 0..n {
                let start = l.scattered_target(i);
                let target = l.assembled_target(i);
                let cur = l.current_position(i);
                let d = (cur - target).length();
                assert!(d <= prev[i] + 1e-5);
                // stays on the segment: never past the target
                let along = (cur - start).dot(target - start);
                assert!(along <= (target - start).length_squared() + 1e-3);
                prev[i] = d;
            }
        }
    }

    #[test]
    fn flip_mid_morph_steps_from_current() {
        let mut e = engine_with(baubles(0.05));
        for _ in 0..10 {
            e.step(&Formation::Assembled, 1.0 / 60.0);
        }
        let before: Vec<Vec3> = {
            let l = e.layer(0).unwrap();
            (0..l.len()).map(|i| l.current_position(i)).collect()
        };
        e.step(&Formation::Scattered, 1.0 / 60.0);
        let l = e.layer(0).unwrap();
        for (i, p) in before.iter().enumerate() {
            let expected = *p + (l.scattered_target(i) - *p) * 0.05;
            assert!((l.current_position(i) - expected).length() < 1e-4);
        }
    }

    #[test]
    fn two_hundred_frames_at_003_within_one_percent() {
        let mut e = engine_with(baubles(0.03));
        {
            let l = e.layer_mut(0).unwrap();
            for i in 0..l.len() {
                let a = l.assembled_target(i);
                l.place(i, a);
            }
        }
        let start: Vec<f32> = {
            let l = e.layer(0).unwrap();
            (0..l.len()).map(|i| (l.assembled_target(i) - l.scattered_target(i)).length()).collect()
        };
        for _ in 0..200 {
            e.step(&Formation::Scattered, 1.0 / 60.0);
        }
        let l = e.layer(0).unwrap();
        for i in 0..l.len() {
            let d = (l.current_position(i) - l.scattered_target(i)).length();
            assert!(d <= start[i] * 0.01 + 1e-4, "instance {} still {} away", i, d);
        }
    }

    #[test]
    fn time_scaled_matches_per_frame_at_reference_rate() {
        let e = Easing::TimeScaled { reference_hz: 60.0 };
        assert!((e.factor(0.03, 1.0 / 60.0) - 0.03).abs() < 1e-5);
        // two reference frames in one call compound
        let two = e.factor(0.03, 2.0 / 60.0);
        assert!((two - (1.0 - 0.97f32 * 0.97)).abs() < 1e-5);
        assert_eq!(e.factor(0.5, 0.0), 0.0);
        assert_eq!(Easing::PerFrame.factor(0.03, 1.0), 0.03);
    }

    #[test]
    fn bob_only_when_loose() {
        let mut e = engine_with(LayerSpec::foliage(200, 0.5, 40.0));
        for _ in 0..5 {
            e.step(&Formation::Assembled, 0.1);
        }
        let l = e.layer(0).unwrap();
        for i in 0..l.len() {
            assert_eq!(l.transforms()[i].position, l.current_position(i));
        }
        e.step(&Formation::Scattered, 0.1);
        let l = e.layer(0).unwrap();
        let floating = (0..l.len())
            .filter(|&i| (l.transforms()[i].position - l.current_position(i)).length() > 1e-4)
            .count();
        assert!(floating > l.len() / 2);
    }

    #[test]
    fn focused_frame_goes_to_camera() {
        let mut e = photo_engine();
        let id = InstanceId { layer: 0, slot: 2 };
        assert!(e.is_focusable(id));
        for _ in 0..400 {
            e.step(&Formation::Focused(id), 1.0 / 60.0);
        }
        let t = e.transform(id).unwrap();
        assert!((t.position - Vec3::new(0.0, 0.0, 12.0)).length() < 1e-2);
        assert!((t.scale.y - 4.0).abs() < 1e-2);
        // straight down the default camera axis
        assert!((t.rotation * Vec3::Z - Vec3::Z).length() < 2e-3);

        // the others hold their scattered spots at scattered scale
        let l = e.layer(0).unwrap();
        let i = l.index_of(0).unwrap();
        assert!((l.current_position(i) - l.scattered_target(i)).length() < 1e-2);
        assert!((l.transforms()[i].scale.y - 1.5).abs() < 1e-2);
    }

    #[test]
    fn loose_frames_face_the_camera() {
        let mut e = photo_engine();
        let eye = Vec3::new(6.0, -3.0, 18.0);
        e.set_viewer(eye);
        e.step(&Formation::Scattered, 1.0 / 60.0);
        let l = e.layer(0).unwrap();
        for i in 0..l.len() {
            let want = (eye - l.current_position(i)).normalize();
            let facing = l.transforms()[i].rotation * Vec3::Z;
            assert!((facing - want).length() < 1e-3, "frame {} faces {:?}", i, facing);
        }
    }

    #[test]
    fn topper_pulses_gently() {
        let tree = TreeShape::default();
        let mut e = engine_with(LayerSpec::topper(&tree, 1.0));
        let base = e.layer(0).unwrap().spec().scale_base;
        for _ in 0..120 {
            e.step(&Formation::Assembled, 1.0 / 60.0);
            let s = e.layer(0).unwrap().transforms()[0].scale.x;
            assert!(s >= base * (1.0 - TOPPER_PULSE) - 1e-5);
            assert!(s <= base * (1.0 + TOPPER_PULSE) + 1e-5);
        }
    }

    #[test]
    fn oriented_layers_face_outward_when_assembled() {
        let mut spec = LayerSpec::ornament(LayerKind::GiftBox, 30, 1.0, 0.9, 0.6, 40.0);
        spec.max_spin = 0.0;
        let mut e = engine_with(spec);
        e.step(&Formation::Assembled, 1.0 / 60.0);
        let l = e.layer(0).unwrap();
        for i in 0..l.len() {
            let p = l.current_position(i);
            let want = Vec3::new(p.x, 0.0, p.z).normalize_or_zero();
            if want == Vec3::ZERO {
                continue;
            }
            let facing = l.transforms()[i].rotation * Vec3::Z;
            assert!((facing - want).length() < 1e-3);
        }
    }

    #[test]
    fn unknown_focus_id_leaves_everything_scattered() {
        let mut e = photo_engine();
        let ghost = InstanceId { layer: 0, slot: 77 };
        assert!(!e.contains(ghost));
        e.step(&Formation::Focused(ghost), 1.0 / 60.0);
        let l = e.layer(0).unwrap();
        for i in 0..l.len() {
            assert!((l.transforms()[i].scale.y - 1.5).abs() < 1e-4);
            assert!((l.current_position(i) - l.scattered_target(i)).length() < 1e-4);
        }
    }

    #[test]
    fn add_and_remove_through_engine() {
        let mut e = photo_engine();
        let mut r = rng();
        let id = e.add_instance(0, 1.0, &mut r).unwrap();
        assert_eq!(id.slot, 4);
        assert_eq!(e.focusable_instances().len(), 5);
        assert!(e.remove_instance(id, &mut r));
        assert!(!e.contains(id));
        assert!(e.add_instance(9, 1.0, &mut r).is_none());
    }

    #[test]
    fn topper_floats_above_when_scattered() {
        let tree = TreeShape::default();
        let mut e = engine_with(LayerSpec::topper(&tree, 1.0));
        e.step(&Formation::Scattered, 1.0 / 60.0);
        let t = e.layer(0).unwrap().transforms()[0];
        assert!((t.position.y - 19.5).abs() < 1e-4);
        e.step(&Formation::Assembled, 1.0 / 60.0);
        let t = e.layer(0).unwrap().transforms()[0];
        assert!((t.position.y - 9.5).abs() < 1e-4);
    }
}
