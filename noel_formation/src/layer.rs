//! Particle layers.
//!
//! A layer is a group of instances sharing geometry kind, palette and morph
//! rate.  Per-instance data is stored struct-of-arrays so the per-frame
//! update walks contiguous `Vec`s.
//!
//! Layers never reference each other: a heavy gift box and a string light
//! ease toward the same formation at their own rates.

use glam::{Quat, Vec3};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::geometry::{AssemblePlacement, ScatterShape, TreeShape};
use crate::palette::{self, BURGUNDY, EMERALD, FOREST, GOLD, METALLIC_GOLD, PURE_WHITE, WARM_WHITE};

// ════════════════════════════════════════════════════════════════════════════
// LayerKind
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Foliage,
    GiftBox,
    Bauble,
    Star,
    Light,
    Topper,
    PhotoFrame,
}

impl LayerKind {
    /// Turns to face away from the trunk while assembled.
    pub fn faces_outward(&self) -> bool {
        matches!(self, LayerKind::GiftBox | LayerKind::Star | LayerKind::PhotoFrame)
    }

    /// Tumbles around its own random axis.
    pub fn tumbles(&self) -> bool {
        matches!(self, LayerKind::GiftBox | LayerKind::Bauble | LayerKind::Star)
    }

    /// Can be selected and brought to the camera.
    pub fn focusable(&self) -> bool {
        matches!(self, LayerKind::PhotoFrame)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LayerSpec
// ════════════════════════════════════════════════════════════════════════════

/// Idle oscillation applied while not assembled:
/// `axis · amplitude · sin(t · f + phase)`, where each instance draws its own
/// `f` around `frequency`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bob {
    pub axis:      [f32; 3],
    pub amplitude: f32,
    pub frequency: f32,
}

impl Bob {
    pub const STILL: Bob = Bob { axis: [0.0, 1.0, 0.0], amplitude: 0.0, frequency: 0.0 };

    /// Spread of per-instance frequencies around `frequency`.
    pub const FREQUENCY_JITTER: f32 = 0.25;

    pub fn offset(&self, elapsed: f32, frequency: f32, phase: f32) -> Vec3 {
        Vec3::from_array(self.axis) * (self.amplitude * (elapsed * frequency + phase).sin())
    }

    /// Draw one instance's frequency.
    pub fn sample_frequency<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let j = Self::FREQUENCY_JITTER;
        self.frequency * rng.random_range(1.0 - j..=1.0 + j)
    }
}

/// Static description of one layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    pub name:       String,
    pub kind:       LayerKind,
    pub count:      usize,
    /// Per-frame approach fraction in `(0, 1]`.
    pub rate:       f32,
    pub scale_base: f32,
    pub placement:  AssemblePlacement,
    pub scatter:    ScatterShape,
    pub palette:    Vec<u32>,
    pub bob:        Bob,
    /// Upper bound of the per-instance tumble rate (radians per frame).
    pub max_spin:   f32,
}

impl LayerSpec {
    pub fn foliage(count: usize, rate: f32, scatter_bounds: f32) -> Self {
        LayerSpec {
            name:       "foliage".into(),
            kind:       LayerKind::Foliage,
            count,
            rate,
            scale_base: 1.0,
            placement:  AssemblePlacement::Volume,
            scatter:    ScatterShape::Sphere { radius: scatter_bounds },
            palette:    vec![EMERALD, FOREST],
            bob:        Bob { axis: [1.0, 0.0, 0.0], amplitude: 0.1, frequency: 0.5 },
            max_spin:   0.0,
        }
    }

    /// Ornament on the cone's surface, scattering through a cube of
    /// half-extent `0.75 · scatter_bounds`.
    pub fn ornament(
        kind: LayerKind,
        count: usize,
        rate: f32,
        radius_modifier: f32,
        scale_base: f32,
        scatter_bounds: f32,
    ) -> Self {
        let palette = match kind {
            LayerKind::GiftBox => vec![BURGUNDY, GOLD, EMERALD],
            LayerKind::Bauble  => vec![GOLD, METALLIC_GOLD, BURGUNDY, PURE_WHITE],
            LayerKind::Star    => vec![GOLD, PURE_WHITE],
            _                  => vec![GOLD],
        };
        let name = match kind {
            LayerKind::GiftBox => "gift boxes",
            LayerKind::Bauble  => "baubles",
            LayerKind::Star    => "stars",
            LayerKind::Light   => "lights",
            _                  => "ornaments",
        };
        let half = scatter_bounds * 0.75;
        LayerSpec {
            name: name.into(),
            kind,
            count,
            rate,
            scale_base,
            placement: AssemblePlacement::Shell { radius_modifier, y_offset: 0.0, jitter: 0.25 },
            scatter:   ScatterShape::Box { half_extents: [half; 3], center: [0.0; 3] },
            palette,
            bob:       Bob { axis: [0.0, 1.0, 0.0], amplitude: 0.05, frequency: 2.0 },
            max_spin:  if kind == LayerKind::Light { 0.0 } else { 0.02 },
        }
    }

    pub fn topper(tree: &TreeShape, rate: f32) -> Self {
        let lift = 0.5;
        let float = tree.apex() + Vec3::Y * (lift + 10.0);
        LayerSpec {
            name:       "topper".into(),
            kind:       LayerKind::Topper,
            count:      1,
            rate,
            scale_base: 1.5,
            placement:  AssemblePlacement::Apex { lift },
            scatter:    ScatterShape::Point { at: float.to_array() },
            palette:    vec![GOLD],
            bob:        Bob::STILL,
            max_spin:   0.0,
        }
    }

    /// Focusable frames spiralling four times around the outside of the cone.
    pub fn photo_frames(count: usize, rate: f32, scatter_bounds: f32) -> Self {
        LayerSpec {
            name:       "photo frames".into(),
            kind:       LayerKind::PhotoFrame,
            count,
            rate,
            scale_base: 1.5,
            placement:  AssemblePlacement::Spiral { turns: 4.0, outset: 0.5 },
            scatter:    ScatterShape::Box {
                half_extents: [scatter_bounds * 0.6, scatter_bounds * 0.4, scatter_bounds * 0.25],
                center:       [0.0, 0.0, 5.0],
            },
            palette:    vec![WARM_WHITE],
            bob:        Bob { axis: [0.0, 1.0, 0.0], amplitude: 0.5, frequency: 1.0 },
            max_spin:   0.0,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// InstanceId
// ════════════════════════════════════════════════════════════════════════════

/// Stable handle on one instance: the layer index plus a slot number that
/// is never reused within the layer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId {
    pub layer: usize,
    pub slot:  u32,
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.layer, self.slot)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Transform
// ════════════════════════════════════════════════════════════════════════════

/// What the renderer draws for one instance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale:    Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Transform { position: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Layer
// ════════════════════════════════════════════════════════════════════════════

/// All instances of one layer.
///
/// `assembled` / `scattered` are the immutable dual targets; `current` is
/// the eased position and is only ever moved toward a target, never set.
#[derive(Clone, Debug)]
pub struct Layer {
    spec: LayerSpec,

    /// Stable per-instance ids (survive removal of other instances).
    pub(crate) slots:     Vec<u32>,
    next_slot:            u32,

    pub(crate) assembled: Vec<Vec3>,
    pub(crate) scattered: Vec<Vec3>,
    pub(crate) current:   Vec<Vec3>,

    pub(crate) phase:     Vec<f32>,
    pub(crate) freq:      Vec<f32>,
    pub(crate) scale:     Vec<f32>,
    pub(crate) aspect:    Vec<f32>,
    pub(crate) axis:      Vec<Vec3>,
    pub(crate) spin_rate: Vec<f32>,
    pub(crate) spin:      Vec<Quat>,
    pub(crate) color:     Vec<u32>,

    pub(crate) current_scale: Vec<Vec3>,
    pub(crate) rendered:      Vec<Transform>,
}

impl Layer {
    /// Sample every instance's targets and attributes.  Instances start at
    /// their scattered target so the first assembly reads as the tree
    /// gathering itself out of the cloud.
    pub fn generate<R: Rng + ?Sized>(spec: LayerSpec, tree: &TreeShape, rng: &mut R) -> Self {
        let n = spec.count;
        let mut layer = Layer {
            spec,
            slots:         Vec::with_capacity(n),
            next_slot:     0,
            assembled:     Vec::with_capacity(n),
            scattered:     Vec::with_capacity(n),
            current:       Vec::with_capacity(n),
            phase:         Vec::with_capacity(n),
            freq:          Vec::with_capacity(n),
            scale:         Vec::with_capacity(n),
            aspect:        Vec::with_capacity(n),
            axis:          Vec::with_capacity(n),
            spin_rate:     Vec::with_capacity(n),
            spin:          Vec::with_capacity(n),
            color:         Vec::with_capacity(n),
            current_scale: Vec::with_capacity(n),
            rendered:      Vec::with_capacity(n),
        };
        for i in 0..n {
            let assembled = layer.spec.placement.sample(rng, tree, i, n);
            layer.push_sampled(rng, assembled, 1.0);
        }
        layer
    }

    fn push_sampled<R: Rng + ?Sized>(&mut self, rng: &mut R, assembled: Vec3, aspect: f32) -> u32 {
        let scattered = self.spec.scatter.sample(rng);
        let scale = match self.spec.kind {
            LayerKind::Topper | LayerKind::PhotoFrame => self.spec.scale_base,
            _ => (rng.random::<f32>() * 0.5 + 0.5) * self.spec.scale_base,
        };
        let axis = Vec3::new(rng.random(), rng.random(), rng.random()).normalize_or_zero();
        let axis = if axis == Vec3::ZERO { Vec3::Y } else { axis };
        let start_scale = if self.spec.kind == LayerKind::PhotoFrame {
            Vec3::new(scale * aspect, scale, 1.0)
        } else {
            Vec3::splat(scale)
        };

        let slot = self.next_slot;
        self.next_slot += 1;
        self.slots.push(slot);
        self.assembled.push(assembled);
        self.scattered.push(scattered);
        self.current.push(scattered);
        self.phase.push(rng.random::<f32>() * std::f32::consts::TAU);
        self.freq.push(self.spec.bob.sample_frequency(rng));
        self.scale.push(scale);
        self.aspect.push(aspect);
        self.axis.push(axis);
        self.spin_rate.push(rng.random::<f32>() * self.spec.max_spin);
        self.spin.push(Quat::IDENTITY);
        self.color.push(palette::pick(rng, &self.spec.palette));
        self.current_scale.push(start_scale);
        self.rendered.push(Transform { position: scattered, rotation: Quat::IDENTITY, scale: start_scale });
        slot
    }

    /// Add one instance at runtime (e.g. a new photo frame).  Count-dependent
    /// placements are re-laid out so the spiral stays evenly spaced.
    pub fn push_instance<R: Rng + ?Sized>(&mut self, rng: &mut R, tree: &TreeShape, aspect: f32) -> u32 {
        let n = self.len();
        let assembled = self.spec.placement.sample(rng, tree, n, n + 1);
        let slot = self.push_sampled(rng, assembled, aspect.max(0.05));
        self.relayout(rng, tree);
        slot
    }

    /// Remove the instance with stable id `slot`.  Returns `false` if absent.
    pub fn remove_instance<R: Rng + ?Sized>(&mut self, rng: &mut R, tree: &TreeShape, slot: u32) -> bool {
        let Some(i) = self.index_of(slot) else { return false };
        self.slots.remove(i);
        self.assembled.remove(i);
        self.scattered.remove(i);
        self.current.remove(i);
        self.phase.remove(i);
        self.freq.remove(i);
        self.scale.remove(i);
        self.aspect.remove(i);
        self.axis.remove(i);
        self.spin_rate.remove(i);
        self.spin.remove(i);
        self.color.remove(i);
        self.current_scale.remove(i);
        self.rendered.remove(i);
        self.relayout(rng, tree);
        true
    }

    fn relayout<R: Rng + ?Sized>(&mut self, rng: &mut R, tree: &TreeShape) {
        if !self.spec.placement.depends_on_count() {
            return;
        }
        let n = self.len();
        for i in 0..n {
            self.assembled[i] = self.spec.placement.sample(rng, tree, i, n);
        }
        self.spec.count = n;
    }

    // ── Accessors ─────────────────────────────────────────────────────────

    pub fn spec(&self) -> &LayerSpec { &self.spec }
    pub fn kind(&self) -> LayerKind { self.spec.kind }
    pub fn name(&self) -> &str { &self.spec.name }
    pub fn rate(&self) -> f32 { self.spec.rate }
    pub fn len(&self) -> usize { self.slots.len() }
    pub fn is_empty(&self) -> bool { self.slots.is_empty() }

    pub fn slots(&self) -> &[u32] { &self.slots }
    pub fn index_of(&self, slot: u32) -> Option<usize> {
        self.slots.iter().position(|&s| s == slot)
    }

    pub fn assembled_target(&self, i: usize) -> Vec3 { self.assembled[i] }
    pub fn scattered_target(&self, i: usize) -> Vec3 { self.scattered[i] }
    pub fn current_position(&self, i: usize) -> Vec3 { self.current[i] }
    pub fn phase(&self, i: usize) -> f32 { self.phase[i] }
    pub fn frequency(&self, i: usize) -> f32 { self.freq[i] }
    pub fn aspect(&self, i: usize) -> f32 { self.aspect[i] }

    pub fn colors(&self) -> &[u32] { &self.color }
    pub fn transforms(&self) -> &[Transform] { &self.rendered }

    /// Teleport an instance for test setup.
    #[cfg(test)]
    pub(crate) fn place(&mut self, i: usize, position: Vec3) {
        self.current[i] = position;
        self.rendered[i].position = position;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Default catalogue
// ════════════════════════════════════════════════════════════════════════════

/// Per-layer counts and morph rates of the stock tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerCounts {
    pub foliage:      usize,
    pub gift_boxes:   usize,
    pub baubles:      usize,
    pub stars:        usize,
    pub lights:       usize,
    pub photo_frames: usize,
}

impl Default for LayerCounts {
    fn default() -> Self {
        LayerCounts {
            foliage:      18_000,
            gift_boxes:   200,
            baubles:      400,
            stars:        150,
            lights:       600,
            photo_frames: 6,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerRates {
    pub foliage: f32,
    pub heavy:   f32,
    pub medium:  f32,
    pub star:    f32,
    pub light:   f32,
    pub topper:  f32,
    pub photo:   f32,
}

impl Default for LayerRates {
    fn default() -> Self {
        LayerRates {
            foliage: 0.02,
            heavy:   0.015,
            medium:  0.03,
            star:    0.04,
            light:   0.05,
            topper:  0.02,
            photo:   0.05,
        }
    }
}

/// The stock layer stack, back to front.
pub fn tree_catalogue(
    tree: &TreeShape,
    scatter_bounds: f32,
    counts: &LayerCounts,
    rates: &LayerRates,
) -> Vec<LayerSpec> {
    vec![
        LayerSpec::foliage(counts.foliage, rates.foliage, scatter_bounds),
        LayerSpec::ornament(LayerKind::GiftBox, counts.gift_boxes, rates.heavy,  0.9,  0.6,  scatter_bounds),
        LayerSpec::ornament(LayerKind::Bauble,  counts.baubles,    rates.medium, 1.0,  0.4,  scatter_bounds),
        LayerSpec::ornament(LayerKind::Star,    counts.stars,      rates.star,   1.1,  0.25, scatter_bounds),
        LayerSpec::ornament(LayerKind::Light,   counts.lights,     rates.light,  1.05, 0.15, scatter_bounds),
        LayerSpec::topper(tree, rates.topper),
        LayerSpec::photo_frames(counts.photo_frames, rates.photo, scatter_bounds),
    ]
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
