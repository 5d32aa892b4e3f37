//! # noel_formation
//!
//! Dual-formation particle layers and the per-frame morph between them.
//!
//! ```text
//!  LayerSpec ──generate──▶ Layer { assembled[], scattered[], current[], … }
//!                                   │
//!  Formation ──▶ MorphEngine::step(dt) ──▶ Layer::transforms() ──▶ renderer
//! ```
//!
//! Targets are sampled once (see [`geometry`]) and never move afterwards,
//! except that count-dependent placements (the photo-frame spiral) are
//! re-laid out when instances are added or removed.  Only `current`, the
//! spin and the rendered transform change per frame.

pub mod palette;
pub mod geometry;
pub mod layer;
pub mod morph;

pub use geometry::{AssemblePlacement, ScatterShape, TreeShape};
pub use layer::{
    tree_catalogue, Bob, InstanceId, Layer, LayerCounts, LayerKind, LayerRates, LayerSpec, Transform,
};
pub use morph::{ease_toward, Easing, FocusPose, Formation, MorphEngine};
