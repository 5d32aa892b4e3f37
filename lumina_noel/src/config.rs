//! Static configuration, loaded once at startup.
//!
//! Every section is `#[serde(default)]`, so a JSON file only needs to name
//! the values it changes:
//!
//! ```json
//! { "layers": { "counts": { "foliage": 6000 } }, "camera": { "rate": 0.05 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use noel_formation::{tree_catalogue, Easing, FocusPose, LayerCounts, LayerRates, LayerSpec, TreeShape};
use noel_gesture::GestureThresholds;

use crate::error::{LuminaError, Result};

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub formation: FormationConfig,
    pub layers:    LayersConfig,
    pub gesture:   GestureConfig,
    pub camera:    CameraConfig,
    pub easing:    Easing,
    pub focus:     FocusPose,
    /// Draw the tracked hand skeleton over the scene.
    pub debug:     bool,
    /// RNG seed for target sampling; random when absent.
    pub seed:      Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormationConfig {
    pub tree:           TreeShape,
    /// Radius of the scattered cloud.
    pub scatter_bounds: f32,
}

impl Default for FormationConfig {
    fn default() -> Self {
        FormationConfig { tree: TreeShape::default(), scatter_bounds: 40.0 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayersConfig {
    pub counts: LayerCounts,
    pub rates:  LayerRates,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Identical consecutive classifications that must be exceeded.
    pub confidence_frames: u32,
    pub thresholds:        GestureThresholds,
}

impl Default for GestureConfig {
    fn default() -> Self {
        GestureConfig {
            confidence_frames: noel_gesture::debounce::DEFAULT_CONFIDENCE_FRAMES,
            thresholds:        GestureThresholds::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub rate:               f32,
    pub horizontal_gain:    f32,
    pub vertical_gain:      f32,
    pub assembled_distance: f32,
    pub scattered_distance: f32,
    pub focused_distance:   f32,
    /// Vertical field of view in degrees.
    pub fov_degrees:        f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        CameraConfig {
            rate:               0.03,
            horizontal_gain:    15.0,
            vertical_gain:      10.0,
            assembled_distance: 26.0,
            scattered_distance: 16.0,
            focused_distance:   16.0,
            fov_degrees:        50.0,
        }
    }
}

impl AppConfig {
    /// Built-in defaults, overridden by `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let cfg = match path {
            Some(p) => {
                let text = std::fs::read_to_string(p)?;
                let cfg: AppConfig = serde_json::from_str(&text)?;
                tracing::info!("loaded configuration from {}", p.display());
                cfg
            }
            None => AppConfig::default(),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        let tree = &self.formation.tree;
        if !(tree.height > 0.0 && tree.radius > 0.0 && self.formation.scatter_bounds > 0.0) {
            return Err(LuminaError::Config(
                "tree height, tree radius and scatter bounds must be positive".into(),
            ));
        }

        let r = &self.layers.rates;
        for (name, rate) in [
            ("foliage", r.foliage),
            ("heavy", r.heavy),
            ("medium", r.medium),
            ("star", r.star),
            ("light", r.light),
            ("topper", r.topper),
            ("photo", r.photo),
            ("camera", self.camera.rate),
        ] {
            check_rate(name, rate)?;
        }

        if let Easing::TimeScaled { reference_hz } = self.easing {
            if !(reference_hz > 0.0) {
                return Err(LuminaError::Config("easing reference_hz must be positive".into()));
            }
        }
        if !(self.camera.fov_degrees > 0.0 && self.camera.fov_degrees < 180.0) {
            return Err(LuminaError::Config("camera fov_degrees must be in (0, 180)".into()));
        }
        if self.gesture.confidence_frames == 0 {
            return Err(LuminaError::Config("gesture confidence_frames must be at least 1".into()));
        }
        check_thresholds(&self.gesture.thresholds)
    }

    /// The stock layer stack for this configuration.
    pub fn layer_specs(&self) -> Vec<LayerSpec> {
        tree_catalogue(
            &self.formation.tree,
            self.formation.scatter_bounds,
            &self.layers.counts,
            &self.layers.rates,
        )
    }
}

fn check_rate(name: &str, rate: f32) -> Result<()> {
    if rate > 0.0 && rate <= 1.0 {
        Ok(())
    } else {
        Err(LuminaError::Config(format!("{} rate {} outside (0, 1]", name, rate)))
    }
}

/// Distances must be positive and finite; the digit counts must leave both
/// open palm and fist reachable out of five digits.
fn check_thresholds(th: &GestureThresholds) -> Result<()> {
    for (name, d) in [("pinch_distance", th.pinch_distance), ("thumb_extension", th.thumb_extension)] {
        if !(d.is_finite() && d > 0.0) {
            return Err(LuminaError::Config(format!("gesture {} {} must be positive", name, d)));
        }
    }
    if th.open_palm_min_extended == 0 || th.open_palm_min_extended > 5 {
        return Err(LuminaError::Config(format!(
            "gesture open_palm_min_extended {} outside 1..=5",
            th.open_palm_min_extended
        )));
    }
    if th.fist_max_extended >= th.open_palm_min_extended {
        return Err(LuminaError::Config(format!(
            "gesture fist_max_extended {} must be below open_palm_min_extended {}",
            th.fist_max_extended, th.open_palm_min_extended
        )));
    }
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = AppConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.layers.counts.foliage, 18_000);
        assert_eq!(cfg.gesture.confidence_frames, 5);
        assert_eq!(cfg.camera.assembled_distance, 26.0);
        assert_eq!(cfg.easing, Easing::TimeScaled { reference_hz: 60.0 });
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let cfg: AppConfig =
            serde_json::from_str(r#"{ "layers": { "counts": { "foliage": 500 } }, "camera": { "rate": 0.1 } }"#)
                .unwrap();
        assert_eq!(cfg.layers.counts.foliage, 500);
        assert_eq!(cfg.layers.counts.baubles, 400);
        assert_eq!(cfg.camera.rate, 0.1);
        assert_eq!(cfg.camera.horizontal_gain, 15.0);
    }

    #[test]
    fn per_frame_easing_parses() {
        let cfg: AppConfig = serde_json::from_str(r#"{ "easing": { "mode": "per_frame" } }"#).unwrap();
        assert_eq!(cfg.easing, Easing::PerFrame);
    }

    #[test]
    fn rejects_zero_rate() {
        let mut cfg = AppConfig::default();
        cfg.layers.rates.light = 0.0;
        assert!(matches!(cfg.validate(), Err(LuminaError::Config(_))));
    }

    #[test]
    fn rejects_rate_above_one() {
        let mut cfg = AppConfig::default();
        cfg.camera.rate = 1.5;
        assert!(matches!(cfg.validate(), Err(LuminaError::Config(_))));
    }

    #[test]
    fn rejects_unreachable_open_palm() {
        let mut cfg = AppConfig::default();
        cfg.gesture.thresholds.open_palm_min_extended = 6;
        assert!(matches!(cfg.validate(), Err(LuminaError::Config(_))));
    }

    #[test]
    fn rejects_overlapping_digit_counts() {
        let mut cfg = AppConfig::default();
        cfg.gesture.thresholds.fist_max_extended = 4;
        assert!(matches!(cfg.validate(), Err(LuminaError::Config(_))));
    }

    #[test]
    fn rejects_bad_pinch_distance() {
        for d in [-0.05, 0.0, f32::NAN] {
            let mut cfg = AppConfig::default();
            cfg.gesture.thresholds.pinch_distance = d;
            assert!(matches!(cfg.validate(), Err(LuminaError::Config(_))), "accepted {}", d);
        }
        let mut cfg = AppConfig::default();
        cfg.gesture.thresholds.thumb_extension = f32::INFINITY;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_negative_geometry() {
        let mut cfg = AppConfig::default();
        cfg.formation.tree.radius = -1.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/lumina.json"))).unwrap_err();
        assert!(matches!(err, LuminaError::Io(_)));
    }

    #[test]
    fn layer_specs_follow_counts() {
        let mut cfg = AppConfig::default();
        cfg.layers.counts.foliage = 10;
        let specs = cfg.layer_specs();
        assert_eq!(specs[0].count, 10);
        assert_eq!(specs.len(), 7);
    }
}
