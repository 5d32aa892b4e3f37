//! Top-level application state and frame driver.
//!
//! `AppState` is the one context object: it owns the gesture tracker, the
//! mode machine, the morph engine and the camera rig, and it is the only
//! place they meet.  Each rendered frame runs, in order:
//!
//! ```text
//! detector events ──▶ classify ──▶ debounce ──▶ ModeMachine
//! pointer events  ─────────────────────────────▶ ModeMachine
//! tick(dt):                        MorphEngine::step ──▶ CameraRig::update
//! ```

use std::time::Instant;

use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use noel_formation::{InstanceId, LayerKind, MorphEngine};
use noel_gesture::{pose_landmarks, Gesture, GestureTracker, HandFrame, HandPosition, SyntheticPose};

use crate::camera::CameraRig;
use crate::config::AppConfig;
use crate::detector::{spawn_detector, DetectorEvent, DetectorHandle};
use crate::error::{LuminaError, Result};
use crate::mode::{DisplayMode, ModeMachine};
use crate::visualizer::{pick_instance, Hud, Visualizer, WindowInput, SCENE_H, WIN_W};

/// Aspect ratios offered to new photo frames.
const FRAME_ASPECTS: [f32; 4] = [1.0, 0.75, 4.0 / 3.0, 1.5];

// ════════════════════════════════════════════════════════════════════════════
// AppState
// ════════════════════════════════════════════════════════════════════════════

pub struct AppState {
    // ── gesture side ─────────────────────────────────────────────────────
    tracker:     GestureTracker,
    detector_ok: bool,

    // ── scene ────────────────────────────────────────────────────────────
    modes:       ModeMachine,
    engine:      MorphEngine,
    camera:      CameraRig,
    rng:         StdRng,

    // ── ui ───────────────────────────────────────────────────────────────
    pub status:  String,
    pub debug:   bool,
}

impl AppState {
    pub fn new(cfg: &AppConfig) -> Self {
        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let engine = MorphEngine::from_specs(cfg.formation.tree, cfg.layer_specs(), cfg.easing, &mut rng)
            .with_focus(cfg.focus);
        info!(
            "tree ready: {} layers, {} instances",
            engine.layers().len(),
            engine.instance_count()
        );

        AppState {
            tracker:     GestureTracker::new(cfg.gesture.thresholds.clone(), cfg.gesture.confidence_frames),
            detector_ok: true,
            modes:       ModeMachine::new(),
            engine,
            camera:      CameraRig::new(cfg.camera.clone(), cfg.easing),
            rng,
            status:      "Ready: make a fist to assemble, open your palm to scatter".to_string(),
            debug:       cfg.debug,
        }
    }

    // ── detector → classifier → debouncer → mode ─────────────────────────

    /// Feed one detector tick.  A malformed frame still counts as a
    /// no-gesture tick and is reported back for logging.
    pub fn handle_detector(&mut self, event: DetectorEvent) -> Result<()> {
        let edge = match &event {
            DetectorEvent::Hand(landmarks) => self.tracker.observe(Some(landmarks.as_slice())),
            DetectorEvent::NoHand => self.tracker.observe(None),
            DetectorEvent::Unavailable(reason) => {
                self.detector_ok = false;
                self.status = format!("Camera unavailable ({}); click photos to interact", reason);
                let edge = self.tracker.detector_lost();
                self.apply_gesture(edge);
                return Err(LuminaError::DetectorUnavailable(reason.clone()));
            }
        };
        self.apply_gesture(edge);

        match self.tracker.last_error() {
            Some(e) => Err(LuminaError::MalformedFrame(e.clone())),
            None => Ok(()),
        }
    }

    fn apply_gesture(&mut self, edge: Option<Gesture>) {
        let Some(g) = edge else { return };
        debug!("stable gesture: {}", g.as_str());
        if self.modes.on_gesture(g) {
            self.status = match self.modes.mode() {
                DisplayMode::Assembled => "Fist: the tree gathers itself".to_string(),
                DisplayMode::Scattered => "Open palm: scattered; move your hand to look around".to_string(),
                DisplayMode::Focused(_) => self.status.clone(),
            };
        }
    }

    // ── pointer / selection ──────────────────────────────────────────────

    /// Focus `id`, or release it if it already has focus.
    pub fn select(&mut self, id: InstanceId) -> Result<()> {
        if !self.engine.is_focusable(id) {
            return Err(LuminaError::InvalidTransitionRequest(id));
        }
        self.modes.select(id);
        self.status = match self.modes.mode() {
            DisplayMode::Focused(_) => format!("Photo {} in focus; click again or Esc to release", id.slot),
            _ => "Photo released".to_string(),
        };
        Ok(())
    }

    pub fn deselect(&mut self) {
        if self.modes.deselect() {
            self.status = "Photo released".to_string();
        }
    }

    /// Select whatever focusable item is under scene pixel `(x, y)`.
    pub fn click(&mut self, x: f32, y: f32) -> Result<()> {
        let projector = self.camera.projector(WIN_W, SCENE_H);
        match pick_instance(&self.engine, &projector, x, y) {
            Some(id) => self.select(id),
            None => Ok(()),
        }
    }

    // ── photo frames ─────────────────────────────────────────────────────

    pub fn add_photo_frame(&mut self) -> Option<InstanceId> {
        let layer = self.engine.find_layer(LayerKind::PhotoFrame)?;
        let aspect = FRAME_ASPECTS[self.rng.random_range(0..FRAME_ASPECTS.len())];
        let id = self.engine.add_instance(layer, aspect, &mut self.rng)?;
        self.status = format!("Added photo {}", id.slot);
        Some(id)
    }

    /// Remove `id`.  Removing the focused frame drops back to scattered.
    pub fn remove_photo_frame(&mut self, id: InstanceId) -> bool {
        if !self.engine.remove_instance(id, &mut self.rng) {
            return false;
        }
        if self.modes.mode().focused() == Some(id) {
            self.modes.deselect();
        }
        self.status = format!("Removed photo {}", id.slot);
        true
    }

    /// The focused frame if there is one, otherwise the newest.
    pub fn remove_current_frame(&mut self) -> bool {
        let target = self.modes.mode().focused().or_else(|| {
            let li = self.engine.find_layer(LayerKind::PhotoFrame)?;
            let slot = *self.engine.layer(li)?.slots().last()?;
            Some(InstanceId { layer: li, slot })
        });
        match target {
            Some(id) => self.remove_photo_frame(id),
            None => false,
        }
    }

    // ── per-frame tick ───────────────────────────────────────────────────

    pub fn tick(&mut self, dt: f32) {
        let mode = self.modes.mode();
        self.engine.set_viewer(self.camera.position());
        self.engine.step(&mode.formation(), dt);
        self.camera.update(mode, self.tracker.stable(), self.tracker.hand(), dt);
    }

    // ── accessors for the render loop ────────────────────────────────────

    pub fn mode(&self)        -> DisplayMode        { self.modes.mode() }
    pub fn gesture(&self)     -> Gesture            { self.tracker.stable() }
    pub fn raw_gesture(&self) -> Gesture            { self.tracker.raw() }
    pub fn hand(&self)        -> HandPosition       { self.tracker.hand() }
    pub fn hand_frame(&self)  -> Option<&HandFrame> { self.tracker.last_frame() }
    pub fn engine(&self)      -> &MorphEngine       { &self.engine }
    pub fn camera(&self)      -> &CameraRig         { &self.camera }
    pub fn camera_position(&self) -> Vec3           { self.camera.position() }
    pub fn detector_ok(&self) -> bool               { self.detector_ok }

    pub fn hud<'a>(&'a self, detector: &'a str) -> Hud<'a> {
        Hud {
            mode:     self.modes.mode(),
            stable:   self.tracker.stable(),
            raw:      self.tracker.raw(),
            status:   &self.status,
            detector: if self.detector_ok { detector } else { "offline" },
            hand:     self.hand_frame(),
            debug:    self.debug,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// run(): the windowed application loop
// ════════════════════════════════════════════════════════════════════════════

#[cfg(not(feature = "leap"))]
fn start_detector() -> Result<(Option<crossbeam_channel::Sender<crate::detector::SimInput>>, DetectorHandle)> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let handle = spawn_detector(crate::detector::SimHandSource::new(rx))?;
    Ok((Some(tx), handle))
}

#[cfg(feature = "leap")]
fn start_detector() -> Result<(Option<crossbeam_channel::Sender<crate::detector::SimInput>>, DetectorHandle)> {
    let handle = spawn_detector(crate::detector::LeapHandSource)?;
    Ok((None, handle))
}

/// Run the full application.
///
/// Creates the detector (simulation by default, hardware with
/// `--features leap`) and the visualizer, then drives the frame loop at the
/// window's refresh rate.  The detector thread is stopped and joined on
/// every exit path when its handle drops.
pub fn run(cfg: AppConfig) -> Result<()> {
    let (sim_tx, detector) = start_detector()?;
    let mut vis = Visualizer::new(sim_tx)?;
    let mut app = AppState::new(&cfg);
    let mut last = Instant::now();

    while vis.is_open() {
        let input = vis.poll_input();
        if input.quit {
            break;
        }

        for event in detector.drain() {
            match app.handle_detector(event) {
                Ok(()) => {}
                Err(e @ LuminaError::DetectorUnavailable(_)) => warn!("{}; continuing pointer-only", e),
                Err(e) => debug!("{}", e),
            }
        }

        handle_window_input(&mut app, &input);

        let now = Instant::now();
        let dt = now.duration_since(last).as_secs_f32().min(0.1);
        last = now;
        app.tick(dt);

        vis.render(app.engine(), app.camera(), &app.hud(detector.name()))?;
    }

    info!("window closed; shutting down");
    Ok(())
}

fn handle_window_input(app: &mut AppState, input: &WindowInput) {
    if input.toggle_debug {
        app.debug = !app.debug;
    }
    if input.deselect {
        app.deselect();
    }
    if let Some((x, y)) = input.click {
        if let Err(e) = app.click(x, y) {
            warn!("{}", e);
        }
    }
    if input.add_frame {
        app.add_photo_frame();
    }
    if input.remove_frame {
        app.remove_current_frame();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Headless driver
// ════════════════════════════════════════════════════════════════════════════

/// Final state of a headless run.
#[derive(Clone, Debug, PartialEq)]
pub struct HeadlessReport {
    pub frames:  u64,
    pub mode:    DisplayMode,
    pub gesture: Gesture,
    pub camera:  Vec3,
}

/// Scripted hand for one frame of a 240-frame cycle: open palm sweeping
/// left to right, hand out of view, fist, then an ambiguous pose.
fn scripted_hand(frame: u64) -> DetectorEvent {
    let phase = frame % 240;
    let sweep = 0.3 + 0.4 * ((frame as f32) * 0.05).sin().abs();
    let pose = match phase {
        0..=79    => Some(SyntheticPose::OpenPalm),
        80..=99   => None,
        100..=179 => Some(SyntheticPose::Fist),
        _         => Some(SyntheticPose::Relaxed),
    };
    match pose {
        Some(p) => DetectorEvent::Hand(pose_landmarks(p, sweep, 0.5)),
        None => DetectorEvent::NoHand,
    }
}

/// Drive the whole pipeline for `frames` frames at 60 Hz without a window.
/// Half-way through the first photo frame is selected; three quarters in it
/// is released.
pub fn run_headless(cfg: AppConfig, frames: u64) -> Result<HeadlessReport> {
    let mut app = AppState::new(&cfg);
    let dt = 1.0 / 60.0;

    for n in 0..frames {
        if let Err(e) = app.handle_detector(scripted_hand(n)) {
            debug!("{}", e);
        }

        if n == frames / 2 {
            let first = app
                .engine()
                .focusable_instances()
                .first()
                .map(|(id, _)| *id);
            if let Some(id) = first {
                app.select(id)?;
            }
        }
        if n == frames * 3 / 4 {
            app.deselect();
        }

        app.tick(dt);

        if n % 60 == 0 {
            debug!(
                "frame {:>5}  mode {:<9}  gesture {:<9}  camera ({:.2}, {:.2}, {:.2})",
                n,
                app.mode().label(),
                app.gesture().as_str(),
                app.camera_position().x,
                app.camera_position().y,
                app.camera_position().z,
            );
        }
    }

    let report = HeadlessReport {
        frames,
        mode:    app.mode(),
        gesture: app.gesture(),
        camera:  app.camera_position(),
    };
    info!(
        "headless run finished after {} frames: mode {}, gesture {}, camera ({:.2}, {:.2}, {:.2})",
        report.frames,
        report.mode.label(),
        report.gesture.as_str(),
        report.camera.x,
        report.camera.y,
        report.camera.z,
    );
    Ok(report)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
