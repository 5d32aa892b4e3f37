//! End-to-end: synthetic landmark frames through classification, debounce,
//! mode transitions, morph and camera.

use lumina_noel::detector::DetectorEvent;
use lumina_noel::{AppConfig, AppState, DisplayMode, LuminaError};
use noel_formation::{Easing, LayerKind};
use noel_gesture::{pose_landmarks, Gesture, SyntheticPose};

const DT: f32 = 1.0 / 60.0;

fn config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.layers.counts.foliage = 500;
    cfg.layers.counts.gift_boxes = 30;
    cfg.layers.counts.baubles = 30;
    cfg.layers.counts.stars = 30;
    cfg.layers.counts.lights = 30;
    cfg.layers.counts.photo_frames = 4;
    cfg.easing = Easing::PerFrame;
    cfg.seed = Some(2024);
    cfg
}

fn frame(app: &mut AppState, pose: SyntheticPose) {
    app.handle_detector(DetectorEvent::Hand(pose_landmarks(pose, 0.5, 0.5)))
        .expect("well-formed frame");
    app.tick(DT);
}

fn foliage_error(app: &AppState, scattered: bool) -> f32 {
    let engine = app.engine();
    let li = engine.find_layer(LayerKind::Foliage).unwrap();
    let layer = engine.layer(li).unwrap();
    let mut worst: f32 = 0.0;
    for i in 0..layer.len() {
        let start = if scattered { layer.assembled_target(i) } else { layer.scattered_target(i) };
        let end = if scattered { layer.scattered_target(i) } else { layer.assembled_target(i) };
        let span = (end - start).length().max(1e-3);
        worst = worst.max((layer.current_position(i) - end).length() / span);
    }
    worst
}

#[test]
fn open_palm_on_sixth_frame_scatters() {
    let mut app = AppState::new(&config());
    for _ in 0..5 {
        frame(&mut app, SyntheticPose::OpenPalm);
        assert_eq!(app.mode(), DisplayMode::Assembled);
    }
    frame(&mut app, SyntheticPose::OpenPalm);
    assert_eq!(app.gesture(), Gesture::OpenPalm);
    assert_eq!(app.mode(), DisplayMode::Scattered);
}

#[test]
fn morph_settles_within_two_hundred_frames() {
    let mut cfg = config();
    cfg.layers.rates.foliage = 0.03;
    let mut app = AppState::new(&cfg);
    // the tree is generated scattered and starts pulling in immediately
    for _ in 0..200 {
        app.handle_detector(DetectorEvent::NoHand).unwrap();
        app.tick(DT);
    }
    assert!(foliage_error(&app, false) < 0.01);

    for _ in 0..6 {
        frame(&mut app, SyntheticPose::OpenPalm);
    }
    assert_eq!(app.mode(), DisplayMode::Scattered);
    for _ in 0..200 {
        frame(&mut app, SyntheticPose::OpenPalm);
    }
    assert!(foliage_error(&app, true) < 0.01);
}

#[test]
fn fist_releases_focus_and_assembles() {
    let mut app = AppState::new(&config());
    let (id, _) = app.engine().focusable_instances()[0];
    app.select(id).unwrap();
    assert_eq!(app.mode(), DisplayMode::Focused(id));

    for _ in 0..120 {
        frame(&mut app, SyntheticPose::Relaxed);
    }
    let focused = app.engine().transform(id).unwrap();
    assert!((focused.position - glam::Vec3::new(0.0, 0.0, 12.0)).length() < 0.5);

    for _ in 0..6 {
        frame(&mut app, SyntheticPose::Fist);
    }
    assert_eq!(app.mode(), DisplayMode::Assembled);
}

#[test]
fn malformed_frames_read_as_no_gesture() {
    let mut app = AppState::new(&config());
    for _ in 0..6 {
        frame(&mut app, SyntheticPose::Fist);
    }
    assert_eq!(app.gesture(), Gesture::Fist);

    let mut bad = pose_landmarks(SyntheticPose::Fist, 0.5, 0.5);
    bad[4].x = 1.7;
    let err = app.handle_detector(DetectorEvent::Hand(bad)).unwrap_err();
    assert!(matches!(err, LuminaError::MalformedFrame(_)));
    assert_eq!(app.raw_gesture(), Gesture::None);
    assert_eq!(app.mode(), DisplayMode::Assembled);
}

#[test]
fn removing_focused_photo_returns_to_scattered() {
    let mut app = AppState::new(&config());
    let (id, _) = app.engine().focusable_instances()[1];
    app.select(id).unwrap();
    assert!(app.remove_photo_frame(id));
    assert_eq!(app.mode(), DisplayMode::Scattered);
    assert!(matches!(app.select(id), Err(LuminaError::InvalidTransitionRequest(_))));
}

#[test]
fn camera_pulls_in_when_scattered() {
    let mut app = AppState::new(&config());
    let start = app.camera_position().z;
    for _ in 0..206 {
        frame(&mut app, SyntheticPose::OpenPalm);
    }
    assert!(app.camera_position().z < start);
    assert!((app.camera_position().z - 16.0).abs() < 0.1);
}
