//! Software-rendered visualizer using `minifb`.
//!
//! Layout:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┬───────────┐
//! │                                                      │  hand     │
//! │            instanced scene, painter-sorted           │  overlay  │
//! │                                                      │  (debug)  │
//! │                                                      └───────────┤
//! │                                                                  │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  MODE  gesture  status                                           │
//! │  key legend                                                      │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

use crossbeam_channel::Sender;
use minifb::{Key, KeyRepeat, MouseButton, MouseMode, Window, WindowOptions};

use noel_formation::palette::{blend, dim, GOLD, PURE_WHITE, WARM_WHITE};
use noel_formation::{InstanceId, LayerKind, MorphEngine};
use noel_gesture::landmarks::HAND_SKELETON;
use noel_gesture::{Gesture, HandFrame, SyntheticPose};

use crate::camera::{CameraRig, Projector};
use crate::detector::SimInput;
use crate::error::Result;
use crate::mode::DisplayMode;

// ════════════════════════════════════════════════════════════════════════════
// Layout constants
// ════════════════════════════════════════════════════════════════════════════

pub const WIN_W:    usize = 1000;
pub const WIN_H:    usize = 720;
const STATUS_H:     usize = 44;
pub const SCENE_H:  usize = WIN_H - STATUS_H;
const OVERLAY_W:    usize = 200;
const OVERLAY_H:    usize = 160;
const BG_COLOR:     u32   = 0xFF010502;
const STATUS_BG:    u32   = 0xFF06140C;
const OVERLAY_BG:   u32   = 0xFF0A1F14;
const FRAME_BORDER: u32   = 0xFFD4AF37;
/// Screen-space slack around a photo frame when picking, in pixels.
const PICK_SLACK:   f32   = 6.0;

// ════════════════════════════════════════════════════════════════════════════
// Per-frame input / HUD
// ════════════════════════════════════════════════════════════════════════════

/// Window events the app acts on directly (not through the detector).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WindowInput {
    pub quit:         bool,
    /// Left click in scene pixels.
    pub click:        Option<(f32, f32)>,
    pub deselect:     bool,
    pub add_frame:    bool,
    pub remove_frame: bool,
    pub toggle_debug: bool,
}

/// Everything besides the scene that goes on screen.
pub struct Hud<'a> {
    pub mode:     DisplayMode,
    pub stable:   Gesture,
    pub raw:      Gesture,
    pub status:   &'a str,
    pub detector: &'a str,
    pub hand:     Option<&'a HandFrame>,
    pub debug:    bool,
}

// ════════════════════════════════════════════════════════════════════════════
// Visualizer
// ════════════════════════════════════════════════════════════════════════════

pub struct Visualizer {
    window:     Window,
    buf:        Vec<u32>,
    /// Keyboard/mouse hand simulation; `None` when a real detector runs.
    sim_tx:     Option<Sender<SimInput>>,
    mouse_was_down: bool,
    last_pointer:   Option<(f32, f32)>,
    /// Depth-sorted draw list, reused across frames.
    draws:      Vec<Draw>,
}

impl Visualizer {
    pub fn new(sim_tx: Option<Sender<SimInput>>) -> Result<Self> {
        let mut window = Window::new(
            "Lumina Noel — gesture-controlled tree",
            WIN_W, WIN_H,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;
        window.set_target_fps(60);

        Ok(Visualizer {
            window,
            buf: vec![BG_COLOR; WIN_W * WIN_H],
            sim_tx,
            mouse_was_down: false,
            last_pointer:   None,
            draws:          Vec::new(),
        })
    }

    pub fn is_open(&self) -> bool { self.window.is_open() }

    /// Poll keyboard and mouse.  Pose keys and pointer motion go to the
    /// simulated detector; everything else is returned.
    pub fn poll_input(&mut self) -> WindowInput {
        let mut input = WindowInput { quit: !self.window.is_open(), ..WindowInput::default() };
        let pressed = |k: Key| self.window.is_key_pressed(k, KeyRepeat::No);

        if pressed(Key::Q) { input.quit = true; }
        if pressed(Key::Escape) { input.deselect = true; }
        if pressed(Key::N) { input.add_frame = true; }
        if pressed(Key::Delete) || pressed(Key::Backspace) { input.remove_frame = true; }
        if pressed(Key::D) { input.toggle_debug = true; }

        let pose = if pressed(Key::F) {
            Some(Some(SyntheticPose::Fist))
        } else if pressed(Key::O) {
            Some(Some(SyntheticPose::OpenPalm))
        } else if pressed(Key::P) {
            Some(Some(SyntheticPose::Pinch))
        } else if pressed(Key::R) {
            Some(Some(SyntheticPose::Relaxed))
        } else if pressed(Key::H) {
            Some(None)
        } else {
            None
        };

        let pointer = self.window.get_mouse_pos(MouseMode::Discard);
        let down = self.window.get_mouse_down(MouseButton::Left);
        if down && !self.mouse_was_down {
            input.click = pointer.filter(|&(_, y)| y < SCENE_H as f32);
        }
        self.mouse_was_down = down;

        if let Some(tx) = &self.sim_tx {
            if let Some(p) = pose {
                let _ = tx.send(SimInput::Pose(p));
            }
            if let Some((x, y)) = pointer {
                if self.last_pointer != Some((x, y)) {
                    let _ = tx.send(SimInput::Pointer {
                        x: x / WIN_W as f32,
                        y: (y / SCENE_H as f32).min(1.0),
                    });
                    self.last_pointer = Some((x, y));
                }
            }
        }

        input
    }

    /// Render one frame.
    pub fn render(&mut self, engine: &MorphEngine, camera: &CameraRig, hud: &Hud<'_>) -> Result<()> {
        self.buf.fill(BG_COLOR);

        let projector = camera.projector(WIN_W, SCENE_H);
        self.draw_scene(engine, &projector, hud.mode.focused());

        if hud.debug {
            self.draw_hand_overlay(hud.hand);
        }
        self.draw_status(hud);

        self.window.update_with_buffer(&self.buf, WIN_W, WIN_H)?;
        Ok(())
    }

    // ── Scene ─────────────────────────────────────────────────────────────

    fn draw_scene(&mut self, engine: &MorphEngine, projector: &Projector, focused: Option<InstanceId>) {
        let mut draws = std::mem::take(&mut self.draws);
        draws.clear();
        collect_draws(engine, projector, focused, &mut draws);
        draws.sort_by(|a, b| b.depth.total_cmp(&a.depth));

        for d in &draws {
            let (x, y) = (d.x as isize, d.y as isize);
            let r = d.size as isize;
            match d.shape {
                Shape::Dot => {
                    self.set_pixel_i(x, y, d.color);
                    if r >= 1 {
                        self.set_pixel_i(x + 1, y, d.color);
                        self.set_pixel_i(x, y + 1, d.color);
                    }
                }
                Shape::Square => self.fill_rect_i(x - r, y - r, 2 * r + 1, 2 * r + 1, d.color),
                Shape::Disc => self.fill_disc(x, y, r, d.color),
                Shape::Diamond => self.fill_diamond(x, y, r.max(1), d.color),
                Shape::Frame { half_w, half_h } => {
                    let (hw, hh) = (half_w as isize, half_h as isize);
                    self.fill_rect_i(x - hw, y - hh, 2 * hw + 1, 2 * hh + 1, FRAME_BORDER);
                    let inset = (hw.min(hh) / 8).max(1);
                    self.fill_rect_i(
                        x - hw + inset, y - hh + inset,
                        2 * (hw - inset) + 1, 2 * (hh - inset) + 1,
                        d.color,
                    );
                }
            }
        }
        self.draws = draws;
    }

    // ── Debug hand overlay ────────────────────────────────────────────────

    fn draw_hand_overlay(&mut self, hand: Option<&HandFrame>) {
        let ox = WIN_W - OVERLAY_W - 8;
        let oy = 8;
        self.fill_rect_i(ox as isize, oy as isize, OVERLAY_W as isize, OVERLAY_H as isize, OVERLAY_BG);
        self.draw_label("HAND", ox + 6, oy + 6, GOLD);

        let Some(frame) = hand else {
            self.draw_label("NO HAND", ox + 6, oy + OVERLAY_H / 2, 0xFF888888);
            return;
        };
        // mirrored, like the selfie preview
        let to_px = |l: &noel_gesture::Landmark| {
            (
                ox as isize + ((1.0 - l.x) * OVERLAY_W as f32) as isize,
                oy as isize + (l.y * OVERLAY_H as f32) as isize,
            )
        };
        for &(a, b) in HAND_SKELETON.iter() {
            let (x0, y0) = to_px(frame.joint(a));
            let (x1, y1) = to_px(frame.joint(b));
            self.draw_line(x0, y0, x1, y1, 0xFF50C878);
        }
        for j in frame.joints() {
            let (x, y) = to_px(j);
            self.fill_rect_i(x - 1, y - 1, 3, 3, GOLD);
        }
    }

    // ── Status bar ────────────────────────────────────────────────────────

    fn draw_status(&mut self, hud: &Hud<'_>) {
        self.fill_rect_i(0, SCENE_H as isize, WIN_W as isize, STATUS_H as isize, STATUS_BG);
        let line = format!(
            "{}   GESTURE {}   RAW {}   DETECTOR {}   {}",
            hud.mode.label(),
            hud.stable.as_str(),
            hud.raw.as_str(),
            hud.detector,
            hud.status,
        );
        self.draw_label(&line, 10, SCENE_H + 8, WARM_WHITE);
        self.draw_label(
            "F=fist  O=open palm  P=pinch  R=relaxed  H=hide hand  mouse=hand  click=focus  Esc=release  N/Del=frames  D=debug  Q=quit",
            10, SCENE_H + 28, 0xFF888888,
        );
    }

    // ── Primitive drawing helpers ─────────────────────────────────────────

    fn set_pixel_i(&mut self, x: isize, y: isize, color: u32) {
        if x >= 0 && y >= 0 && (x as usize) < WIN_W && (y as usize) < WIN_H {
            self.buf[y as usize * WIN_W + x as usize] = color;
        }
    }

    fn fill_rect_i(&mut self, x: isize, y: isize, w: isize, h: isize, color: u32) {
        let x0 = x.max(0) as usize;
        let y0 = y.max(0) as usize;
        let x1 = (x + w).clamp(0, WIN_W as isize) as usize;
        let y1 = (y + h).clamp(0, WIN_H as isize) as usize;
        for row in y0..y1 {
            for col in x0..x1 {
                self.buf[row * WIN_W + col] = color;
            }
        }
    }

    fn fill_disc(&mut self, cx: isize, cy: isize, r: isize, color: u32) {
        for dy in -r..=r {
            for dx in -r..=r {
                if dx * dx + dy * dy <= r * r {
                    self.set_pixel_i(cx + dx, cy + dy, color);
                }
            }
        }
    }

    fn fill_diamond(&mut self, cx: isize, cy: isize, r: isize, color: u32) {
        for dy in -r..=r {
            let span = r - dy.abs();
            for dx in -span..=span {
                self.set_pixel_i(cx + dx, cy + dy, color);
            }
        }
    }

    fn draw_line(&mut self, x0: isize, y0: isize, x1: isize, y1: isize, color: u32) {
        let (dx, dy) = ((x1 - x0).abs(), -(y1 - y0).abs());
        let (sx, sy) = (if x0 < x1 { 1 } else { -1 }, if y0 < y1 { 1 } else { -1 });
        let (mut x, mut y, mut err) = (x0, y0, dx + dy);
        loop {
            self.set_pixel_i(x, y, color);
            if x == x1 && y == y1 { break; }
            let e2 = 2 * err;
            if e2 >= dy { err += dy; x += sx; }
            if e2 <= dx { err += dx; y += sy; }
        }
    }

    /// 3×5 bitmap font, each glyph 5 rows × 3 bits.
    fn draw_label(&mut self, text: &str, x: usize, y: usize, color: u32) {
        let mut cx = x;
        for ch in text.chars() {
            let glyph = char_glyph(ch);
            for (row, &bits) in glyph.iter().enumerate() {
                for col in 0..3usize {
                    if bits & (1 << (2 - col)) != 0 {
                        self.set_pixel_i((cx + col) as isize, (y + row) as isize, color);
                    }
                }
            }
            cx += 4;
            if cx + 4 > WIN_W { break; }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Draw list (window-independent, so it can be tested)
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Copy, Debug, PartialEq)]
enum Shape {
    Dot,
    Square,
    Disc,
    Diamond,
    Frame { half_w: f32, half_h: f32 },
}

#[derive(Clone, Copy, Debug)]
struct Draw {
    x:     f32,
    y:     f32,
    depth: f32,
    size:  f32,
    color: u32,
    shape: Shape,
}

/// Distance fog: far instances fade toward the background.
fn fog(color: u32, depth: f32) -> u32 {
    dim(color, (1.25 - depth / 70.0).clamp(0.3, 1.0))
}

fn collect_draws(
    engine: &MorphEngine,
    projector: &Projector,
    focused: Option<InstanceId>,
    out: &mut Vec<Draw>,
) {
    let tree = engine.tree();
    let t = engine.elapsed();

    for (li, layer) in engine.layers().iter().enumerate() {
        let kind = layer.kind();
        for (i, xf) in layer.transforms().iter().enumerate() {
            let Some(s) = projector.project(xf.position) else { continue };
            let base = layer.colors()[i];
            let size = projector.pixels(xf.scale.y * 0.5, s.depth);

            let (color, shape, size) = match kind {
                LayerKind::Foliage => {
                    // lift the dark greens toward gold near the top, plus sparkle
                    let hf = tree.height_fraction(xf.position.y).clamp(0.0, 1.0);
                    let sparkle = (t * 3.0 + layer.phase(i) * 7.0).sin() > 0.985;
                    let c = if sparkle { GOLD } else { blend(base, WARM_WHITE, 0.08 + 0.22 * hf) };
                    (fog(c, s.depth), Shape::Dot, if s.depth < 20.0 { 1.0 } else { 0.0 })
                }
                LayerKind::GiftBox => (fog(base, s.depth), Shape::Square, size.clamp(1.0, 6.0)),
                LayerKind::Bauble  => (fog(base, s.depth), Shape::Disc,   size.clamp(1.0, 5.0)),
                LayerKind::Star    => (fog(base, s.depth), Shape::Diamond, size.clamp(1.0, 4.0)),
                LayerKind::Light   => {
                    let twinkle = 0.7 + 0.3 * (t * 4.0 + layer.phase(i)).sin();
                    (dim(blend(base, PURE_WHITE, 0.3), twinkle), Shape::Dot, 1.0)
                }
                LayerKind::Topper => (GOLD, Shape::Diamond, size.clamp(4.0, 18.0)),
                LayerKind::PhotoFrame => {
                    let id = InstanceId { layer: li, slot: layer.slots()[i] };
                    let hw = projector.pixels(xf.scale.x * 0.5, s.depth);
                    let hh = projector.pixels(xf.scale.y * 0.5, s.depth);
                    let c = if focused == Some(id) { PURE_WHITE } else { fog(WARM_WHITE, s.depth) };
                    (c, Shape::Frame { half_w: hw, half_h: hh }, hw.max(hh))
                }
            };
            out.push(Draw { x: s.x, y: s.y, depth: s.depth, size, color, shape });
        }
    }
}

/// The focusable instance under scene pixel `(x, y)`; nearest to the camera
/// wins when frames overlap.
pub fn pick_instance(engine: &MorphEngine, projector: &Projector, x: f32, y: f32) -> Option<InstanceId> {
    let mut best: Option<(InstanceId, f32)> = None;
    for (id, xf) in engine.focusable_instances() {
        let Some(s) = projector.project(xf.position) else { continue };
        let hw = projector.pixels(xf.scale.x * 0.5, s.depth) + PICK_SLACK;
        let hh = projector.pixels(xf.scale.y * 0.5, s.depth) + PICK_SLACK;
        if (x - s.x).abs() <= hw && (y - s.y).abs() <= hh {
            if best.map_or(true, |(_, d)| s.depth < d) {
                best = Some((id, s.depth));
            }
        }
    }
    best.map(|(id, _)| id)
}

// ────────────────────────────────────────────────────────────────────────────
// Minimal 3×5 bitmap font
// ────────────────────────────────────────────────────────────────────────────

/// Row bitmaps for `0`..=`9`.
const DIGIT_GLYPHS: [[u8; 5]; 10] = [
    [0b111, 0b101, 0b101, 0b101, 0b111], // 0
    [0b010, 0b110, 0b010, 0b010, 0b111], // 1
    [0b111, 0b001, 0b111, 0b100, 0b111], // 2
    [0b111, 0b001, 0b111, 0b001, 0b111], // 3
    [0b101, 0b101, 0b111, 0b001, 0b001], // 4
    [0b111, 0b100, 0b111, 0b001, 0b111], // 5
    [0b111, 0b100, 0b111, 0b101, 0b111], // 6
    [0b111, 0b001, 0b001, 0b001, 0b001], // 7
    [0b111, 0b101, 0b111, 0b101, 0b111], // 8
    [0b111, 0b101, 0b111, 0b001, 0b111], // 9
];

/// Row bitmaps for `A`..=`Z`; lowercase shares them.
const LETTER_GLYPHS: [[u8; 5]; 26] = [
    [0b111, 0b101, 0b111, 0b101, 0b101], // A
    [0b110, 0b101, 0b110, 0b101, 0b110], // B
    [0b111, 0b100, 0b100, 0b100, 0b111], // C
    [0b110, 0b101, 0b101, 0b101, 0b110], // D
    [0b111, 0b100, 0b111, 0b100, 0b111], // E
    [0b111, 0b100, 0b111, 0b100, 0b100], // F
    [0b111, 0b100, 0b101, 0b101, 0b111], // G
    [0b101, 0b101, 0b111, 0b101, 0b101], // H
    [0b111, 0b010, 0b010, 0b010, 0b111], // I
    [0b001, 0b001, 0b001, 0b101, 0b111], // J
    [0b101, 0b101, 0b110, 0b101, 0b101], // K
    [0b100, 0b100, 0b100, 0b100, 0b111], // L
    [0b101, 0b111, 0b101, 0b101, 0b101], // M
    [0b111, 0b101, 0b101, 0b101, 0b101], // N
    [0b111, 0b101, 0b101, 0b101, 0b111], // O
    [0b111, 0b101, 0b111, 0b100, 0b100], // P
    [0b111, 0b101, 0b101, 0b111, 0b001], // Q
    [0b110, 0b101, 0b110, 0b101, 0b101], // R
    [0b111, 0b100, 0b111, 0b001, 0b111], // S
    [0b111, 0b010, 0b010, 0b010, 0b010], // T
    [0b101, 0b101, 0b101, 0b101, 0b111], // U
    [0b101, 0b101, 0b101, 0b010, 0b010], // V
    [0b101, 0b101, 0b101, 0b111, 0b101], // W
    [0b101, 0b101, 0b010, 0b101, 0b101], // X
    [0b101, 0b101, 0b111, 0b010, 0b010], // Y
    [0b111, 0b001, 0b010, 0b100, 0b111], // Z
];

const UNKNOWN_GLYPH: [u8; 5] = [0b000, 0b000, 0b010, 0b000, 0b000];

fn char_glyph(c: char) -> [u8; 5] {
    match c {
        '0'..='9' => DIGIT_GLYPHS[c as usize - '0' as usize],
        'a'..='z' | 'A'..='Z' => LETTER_GLYPHS[c.to_ascii_uppercase() as usize - 'A' as usize],
        ' ' => [0b000, 0b000, 0b000, 0b000, 0b000],
        '.' => [0b000, 0b000, 0b000, 0b000, 0b010],
        ',' => [0b000, 0b000, 0b000, 0b010, 0b100],
        ':' => [0b000, 0b010, 0b000, 0b010, 0b000],
        ';' => [0b000, 0b010, 0b000, 0b010, 0b100],
        '=' => [0b000, 0b111, 0b000, 0b111, 0b000],
        '-' => [0b000, 0b000, 0b111, 0b000, 0b000],
        '/' => [0b001, 0b001, 0b010, 0b100, 0b100],
        '(' => [0b010, 0b100, 0b100, 0b100, 0b010],
        ')' => [0b010, 0b001, 0b001, 0b001, 0b010],
        _ => UNKNOWN_GLYPH,
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use noel_formation::{Easing, Formation, LayerSpec, TreeShape};
    use rand::{rngs::StdRng, SeedableRng};

    fn photo_engine(frames: usize) -> MorphEngine {
        let mut rng = StdRng::seed_from_u64(5);
        MorphEngine::from_specs(
            TreeShape::default(),
            vec![LayerSpec::photo_frames(frames, 1.0, 40.0)],
            Easing::PerFrame,
            &mut rng,
        )
    }

    #[test]
    fn click_on_focused_frame_picks_it() {
        let mut e = photo_engine(1);
        let id = InstanceId { layer: 0, slot: 0 };
        e.step(&Formation::Focused(id), 1.0 / 60.0);
        let p = Projector::new(Vec3::new(0.0, 0.0, 16.0), 50.0, WIN_W, SCENE_H);
        let centre = p.project(Vec3::new(0.0, 0.0, 12.0)).unwrap();
        assert_eq!(pick_instance(&e, &p, centre.x, centre.y), Some(id));
    }

    #[test]
    fn click_on_empty_space_picks_nothing() {
        let mut e = photo_engine(3);
        e.step(&Formation::Assembled, 1.0 / 60.0);
        let p = Projector::new(Vec3::new(0.0, 0.0, 26.0), 50.0, WIN_W, SCENE_H);
        assert_eq!(pick_instance(&e, &p, 1.0, 1.0), None);
    }

    #[test]
    fn draw_list_covers_visible_instances() {
        let mut e = photo_engine(3);
        e.step(&Formation::Assembled, 1.0 / 60.0);
        let p = Projector::new(Vec3::new(0.0, 0.0, 26.0), 50.0, WIN_W, SCENE_H);
        let mut draws = Vec::new();
        collect_draws(&e, &p, None, &mut draws);
        assert_eq!(draws.len(), 3);
        assert!(draws.iter().all(|d| matches!(d.shape, Shape::Frame { .. })));
    }

    #[test]
    fn hud_text_has_real_glyphs() {
        let samples = [
            "ASSEMBLED   GESTURE open-palm   RAW none   DETECTOR simulation",
            "Photo 3 in focus; click again or Esc to release",
            "Camera unavailable (denied); click photos to interact",
            "F=fist  N/Del=frames  Q=quit",
        ];
        for text in samples {
            for c in text.chars() {
                assert_ne!(char_glyph(c), UNKNOWN_GLYPH, "no glyph for {:?}", c);
            }
        }
        assert_eq!(char_glyph('q'), char_glyph('Q'));
    }

    #[test]
    fn fog_never_brightens() {
        let c = fog(GOLD, 100.0);
        assert!((c & 0xFF) <= (GOLD & 0xFF));
        assert!(((c >> 16) & 0xFF) <= ((GOLD >> 16) & 0xFF));
    }
}
