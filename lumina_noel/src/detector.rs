//! Hand detector sources.
//!
//! A detector runs on its own thread and publishes one [`DetectorEvent`] per
//! tick over a small bounded channel.  The render loop drains whatever has
//! arrived without blocking and runs classification itself, so gesture and
//! mode state stay on the render thread.
//!
//! Consumers don't need to know whether frames came from real hardware or
//! the keyboard/mouse simulator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, SendTimeoutError, Sender, TrySendError};
use tracing::{debug, trace, warn};

use noel_gesture::{pose_landmarks, Landmark, SyntheticPose};

use crate::error::{LuminaError, Result};

// ════════════════════════════════════════════════════════════════════════════
// DetectorEvent
// ════════════════════════════════════════════════════════════════════════════

/// One detector tick.
#[derive(Clone, Debug, PartialEq)]
pub enum DetectorEvent {
    /// 21 normalized image-space landmarks of the tracked hand.
    Hand(Vec<Landmark>),
    /// The detector ran but saw no hand.
    NoHand,
    /// The detector cannot run (no device, permission denied, driver gone).
    /// Sent at most once; the source exits afterwards.
    Unavailable(String),
}

/// Frames buffered between detector and render loop before new ones drop.
pub const CHANNEL_DEPTH: usize = 8;

// ════════════════════════════════════════════════════════════════════════════
// HandDetector trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`DetectorEvent`]s from its own thread.
///
/// `run` must return soon after `stop` is raised, and must release any
/// device it opened on every exit path.
pub trait HandDetector: Send + 'static {
    fn name(&self) -> &'static str;
    fn run(self: Box<Self>, out: FrameSink);
}

/// The detector's end of the channel.
pub struct FrameSink {
    tx:   Sender<DetectorEvent>,
    stop: Arc<AtomicBool>,
}

impl FrameSink {
    pub fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Publish one tick.  A full channel drops the frame (the render loop is
    /// behind and only the latest state matters).  Returns `false` once the
    /// receiver has gone away.
    pub fn publish(&self, event: DetectorEvent) -> bool {
        match self.tx.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                trace!("detector frame dropped: render loop is behind");
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Report that the source cannot run.  Blocks briefly so the message is
    /// not lost to a full channel.  Returns whether it was delivered.
    pub fn unavailable(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        warn!("hand detector unavailable: {}", reason);
        match self.tx.send_timeout(DetectorEvent::Unavailable(reason), Duration::from_millis(500)) {
            Ok(()) => true,
            Err(SendTimeoutError::Timeout(_)) => {
                debug!("unavailable notice not delivered: channel stayed full");
                false
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                debug!("unavailable notice not delivered: render loop is gone");
                false
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// DetectorHandle
// ════════════════════════════════════════════════════════════════════════════

/// Owns the detector thread.  Dropping the handle stops and joins it.
pub struct DetectorHandle {
    rx:     Receiver<DetectorEvent>,
    stop:   Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
    name:   &'static str,
}

impl DetectorHandle {
    /// Everything published since the last call, oldest first.
    pub fn drain(&self) -> Vec<DetectorEvent> {
        self.rx.try_iter().collect()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Raise the stop flag and wait for the thread to exit.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(t) = self.thread.take() {
            if t.join().is_err() {
                warn!("detector thread '{}' panicked", self.name);
            } else {
                debug!("detector '{}' stopped", self.name);
            }
        }
    }
}

impl Drop for DetectorHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Spawn a detector on its own thread.
pub fn spawn_detector<D: HandDetector>(detector: D) -> Result<DetectorHandle> {
    let (tx, rx) = bounded(CHANNEL_DEPTH);
    let stop = Arc::new(AtomicBool::new(false));
    let name = detector.name();
    let sink = FrameSink { tx, stop: Arc::clone(&stop) };

    let thread = thread::Builder::new()
        .name(format!("detector-{}", name))
        .spawn(move || Box::new(detector).run(sink))
        .map_err(LuminaError::Io)?;

    debug!("detector '{}' started", name);
    Ok(DetectorHandle { rx, stop, thread: Some(thread), name })
}

// ════════════════════════════════════════════════════════════════════════════
// SimHandSource: keyboard/mouse simulation (always available)
// ════════════════════════════════════════════════════════════════════════════

/// Raw input from the visualizer window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SimInput {
    /// Hold up a pose, or `None` to take the hand out of view.
    Pose(Option<SyntheticPose>),
    /// Pointer position in window coordinates, each axis in `[0, 1]`.
    Pointer { x: f32, y: f32 },
}

/// Synthesises a hand frame at a fixed rate from the latest [`SimInput`].
///
/// The pointer is where the hand *appears* on screen, so the landmark x is
/// mirrored back into selfie-image space before laying out the pose.
pub struct SimHandSource {
    pub rx:     Receiver<SimInput>,
    pub period: Duration,
}

impl SimHandSource {
    pub fn new(rx: Receiver<SimInput>) -> Self {
        SimHandSource { rx, period: Duration::from_millis(33) }
    }
}

impl HandDetector for SimHandSource {
    fn name(&self) -> &'static str {
        "simulation"
    }

    fn run(self: Box<Self>, out: FrameSink) {
        let ticker = crossbeam_channel::tick(self.period);
        let mut pose: Option<SyntheticPose> = None;
        let (mut px, mut py) = (0.5f32, 0.5f32);

        while !out.stopped() {
            crossbeam_channel::select! {
                recv(self.rx) -> msg => match msg {
                    Ok(SimInput::Pose(p)) => pose = p,
                    Ok(SimInput::Pointer { x, y }) => {
                        px = x.clamp(0.0, 1.0);
                        py = y.clamp(0.0, 1.0);
                    }
                    // window closed
                    Err(_) => return,
                },
                recv(ticker) -> _ => {
                    let event = match pose {
                        Some(p) => DetectorEvent::Hand(pose_landmarks(p, 1.0 - px, py)),
                        None => DetectorEvent::NoHand,
                    };
                    if !out.publish(event) {
                        return;
                    }
                }
            }
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// LeapHandSource: real hardware (feature = "leap")
// ════════════════════════════════════════════════════════════════════════════

/// Hand source backed by a LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
///
/// Each digit's four bone joints map onto the camera-style layout
/// (MCP, PIP, DIP, TIP; CMC/MCP/IP/TIP for the thumb), the index
/// metacarpal's base stands in for the wrist, and millimetres over the
/// device are normalized into a mirrored image frame.
#[cfg(feature = "leap")]
pub struct LeapHandSource;

#[cfg(feature = "leap")]
impl HandDetector for LeapHandSource {
    fn name(&self) -> &'static str {
        "leap"
    }

    fn run(self: Box<Self>, out: FrameSink) {
        use leaprs::*;

        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c) => c,
            Err(e) => {
                out.unavailable(format!("cannot create LeapC connection: {:?}", e));
                return;
            }
        };
        if let Err(e) = connection.open() {
            out.unavailable(format!("cannot open LeapMotion device: {:?}", e));
            return;
        }

        while !out.stopped() {
            let msg = match connection.poll(100) {
                Ok(m) => m,
                Err(_) => continue,
            };
            if let Event::Tracking(frame) = msg.event() {
                let event = match frame.hands().next() {
                    Some(hand) => leap_landmarks(&hand)
                        .map(DetectorEvent::Hand)
                        .unwrap_or(DetectorEvent::NoHand),
                    None => DetectorEvent::NoHand,
                };
                if !out.publish(event) {
                    return;
                }
            }
        }
        // `connection` drops here and closes the device.
    }
}

#[cfg(feature = "leap")]
fn leap_landmarks(hand: &leaprs::HandRef) -> Option<Vec<Landmark>> {
    // Interaction box over the device, in mm.
    const X_HALF: f32 = 200.0;
    const Y_MIN:  f32 = 100.0;
    const Y_SPAN: f32 = 300.0;

    let to_image = |x: f32, y: f32| {
        let u = (x + X_HALF) / (2.0 * X_HALF);
        let v = 1.0 - (y - Y_MIN) / Y_SPAN;
        // mirrored: the app flips x back when reading the palm anchor
        Landmark::new((1.0 - u).clamp(0.0, 1.0), v.clamp(0.0, 1.0))
    };

    let digits: Vec<_> = hand.digits().collect();
    if digits.len() < 5 {
        return None;
    }

    let wrist = digits[1].metacarpal().prev_joint();
    let mut out = Vec::with_capacity(noel_gesture::JOINT_COUNT);
    out.push(to_image(wrist.x, wrist.y));
    for d in &digits {
        for j in [
            d.proximal().prev_joint(),
            d.intermediate().prev_joint(),
            d.distal().prev_joint(),
            d.distal().next_joint(),
        ] {
            out.push(to_image(j.x, j.y));
        }
    }
    Some(out)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    struct Broken;

    impl HandDetector for Broken {
        fn name(&self) -> &'static str { "broken" }
        fn run(self: Box<Self>, out: FrameSink) {
            out.unavailable("no camera");
        }
    }

    /// Floods the channel until told to stop.
    struct Flood;

    impl HandDetector for Flood {
        fn name(&self) -> &'static str { "flood" }
        fn run(self: Box<Self>, out: FrameSink) {
            while !out.stopped() {
                if !out.publish(DetectorEvent::NoHand) {
                    return;
                }
                thread::sleep(Duration::from_millis(1));
            }
        }
    }

    fn wait_for<F: Fn(&[DetectorEvent]) -> bool>(h: &DetectorHandle, f: F) -> Vec<DetectorEvent> {
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut seen = Vec::new();
        while Instant::now() < deadline {
            seen.extend(h.drain());
            if f(&seen) {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        seen
    }

    #[test]
    fn unavailable_is_reported() {
        let h = spawn_detector(Broken).unwrap();
        let seen = wait_for(&h, |s| !s.is_empty());
        assert_eq!(seen, vec![DetectorEvent::Unavailable("no camera".into())]);
    }

    fn sink(depth: usize) -> (FrameSink, Receiver<DetectorEvent>) {
        let (tx, rx) = bounded(depth);
        (FrameSink { tx, stop: Arc::new(AtomicBool::new(false)) }, rx)
    }

    #[test]
    fn unavailable_reports_delivery() {
        let (out, rx) = sink(1);
        assert!(out.unavailable("denied"));
        assert_eq!(rx.try_recv(), Ok(DetectorEvent::Unavailable("denied".into())));

        // full channel times out
        assert!(out.publish(DetectorEvent::NoHand));
        assert!(!out.unavailable("denied"));

        drop(rx);
        assert!(!out.unavailable("denied"));
    }

    #[test]
    fn channel_is_bounded() {
        let h = spawn_detector(Flood).unwrap();
        thread::sleep(Duration::from_millis(60));
        assert!(h.drain().len() <= CHANNEL_DEPTH);
    }

    #[test]
    fn drop_joins_thread() {
        let mut h = spawn_detector(Flood).unwrap();
        assert!(h.is_running());
        h.stop();
        assert!(!h.is_running());
    }

    #[test]
    fn sim_source_follows_pose_and_pointer() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut src = SimHandSource::new(rx);
        src.period = Duration::from_millis(2);
        let h = spawn_detector(src).unwrap();

        let seen = wait_for(&h, |s| s.contains(&DetectorEvent::NoHand));
        assert!(seen.contains(&DetectorEvent::NoHand));

        tx.send(SimInput::Pointer { x: 0.3, y: 0.6 }).unwrap();
        tx.send(SimInput::Pose(Some(SyntheticPose::Fist))).unwrap();
        let seen = wait_for(&h, |s| s.iter().any(|e| matches!(e, DetectorEvent::Hand(_))));
        let hand = seen.iter().find_map(|e| match e {
            DetectorEvent::Hand(l) => Some(l.clone()),
            _ => None,
        });
        let hand = hand.expect("no hand frame");
        assert_eq!(hand.len(), noel_gesture::JOINT_COUNT);
        // anchor mirrored into image space
        let anchor = hand[noel_gesture::landmarks::PALM_ANCHOR];
        assert!((anchor.x - 0.7).abs() < 1e-5);
        assert!((anchor.y - 0.6).abs() < 1e-5);
    }

    #[test]
    fn sim_source_exits_when_window_goes() {
        let (tx, rx) = crossbeam_channel::unbounded::<SimInput>();
        let h = spawn_detector(SimHandSource::new(rx)).unwrap();
        drop(tx);
        let deadline = Instant::now() + Duration::from_secs(2);
        while h.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(!h.is_running());
    }
}
