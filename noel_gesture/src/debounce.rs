//! Temporal debouncing of raw classifications.
//!
//! A raw gesture must repeat on more than `threshold` consecutive detector
//! ticks before it becomes the stable gesture.  Output is edge-triggered:
//! [`GestureDebouncer::push`] reports a gesture only on the tick the stable
//! value changes, so a held fist does not re-fire every frame.

use tracing::debug;

use crate::classifier::Gesture;

/// Consecutive identical ticks that must be *exceeded* before a gesture is
/// trusted.
pub const DEFAULT_CONFIDENCE_FRAMES: u32 = 5;

#[derive(Clone, Debug)]
pub struct GestureDebouncer {
    threshold:         u32,
    last_raw:          Gesture,
    /// Length of the current run of `last_raw`, counting the tick that
    /// started it.
    consecutive_count: u32,
    stable:            Gesture,
}

impl GestureDebouncer {
    pub fn new(threshold: u32) -> Self {
        GestureDebouncer {
            threshold,
            last_raw:          Gesture::None,
            consecutive_count: 0,
            stable:            Gesture::None,
        }
    }

    /// Feed one raw classification.  Returns `Some(gesture)` exactly when the
    /// stable gesture changes on this tick.
    pub fn push(&mut self, raw: Gesture) -> Option<Gesture> {
        if raw == self.last_raw {
            self.consecutive_count = self.consecutive_count.saturating_add(1);
        } else {
            self.last_raw = raw;
            self.consecutive_count = 1;
        }

        if self.consecutive_count > self.threshold && raw != self.stable {
            debug!(
                "stable gesture {} -> {} after {} ticks",
                self.stable.as_str(), raw.as_str(), self.consecutive_count
            );
            self.stable = raw;
            return Some(raw);
        }
        None
    }

    /// Override the stable gesture without touching the current run (hand
    /// lost, detector gone).  Returns `true` if the stable value changed.
    pub fn force_stable(&mut self, gesture: Gesture) -> bool {
        let changed = self.stable != gesture;
        self.stable = gesture;
        changed
    }

    pub fn stable(&self) -> Gesture { self.stable }
    pub fn last_raw(&self) -> Gesture { self.last_raw }
    pub fn consecutive_count(&self) -> u32 { self.consecutive_count }
    pub fn threshold(&self) -> u32 { self.threshold }
}

impl Default for GestureDebouncer {
    fn default() -> Self {
        GestureDebouncer::new(DEFAULT_CONFIDENCE_FRAMES)
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
