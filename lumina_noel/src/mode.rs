//! Display mode state machine.
//!
//! | From | Event | To |
//! |---|---|---|
//! | any | stable `Fist` | `Assembled` |
//! | `Assembled`, `Focused(_)` | stable `OpenPalm` | `Scattered` |
//! | `Scattered` | stable `OpenPalm` | unchanged |
//! | any | `select(id)` | `Focused(id)` |
//! | `Focused(id)` | `select(id)` again | `Scattered` |
//! | `Focused(_)` | `deselect` | `Scattered` |
//!
//! `Pinch` and `None` never move the machine; `Focused` is only reachable
//! through an explicit selection.

use tracing::info;

use noel_formation::{Formation, InstanceId};
use noel_gesture::Gesture;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    #[default]
    Assembled,
    Scattered,
    Focused(InstanceId),
}

impl DisplayMode {
    pub fn label(&self) -> &'static str {
        match self {
            DisplayMode::Assembled  => "ASSEMBLED",
            DisplayMode::Scattered  => "SCATTERED",
            DisplayMode::Focused(_) => "FOCUSED",
        }
    }

    pub fn formation(&self) -> Formation {
        match self {
            DisplayMode::Assembled   => Formation::Assembled,
            DisplayMode::Scattered   => Formation::Scattered,
            DisplayMode::Focused(id) => Formation::Focused(*id),
        }
    }

    pub fn focused(&self) -> Option<InstanceId> {
        match self {
            DisplayMode::Focused(id) => Some(*id),
            _ => None,
        }
    }
}

/// Sole writer of the display mode.
#[derive(Clone, Debug, Default)]
pub struct ModeMachine {
    mode: DisplayMode,
}

impl ModeMachine {
    pub fn new() -> Self {
        ModeMachine::default()
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Apply a stable gesture.  Returns `true` if the mode changed.
    pub fn on_gesture(&mut self, gesture: Gesture) -> bool {
        let next = match (gesture, self.mode) {
            (Gesture::Fist, _) => DisplayMode::Assembled,
            (Gesture::OpenPalm, DisplayMode::Assembled | DisplayMode::Focused(_)) => DisplayMode::Scattered,
            _ => self.mode,
        };
        self.set(next, gesture.as_str())
    }

    /// Pointer selection of an item that is known to exist.  Selecting the
    /// item that is already focused releases it.
    pub fn select(&mut self, id: InstanceId) -> bool {
        let next = if self.mode == DisplayMode::Focused(id) {
            DisplayMode::Scattered
        } else {
            DisplayMode::Focused(id)
        };
        self.set(next, "select")
    }

    pub fn deselect(&mut self) -> bool {
        if let DisplayMode::Focused(_) = self.mode {
            self.set(DisplayMode::Scattered, "deselect")
        } else {
            false
        }
    }

    fn set(&mut self, next: DisplayMode, cause: &str) -> bool {
        if next == self.mode {
            return false;
        }
        info!("mode {} -> {} ({})", self.mode.label(), next.label(), cause);
        self.mode = next;
        true
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    const PHOTO: InstanceId = InstanceId { layer: 6, slot: 0 };
    const OTHER: InstanceId = InstanceId { layer: 6, slot: 1 };

    fn focused() -> ModeMachine {
        let mut m = ModeMachine::new();
        m.select(PHOTO);
        m
    }

    #[test]
    fn starts_assembled() {
        assert_eq!(ModeMachine::new().mode(), DisplayMode::Assembled);
    }

    #[test]
    fn fist_assembles_from_every_state() {
        let mut m = ModeMachine::new();
        m.on_gesture(Gesture::OpenPalm);
        assert!(m.on_gesture(Gesture::Fist));
        assert_eq!(m.mode(), DisplayMode::Assembled);

        let mut m = focused();
        assert!(m.on_gesture(Gesture::Fist));
        assert_eq!(m.mode(), DisplayMode::Assembled);

        let mut m = ModeMachine::new();
        assert!(!m.on_gesture(Gesture::Fist));
        assert_eq!(m.mode(), DisplayMode::Assembled);
    }

    #[test]
    fn open_palm_scatters() {
        let mut m = ModeMachine::new();
        assert!(m.on_gesture(Gesture::OpenPalm));
        assert_eq!(m.mode(), DisplayMode::Scattered);
        // idempotent
        assert!(!m.on_gesture(Gesture::OpenPalm));
        assert_eq!(m.mode(), DisplayMode::Scattered);

        let mut m = focused();
        assert!(m.on_gesture(Gesture::OpenPalm));
        assert_eq!(m.mode(), DisplayMode::Scattered);
    }

    #[test]
    fn pinch_and_none_never_transition() {
        for start in [ModeMachine::new(), focused()] {
            let mut m = start.clone();
            let before = m.mode();
            assert!(!m.on_gesture(Gesture::Pinch));
            assert!(!m.on_gesture(Gesture::None));
            assert_eq!(m.mode(), before);
        }
    }

    #[test]
    fn gestures_alone_never_focus() {
        let mut m = ModeMachine::new();
        for g in [Gesture::OpenPalm, Gesture::Pinch, Gesture::None, Gesture::Fist, Gesture::OpenPalm] {
            m.on_gesture(g);
            assert!(m.mode().focused().is_none());
        }
    }

    #[test]
    fn reselect_same_item_releases_it() {
        let mut m = focused();
        assert_eq!(m.mode(), DisplayMode::Focused(PHOTO));
        assert!(m.select(PHOTO));
        assert_eq!(m.mode(), DisplayMode::Scattered);
    }

    #[test]
    fn select_other_item_switches_focus() {
        let mut m = focused();
        assert!(m.select(OTHER));
        assert_eq!(m.mode(), DisplayMode::Focused(OTHER));
    }

    #[test]
    fn deselect() {
        let mut m = focused();
        assert!(m.deselect());
        assert_eq!(m.mode(), DisplayMode::Scattered);
        assert!(!m.deselect());
        let mut m = ModeMachine::new();
        assert!(!m.deselect());
        assert_eq!(m.mode(), DisplayMode::Assembled);
    }

    #[test]
    fn formation_mirrors_mode() {
        assert_eq!(DisplayMode::Assembled.formation(), Formation::Assembled);
        assert_eq!(DisplayMode::Focused(PHOTO).formation(), Formation::Focused(PHOTO));
    }
}
