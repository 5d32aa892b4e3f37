//! # lumina_noel
//!
//! Hand-gesture controller for a particle Christmas tree.  Tens of thousands
//! of instances (foliage, ornaments, lights, a topper and photo frames) morph
//! between an assembled cone and a scattered cloud; a photo can be pulled
//! forward for a close look.
//!
//! ## Gesture → Action mapping
//!
//! | Gesture | Mode before | Action |
//! |---|---|---|
//! | Fist | any | Assemble the tree (releases a focused photo) |
//! | Open palm | Assembled / Focused | Scatter the cloud |
//! | Open palm, moving | Scattered | Camera drifts with the hand |
//! | Pinch | any | Shown in the HUD, no mode change |
//! | Click a photo | any | Focus it; click it again to release |
//!
//! A gesture has to be seen on six consecutive detector ticks before it
//! counts.  Losing the hand clears the gesture at once but never changes the
//! mode.
//!
//! ## Feature flags
//!
//! * (default): **Simulation mode**: keyboard poses plus the mouse as the
//!   hand position.
//! * `leap`: **Hardware mode**: reads a real LeapMotion controller via LeapC.
//!
//! ### Simulation keyboard shortcuts
//!
//! | Key | Action |
//! |---|---|
//! | `O` | Open palm |
//! | `F` | Fist |
//! | `P` | Pinch |
//! | `R` | Relaxed (no gesture) |
//! | `H` | Hide the hand |
//! | `N` | Add a photo frame |
//! | `Delete` | Remove the focused (or newest) photo frame |
//! | `Escape` | Release the focused photo |
//! | `D` | Toggle the hand debug overlay |
//! | `Q` | Quit |

pub mod error;
pub mod config;
pub mod mode;
pub mod camera;
pub mod detector;
pub mod visualizer;
pub mod app;

pub use error::{LuminaError, Result};
pub use config::AppConfig;
pub use mode::{DisplayMode, ModeMachine};
pub use camera::{CameraRig, Projector};
pub use app::{run, run_headless, AppState, HeadlessReport};
