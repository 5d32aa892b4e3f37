//! Error type for the application crate.
//!
//! None of these is fatal to a running session: detector loss degrades to
//! pointer-only interaction, malformed frames classify as no gesture, and a
//! bad selection is logged and dropped.  Only startup (config, window) can
//! fail the process.

use std::fmt;

use noel_formation::InstanceId;
use noel_gesture::FrameError;

#[derive(Debug)]
pub enum LuminaError {
    /// Device missing, permission denied, or the driver went away.
    DetectorUnavailable(String),
    /// Wrong joint count or coordinates outside `[0, 1]`.
    MalformedFrame(FrameError),
    /// A selection named an instance that does not exist or cannot focus.
    InvalidTransitionRequest(InstanceId),
    /// Configuration rejected by validation.
    Config(String),
    Io(std::io::Error),
    Json(serde_json::Error),
    /// The visualizer window could not be created.
    Window(String),
}

impl std::error::Error for LuminaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LuminaError::MalformedFrame(e) => Some(e),
            LuminaError::Io(e) => Some(e),
            LuminaError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for LuminaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LuminaError::DetectorUnavailable(why) => write!(f, "hand detector unavailable: {}", why),
            LuminaError::MalformedFrame(e) => write!(f, "malformed hand frame: {}", e),
            LuminaError::InvalidTransitionRequest(id) => {
                write!(f, "cannot focus instance {}: no such focusable item", id)
            }
            LuminaError::Config(msg) => write!(f, "configuration error: {}", msg),
            LuminaError::Io(e) => write!(f, "I/O error: {}", e),
            LuminaError::Json(e) => write!(f, "JSON error: {}", e),
            LuminaError::Window(msg) => write!(f, "window error: {}", msg),
        }
    }
}

impl From<FrameError> for LuminaError {
    fn from(err: FrameError) -> Self {
        LuminaError::MalformedFrame(err)
    }
}

impl From<std::io::Error> for LuminaError {
    fn from(err: std::io::Error) -> Self {
        LuminaError::Io(err)
    }
}

impl From<serde_json::Error> for LuminaError {
    fn from(err: serde_json::Error) -> Self {
        LuminaError::Json(err)
    }
}

impl From<minifb::Error> for LuminaError {
    fn from(err: minifb::Error) -> Self {
        LuminaError::Window(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LuminaError>;
