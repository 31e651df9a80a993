//! Surf Autopilot
//!
//! Screen-vision autopilot for the Edge surf game. Frames come from a
//! [`vision::CaptureSource`], key presses go to a [`control::InputDevice`].
//!
//! Two loops are provided:
//! - [`SurfPilot`] - masks the lane colors, compares the weighted signal of
//!   the left and right lanes and steers with a PID-sized key press
//! - [`PositionDetector`] - finds every position of a needle image and
//!   outlines the matches on the live feed
//!
//! # Example
//!
//! ```ignore
//! use surf_autopilot::{RecordingKeyboard, SurfConfig, SurfPilot};
//! use surf_autopilot::vision::FrameSequenceCapture;
//!
//! let config = SurfConfig::load("surf.toml")?;
//! let capture = FrameSequenceCapture::from_directory("recording", false)?;
//! let mut pilot = SurfPilot::new(&config, Box::new(capture), Box::new(RecordingKeyboard::new()))?;
//! let reason = pilot.run()?;
//! ```

pub mod config;
pub mod control;
mod error;
pub mod runner;
pub mod vision;

// Re-export commonly used types
pub use config::{
    ColorInterval, DriveConfig, FeedConfig, LaneGeometry, MatchConfig, PidConfig, Region,
    SurfConfig,
};
pub use control::{Direction, InputDevice, Key, PidController, RecordingKeyboard};
pub use error::{Result, SurfError};
pub use runner::{
    ControlSample, DetectionReport, PilotHandle, PilotState, PositionDetector, StopReason,
    SurfPilot,
};
pub use vision::{Match, MatchMethod, TemplateMatcher};
