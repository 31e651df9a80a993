//! Control side of the autopilot
//!
//! - `PidController` - turns the lane delta into a bounded correction
//! - `Direction` - which way to steer this iteration
//! - `InputDevice` - where the resulting key presses go

mod direction;
mod input;
mod pid;

pub use direction::{press_duration, should_reset, Direction};
pub use input::{InputDevice, Key, KeyAction, KeyEvent, RecordingKeyboard};
pub use pid::{PidController, PidGains};
