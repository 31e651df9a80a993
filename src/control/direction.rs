//! Steering decisions derived from the lane delta

use serde::{Deserialize, Serialize};
use std::fmt;

use super::input::Key;

/// Lateral correction chosen for one iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Left,
    Right,
    /// No lateral correction
    Neutral,
}

impl Direction {
    /// Steer left below `-threshold`, right above `threshold`
    ///
    /// Both comparisons are strict, so a delta of exactly `±threshold` is
    /// neutral.
    pub fn from_delta(delta: i64, threshold: i64) -> Self {
        if delta < -threshold {
            Direction::Left
        } else if delta > threshold {
            Direction::Right
        } else {
            Direction::Neutral
        }
    }

    /// Key bound to this direction; neutral uses `neutral_key` if any
    pub fn key(self, neutral_key: Option<Key>) -> Option<Key> {
        match self {
            Direction::Left => Some(Key::Left),
            Direction::Right => Some(Key::Right),
            Direction::Neutral => neutral_key,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Left => write!(f, "left"),
            Direction::Right => write!(f, "right"),
            Direction::Neutral => write!(f, "neutral"),
        }
    }
}

/// Whether the controller should forget its history
///
/// True when the control output and the measured delta are both non-zero
/// and point opposite ways.
pub fn should_reset(delta: i64, pid_output: f64) -> bool {
    (pid_output < 0.0 && delta > 0) || (pid_output > 0.0 && delta < 0)
}

/// Hold time for a key press: `|pid_output| / divisor` seconds
pub fn press_duration(pid_output: f64, divisor: f64) -> std::time::Duration {
    let seconds = pid_output.abs() / divisor;
    if seconds.is_finite() && seconds > 0.0 {
        std::time::Duration::from_secs_f64(seconds)
    } else {
        std::time::Duration::ZERO
    }
}
