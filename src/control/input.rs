//! Simulated keyboard
//!
//! The loops only ever press and release keys. Presses are fire-and-forget;
//! the driver guarantees each press is released in the same iteration.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Keys the autopilot can send
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Key {
    Left,
    Right,
    Up,
    Down,
    Space,
    Char(char),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Left => write!(f, "left"),
            Key::Right => write!(f, "right"),
            Key::Up => write!(f, "up"),
            Key::Down => write!(f, "down"),
            Key::Space => write!(f, "space"),
            Key::Char(c) => write!(f, "'{}'", c),
        }
    }
}

/// Device that accepts key presses and releases
pub trait InputDevice {
    fn press(&mut self, key: Key);
    fn release(&mut self, key: Key);
}

/// Whether a key went down or up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Press,
    Release,
}

/// One recorded key action
#[derive(Debug, Clone)]
pub struct KeyEvent {
    pub key: Key,
    pub action: KeyAction,
    pub timestamp: Instant,
}

/// Input device that logs and records every action instead of sending it
///
/// Clones share the same event log, so a caller can keep one handle while
/// the driver owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingKeyboard {
    events: Arc<Mutex<Vec<KeyEvent>>>,
}

impl RecordingKeyboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every action so far
    pub fn events(&self) -> Vec<KeyEvent> {
        self.events.lock().clone()
    }

    /// Recorded (key, action) pairs without timestamps
    pub fn actions(&self) -> Vec<(Key, KeyAction)> {
        self.events.lock().iter().map(|e| (e.key, e.action)).collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    fn record(&self, key: Key, action: KeyAction) {
        self.events.lock().push(KeyEvent {
            key,
            action,
            timestamp: Instant::now(),
        });
    }
}

impl InputDevice for RecordingKeyboard {
    fn press(&mut self, key: Key) {
        log::debug!("Key down: {}", key);
        self.record(key, KeyAction::Press);
    }

    fn release(&mut self, key: Key) {
        log::debug!("Key up: {}", key);
        self.record(key, KeyAction::Release);
    }
}
