//! Top-level loops
//!
//! Two entry points share one loop skeleton:
//! - [`SurfPilot`] - lane-keeping control loop (capture, mask, reduce, PID, key press)
//! - [`PositionDetector`] - capture, match needle, mark and show
//!
//! Both run synchronously on the calling thread. Another thread can end a
//! run through a cloned [`PilotHandle`]; the request is noticed at the end
//! of the current iteration.

mod position;
mod surf;

pub use position::{DetectionReport, PositionDetector};
pub use surf::{ControlSample, SurfPilot};

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::{Result, SurfError};

/// Interval between periodic statistics log lines
const STATS_INTERVAL: Duration = Duration::from_secs(5);

/// State of a loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PilotState {
    /// Not started or finished normally
    Stopped,
    /// Processing frames
    Running,
    /// Ended by an error
    Error(String),
}

/// Why a run ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// [`PilotHandle::stop`] was called
    StopRequested,
    /// The display reported the stop key
    StopKey(char),
    /// A replay source ran out of frames
    SourceExhausted,
}

/// Shared stop flag and state of a running loop
#[derive(Debug, Clone)]
pub struct PilotHandle {
    stop_requested: Arc<AtomicBool>,
    state: Arc<Mutex<PilotState>>,
}

impl PilotHandle {
    pub fn new() -> Self {
        Self {
            stop_requested: Arc::new(AtomicBool::new(false)),
            state: Arc::new(Mutex::new(PilotState::Stopped)),
        }
    }

    /// Ask the loop to finish after the current iteration
    pub fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> PilotState {
        self.state.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        *self.state.lock() == PilotState::Running
    }

    fn set_state(&self, state: PilotState) {
        *self.state.lock() = state;
    }
}

impl Default for PilotHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Blocks for the duration of a key press
pub trait Pacer {
    fn hold(&mut self, duration: Duration);
}

/// Sleeps the current thread
#[derive(Debug, Default)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn hold(&mut self, duration: Duration) {
        if !duration.is_zero() {
            std::thread::sleep(duration);
        }
    }
}

/// One loop driver, as seen by [`run_loop`]
trait Iteration {
    fn label(&self) -> &'static str;

    /// Run one full iteration; returns the frame size for statistics
    fn iterate(&mut self) -> Result<(u32, u32)>;

    /// Key reported by the display since the last iteration
    fn poll_key(&mut self) -> Option<char>;
}

/// Repeat `driver` until stopped, exhausted or failed
fn run_loop(
    driver: &mut dyn Iteration,
    handle: &PilotHandle,
    stop_key: char,
) -> Result<StopReason> {
    let label = driver.label();
    handle.set_state(PilotState::Running);
    log::info!("{} started", label);

    let mut frame_count: u64 = 0;
    let mut last_log = Instant::now();

    let reason = loop {
        let (width, height) = match driver.iterate() {
            Ok(size) => size,
            Err(SurfError::SourceExhausted) => {
                log::info!("{}: capture source exhausted", label);
                break StopReason::SourceExhausted;
            }
            Err(e) => {
                log::error!("{} failed: {}", label, e);
                handle.stop_requested.store(false, Ordering::SeqCst);
                handle.set_state(PilotState::Error(e.to_string()));
                return Err(e);
            }
        };
        frame_count += 1;

        if last_log.elapsed() >= STATS_INTERVAL {
            log::info!(
                "{}: {} frames processed, {}x{} resolution",
                label,
                frame_count,
                width,
                height
            );
            last_log = Instant::now();
        }

        if driver.poll_key() == Some(stop_key) {
            break StopReason::StopKey(stop_key);
        }
        if handle.is_stop_requested() {
            break StopReason::StopRequested;
        }
    };

    handle.stop_requested.store(false, Ordering::SeqCst);
    handle.set_state(PilotState::Stopped);
    log::info!("{} stopped after {} frames ({:?})", label, frame_count, reason);
    Ok(reason)
}
