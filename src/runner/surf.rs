//! Lane-keeping control loop
//!
//! Each iteration: grab a frame, mask out the lane color, crop the windows
//! left and right of the character, reduce each to a row-weighted sum,
//! feed `left - right` to the PID controller and turn the output into a
//! timed key press. The PID memory is cleared whenever its output and the
//! measured delta disagree in sign.

use image::DynamicImage;
use std::time::{Duration, Instant};

use super::{run_loop, Iteration, Pacer, PilotHandle, StopReason, ThreadPacer};
use crate::config::{Region, SurfConfig};
use crate::control::{press_duration, should_reset, Direction, InputDevice, PidController};
use crate::vision::{
    hconcat, lane_crops, mask_out_range, show_frame, weighted_sum, CaptureSource, FrameSink,
    NullSink,
};
use crate::Result;

/// What one control iteration measured and did
#[derive(Debug, Clone, PartialEq)]
pub struct ControlSample {
    pub iteration: u64,
    pub left_sum: i64,
    pub right_sum: i64,
    /// `left_sum - right_sum`
    pub delta: i64,
    pub pid_output: f64,
    pub direction: Direction,
    /// How long the key was held; zero when nothing was pressed
    pub press: Duration,
    /// Whether the controller was reset at the end of the iteration
    pub pid_reset: bool,
}

/// Callback for per-iteration samples
pub type SampleCallback = Box<dyn FnMut(&ControlSample)>;

/// The lane-keeping driver
pub struct SurfPilot<'a> {
    config: &'a SurfConfig,
    left: Region,
    right: Region,
    capture: Box<dyn CaptureSource>,
    input: Box<dyn InputDevice>,
    sink: Box<dyn FrameSink>,
    pacer: Box<dyn Pacer>,
    pid: PidController,
    handle: PilotHandle,
    callback: Option<SampleCallback>,
    iteration: u64,
    last_step: Instant,
}

impl<'a> SurfPilot<'a> {
    /// Validate `config` and build a pilot with no display
    pub fn new(
        config: &'a SurfConfig,
        capture: Box<dyn CaptureSource>,
        input: Box<dyn InputDevice>,
    ) -> Result<Self> {
        config.validate()?;
        let left = config.lanes.left_region()?;
        let right = config.lanes.right_region()?;
        log::debug!("Lane windows: left {}, right {}", left, right);
        let pid = PidController::from_config(&config.pid)?;

        Ok(Self {
            config,
            left,
            right,
            capture,
            input,
            sink: Box::new(NullSink),
            pacer: Box::new(ThreadPacer),
            pid,
            handle: PilotHandle::new(),
            callback: None,
            iteration: 0,
            last_step: Instant::now(),
        })
    }

    /// Send the side-by-side lane crops to `sink` when the feed is on
    pub fn with_sink(mut self, sink: Box<dyn FrameSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Replace how key presses are held
    pub fn with_pacer(mut self, pacer: Box<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    /// Call `callback` with every iteration's sample
    pub fn on_sample<F>(&mut self, callback: F)
    where
        F: FnMut(&ControlSample) + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    /// Handle for stopping the run and reading its state
    pub fn handle(&self) -> PilotHandle {
        self.handle.clone()
    }

    pub fn pid(&self) -> &PidController {
        &self.pid
    }

    pub fn lane_regions(&self) -> (Region, Region) {
        (self.left, self.right)
    }

    /// Seconds since the previous controller step, or the fixed sample time
    fn next_dt(&mut self) -> f64 {
        let now = Instant::now();
        let measured = now.duration_since(self.last_step).as_secs_f64();
        self.last_step = now;
        self.config.pid.sample_time.unwrap_or(measured)
    }

    /// Run one capture-to-action iteration
    pub fn step(&mut self) -> Result<ControlSample> {
        self.step_with_size().map(|(sample, _)| sample)
    }

    fn step_with_size(&mut self) -> Result<(ControlSample, (u32, u32))> {
        self.iteration += 1;

        let frame = self.capture.grab()?;
        let frame_size = frame.dimensions();

        let mask = mask_out_range(&frame, &self.config.color);
        drop(frame);
        let (left_crop, right_crop) = lane_crops(&mask, &self.left, &self.right)?;

        let left_sum = weighted_sum(&left_crop);
        let right_sum = weighted_sum(&right_crop);
        let delta = left_sum - right_sum;

        let dt = self.next_dt();
        let pid_output = self.pid.update(delta as f64, dt);
        let direction = Direction::from_delta(delta, self.config.drive.turn_threshold);

        let mut press = Duration::ZERO;
        if let Some(key) = direction.key(self.config.drive.neutral_key) {
            press = press_duration(pid_output, self.config.drive.press_divisor);
            self.input.press(key);
            self.pacer.hold(press);
            self.input.release(key);
        }

        let pid_reset = should_reset(delta, pid_output);
        if pid_reset {
            log::trace!("PID reset: output {:.3} opposes delta {}", pid_output, delta);
            self.pid.reset();
            self.last_step = Instant::now();
        }

        if let Some(window) = self.config.feed.window() {
            let joined = hconcat(&left_crop, &right_crop);
            let size = joined.dimensions();
            show_frame(
                self.sink.as_mut(),
                Some(window),
                &DynamicImage::ImageLuma8(joined),
                size,
            )?;
        }

        let sample = ControlSample {
            iteration: self.iteration,
            left_sum,
            right_sum,
            delta,
            pid_output,
            direction,
            press,
            pid_reset,
        };
        log::debug!(
            "Delta: {} PID: {:.3} -> {} for {:?}",
            sample.delta,
            sample.pid_output,
            sample.direction,
            sample.press
        );
        if let Some(callback) = self.callback.as_mut() {
            callback(&sample);
        }

        Ok((sample, frame_size))
    }

    /// Loop until stopped, the source runs dry, or an error occurs
    pub fn run(&mut self) -> Result<StopReason> {
        let stop_key = self.config.feed.stop_key;
        let handle = self.handle.clone();
        run_loop(self, &handle, stop_key)
    }
}

impl Iteration for SurfPilot<'_> {
    fn label(&self) -> &'static str {
        "Surf pilot"
    }

    fn iterate(&mut self) -> Result<(u32, u32)> {
        self.step_with_size().map(|(_, size)| size)
    }

    fn poll_key(&mut self) -> Option<char> {
        self.sink.poll_key()
    }
}
