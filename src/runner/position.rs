//! Needle position detector loop
//!
//! Grabs frames, reports every position where the needle matches and, when
//! the live feed is on, shows the frame with each match outlined.

use image::{DynamicImage, Rgb};

use super::{run_loop, Iteration, PilotHandle, StopReason};
use crate::config::SurfConfig;
use crate::vision::{
    mark_rectangles, show_frame, CaptureSource, FrameSink, Match, NullSink, TemplateMatcher,
};
use crate::Result;

/// Matches found in one frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionReport {
    pub iteration: u64,
    pub matches: Vec<Match>,
}

/// Callback for per-frame detection reports
pub type DetectionCallback = Box<dyn FnMut(&DetectionReport)>;

/// Alternate entry point: find the needle in every frame
pub struct PositionDetector<'a> {
    config: &'a SurfConfig,
    matcher: TemplateMatcher,
    capture: Box<dyn CaptureSource>,
    sink: Box<dyn FrameSink>,
    handle: PilotHandle,
    callback: Option<DetectionCallback>,
    iteration: u64,
}

impl<'a> PositionDetector<'a> {
    pub fn new(
        config: &'a SurfConfig,
        matcher: TemplateMatcher,
        capture: Box<dyn CaptureSource>,
    ) -> Result<Self> {
        config.validate()?;
        log::info!(
            "Position detector using {} (threshold {})",
            capture.describe(),
            matcher.threshold()
        );
        Ok(Self {
            config,
            matcher,
            capture,
            sink: Box::new(NullSink),
            handle: PilotHandle::new(),
            callback: None,
            iteration: 0,
        })
    }

    /// Load the needle named in `config.matching` and build a detector
    pub fn from_config(config: &'a SurfConfig, capture: Box<dyn CaptureSource>) -> Result<Self> {
        let matcher = TemplateMatcher::load(&config.matching.needle_path, config.matching.threshold)?
            .with_method(config.matching.method);
        Self::new(config, matcher, capture)
    }

    pub fn with_sink(mut self, sink: Box<dyn FrameSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn on_detection<F>(&mut self, callback: F)
    where
        F: FnMut(&DetectionReport) + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    pub fn handle(&self) -> PilotHandle {
        self.handle.clone()
    }

    pub fn matcher(&self) -> &TemplateMatcher {
        &self.matcher
    }

    /// Grab one frame and match the needle against it
    pub fn step(&mut self) -> Result<DetectionReport> {
        self.step_with_size().map(|(report, _)| report)
    }

    fn step_with_size(&mut self) -> Result<(DetectionReport, (u32, u32))> {
        self.iteration += 1;

        let frame = self.capture.grab()?;
        let frame_size = frame.dimensions();
        let matches = self.matcher.find_matches(&frame)?;
        log::debug!("Frame {}: {} matches {:?}", self.iteration, matches.len(), matches);

        if let Some(window) = self.config.feed.window() {
            let shown = if matches.is_empty() {
                frame
            } else {
                let needle = self.matcher.needle();
                mark_rectangles(
                    &frame,
                    needle.width(),
                    needle.height(),
                    &matches,
                    Rgb(self.config.feed.mark_color),
                )
            };
            show_frame(
                self.sink.as_mut(),
                Some(window),
                &DynamicImage::ImageRgb8(shown),
                (self.config.feed.width, self.config.feed.height),
            )?;
        }

        let report = DetectionReport {
            iteration: self.iteration,
            matches,
        };
        if let Some(callback) = self.callback.as_mut() {
            callback(&report);
        }
        Ok((report, frame_size))
    }

    /// Loop until stopped, the source runs dry, or an error occurs
    pub fn run(&mut self) -> Result<StopReason> {
        let stop_key = self.config.feed.stop_key;
        let handle = self.handle.clone();
        run_loop(self, &handle, stop_key)
    }
}

impl Iteration for PositionDetector<'_> {
    fn label(&self) -> &'static str {
        "Position detector"
    }

    fn iterate(&mut self) -> Result<(u32, u32)> {
        self.step_with_size().map(|(_, size)| size)
    }

    fn poll_key(&mut self) -> Option<char> {
        self.sink.poll_key()
    }
}
