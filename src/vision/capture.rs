//! Frame capture sources
//!
//! The autopilot pulls one frame per iteration through [`CaptureSource`].
//! Platform screen grabbers live outside this crate and only need to
//! implement the trait; the sources here replay images from disk.

use image::RgbImage;
use std::path::{Path, PathBuf};

use crate::{Result, SurfError};

/// One captured frame, RGB channel order
pub type Frame = RgbImage;

/// Source of frames for the control loops
pub trait CaptureSource {
    /// Block until the latest frame is available and return it
    fn grab(&mut self) -> Result<Frame>;

    /// Short description for log lines
    fn describe(&self) -> String {
        "capture".to_string()
    }
}

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Replays a directory of images in file name order
pub struct FrameSequenceCapture {
    frames: Vec<PathBuf>,
    next: usize,
    loop_playback: bool,
}

impl FrameSequenceCapture {
    /// Collect every image in `dir`; fails if there are none
    pub fn from_directory(dir: impl AsRef<Path>, loop_playback: bool) -> Result<Self> {
        let dir = dir.as_ref();
        let mut frames = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_frame = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if is_frame {
                frames.push(path);
            }
        }
        frames.sort();

        if frames.is_empty() {
            return Err(SurfError::Capture(format!(
                "no frames found in {}",
                dir.display()
            )));
        }

        log::info!("Loaded {} frames from {}", frames.len(), dir.display());
        Ok(Self::from_paths(frames, loop_playback))
    }

    /// Replay an explicit list of image files
    pub fn from_paths(frames: Vec<PathBuf>, loop_playback: bool) -> Self {
        Self {
            frames,
            next: 0,
            loop_playback,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl CaptureSource for FrameSequenceCapture {
    fn grab(&mut self) -> Result<Frame> {
        if self.next >= self.frames.len() {
            if !self.loop_playback || self.frames.is_empty() {
                return Err(SurfError::SourceExhausted);
            }
            self.next = 0;
        }
        let path = &self.frames[self.next];
        self.next += 1;
        let frame = image::open(path)?.to_rgb8();
        Ok(frame)
    }

    fn describe(&self) -> String {
        format!("frame sequence ({} frames)", self.frames.len())
    }
}

/// Returns the same frame forever, or a fixed number of times
pub struct StaticCapture {
    frame: Frame,
    remaining: Option<usize>,
}

impl StaticCapture {
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            remaining: None,
        }
    }

    /// Stop with [`SurfError::SourceExhausted`] after `count` frames
    pub fn with_limit(mut self, count: usize) -> Self {
        self.remaining = Some(count);
        self
    }
}

impl CaptureSource for StaticCapture {
    fn grab(&mut self) -> Result<Frame> {
        if let Some(remaining) = self.remaining.as_mut() {
            if *remaining == 0 {
                return Err(SurfError::SourceExhausted);
            }
            *remaining -= 1;
        }
        Ok(self.frame.clone())
    }

    fn describe(&self) -> String {
        format!("static {}x{}", self.frame.width(), self.frame.height())
    }
}
