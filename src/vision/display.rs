//! Live feed output
//!
//! Purely observational: nothing shown here feeds back into control. A sink
//! may also report key presses, which is how the stop key reaches the loops.

use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use std::path::{Path, PathBuf};

use super::matcher::Match;
use crate::Result;

/// Consumer of debug frames
pub trait FrameSink {
    /// Show `frame` in the window called `window`
    fn show(&mut self, window: &str, frame: &DynamicImage) -> Result<()>;

    /// Key pressed since the last poll, if the sink observes a keyboard
    fn poll_key(&mut self) -> Option<char> {
        None
    }
}

/// Discards every frame
#[derive(Debug, Default)]
pub struct NullSink;

impl FrameSink for NullSink {
    fn show(&mut self, _window: &str, _frame: &DynamicImage) -> Result<()> {
        Ok(())
    }
}

/// Writes every shown frame to `<dir>/<window>-<index>.png`
pub struct ImageDumpSink {
    dir: PathBuf,
    index: u64,
}

impl ImageDumpSink {
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir, index: 0 })
    }

    pub fn frames_written(&self) -> u64 {
        self.index
    }
}

impl FrameSink for ImageDumpSink {
    fn show(&mut self, window: &str, frame: &DynamicImage) -> Result<()> {
        let name: String = window
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        let path = self.dir.join(format!("{}-{:06}.png", name, self.index));
        frame.save(&path)?;
        self.index += 1;
        log::trace!("Wrote feed frame {}", path.display());
        Ok(())
    }
}

/// Resize `frame` to `size` and hand it to the sink
///
/// A `None` window means the feed is off and nothing happens.
pub fn show_frame(
    sink: &mut dyn FrameSink,
    window: Option<&str>,
    frame: &DynamicImage,
    size: (u32, u32),
) -> Result<()> {
    let Some(window) = window else {
        return Ok(());
    };
    if frame.width() == size.0 && frame.height() == size.1 {
        sink.show(window, frame)
    } else {
        sink.show(window, &frame.resize_exact(size.0, size.1, FilterType::Triangle))
    }
}

/// Copy of `image` with a `width` x `height` outline at every match
///
/// The input image is left untouched.
pub fn mark_rectangles(
    image: &RgbImage,
    width: u32,
    height: u32,
    matches: &[Match],
    color: Rgb<u8>,
) -> RgbImage {
    let mut marked = image.clone();
    if width == 0 || height == 0 {
        return marked;
    }
    for m in matches {
        let rect = Rect::at(m.x as i32, m.y as i32).of_size(width, height);
        draw_hollow_rect_mut(&mut marked, rect, color);
    }
    marked
}
