//! Screen vision for the autopilot
//!
//! This module turns captured frames into the two things the loops act on:
//! needle positions (template matching) and a left/right lane signal
//! (color masking, cropping and a row-weighted sum).
//!
//! # Example
//!
//! ```ignore
//! use surf_autopilot::vision::{find_matches, mask_out_range, weighted_sum};
//!
//! let positions = find_matches(&frame, &needle, 0.025)?;
//! let mask = mask_out_range(&frame, &config.color);
//! let strength = weighted_sum(&crop_region(&mask, &left)?);
//! ```

pub mod capture;
pub mod color;
pub mod display;
pub mod matcher;
pub mod signal;

// Re-export main types for convenient access
pub use capture::{CaptureSource, Frame, FrameSequenceCapture, StaticCapture};
pub use color::{crop_region, hconcat, lane_crops, mask_out_range};
pub use display::{mark_rectangles, show_frame, FrameSink, ImageDumpSink, NullSink};
pub use matcher::{find_matches, match_exists, Match, MatchMethod, ScoreMap, TemplateMatcher};
pub use signal::weighted_sum;
