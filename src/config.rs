//! Configuration types for the autopilot
//!
//! Every constant the loops need lives in one [`SurfConfig`], built once at
//! startup (from [`Default`] or a TOML file) and borrowed by the drivers.
//! All fields carry serde defaults so a partial TOML file only overrides
//! what it names.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::control::Key;
use crate::vision::MatchMethod;
use crate::{Result, SurfError};

/// Rectangle in frame pixel coordinates, origin top-left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Region {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Exclusive right edge
    pub fn right(&self) -> u64 {
        self.x as u64 + self.width as u64
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u64 {
        self.y as u64 + self.height as u64
    }

    /// Whether the region lies entirely inside a `width` x `height` frame
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.right() <= width as u64 && self.bottom() <= height as u64
    }

    /// Fail with [`SurfError::RegionOutOfBounds`] unless the region fits
    pub fn check_within(&self, width: u32, height: u32) -> Result<()> {
        if self.fits_within(width, height) {
            Ok(())
        } else {
            Err(SurfError::RegionOutOfBounds {
                region: *self,
                width,
                height,
            })
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}x{})", self.x, self.y, self.width, self.height)
    }
}

/// Placement of the two lane windows around the character
///
/// Both windows start `vision_offset` pixels below the anchor. The left
/// window ends at the anchor column, the right window starts there.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaneGeometry {
    /// Character position on screen (x, y)
    pub anchor: [u32; 2],
    /// Vertical gap between the anchor and the top of the lane windows
    pub vision_offset: u32,
    pub lane_width: u32,
    pub lane_height: u32,
}

impl Default for LaneGeometry {
    fn default() -> Self {
        Self {
            anchor: [1686, 966],
            vision_offset: 50,
            lane_width: 500,
            lane_height: 500,
        }
    }
}

impl LaneGeometry {
    /// Window to the left of the character
    pub fn left_region(&self) -> Result<Region> {
        let x = self.anchor[0].checked_sub(self.lane_width).ok_or_else(|| {
            SurfError::Config(format!(
                "lane width {} reaches left of the screen from anchor x {}",
                self.lane_width, self.anchor[0]
            ))
        })?;
        Ok(Region::new(x, self.top()?, self.lane_width, self.lane_height))
    }

    /// Window to the right of the character
    pub fn right_region(&self) -> Result<Region> {
        Ok(Region::new(
            self.anchor[0],
            self.top()?,
            self.lane_width,
            self.lane_height,
        ))
    }

    fn top(&self) -> Result<u32> {
        self.anchor[1]
            .checked_add(self.vision_offset)
            .ok_or_else(|| SurfError::Config("lane window top overflows".to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.lane_width == 0 || self.lane_height == 0 {
            return Err(SurfError::Config(format!(
                "lane windows must be non-empty, got {}x{}",
                self.lane_width, self.lane_height
            )));
        }
        self.left_region()?;
        self.right_region()?;
        Ok(())
    }
}

/// Inclusive per-channel RGB interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorInterval {
    pub low: [u8; 3],
    pub high: [u8; 3],
}

impl Default for ColorInterval {
    /// Light blue through white, the lane boundary colors
    fn default() -> Self {
        Self {
            low: [0, 0, 200],
            high: [255, 255, 255],
        }
    }
}

impl ColorInterval {
    pub fn new(low: [u8; 3], high: [u8; 3]) -> Result<Self> {
        let interval = Self { low, high };
        interval.validate()?;
        Ok(interval)
    }

    /// Whether every channel of `pixel` lies inside the interval
    pub fn contains(&self, pixel: &[u8; 3]) -> bool {
        pixel
            .iter()
            .zip(self.low.iter().zip(self.high.iter()))
            .all(|(v, (lo, hi))| lo <= v && v <= hi)
    }

    pub fn validate(&self) -> Result<()> {
        if self.low.iter().zip(self.high.iter()).any(|(lo, hi)| lo > hi) {
            return Err(SurfError::InvalidColorInterval {
                low: self.low,
                high: self.high,
            });
        }
        Ok(())
    }
}

/// PID gains, setpoint and output clamp
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub setpoint: f64,
    pub output_min: f64,
    pub output_max: f64,
    /// Fixed time step in seconds; measured between iterations when unset
    pub sample_time: Option<f64>,
}

impl Default for PidConfig {
    fn default() -> Self {
        Self {
            kp: 0.001,
            ki: 0.001,
            kd: 0.05,
            setpoint: 1.0,
            output_min: -100.0,
            output_max: 100.0,
            sample_time: None,
        }
    }
}

impl PidConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.output_min < self.output_max) {
            return Err(SurfError::Config(format!(
                "pid output limits must satisfy min < max, got [{}, {}]",
                self.output_min, self.output_max
            )));
        }
        if let Some(dt) = self.sample_time {
            if !(dt > 0.0) {
                return Err(SurfError::Config(format!(
                    "pid sample time must be positive, got {}",
                    dt
                )));
            }
        }
        Ok(())
    }
}

/// How control output is turned into key presses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    /// |delta| must exceed this to steer left or right
    pub turn_threshold: i64,
    /// Press duration in seconds is |pid output| / press_divisor
    pub press_divisor: f64,
    /// Key held on neutral iterations; none means do nothing
    pub neutral_key: Option<Key>,
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            turn_threshold: 200,
            press_divisor: 300.0,
            neutral_key: None,
        }
    }
}

impl DriveConfig {
    pub fn validate(&self) -> Result<()> {
        if self.turn_threshold < 0 {
            return Err(SurfError::Config(format!(
                "turn threshold must not be negative, got {}",
                self.turn_threshold
            )));
        }
        if !(self.press_divisor > 0.0) {
            return Err(SurfError::Config(format!(
                "press divisor must be positive, got {}",
                self.press_divisor
            )));
        }
        Ok(())
    }
}

/// Needle matching settings for the position detector
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    pub needle_path: PathBuf,
    /// Maximum normalized squared difference accepted as a match
    pub threshold: f32,
    pub method: MatchMethod,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            needle_path: PathBuf::from("assets/images/needles/image.png"),
            threshold: 0.025,
            method: MatchMethod::default(),
        }
    }
}

/// Live feed window settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub enabled: bool,
    pub window_name: String,
    /// Size the position detector feed is resized to
    pub width: u32,
    pub height: u32,
    /// Key that ends a run when reported by the display
    pub stop_key: char,
    /// Outline color for needle matches
    pub mark_color: [u8; 3],
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_name: "Live Feed".to_string(),
            width: 640,
            height: 480,
            stop_key: 'q',
            mark_color: [255, 0, 0],
        }
    }
}

impl FeedConfig {
    /// Window to show frames in, or `None` when the feed is off
    pub fn window(&self) -> Option<&str> {
        if self.enabled {
            Some(self.window_name.as_str())
        } else {
            None
        }
    }
}

/// Complete autopilot configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SurfConfig {
    pub lanes: LaneGeometry,
    pub color: ColorInterval,
    pub pid: PidConfig,
    pub drive: DriveConfig,
    pub matching: MatchConfig,
    pub feed: FeedConfig,
}

impl SurfConfig {
    /// Load and validate a TOML configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: SurfConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every section; frame-dependent checks happen on first use
    pub fn validate(&self) -> Result<()> {
        self.lanes.validate()?;
        self.color.validate()?;
        self.pid.validate()?;
        self.drive.validate()?;
        if self.feed.width == 0 || self.feed.height == 0 {
            return Err(SurfError::Config(format!(
                "feed size must be non-empty, got {}x{}",
                self.feed.width, self.feed.height
            )));
        }
        Ok(())
    }

    pub fn with_lanes(mut self, lanes: LaneGeometry) -> Self {
        self.lanes = lanes;
        self
    }

    pub fn with_color(mut self, color: ColorInterval) -> Self {
        self.color = color;
        self
    }

    pub fn with_pid(mut self, pid: PidConfig) -> Self {
        self.pid = pid;
        self
    }

    pub fn with_drive(mut self, drive: DriveConfig) -> Self {
        self.drive = drive;
        self
    }

    pub fn with_matching(mut self, matching: MatchConfig) -> Self {
        self.matching = matching;
        self
    }

    /// Turn the live feed on or off
    pub fn with_feed(mut self, enabled: bool) -> Self {
        self.feed.enabled = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_lane_regions() {
        let lanes = LaneGeometry::default();
        assert_eq!(lanes.left_region().unwrap(), Region::new(1186, 1016, 500, 500));
        assert_eq!(lanes.right_region().unwrap(), Region::new(1686, 1016, 500, 500));
    }

    #[test]
    fn test_lane_too_wide_for_anchor() {
        let lanes = LaneGeometry {
            anchor: [100, 10],
            vision_offset: 5,
            lane_width: 200,
            lane_height: 20,
        };
        assert!(lanes.left_region().is_err());
        assert!(lanes.validate().is_err());
    }

    #[test]
    fn test_region_fits_within() {
        let region = Region::new(10, 10, 20, 5);
        assert!(region.fits_within(30, 15));
        assert!(!region.fits_within(29, 15));
        assert!(!region.fits_within(30, 14));
        assert!(region.check_within(29, 15).is_err());
    }

    #[test]
    fn test_color_interval_contains_inclusive() {
        let interval = ColorInterval::default();
        assert!(interval.contains(&[0, 0, 200]));
        assert!(interval.contains(&[255, 255, 255]));
        assert!(!interval.contains(&[0, 0, 199]));
    }

    #[test]
    fn test_color_interval_rejects_inverted() {
        assert!(ColorInterval::new([10, 0, 0], [5, 255, 255]).is_err());
        assert!(ColorInterval::new([5, 0, 0], [5, 0, 0]).is_ok());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(SurfConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SurfConfig::from_toml_str(
            r#"
            [pid]
            kp = 0.5
            sample_time = 0.1

            [drive]
            neutral_key = "down"
            "#,
        )
        .unwrap();
        assert_eq!(config.pid.kp, 0.5);
        assert_eq!(config.pid.ki, 0.001);
        assert_eq!(config.pid.sample_time, Some(0.1));
        assert_eq!(config.drive.neutral_key, Some(Key::Down));
        assert_eq!(config.drive.turn_threshold, 200);
        assert_eq!(config.feed.stop_key, 'q');
    }

    #[test]
    fn test_capture_section_is_not_config() {
        // capture backends are configured where they are constructed
        let config = SurfConfig::from_toml_str("[capture]\nmonitor = 2\n").unwrap();
        let text = config.to_toml_string().unwrap();
        assert!(!text.contains("[capture]"));
        assert!(!text.contains("monitor"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = SurfConfig::default();
        let text = config.to_toml_string().unwrap();
        let parsed = SurfConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed.lanes.anchor, config.lanes.anchor);
        assert_eq!(parsed.color, config.color);
        assert_eq!(parsed.matching.threshold, config.matching.threshold);
    }

    #[test]
    fn test_invalid_color_in_toml() {
        let err = SurfConfig::from_toml_str(
            r#"
            [color]
            low = [0, 0, 255]
            high = [255, 255, 200]
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, SurfError::InvalidColorInterval { .. }));
    }

    #[test]
    fn test_invalid_pid_limits() {
        let pid = PidConfig {
            output_min: 5.0,
            output_max: 5.0,
            ..PidConfig::default()
        };
        assert!(pid.validate().is_err());
    }

    #[test]
    fn test_feed_window_toggle() {
        let config = SurfConfig::default();
        assert_eq!(config.feed.window(), Some("Live Feed"));
        let config = config.with_feed(false);
        assert_eq!(config.feed.window(), None);
    }
}
