//! Error types for the autopilot

use thiserror::Error;

use crate::config::Region;

/// Result type for autopilot operations
pub type Result<T> = std::result::Result<T, SurfError>;

/// Error type shared by the vision, control and runner modules
#[derive(Debug, Error)]
pub enum SurfError {
    /// Needle does not fit strictly inside the haystack
    #[error("needle {needle_width}x{needle_height} must be strictly smaller than haystack {haystack_width}x{haystack_height}")]
    NeedleTooLarge {
        needle_width: u32,
        needle_height: u32,
        haystack_width: u32,
        haystack_height: u32,
    },

    /// Crop region reaches outside the frame
    #[error("region {region} lies outside the {width}x{height} frame")]
    RegionOutOfBounds {
        region: Region,
        width: u32,
        height: u32,
    },

    /// Color interval with low > high on some channel
    #[error("invalid color interval: low {low:?} exceeds high {high:?}")]
    InvalidColorInterval { low: [u8; 3], high: [u8; 3] },

    /// Any other configuration problem
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Frame capture failed
    #[error("capture failed: {0}")]
    Capture(String),

    /// A replay source has no more frames
    #[error("capture source exhausted")]
    SourceExhausted,

    /// Visualization sink failed
    #[error("display failed: {0}")]
    Display(String),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),
}

impl SurfError {
    /// Whether this error is a configuration problem that no retry can fix
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            SurfError::NeedleTooLarge { .. }
                | SurfError::RegionOutOfBounds { .. }
                | SurfError::InvalidColorInterval { .. }
                | SurfError::Config(_)
                | SurfError::ConfigParse(_)
        )
    }
}
