//! Error types for particle-mask.
//!
//! Everything that can go wrong is detected while a run is being set up:
//! bad descriptors, malformed colors, unreadable mask files. Once frames
//! start flowing the simulation itself cannot fail, so a run either produces
//! output for every frame or returns one of these errors up front.

use std::io;
use thiserror::Error;

/// Errors raised while configuring or loading a particle mask run.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A color was neither an RGB triple nor a `"(r, g, b)"` string.
    #[error("Invalid color '{0}': expected \"(r, g, b)\" with 0-255 channels or a [r, g, b] triple in 0..1")]
    InvalidColor(String),

    /// A numeric parameter is out of its allowed range.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        /// Parameter name as it appears in the configuration.
        name: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A run was configured without any emitter.
    #[error("No emitters configured")]
    NoEmitters,

    /// Input masks do not share one shape, or do not match the configured size.
    #[error("Mask shape mismatch: expected {expected_width}x{expected_height}, found {width}x{height} at frame {frame}")]
    MaskShape {
        /// Frame index of the offending mask.
        frame: usize,
        /// Expected width in pixels.
        expected_width: u32,
        /// Expected height in pixels.
        expected_height: u32,
        /// Actual width in pixels.
        width: u32,
        /// Actual height in pixels.
        height: u32,
    },

    /// The configuration JSON could not be parsed (includes unknown identifiers
    /// such as a well type other than `attract` or `repel`).
    #[error("Configuration parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O error occurred while reading a configuration or mask file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A mask image could not be decoded or an output image could not be written.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::InvalidParameter`].
    pub fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Type alias for results of configuration and loading.
pub type Result<T> = std::result::Result<T, ConfigError>;
