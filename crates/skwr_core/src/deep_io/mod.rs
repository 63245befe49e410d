//! Deep image file reading and writing.
//!
//! The on-disk layout mirrors a deep scanline image: a header with the data
//! window and channel list, then chunks of scanlines. Each chunk holds a
//! dense sample-count table for its lines followed by one flat array per
//! channel whose length is the chunk's total sample count.
//!
//! Color and opacity (`R`, `G`, `B`, `A`) are written as half floats, depth
//! (`Z`, `ZBack`) as full single precision floats.

mod format;
mod layout;
mod reader;
mod writer;

pub use format::{ChannelDesc, DeepHeader, PixelType, CHANNEL_NAMES, REQUIRED_CHANNELS};
pub use layout::SampleLayout;
pub use reader::{load_deep_image, read_deep_header, read_deep_image};
pub use writer::{save_deep_image, save_deep_image_with, write_deep_image, SaveOptions, ZBackMode};

use thiserror::Error;

/// Errors that can occur while reading or writing deep images.
#[derive(Error, Debug)]
pub enum DeepImageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid deep image header: {0}")]
    InvalidHeader(String),

    #[error("Missing required channels: {}", .0.join(", "))]
    MissingChannels(Vec<String>),

    #[error("Unknown pixel type {code} for channel {channel}")]
    UnknownPixelType { channel: String, code: u32 },

    #[error("Deep image data truncated: {0}")]
    Truncated(String),

    #[error("Invalid depth range at pixel ({x}, {y}): Z {z_front}, ZBack {z_back}")]
    InvalidDepth {
        x: i64,
        y: i64,
        z_front: f32,
        z_back: f32,
    },
}

impl DeepImageError {
    /// True for malformed or incomplete files, false for plain IO failures.
    pub fn is_format_error(&self) -> bool {
        !matches!(self, DeepImageError::Io(_))
    }

    /// Names of the missing required channels, if that is the failure.
    pub fn missing_channels(&self) -> &[String] {
        match self {
            DeepImageError::MissingChannels(names) => names,
            _ => &[],
        }
    }
}

pub type DeepImageResult<T> = Result<T, DeepImageError>;
