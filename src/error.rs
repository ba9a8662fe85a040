//! Error types for the alpha-threshold crate.

use std::path::PathBuf;

/// Errors that can occur while building a compositor or running a matte job.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The threshold pair cannot describe a ramp.
    #[error("invalid threshold configuration (low={low}, high={high}): {reason}")]
    InvalidConfiguration {
        /// Requested low threshold.
        low: i64,
        /// Requested high threshold.
        high: i64,
        /// Why the pair was rejected.
        reason: &'static str,
    },

    /// The source bytes are not a recognised raster format.
    #[error("failed to decode image: {0}")]
    Decode(#[source] image::ImageError),

    /// The source could not be read from the store.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The raster could not be encoded.
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// The encoded raster could not be written to the store.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// Path that was being written.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The image format is not supported, or cannot carry an alpha channel.
    #[error("unsupported image format: {0}")]
    UnsupportedFormat(String),

    /// An I/O error occurred outside a single read or write (e.g. listing a directory).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error belongs to the decode side of a job (missing,
    /// unreadable or unrecognised source).
    #[must_use]
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Read { .. })
    }

    /// Whether this error belongs to the encode side of a job (encoder
    /// failure or unwritable destination).
    #[must_use]
    pub fn is_encode_failure(&self) -> bool {
        matches!(self, Self::Encode(_) | Self::Write { .. })
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
