use std::io;

use mmd_data::DataError;
use thiserror::Error;

/// Error types for PMX model parsing and writing
#[derive(Error, Debug)]
pub enum PmxError {
    /// I/O Error during reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid magic number in the file header
    #[error("Invalid magic number: expected '{expected}', got '{actual}'")]
    InvalidMagic { expected: String, actual: String },

    /// File version older than 2.0
    #[error("Unsupported version: {0}")]
    UnsupportedVersion(f32),

    /// Header globals that cannot describe a valid file
    #[error("Invalid header: {0}")]
    InvalidHeader(String),

    /// A record holds a value outside its enumeration
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Parent links that loop back on themselves
    #[error("Invalid bone hierarchy: {0}")]
    InvalidBoneHierarchy(String),

    /// Truncation or corrupt counts in the underlying buffer
    #[error(transparent)]
    Data(#[from] DataError),
}

impl PmxError {
    /// True when the buffer is not a PMX 2.x file at all.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidMagic { .. } | Self::UnsupportedVersion(_) | Self::InvalidHeader(_)
        )
    }

    /// True when a read ran past the end of the buffer.
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, Self::Data(e) if e.is_out_of_bounds())
    }
}

/// Result type using PmxError
pub type Result<T> = std::result::Result<T, PmxError>;
