use std::io;

use mmd_data::DataError;
use thiserror::Error;

/// Error types for VMD motion parsing and writing
#[derive(Error, Debug)]
pub enum VmdError {
    /// I/O Error during reading or writing
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Invalid magic string in the file header
    #[error("Invalid magic number: expected '{expected}', got '{actual}'")]
    InvalidMagic { expected: String, actual: String },

    /// Truncation or corrupt counts in the underlying buffer
    #[error(transparent)]
    Data(#[from] DataError),
}

impl VmdError {
    pub fn is_format_error(&self) -> bool {
        matches!(self, Self::InvalidMagic { .. })
    }

    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, Self::Data(e) if e.is_out_of_bounds())
    }
}

/// Result type using VmdError
pub type Result<T> = std::result::Result<T, VmdError>;
