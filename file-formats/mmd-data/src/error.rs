use std::io;

use thiserror::Error;

/// Errors raised by the low level binary reader.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read would run past the end of the buffer.
    #[error("Read of {requested} bytes at offset {offset} exceeds buffer ({available} bytes left)")]
    OutOfBounds {
        offset: usize,
        requested: usize,
        available: usize,
    },

    /// A declared element count cannot be right for the data that follows it.
    #[error("Implausible {what} count {count} (limit {limit})")]
    ImplausibleCount {
        what: &'static str,
        count: i64,
        limit: usize,
    },

    #[error("Invalid index width: {0}")]
    InvalidIndexWidth(u8),

    #[error("Invalid text encoding: {0}")]
    InvalidTextEncoding(u8),
}

impl DataError {
    /// True for truncation errors.
    pub fn is_out_of_bounds(&self) -> bool {
        matches!(self, Self::OutOfBounds { .. })
    }

    /// True for errors caused by a corrupt length field.
    pub fn is_implausible_count(&self) -> bool {
        matches!(self, Self::ImplausibleCount { .. })
    }
}

pub type Result<T> = std::result::Result<T, DataError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DataError::OutOfBounds {
            offset: 12,
            requested: 4,
            available: 2,
        };
        assert_eq!(
            format!("{}", error),
            "Read of 4 bytes at offset 12 exceeds buffer (2 bytes left)"
        );

        let error = DataError::ImplausibleCount {
            what: "morph",
            count: -1,
            limit: 65536,
        };
        assert_eq!(format!("{}", error), "Implausible morph count -1 (limit 65536)");
        assert!(error.is_implausible_count());
        assert!(!error.is_out_of_bounds());
    }
}
