use mmd_pmx::PmxError;
use mmd_vmd::VmdError;
use thiserror::Error;

/// Error types for the animation and physics runtime
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The model buffer could not be parsed
    #[error("Model error: {0}")]
    Model(#[from] PmxError),

    /// The motion buffer could not be parsed
    #[error("Motion error: {0}")]
    Motion(#[from] VmdError),

    /// An operation needs a loaded model
    #[error("No model loaded")]
    NoModel,

    /// Bone names and rotations of a direct override differ in length
    #[error("Got {names} bone names but {rotations} rotations")]
    LengthMismatch { names: usize, rotations: usize },
}

/// Result type using RuntimeError
pub type Result<T> = std::result::Result<T, RuntimeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = RuntimeError::LengthMismatch {
            names: 2,
            rotations: 1,
        };
        assert_eq!(format!("{}", error), "Got 2 bone names but 1 rotations");
        assert_eq!(format!("{}", RuntimeError::NoModel), "No model loaded");
    }
}
