//! Runtime options

use glam::Vec3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Options for the rigidbody simulation
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PhysicsConfig {
    /// Whether dynamic bodies are simulated at all
    pub enabled: bool,

    /// Gravity in model units per second squared
    pub gravity: Vec3,

    /// Longest frame delta fed to one step, in seconds
    pub max_delta: f32,

    /// Solver sub-steps per frame
    pub substeps: u32,

    /// Bodies lighter than this may be tagged problematic
    pub light_mass: f32,

    /// Bodies whose largest dimension is below this may be tagged problematic
    pub small_size: f32,

    /// Multiplier applied to the sleep thresholds of problematic bodies;
    /// above 1.0 they fall asleep sooner
    pub sleep_threshold_scale: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            gravity: Vec3::new(0.0, -98.0, 0.0),
            max_delta: 0.1,
            substeps: 3,
            light_mass: 0.1,
            small_size: 0.2,
            sleep_threshold_scale: 2.0,
        }
    }
}

/// How keyframes after the first are applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TransitionMode {
    /// Jump to each keyframe at its own time and hold until the next.
    #[default]
    Snap,
    /// Start at the previous keyframe and slerp into the next one.
    Linear,
}

/// Options for keyframe playback
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SchedulerConfig {
    pub transition: TransitionMode,

    /// Restart from the beginning after the last keyframe
    pub looping: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RuntimeConfig {
    pub physics: PhysicsConfig,
    pub scheduler: SchedulerConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert!(config.physics.enabled);
        assert_eq!(config.physics.max_delta, 0.1);
        assert_eq!(config.scheduler.transition, TransitionMode::Snap);
        assert!(!config.scheduler.looping);
    }
}
