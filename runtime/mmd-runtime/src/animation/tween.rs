//! In-flight interpolation of one bone towards a target

use glam::{Quat, Vec3};

use crate::pose::Pose;

/// Slerp of a bone's rotation (and lerp of its translation) over a time
/// window on the scheduler clock
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tween {
    pub bone: usize,
    pub from_rotation: Quat,
    pub to_rotation: Quat,
    pub from_translation: Vec3,
    pub to_translation: Vec3,
    /// Clock time the tween starts, milliseconds
    pub start_ms: f64,
    pub duration_ms: f64,
}

impl Tween {
    /// Tween a bone from its current pose to the given rotation, keeping
    /// its translation.
    pub fn rotation(pose: &Pose, bone: usize, to: Quat, start_ms: f64, duration_ms: f64) -> Self {
        let translation = pose.translation(bone);
        Self {
            bone,
            from_rotation: pose.rotation(bone),
            to_rotation: to,
            from_translation: translation,
            to_translation: translation,
            start_ms,
            duration_ms,
        }
    }

    /// Progress in `[0, 1]` at clock time `now_ms`.
    pub fn progress(&self, now_ms: f64) -> f32 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        ((now_ms - self.start_ms) / self.duration_ms).clamp(0.0, 1.0) as f32
    }

    pub fn is_finished(&self, now_ms: f64) -> bool {
        self.progress(now_ms) >= 1.0
    }

    /// Interpolated rotation and translation at `now_ms`.
    pub fn sample(&self, now_ms: f64) -> (Quat, Vec3) {
        let t = self.progress(now_ms);
        if t >= 1.0 {
            return (self.to_rotation, self.to_translation);
        }
        (
            self.from_rotation.slerp(self.to_rotation, t),
            self.from_translation.lerp(self.to_translation, t),
        )
    }

    /// Write the sampled value into the pose.
    pub fn apply(&self, pose: &mut Pose, now_ms: f64) {
        let (rotation, translation) = self.sample(now_ms);
        pose.set_rotation(self.bone, rotation);
        pose.set_translation(self.bone, translation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress() {
        let pose = Pose::new(1);
        let tween = Tween::rotation(&pose, 0, Quat::from_rotation_x(1.0), 100.0, 200.0);
        assert_eq!(tween.progress(0.0), 0.0);
        assert_eq!(tween.progress(200.0), 0.5);
        assert_eq!(tween.progress(400.0), 1.0);
        assert!(tween.is_finished(300.0));

        let (rotation, _) = tween.sample(200.0);
        assert!(rotation.angle_between(Quat::from_rotation_x(0.5)) < 1e-4);
    }

    #[test]
    fn test_zero_duration_is_immediate() {
        let pose = Pose::new(1);
        let tween = Tween::rotation(&pose, 0, Quat::from_rotation_y(0.3), 50.0, 0.0);
        assert!(tween.is_finished(0.0));
        assert_eq!(tween.sample(0.0).0, Quat::from_rotation_y(0.3));
    }
}
