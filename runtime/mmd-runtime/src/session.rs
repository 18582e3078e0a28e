//! One model, its motion and its physics, advanced frame by frame

use glam::{Mat4, Quat};
use mmd_pmx::PmxModel;
use mmd_vmd::KeyframeTrack;

use crate::animation::AnimationScheduler;
use crate::config::RuntimeConfig;
use crate::error::{Result, RuntimeError};
use crate::physics::PhysicsWorld;
use crate::pose::{Pose, PoseEvaluator};

/// Everything that only exists while a model is loaded
struct Loaded {
    model: PmxModel,
    pose: Pose,
    physics: PhysicsWorld,
}

/// Host-facing runtime for a single model
///
/// Each [`update`](Session::update) runs in a fixed order: the scheduler
/// changes local rotations, the pose evaluator computes world matrices,
/// physics syncs bone-following bodies and steps, dynamic bodies
/// overwrite their bones, and only then are the matrices returned.
pub struct Session {
    config: RuntimeConfig,
    scheduler: AnimationScheduler,
    evaluator: PoseEvaluator,
    loaded: Option<Loaded>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl Session {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            scheduler: AnimationScheduler::new(config.scheduler.clone()),
            evaluator: PoseEvaluator::new(),
            loaded: None,
            config,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Parse a PMX buffer and make it the session's model
    ///
    /// On success the previous model, its motion and its physics world are
    /// dropped, and the new model is placed at its bind pose. On failure
    /// the session is left as it was.
    pub fn load_model(&mut self, data: &[u8]) -> Result<&PmxModel> {
        let model = PmxModel::parse(data)?;
        self.unload_model();

        let bone_count = model.skeleton.len();
        let physics = PhysicsWorld::new(
            &model.rigidbodies,
            &model.joints,
            bone_count,
            self.config.physics.clone(),
        );
        let loaded = self.loaded.insert(Loaded {
            pose: Pose::new(bone_count),
            physics,
            model,
        });

        self.evaluator.evaluate(&loaded.model.skeleton, &loaded.pose);
        loaded.physics.reset(
            self.evaluator.world_matrices_mut(),
            loaded.model.skeleton.inverse_bind_matrices(),
        );

        log::debug!(
            "Loaded model '{}' with {} bones, {} rigidbodies and {} joints",
            loaded.model.header.name,
            bone_count,
            loaded.model.rigidbodies.len(),
            loaded.model.joints.len()
        );
        Ok(&loaded.model)
    }

    /// Drop the model, its motion and its physics world.
    pub fn unload_model(&mut self) {
        self.scheduler.unload();
        self.evaluator = PoseEvaluator::new();
        self.loaded = None;
    }

    /// Parse a VMD buffer and bind its bone tracks to the loaded model
    ///
    /// Stops playback. Returns every track in the motion, including those
    /// naming bones the model lacks.
    pub fn load_animation(&mut self, data: &[u8]) -> Result<Vec<KeyframeTrack>> {
        let loaded = self.loaded.as_ref().ok_or(RuntimeError::NoModel)?;
        let tracks = mmd_vmd::parse_tracks(data)?;
        let bound = self.scheduler.load(&tracks, &loaded.model.skeleton);
        log::debug!("Motion has {} tracks, {} bound", tracks.len(), bound);
        Ok(tracks)
    }

    /// Start the loaded motion from the beginning
    ///
    /// The pose returns to bind, time-0 keyframes are applied and physics
    /// is reset and primed before this returns.
    pub fn play(&mut self) -> Result<()> {
        let loaded = self.loaded.as_mut().ok_or(RuntimeError::NoModel)?;
        self.scheduler.play(&mut loaded.pose);
        self.evaluator.evaluate(&loaded.model.skeleton, &loaded.pose);
        loaded.physics.reset(
            self.evaluator.world_matrices_mut(),
            loaded.model.skeleton.inverse_bind_matrices(),
        );
        Ok(())
    }

    /// Cancel playback. Safe to call at any time.
    pub fn stop(&mut self) {
        self.scheduler.stop();
    }

    pub fn pause(&mut self) {
        self.scheduler.pause();
    }

    pub fn resume(&mut self) {
        self.scheduler.resume();
    }

    /// Jump to `position_ms` in the playing motion.
    pub fn seek(&mut self, position_ms: f64) {
        if let Some(loaded) = self.loaded.as_mut() {
            self.scheduler.seek(position_ms, &mut loaded.pose);
        }
    }

    /// Override bone rotations directly, optionally over `duration_ms`.
    pub fn rotate_bones<S: AsRef<str>>(
        &mut self,
        names: &[S],
        rotations: &[Quat],
        duration_ms: Option<f64>,
    ) -> Result<usize> {
        let loaded = self.loaded.as_mut().ok_or(RuntimeError::NoModel)?;
        self.scheduler.rotate_bones(
            &loaded.model.skeleton,
            names,
            rotations,
            duration_ms,
            &mut loaded.pose,
        )
    }

    /// Advance by `dt` seconds and return the bone world matrices
    ///
    /// Empty when no model is loaded.
    pub fn update(&mut self, dt: f32) -> &[Mat4] {
        let Some(loaded) = self.loaded.as_mut() else {
            return &[];
        };
        self.scheduler.advance(dt, &mut loaded.pose);
        self.evaluator.evaluate(&loaded.model.skeleton, &loaded.pose);
        loaded.physics.step(
            dt,
            self.evaluator.world_matrices_mut(),
            loaded.model.skeleton.inverse_bind_matrices(),
        );
        self.evaluator.world_matrices()
    }

    pub fn model(&self) -> Option<&PmxModel> {
        self.loaded.as_ref().map(|l| &l.model)
    }

    pub fn pose(&self) -> Option<&Pose> {
        self.loaded.as_ref().map(|l| &l.pose)
    }

    pub fn physics(&self) -> Option<&PhysicsWorld> {
        self.loaded.as_ref().map(|l| &l.physics)
    }

    pub fn scheduler(&self) -> &AnimationScheduler {
        &self.scheduler
    }

    /// Bone world matrices from the last update.
    pub fn world_matrices(&self) -> &[Mat4] {
        self.evaluator.world_matrices()
    }

    /// Static inverse bind matrices of the loaded model.
    pub fn inverse_bind_matrices(&self) -> &[Mat4] {
        self.loaded
            .as_ref()
            .map_or(&[], |l| l.model.skeleton.inverse_bind_matrices())
    }

    pub fn rigidbody_transforms(&self) -> Vec<Mat4> {
        self.physics()
            .map(PhysicsWorld::rigidbody_transforms)
            .unwrap_or_default()
    }

    pub fn joint_transforms(&self) -> Vec<Mat4> {
        self.physics()
            .map(PhysicsWorld::joint_transforms)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operations_without_model() {
        let mut session = Session::default();
        assert!(matches!(
            session.load_animation(&[]),
            Err(RuntimeError::NoModel)
        ));
        assert!(matches!(session.play(), Err(RuntimeError::NoModel)));
        assert!(matches!(
            session.rotate_bones(&["head"], &[Quat::IDENTITY], None),
            Err(RuntimeError::NoModel)
        ));
        session.stop();
        session.stop();
        assert!(session.update(0.016).is_empty());
        assert!(session.inverse_bind_matrices().is_empty());
        assert!(session.rigidbody_transforms().is_empty());
    }

    #[test]
    fn test_bad_model_is_rejected() {
        let mut session = Session::default();
        assert!(matches!(
            session.load_model(b"not a model"),
            Err(RuntimeError::Model(_))
        ));
        assert!(session.model().is_none());
    }
}
