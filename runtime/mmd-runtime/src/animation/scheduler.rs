//! Keyframe playback on a single monotonic clock

use glam::Quat;
use mmd_pmx::Skeleton;
use mmd_vmd::KeyframeTrack;

use super::timeline::{BoundTrack, Timeline, Transition, bind_tracks};
use super::tween::Tween;
use crate::config::{SchedulerConfig, TransitionMode};
use crate::error::{Result, RuntimeError};
use crate::pose::Pose;

/// Position of the active playback
#[derive(Debug, Clone, Copy, PartialEq)]
struct Playback {
    /// Clock time at which the motion's time 0 falls, milliseconds
    started_ms: f64,
    /// Index of the next transition to dispatch
    cursor: usize,
}

/// Drives bone local rotations from keyframe tracks
///
/// `play` builds one time-sorted list of transitions and `advance` moves a
/// cursor over it, dispatching every transition that has come due. Nothing
/// is scheduled outside that list, so `stop` only has to drop it.
#[derive(Debug, Clone, Default)]
pub struct AnimationScheduler {
    config: SchedulerConfig,
    tracks: Vec<BoundTrack>,
    timeline: Timeline,
    playback: Option<Playback>,
    tweens: Vec<Tween>,
    clock_ms: f64,
    paused: bool,
}

impl AnimationScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Replace the loaded motion. Stops any playback.
    ///
    /// Returns the number of tracks that matched a bone.
    pub fn load(&mut self, tracks: &[KeyframeTrack], skeleton: &Skeleton) -> usize {
        self.stop();
        self.tracks = bind_tracks(tracks, skeleton);
        log::debug!(
            "Bound {} of {} keyframe tracks",
            self.tracks.len(),
            tracks.len()
        );
        self.tracks.len()
    }

    /// Drop the loaded motion. Stops any playback.
    pub fn unload(&mut self) {
        self.stop();
        self.tracks.clear();
    }

    pub fn has_motion(&self) -> bool {
        !self.tracks.is_empty()
    }

    /// Start playback from the beginning
    ///
    /// Stops the previous playback, returns every bone to the bind pose and
    /// applies all time-0 keyframes before returning.
    pub fn play(&mut self, pose: &mut Pose) {
        self.stop();
        self.timeline = Timeline::build(&self.tracks, self.config.transition);
        self.playback = Some(Playback {
            started_ms: self.clock_ms,
            cursor: 0,
        });
        self.restart(pose);
        self.dispatch_due(pose);
        self.sample_tweens(pose);
        log::debug!(
            "Playing {} initial keys and {} transitions over {:.0} ms",
            self.timeline.initial.len(),
            self.timeline.transitions.len(),
            self.timeline.duration_ms
        );
    }

    /// Cancel every pending transition and in-flight tween. The pose keeps
    /// its current values. Safe to call at any time.
    pub fn stop(&mut self) {
        self.playback = None;
        self.timeline = Timeline::default();
        self.tweens.clear();
        self.paused = false;
    }

    /// Freeze the clock. Direct overrides without a duration still apply.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_some()
    }

    /// Jump to `position_ms` in the motion, replaying every transition up
    /// to that point. Does nothing without an active playback.
    pub fn seek(&mut self, position_ms: f64, pose: &mut Pose) {
        let Some(playback) = self.playback.as_mut() else {
            return;
        };
        let position_ms = if position_ms.is_finite() {
            position_ms.max(0.0)
        } else {
            0.0
        };
        playback.started_ms = self.clock_ms - position_ms;
        playback.cursor = 0;
        self.restart(pose);
        self.dispatch_due(pose);
        self.sample_tweens(pose);
    }

    /// Advance the clock by `dt` seconds and apply everything that came due.
    pub fn advance(&mut self, dt: f32, pose: &mut Pose) {
        if self.paused {
            return;
        }
        if dt.is_finite() && dt > 0.0 {
            self.clock_ms += f64::from(dt) * 1000.0;
        }
        self.dispatch_due(pose);
        self.sample_tweens(pose);
    }

    /// Directly override bone rotations
    ///
    /// With a duration the rotation is slerped from the current pose over
    /// that many milliseconds; otherwise it is applied at once. Unknown
    /// names are skipped. Returns the number of bones changed.
    pub fn rotate_bones<S: AsRef<str>>(
        &mut self,
        skeleton: &Skeleton,
        names: &[S],
        rotations: &[Quat],
        duration_ms: Option<f64>,
        pose: &mut Pose,
    ) -> Result<usize> {
        if names.len() != rotations.len() {
            return Err(RuntimeError::LengthMismatch {
                names: names.len(),
                rotations: rotations.len(),
            });
        }

        let mut applied = 0;
        for (name, &rotation) in names.iter().zip(rotations) {
            let name = name.as_ref();
            let Some(bone) = skeleton.find(name) else {
                log::warn!("Cannot rotate unknown bone '{}'", name);
                continue;
            };
            self.cancel_tween(bone, self.clock_ms, pose);
            match duration_ms.filter(|d| d.is_finite() && *d > 0.0) {
                Some(duration) => {
                    self.tweens
                        .push(Tween::rotation(pose, bone, rotation, self.clock_ms, duration));
                }
                None => pose.set_rotation(bone, rotation),
            }
            applied += 1;
        }
        Ok(applied)
    }

    /// Transitions not yet dispatched, in dispatch order.
    pub fn pending(&self) -> &[Transition] {
        match self.playback {
            Some(playback) => &self.timeline.transitions[playback.cursor..],
            None => &[],
        }
    }

    /// In-flight tweens.
    pub fn tweens(&self) -> &[Tween] {
        &self.tweens
    }

    /// Current position in the motion, milliseconds.
    pub fn position_ms(&self) -> Option<f64> {
        self.playback.map(|p| self.clock_ms - p.started_ms)
    }

    /// Length of the playing motion, milliseconds.
    pub fn duration_ms(&self) -> f64 {
        self.timeline.duration_ms
    }

    /// Playback back at time 0: bind pose plus the initial keyframes.
    fn restart(&mut self, pose: &mut Pose) {
        self.tweens.clear();
        pose.reset();
        for key in &self.timeline.initial {
            pose.set_rotation(key.bone, key.rotation);
            pose.set_translation(key.bone, key.translation);
        }
    }

    fn dispatch_due(&mut self, pose: &mut Pose) {
        let Some(mut playback) = self.playback else {
            return;
        };
        let count = self.timeline.transitions.len();

        loop {
            while let Some(&transition) = self.timeline.transitions.get(playback.cursor) {
                let due_ms = playback.started_ms + transition.delay_ms;
                if due_ms > self.clock_ms {
                    break;
                }
                self.dispatch(&transition, due_ms, pose);
                playback.cursor += 1;
            }

            let duration = self.timeline.duration_ms;
            let elapsed = self.clock_ms - playback.started_ms;
            if self.config.looping && playback.cursor == count && duration > 0.0 && elapsed >= duration
            {
                playback.started_ms += (elapsed / duration).floor() * duration;
                playback.cursor = 0;
                self.restart(pose);
                continue;
            }
            break;
        }

        self.playback = Some(playback);
    }

    fn dispatch(&mut self, transition: &Transition, due_ms: f64, pose: &mut Pose) {
        self.cancel_tween(transition.bone, due_ms, pose);
        match self.config.transition {
            TransitionMode::Snap => {
                pose.set_rotation(transition.bone, transition.rotation);
                pose.set_translation(transition.bone, transition.translation);
            }
            TransitionMode::Linear => {
                let mut tween = Tween::rotation(
                    pose,
                    transition.bone,
                    transition.rotation,
                    due_ms,
                    transition.duration_ms,
                );
                tween.to_translation = transition.translation;
                self.tweens.push(tween);
            }
        }
    }

    /// Settle any tween on `bone` at `at_ms` and drop it.
    fn cancel_tween(&mut self, bone: usize, at_ms: f64, pose: &mut Pose) {
        if let Some(slot) = self.tweens.iter().position(|t| t.bone == bone) {
            let tween = self.tweens.swap_remove(slot);
            tween.apply(pose, at_ms);
        }
    }

    fn sample_tweens(&mut self, pose: &mut Pose) {
        let now = self.clock_ms;
        for tween in &self.tweens {
            tween.apply(pose, now);
        }
        self.tweens.retain(|t| !t.is_finished(now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;
    use mmd_pmx::Bone;
    use mmd_vmd::Keyframe;
    use pretty_assertions::assert_eq;

    fn skeleton() -> Skeleton {
        Skeleton::new(vec![
            Bone::new("center", Vec3::ZERO, None),
            Bone::new("arm", Vec3::Y, Some(0)),
            Bone::new("hand", Vec3::new(0.0, 2.0, 0.0), Some(1)),
        ])
        .unwrap()
    }

    fn rotation_a() -> Quat {
        Quat::from_rotation_z(0.25)
    }

    fn rotation_b() -> Quat {
        Quat::from_rotation_z(1.0)
    }

    fn arm_track() -> KeyframeTrack {
        KeyframeTrack {
            bone_name: "arm".to_string(),
            keyframes: vec![
                Keyframe {
                    time: 0.0,
                    rotation: rotation_a(),
                    translation: Vec3::ZERO,
                },
                Keyframe {
                    time: 1.0,
                    rotation: rotation_b(),
                    translation: Vec3::ZERO,
                },
            ],
        }
    }

    fn playing(config: SchedulerConfig) -> (AnimationScheduler, Pose) {
        let skeleton = skeleton();
        let mut scheduler = AnimationScheduler::new(config);
        assert_eq!(scheduler.load(&[arm_track()], &skeleton), 1);
        let mut pose = Pose::new(skeleton.len());
        scheduler.play(&mut pose);
        (scheduler, pose)
    }

    fn close(a: Quat, b: Quat) -> bool {
        a.angle_between(b) < 1e-4
    }

    #[test]
    fn test_first_key_applied_on_play() {
        let (scheduler, pose) = playing(SchedulerConfig::default());
        assert!(close(pose.rotation(1), rotation_a()));

        let pending = scheduler.pending();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].bone, 1);
        assert_eq!(pending[0].delay_ms, 1000.0);
    }

    #[test]
    fn test_snap_applies_at_key_time() {
        let (mut scheduler, mut pose) = playing(SchedulerConfig::default());
        scheduler.advance(0.5, &mut pose);
        assert!(close(pose.rotation(1), rotation_a()));
        scheduler.advance(0.5, &mut pose);
        assert!(close(pose.rotation(1), rotation_b()));
        assert!(scheduler.pending().is_empty());
    }

    #[test]
    fn test_linear_slerps_between_keys() {
        let config = SchedulerConfig {
            transition: TransitionMode::Linear,
            looping: false,
        };
        let (mut scheduler, mut pose) = playing(config);
        assert!(close(pose.rotation(1), rotation_a()));
        scheduler.advance(0.5, &mut pose);
        assert!(close(pose.rotation(1), rotation_a().slerp(rotation_b(), 0.5)));
        scheduler.advance(0.5, &mut pose);
        assert!(close(pose.rotation(1), rotation_b()));
        assert!(scheduler.tweens().is_empty());
    }

    #[test]
    fn test_play_resets_untracked_bones() {
        let (mut scheduler, mut pose) = playing(SchedulerConfig::default());
        pose.set_rotation(2, Quat::from_rotation_x(1.0));
        scheduler.play(&mut pose);
        assert_eq!(pose.rotation(2), Quat::IDENTITY);
    }

    #[test]
    fn test_stop_then_play_leaks_nothing() {
        let (mut scheduler, mut pose) = playing(SchedulerConfig::default());
        scheduler.advance(0.9, &mut pose);
        scheduler.stop();
        scheduler.stop();
        assert!(scheduler.pending().is_empty());
        assert!(!scheduler.is_playing());

        scheduler.play(&mut pose);
        assert_eq!(scheduler.pending().len(), 1);
        // The old playback was due at 0.1 s from here; the new one is not.
        scheduler.advance(0.2, &mut pose);
        assert!(close(pose.rotation(1), rotation_a()));
    }

    #[test]
    fn test_stopped_scheduler_ignores_advance() {
        let (mut scheduler, mut pose) = playing(SchedulerConfig::default());
        scheduler.stop();
        scheduler.advance(5.0, &mut pose);
        assert!(close(pose.rotation(1), rotation_a()));
    }

    #[test]
    fn test_pause_and_resume() {
        let (mut scheduler, mut pose) = playing(SchedulerConfig::default());
        scheduler.pause();
        scheduler.advance(2.0, &mut pose);
        assert!(close(pose.rotation(1), rotation_a()));
        scheduler.resume();
        scheduler.advance(1.0, &mut pose);
        assert!(close(pose.rotation(1), rotation_b()));
    }

    #[test]
    fn test_seek() {
        let (mut scheduler, mut pose) = playing(SchedulerConfig::default());
        scheduler.seek(1500.0, &mut pose);
        assert!(close(pose.rotation(1), rotation_b()));
        assert_eq!(scheduler.position_ms(), Some(1500.0));

        scheduler.seek(0.0, &mut pose);
        assert!(close(pose.rotation(1), rotation_a()));
        assert_eq!(scheduler.pending().len(), 1);
    }

    #[test]
    fn test_looping_restarts() {
        let config = SchedulerConfig {
            transition: TransitionMode::Snap,
            looping: true,
        };
        let (mut scheduler, mut pose) = playing(config);
        scheduler.advance(1.0, &mut pose);
        assert!(close(pose.rotation(1), rotation_a()));
        assert_eq!(scheduler.pending().len(), 1);
        scheduler.advance(0.25, &mut pose);
        assert_eq!(scheduler.position_ms(), Some(250.0));
    }

    #[test]
    fn test_rotate_bones() {
        let skeleton = skeleton();
        let mut scheduler = AnimationScheduler::default();
        let mut pose = Pose::new(skeleton.len());

        let applied = scheduler
            .rotate_bones(
                &skeleton,
                &["hand", "missing"],
                &[Quat::from_rotation_y(1.0), Quat::IDENTITY],
                None,
                &mut pose,
            )
            .unwrap();
        assert_eq!(applied, 1);
        assert!(close(pose.rotation(2), Quat::from_rotation_y(1.0)));

        scheduler
            .rotate_bones(&skeleton, &["hand"], &[Quat::IDENTITY], Some(200.0), &mut pose)
            .unwrap();
        scheduler.advance(0.1, &mut pose);
        assert!(close(pose.rotation(2), Quat::from_rotation_y(0.5)));
        scheduler.advance(0.1, &mut pose);
        assert!(close(pose.rotation(2), Quat::IDENTITY));
    }

    #[test]
    fn test_rotate_bones_length_mismatch() {
        let skeleton = skeleton();
        let mut scheduler = AnimationScheduler::default();
        let mut pose = Pose::new(skeleton.len());
        let err = scheduler
            .rotate_bones(&skeleton, &["hand"], &[], None, &mut pose)
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::LengthMismatch {
                names: 1,
                rotations: 0
            }
        ));
    }
}
