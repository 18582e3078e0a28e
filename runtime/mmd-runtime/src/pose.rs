//! Bone world matrix computation
//!
//! A [`Pose`] holds the animated local rotation and translation of every
//! bone. [`PoseEvaluator::evaluate`] turns it into one world matrix per
//! bone. Bone order in the file does not guarantee that parents come
//! first, so each bone's parent and append parent are resolved on demand
//! and memoised for the pass.

use glam::{Mat4, Quat, Vec3};
use mmd_pmx::Skeleton;

/// Animated local state of every bone, relative to the bind pose
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pose {
    rotations: Vec<Quat>,
    translations: Vec<Vec3>,
}

impl Pose {
    /// Bind pose for `bone_count` bones
    pub fn new(bone_count: usize) -> Self {
        Self {
            rotations: vec![Quat::IDENTITY; bone_count],
            translations: vec![Vec3::ZERO; bone_count],
        }
    }

    pub fn len(&self) -> usize {
        self.rotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rotations.is_empty()
    }

    /// Identity rotation and zero translation on every bone.
    pub fn reset(&mut self) {
        self.rotations.fill(Quat::IDENTITY);
        self.translations.fill(Vec3::ZERO);
    }

    pub fn rotation(&self, bone: usize) -> Quat {
        self.rotations.get(bone).copied().unwrap_or(Quat::IDENTITY)
    }

    pub fn translation(&self, bone: usize) -> Vec3 {
        self.translations.get(bone).copied().unwrap_or(Vec3::ZERO)
    }

    /// Set a bone's local rotation. Non-finite or zero quaternions become
    /// identity; out of range bones are ignored.
    pub fn set_rotation(&mut self, bone: usize, rotation: Quat) {
        if let Some(slot) = self.rotations.get_mut(bone) {
            *slot = if rotation.is_finite() && rotation.length_squared() > f32::EPSILON {
                rotation.normalize()
            } else {
                Quat::IDENTITY
            };
        }
    }

    pub fn set_translation(&mut self, bone: usize, translation: Vec3) {
        if let Some(slot) = self.translations.get_mut(bone) {
            *slot = if translation.is_finite() {
                translation
            } else {
                Vec3::ZERO
            };
        }
    }

    pub fn rotations(&self) -> &[Quat] {
        &self.rotations
    }

    pub fn translations(&self) -> &[Vec3] {
        &self.translations
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Computes bone world matrices from a skeleton and a pose
///
/// Keeps its buffers between calls so evaluating every frame does not
/// allocate once the bone count is stable.
#[derive(Debug, Clone, Default)]
pub struct PoseEvaluator {
    world: Vec<Mat4>,
    /// Rotation after append blending, used by bones that append from this one
    rotations: Vec<Quat>,
    translations: Vec<Vec3>,
    marks: Vec<Mark>,
    stack: Vec<usize>,
}

impl PoseEvaluator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute the world matrix of every bone
    ///
    /// `local = T(bind translation + animated translation) × R(rotation)`
    /// and `world = parent world × local`. Append bones first blend in
    /// `ratio` of their append parent's rotation and translation; a
    /// negative ratio uses the inverse rotation. A dependency that is
    /// part of an append cycle is treated as absent.
    pub fn evaluate(&mut self, skeleton: &Skeleton, pose: &Pose) -> &[Mat4] {
        let count = skeleton.len();
        self.world.clear();
        self.world.resize(count, Mat4::IDENTITY);
        self.rotations.clear();
        self.rotations.resize(count, Quat::IDENTITY);
        self.translations.clear();
        self.translations.resize(count, Vec3::ZERO);
        self.marks.clear();
        self.marks.resize(count, Mark::Unvisited);

        for start in 0..count {
            if self.marks[start] == Mark::Done {
                continue;
            }
            self.stack.push(start);
            while let Some(&index) = self.stack.last() {
                match self.marks[index] {
                    Mark::Done => {
                        self.stack.pop();
                    }
                    Mark::Unvisited => {
                        self.marks[index] = Mark::InProgress;
                        for dependency in dependencies(skeleton, index).into_iter().flatten() {
                            if self.marks[dependency] == Mark::Unvisited {
                                self.stack.push(dependency);
                            }
                        }
                    }
                    Mark::InProgress => {
                        self.compute(skeleton, pose, index);
                        self.marks[index] = Mark::Done;
                        self.stack.pop();
                    }
                }
            }
        }

        &self.world
    }

    fn compute(&mut self, skeleton: &Skeleton, pose: &Pose, index: usize) {
        let Some(bone) = skeleton.bone(index) else {
            return;
        };
        let resolved = |dependency: Option<usize>| {
            dependency.filter(|&d| self.marks.get(d) == Some(&Mark::Done))
        };

        let mut rotation = pose.rotation(index);
        let mut translation = pose.translation(index);

        if let Some(append) = &bone.append
            && let Some(source) = resolved(append.parent)
            && append.ratio.is_finite()
        {
            if append.rotate {
                let delta = if append.ratio < 0.0 {
                    self.rotations[source].inverse()
                } else {
                    self.rotations[source]
                };
                rotation = Quat::IDENTITY.slerp(delta, append.ratio.abs()) * rotation;
            }
            if append.translate {
                translation += self.translations[source] * append.ratio;
            }
        }

        self.rotations[index] = rotation;
        self.translations[index] = translation;

        let local = Mat4::from_rotation_translation(rotation, bone.translation + translation);
        let parent_world = resolved(bone.parent).map_or(Mat4::IDENTITY, |p| self.world[p]);
        self.world[index] = parent_world * local;
    }

    /// World matrices from the last evaluation.
    pub fn world_matrices(&self) -> &[Mat4] {
        &self.world
    }

    /// Mutable world matrices, for physics to overwrite dynamic bones.
    pub fn world_matrices_mut(&mut self) -> &mut [Mat4] {
        &mut self.world
    }

    /// World matrix of a bone, identity when out of range.
    pub fn world(&self, bone: usize) -> Mat4 {
        self.world.get(bone).copied().unwrap_or(Mat4::IDENTITY)
    }
}

/// Bones that must be evaluated before `index`: its parent and its append
/// parent, when in range.
fn dependencies(skeleton: &Skeleton, index: usize) -> [Option<usize>; 2] {
    let count = skeleton.len();
    let Some(bone) = skeleton.bone(index) else {
        return [None, None];
    };
    let parent = bone.parent.filter(|&p| p < count);
    let append = bone
        .append
        .and_then(|a| a.parent)
        .filter(|&a| a < count && a != index);
    [parent, append]
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmd_pmx::{AppendTransform, Bone};
    use std::f32::consts::FRAC_PI_2;

    fn assert_near(actual: Vec3, expected: Vec3) {
        assert!(
            actual.abs_diff_eq(expected, 1e-5),
            "expected {expected:?}, got {actual:?}"
        );
    }

    fn chain() -> Skeleton {
        Skeleton::new(vec![
            Bone::new("root", Vec3::ZERO, None),
            Bone::new("mid", Vec3::new(0.0, 2.0, 0.0), Some(0)),
            Bone::new("tip", Vec3::new(0.0, 3.0, 0.0), Some(1)),
        ])
        .unwrap()
    }

    #[test]
    fn test_chain_accumulates_offsets() {
        let skeleton = chain();
        let pose = Pose::new(skeleton.len());
        let mut evaluator = PoseEvaluator::new();
        let world = evaluator.evaluate(&skeleton, &pose);
        assert_eq!(world.len(), 3);
        assert_eq!(world[2].w_axis.y, 3.0);
    }

    #[test]
    fn test_parent_after_child() {
        let skeleton = Skeleton::new(vec![
            Bone::new("tip", Vec3::new(0.0, 3.0, 0.0), Some(2)),
            Bone::new("root", Vec3::ZERO, None),
            Bone::new("mid", Vec3::new(0.0, 2.0, 0.0), Some(1)),
        ])
        .unwrap();
        let mut pose = Pose::new(3);
        pose.set_rotation(1, Quat::from_rotation_z(FRAC_PI_2));

        let mut evaluator = PoseEvaluator::new();
        evaluator.evaluate(&skeleton, &pose);
        // Rotating the root a quarter turn about Z swings +Y onto -X.
        assert_near(evaluator.world(0).w_axis.truncate(), Vec3::new(-3.0, 0.0, 0.0));
        assert_near(evaluator.world(2).w_axis.truncate(), Vec3::new(-2.0, 0.0, 0.0));
    }

    #[test]
    fn test_animated_translation() {
        let skeleton = chain();
        let mut pose = Pose::new(3);
        pose.set_translation(0, Vec3::new(1.0, 0.0, 0.0));
        let mut evaluator = PoseEvaluator::new();
        evaluator.evaluate(&skeleton, &pose);
        assert_near(evaluator.world(2).w_axis.truncate(), Vec3::new(1.0, 3.0, 0.0));
    }

    fn append_skeleton(ratio: f32) -> Skeleton {
        let mut follower = Bone::new("follower", Vec3::X, None);
        follower.append = Some(AppendTransform {
            parent: Some(1),
            ratio,
            rotate: true,
            translate: true,
        });
        Skeleton::new(vec![follower, Bone::new("source", Vec3::ZERO, None)]).unwrap()
    }

    #[test]
    fn test_append_half_rotation() {
        let skeleton = append_skeleton(0.5);
        let mut pose = Pose::new(2);
        pose.set_rotation(1, Quat::from_rotation_y(FRAC_PI_2));
        pose.set_translation(1, Vec3::new(0.0, 4.0, 0.0));

        let mut evaluator = PoseEvaluator::new();
        evaluator.evaluate(&skeleton, &pose);
        let (_, rotation, translation) = evaluator.world(0).to_scale_rotation_translation();
        assert!(rotation.angle_between(Quat::from_rotation_y(FRAC_PI_2 / 2.0)) < 1e-4);
        assert_near(translation, Vec3::new(1.0, 2.0, 0.0));
    }

    #[test]
    fn test_append_negative_ratio_inverts() {
        let skeleton = append_skeleton(-1.0);
        let mut pose = Pose::new(2);
        pose.set_rotation(1, Quat::from_rotation_y(0.4));

        let mut evaluator = PoseEvaluator::new();
        evaluator.evaluate(&skeleton, &pose);
        let (_, rotation, _) = evaluator.world(0).to_scale_rotation_translation();
        assert!(rotation.angle_between(Quat::from_rotation_y(-0.4)) < 1e-4);
    }

    #[test]
    fn test_append_cycle_terminates() {
        let mut a = Bone::new("a", Vec3::ZERO, None);
        let mut b = Bone::new("b", Vec3::Y, None);
        a.append = Some(AppendTransform {
            parent: Some(1),
            ratio: 1.0,
            rotate: true,
            translate: false,
        });
        b.append = Some(AppendTransform {
            parent: Some(0),
            ratio: 1.0,
            rotate: true,
            translate: false,
        });
        let skeleton = Skeleton::new(vec![a, b]).unwrap();
        let mut pose = Pose::new(2);
        pose.set_rotation(0, Quat::from_rotation_x(0.3));

        let mut evaluator = PoseEvaluator::new();
        let world = evaluator.evaluate(&skeleton, &pose);
        assert!(world.iter().all(|m| m.is_finite()));
    }

    #[test]
    fn test_bad_rotation_is_identity() {
        let mut pose = Pose::new(1);
        pose.set_rotation(0, Quat::from_xyzw(f32::NAN, 0.0, 0.0, 1.0));
        assert_eq!(pose.rotation(0), Quat::IDENTITY);
        pose.set_rotation(7, Quat::from_rotation_x(1.0));
        assert_eq!(pose.rotation(7), Quat::IDENTITY);
    }
}
