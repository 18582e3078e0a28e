//! The rigidbody simulation of one loaded model

use std::collections::HashSet;

use glam::{Mat4, Vec3};
use mmd_pmx::{Joint, Rigidbody};
use rapier3d::prelude::{
    CCDSolver, ColliderSet, DefaultBroadPhase, ImpulseJointSet, IntegrationParameters,
    IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline, QueryPipeline, RigidBodySet,
};
use rapier3d::na::Vector3;

use super::body::{BodyKind, PhysicsBody, is_small_and_light};
use super::convert::{from_vector, to_isometry, to_mat4, to_vector};
use super::joint::{self, PhysicsJoint};
use crate::config::PhysicsConfig;

/// Rigidbodies and joints of one model, coupled to its bone matrices
///
/// Each tick runs in two phases. First `step` moves bone-following
/// bodies to their bones and advances the simulation; then every dynamic
/// body overwrites its bone's world matrix. Bone matrices are only ever
/// passed in, never held.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    bodies: Vec<PhysicsBody>,
    joint_records: Vec<Joint>,
    joints: Vec<PhysicsJoint>,
    joints_created: bool,

    gravity: Vector3<f32>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
}

impl PhysicsWorld {
    /// Build one body per rigidbody at its bind pose
    ///
    /// A rigidbody whose record cannot be simulated is logged and left
    /// disabled; the others are unaffected. Joints are created on the
    /// first `step` or `reset`, against the body transforms at that time.
    pub fn new(
        rigidbodies: &[Rigidbody],
        joints: &[Joint],
        bone_count: usize,
        config: PhysicsConfig,
    ) -> Self {
        let jointed: HashSet<usize> = joints
            .iter()
            .flat_map(|j| [j.rigidbody_a, j.rigidbody_b])
            .flatten()
            .collect();

        let mut rigid_body_set = RigidBodySet::new();
        let mut collider_set = ColliderSet::new();
        let mut bodies = Vec::with_capacity(rigidbodies.len());

        for (index, rigidbody) in rigidbodies.iter().enumerate() {
            let mut body = PhysicsBody::new(rigidbody.clone(), bone_count);
            body.problematic = body.kind.is_dynamic()
                && (jointed.contains(&index) || is_small_and_light(rigidbody, &config));

            match body.build(&config) {
                Some((rapier_body, collider)) => {
                    let handle = rigid_body_set.insert(rapier_body);
                    collider_set.insert_with_parent(collider, handle, &mut rigid_body_set);
                    body.handle = Some(handle);
                }
                None => log::warn!(
                    "Rigidbody {} '{}' has non-finite values, disabling it",
                    index,
                    rigidbody.name
                ),
            }
            bodies.push(body);
        }

        log::debug!(
            "Built {} of {} rigidbodies ({} problematic)",
            bodies.iter().filter(|b| b.is_enabled()).count(),
            bodies.len(),
            bodies.iter().filter(|b| b.problematic).count()
        );

        Self {
            gravity: to_vector(config.gravity),
            config,
            bodies,
            joint_records: joints.to_vec(),
            joints: Vec::new(),
            joints_created: false,
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_body_set,
            collider_set,
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
        }
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Force every body back to its bone-driven pose, clear its velocity
    /// and forces, then run a prime step.
    pub fn reset(&mut self, world: &mut [Mat4], inverse_bind: &[Mat4]) {
        for body in &self.bodies {
            let Some(rapier_body) = body.handle.and_then(|h| self.rigid_body_set.get_mut(h))
            else {
                continue;
            };
            let target = match body.bone {
                Some(bone) => body.target(bone_world(world, bone), inverse_bind),
                None => body.rigidbody.shape_transform(),
            };
            rapier_body.set_position(to_isometry(target), false);
            rapier_body.set_linvel(Vector3::zeros(), false);
            rapier_body.set_angvel(Vector3::zeros(), false);
            rapier_body.reset_forces(false);
            rapier_body.reset_torques(false);
            if body.kind.is_dynamic() {
                rapier_body.wake_up(true);
            }
        }
        self.step(0.0, world, inverse_bind);
    }

    /// Advance the simulation by `dt` seconds and write dynamic bodies back
    /// into `world`
    ///
    /// `dt` is clamped to the configured maximum. A `dt` of zero (or less)
    /// is a prime step: bone-following bodies are synced, joints created
    /// and dynamic bones written back, without integrating.
    pub fn step(&mut self, dt: f32, world: &mut [Mat4], inverse_bind: &[Mat4]) {
        let dt = if dt.is_finite() {
            dt.min(self.config.max_delta)
        } else {
            0.0
        };

        self.sync_kinematic(world, inverse_bind);
        self.create_joints();

        if !self.config.enabled {
            return;
        }

        if dt > 0.0 {
            let substeps = self.config.substeps.max(1);
            self.integration_parameters.dt = dt / substeps as f32;
            for _ in 0..substeps {
                self.pipeline.step(
                    &self.gravity,
                    &self.integration_parameters,
                    &mut self.islands,
                    &mut self.broad_phase,
                    &mut self.narrow_phase,
                    &mut self.rigid_body_set,
                    &mut self.collider_set,
                    &mut self.impulse_joint_set,
                    &mut self.multibody_joint_set,
                    &mut self.ccd_solver,
                    None::<&mut QueryPipeline>,
                    &(),
                    &(),
                );
            }
        }

        self.write_back(world, inverse_bind);
    }

    fn sync_kinematic(&mut self, world: &[Mat4], inverse_bind: &[Mat4]) {
        for body in &self.bodies {
            let (BodyKind::Kinematic, Some(bone)) = (body.kind, body.bone) else {
                continue;
            };
            let Some(rapier_body) = body.handle.and_then(|h| self.rigid_body_set.get_mut(h))
            else {
                continue;
            };
            let target = body.target(bone_world(world, bone), inverse_bind);
            rapier_body.set_position(to_isometry(target), true);
            rapier_body.set_linvel(Vector3::zeros(), false);
            rapier_body.set_angvel(Vector3::zeros(), false);
        }
    }

    fn write_back(&self, world: &mut [Mat4], inverse_bind: &[Mat4]) {
        for body in &self.bodies {
            if !body.kind.is_dynamic() {
                continue;
            }
            let Some(bone) = body.bone.filter(|&b| b < world.len()) else {
                continue;
            };
            let Some(rapier_body) = body.handle.and_then(|h| self.rigid_body_set.get(h)) else {
                continue;
            };

            let mut bone_matrix = body.bone_world(to_mat4(rapier_body.position()), inverse_bind);
            if body.kind == BodyKind::DynamicWithBonePosition {
                bone_matrix.w_axis = world[bone].w_axis;
            }
            if bone_matrix.is_finite() {
                world[bone] = bone_matrix;
            }
        }
    }

    /// Create the joints against the current body transforms, once.
    fn create_joints(&mut self) {
        if self.joints_created {
            return;
        }
        self.joints_created = true;

        let mut skipped = 0usize;
        for record in &self.joint_records {
            let Some((a, b)) = self.joint_bodies(record) else {
                log::debug!("Skipping joint '{}' with unusable rigidbodies", record.name);
                skipped += 1;
                continue;
            };
            let (Some(handle_a), Some(handle_b)) = (self.bodies[a].handle, self.bodies[b].handle)
            else {
                skipped += 1;
                continue;
            };
            let (Some(body_a), Some(body_b)) = (
                self.rigid_body_set.get(handle_a),
                self.rigid_body_set.get(handle_b),
            ) else {
                skipped += 1;
                continue;
            };

            let (generic, frame_a) =
                joint::build(record, to_mat4(body_a.position()), to_mat4(body_b.position()));
            let handle = self
                .impulse_joint_set
                .insert(handle_a, handle_b, generic, true);
            self.joints.push(PhysicsJoint {
                name: record.name.clone(),
                body_a: a,
                body_b: b,
                frame_a,
                handle,
            });
        }

        if skipped > 0 {
            log::warn!(
                "Skipped {} of {} joints",
                skipped,
                self.joint_records.len()
            );
        }
    }

    /// Both rigidbody indices of a joint, when in range and distinct.
    fn joint_bodies(&self, record: &Joint) -> Option<(usize, usize)> {
        let count = self.bodies.len();
        let a = record.rigidbody_a.filter(|&a| a < count)?;
        let b = record.rigidbody_b.filter(|&b| b < count)?;
        (a != b).then_some((a, b))
    }

    pub fn bodies(&self) -> &[PhysicsBody] {
        &self.bodies
    }

    pub fn joints(&self) -> &[PhysicsJoint] {
        &self.joints
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn enabled_body_count(&self) -> usize {
        self.bodies.iter().filter(|b| b.is_enabled()).count()
    }

    /// Current world transform of a body, `None` when out of range or
    /// disabled.
    pub fn body_transform(&self, index: usize) -> Option<Mat4> {
        let handle = self.bodies.get(index)?.handle?;
        self.rigid_body_set
            .get(handle)
            .map(|body| to_mat4(body.position()))
    }

    /// Linear and angular velocity of a body.
    pub fn body_velocity(&self, index: usize) -> Option<(Vec3, Vec3)> {
        let handle = self.bodies.get(index)?.handle?;
        self.rigid_body_set
            .get(handle)
            .map(|body| (from_vector(body.linvel()), from_vector(body.angvel())))
    }

    /// World transform of every rigidbody, identity for disabled ones.
    pub fn rigidbody_transforms(&self) -> Vec<Mat4> {
        (0..self.bodies.len())
            .map(|i| self.body_transform(i).unwrap_or(Mat4::IDENTITY))
            .collect()
    }

    /// World transform of every created joint, following body A.
    pub fn joint_transforms(&self) -> Vec<Mat4> {
        self.joints
            .iter()
            .map(|joint| {
                self.body_transform(joint.body_a)
                    .map_or(Mat4::IDENTITY, |body| body * joint.frame_a)
            })
            .collect()
    }
}

fn bone_world(world: &[Mat4], bone: usize) -> Mat4 {
    world.get(bone).copied().unwrap_or(Mat4::IDENTITY)
}
