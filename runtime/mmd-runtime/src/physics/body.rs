//! One simulated body per PMX rigidbody

use std::cell::OnceCell;

use glam::Mat4;
use mmd_pmx::{Rigidbody, RigidbodyMode, RigidbodyShape};
use rapier3d::prelude::{
    Collider, ColliderBuilder, Group, InteractionGroups, RigidBody, RigidBodyBuilder,
    RigidBodyHandle,
};

use super::convert::{inverse_or_identity, to_isometry};
use crate::config::PhysicsConfig;

/// Radius of the stand-in ball given to bodies without usable volume.
pub const DEGENERATE_RADIUS: f32 = 1e-3;

/// Lightest mass handed to the solver for a dynamic body.
pub const MIN_DYNAMIC_MASS: f32 = 1e-3;

/// How a body relates to its bone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Follows no bone and never moves.
    Static,
    /// Placed from its bone every tick.
    Kinematic,
    /// Simulated; drives its bone.
    Dynamic,
    /// Simulated; drives its bone's rotation while the bone keeps its
    /// animated translation.
    DynamicWithBonePosition,
}

impl BodyKind {
    pub fn from_rigidbody(rigidbody: &Rigidbody, bone_count: usize) -> Self {
        let has_bone = rigidbody.bone.is_some_and(|b| b < bone_count);
        match rigidbody.mode {
            RigidbodyMode::FollowBone if has_bone => Self::Kinematic,
            RigidbodyMode::FollowBone => Self::Static,
            RigidbodyMode::Dynamic => Self::Dynamic,
            RigidbodyMode::DynamicWithBonePosition => Self::DynamicWithBonePosition,
        }
    }

    pub fn is_dynamic(self) -> bool {
        matches!(self, Self::Dynamic | Self::DynamicWithBonePosition)
    }
}

/// Bookkeeping for one rigidbody in the simulation
#[derive(Debug, Clone)]
pub struct PhysicsBody {
    /// The record this body was built from, holding the cached body offset
    pub rigidbody: Rigidbody,
    /// Owning bone, `None` when the index is out of range
    pub bone: Option<usize>,
    pub kind: BodyKind,
    /// `None` when the body could not be built and takes no part in the
    /// simulation
    pub handle: Option<RigidBodyHandle>,
    /// Whether the body takes part in collision detection
    pub colliding: bool,
    /// Small, light or jointed; its raised sleep thresholds let it come to
    /// rest at higher residual velocities
    pub problematic: bool,
    offset_inverse: OnceCell<Mat4>,
}

impl PhysicsBody {
    pub fn new(rigidbody: Rigidbody, bone_count: usize) -> Self {
        Self {
            bone: rigidbody.bone.filter(|&b| b < bone_count),
            kind: BodyKind::from_rigidbody(&rigidbody, bone_count),
            handle: None,
            colliding: rigidbody.collision_mask != 0 && !rigidbody.is_degenerate(),
            problematic: false,
            offset_inverse: OnceCell::new(),
            rigidbody,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.handle.is_some()
    }

    /// Bone-relative body transform, `inverse_bind[bone] × shape`, cached
    /// on first use.
    pub fn offset(&self, inverse_bind: &[Mat4]) -> Mat4 {
        self.rigidbody.body_offset(inverse_bind)
    }

    pub fn offset_inverse(&self, inverse_bind: &[Mat4]) -> Mat4 {
        *self
            .offset_inverse
            .get_or_init(|| inverse_or_identity(self.offset(inverse_bind)))
    }

    /// Body transform for a bone world matrix.
    pub fn target(&self, bone_world: Mat4, inverse_bind: &[Mat4]) -> Mat4 {
        bone_world * self.offset(inverse_bind)
    }

    /// Bone world matrix for a body transform.
    pub fn bone_world(&self, body_world: Mat4, inverse_bind: &[Mat4]) -> Mat4 {
        body_world * self.offset_inverse(inverse_bind)
    }

    /// Build the rapier body and collider at the rigidbody's bind pose.
    ///
    /// Returns `None` when the record holds values the solver cannot use.
    pub fn build(&self, config: &PhysicsConfig) -> Option<(RigidBody, Collider)> {
        let rigidbody = &self.rigidbody;
        if !has_finite_values(rigidbody) {
            return None;
        }

        let builder = match self.kind {
            BodyKind::Static => RigidBodyBuilder::fixed(),
            BodyKind::Kinematic => RigidBodyBuilder::kinematic_position_based(),
            BodyKind::Dynamic | BodyKind::DynamicWithBonePosition => RigidBodyBuilder::dynamic(),
        };
        let mut body = builder
            .position(to_isometry(rigidbody.shape_transform()))
            .linear_damping(rigidbody.linear_damping.max(0.0))
            .angular_damping(rigidbody.angular_damping.max(0.0))
            .build();

        if self.problematic {
            let activation = body.activation_mut();
            activation.normalized_linear_threshold *= config.sleep_threshold_scale;
            activation.angular_threshold *= config.sleep_threshold_scale;
        }

        let size = rigidbody.size;
        let collider = if rigidbody.is_degenerate() {
            ColliderBuilder::ball(DEGENERATE_RADIUS)
        } else {
            match rigidbody.shape {
                RigidbodyShape::Sphere => ColliderBuilder::ball(size.x),
                RigidbodyShape::Box => ColliderBuilder::cuboid(size.x, size.y, size.z),
                RigidbodyShape::Capsule => ColliderBuilder::capsule_y(size.y / 2.0, size.x),
            }
        };

        let mass = if self.kind.is_dynamic() {
            rigidbody.mass.max(MIN_DYNAMIC_MASS)
        } else {
            0.0
        };
        let groups = if self.colliding {
            InteractionGroups::new(
                Group::from_bits_truncate(1 << rigidbody.group.min(15)),
                Group::from_bits_truncate(u32::from(rigidbody.collision_mask)),
            )
        } else {
            InteractionGroups::none()
        };

        let collider = collider
            .mass(mass)
            .friction(rigidbody.friction.max(0.0))
            .restitution(rigidbody.restitution.max(0.0))
            .collision_groups(groups)
            .build();

        Some((body, collider))
    }
}

/// Whether a rigidbody is small and light enough to jitter.
pub fn is_small_and_light(rigidbody: &Rigidbody, config: &PhysicsConfig) -> bool {
    rigidbody.mass < config.light_mass && rigidbody.size.max_element() < config.small_size
}

fn has_finite_values(rigidbody: &Rigidbody) -> bool {
    rigidbody.position.is_finite()
        && rigidbody.rotation.is_finite()
        && rigidbody.mass.is_finite()
        && rigidbody.linear_damping.is_finite()
        && rigidbody.angular_damping.is_finite()
        && rigidbody.restitution.is_finite()
        && rigidbody.friction.is_finite()
}
