//! Rigidbody physics for PMX models
//!
//! This module couples a model's rigidbodies and joints to its bone world
//! matrices using rapier:
//! - bone-following bodies are moved to their bones every tick
//! - dynamic bodies are simulated and write their bones back
//! - joints become six degree of freedom spring joints
//! - records the solver cannot use are disabled, not fatal
//!
//! # Example
//!
//! ```rust,ignore
//! use mmd_runtime::physics::PhysicsWorld;
//!
//! let mut physics = PhysicsWorld::new(
//!     &model.rigidbodies,
//!     &model.joints,
//!     model.skeleton.len(),
//!     PhysicsConfig::default(),
//! );
//! let inverse_bind = model.skeleton.inverse_bind_matrices();
//! physics.reset(&mut world, inverse_bind);
//!
//! // every frame, after the pose is evaluated
//! physics.step(delta_seconds, &mut world, inverse_bind);
//! ```

mod body;
mod convert;
mod joint;
mod world;

pub use body::{BodyKind, DEGENERATE_RADIUS, MIN_DYNAMIC_MASS, PhysicsBody};
pub use joint::{AxisLimit, PhysicsJoint, normalize_angle};
pub use world::PhysicsWorld;
