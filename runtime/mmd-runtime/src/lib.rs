//! Animation and physics runtime for PMX models.
//!
//! Takes a parsed model and VMD keyframe tracks and produces one world
//! matrix per bone every frame:
//!
//! 1. the [`AnimationScheduler`] changes bone local rotations
//! 2. the [`PoseEvaluator`] turns them into world matrices
//! 3. the [`PhysicsWorld`] moves bone-following bodies and steps
//! 4. dynamic bodies overwrite their bones' world matrices
//!
//! [`Session`] runs these steps in order for a single model.
//!
//! # Example
//!
//! ```no_run
//! use mmd_runtime::Session;
//!
//! let mut session = Session::default();
//! session.load_model(&std::fs::read("model.pmx").unwrap()).unwrap();
//! session.load_animation(&std::fs::read("dance.vmd").unwrap()).unwrap();
//! session.play().unwrap();
//!
//! let world = session.update(1.0 / 60.0);
//! println!("{} bones", world.len());
//! ```

pub mod animation;
pub mod config;
pub mod error;
pub mod physics;
pub mod pose;
pub mod session;

pub use animation::AnimationScheduler;
pub use config::{PhysicsConfig, RuntimeConfig, SchedulerConfig, TransitionMode};
pub use error::{Result, RuntimeError};
pub use physics::PhysicsWorld;
pub use pose::{Pose, PoseEvaluator};
pub use session::Session;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
