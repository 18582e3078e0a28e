//! Keyframe playback
//!
//! This module turns VMD keyframe tracks into changes of a [`Pose`]:
//! - binding track names to skeleton bones
//! - a single time-sorted timeline of transitions per playback
//! - snap or linear transitions between keyframes
//! - pause, resume, seek and looping
//! - direct rotation overrides with an optional slerp duration
//!
//! Bezier easing stored in the motion file is not evaluated.
//!
//! # Example
//!
//! ```rust,ignore
//! use mmd_runtime::animation::AnimationScheduler;
//! use mmd_runtime::Pose;
//!
//! let mut scheduler = AnimationScheduler::default();
//! scheduler.load(&tracks, &model.skeleton);
//! let mut pose = Pose::new(model.skeleton.len());
//! scheduler.play(&mut pose);
//!
//! // every frame
//! scheduler.advance(delta_seconds, &mut pose);
//! ```
//!
//! [`Pose`]: crate::pose::Pose

mod scheduler;
mod timeline;
mod tween;

pub use scheduler::AnimationScheduler;
pub use timeline::{BoundTrack, Timeline, Transition, bind_tracks};
pub use tween::Tween;
