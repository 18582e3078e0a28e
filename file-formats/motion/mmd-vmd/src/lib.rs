//! Parser and writer for VMD motion files.
//!
//! A VMD file is a flat list of keyframes addressed by bone name and frame
//! number at 30 frames per second. [`VmdMotion::parse`] reads the raw
//! records and [`VmdMotion::bone_tracks`] turns them into per-bone,
//! time-sorted [`KeyframeTrack`]s with times in seconds.
//!
//! Bone and morph names are Shift-JIS. With the default `shift-jis`
//! feature they are decoded properly; without it each byte maps to the
//! code point of the same value.
//!
//! # Example
//!
//! ```no_run
//! let data = std::fs::read("dance.vmd").unwrap();
//! for track in mmd_vmd::parse_tracks(&data).unwrap() {
//!     println!("{}: {} keyframes", track.bone_name, track.keyframes.len());
//! }
//! ```

pub mod error;
pub mod header;
pub mod keyframe;
pub mod motion;
pub mod track;

pub use error::{Result, VmdError};
pub use header::{VmdHeader, VmdVersion};
pub use keyframe::{BoneKeyframe, MorphKeyframe};
pub use motion::{VmdMotion, parse_tracks};
pub use track::{FRAMES_PER_SECOND, Keyframe, KeyframeTrack, MorphKey, MorphTrack};
