//! Parser and writer for PMX 2.x model files.
//!
//! A PMX file holds a skinned mesh together with its skeleton, materials,
//! rigidbodies and joints. This crate reads all of those into a
//! [`PmxModel`]. Morphs and display frames are walked but not kept, and
//! vertex skin weights are normalised to fixed-point values summing to 255
//! once the bone count is known.
//!
//! # Example
//!
//! ```no_run
//! use mmd_pmx::PmxModel;
//!
//! let model = PmxModel::load("model.pmx").unwrap();
//! for bone in model.skeleton.bones() {
//!     println!("{} parent={:?}", bone.name, bone.parent);
//! }
//! ```

pub mod bone;
pub mod error;
pub mod header;
pub mod joint;
pub mod material;
pub mod model;
pub mod morph;
pub mod rigidbody;
pub mod skeleton;
pub mod vertex;

pub use bone::{AppendTransform, Bone, BoneFlags, BoneTail, IkChain, IkLink};
pub use error::{PmxError, Result};
pub use header::PmxHeader;
pub use joint::Joint;
pub use material::{Material, MaterialFlags, SphereMode, ToonRef};
pub use model::PmxModel;
pub use rigidbody::{Rigidbody, RigidbodyMode, RigidbodyShape};
pub use skeleton::Skeleton;
pub use vertex::{Deform, SkinWeights, Vertex};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
