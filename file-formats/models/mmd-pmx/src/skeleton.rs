//! Bone hierarchy built from the parsed bone list
//!
//! The file stores absolute bind positions. Building a [`Skeleton`] repairs
//! dangling parent links, rejects parent cycles, converts positions to
//! parent-relative translations and computes one translation-only inverse
//! bind matrix per bone.

use std::collections::HashMap;

use glam::{Mat4, Vec3};

use crate::bone::Bone;
use crate::error::{PmxError, Result};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skeleton {
    bones: Vec<Bone>,
    inverse_bind: Vec<Mat4>,
    names: HashMap<String, usize>,
}

impl Skeleton {
    pub fn new(mut bones: Vec<Bone>) -> Result<Self> {
        let count = bones.len();
        for (index, bone) in bones.iter_mut().enumerate() {
            if let Some(parent) = bone.parent
                && parent >= count
            {
                log::warn!(
                    "Bone {} '{}' has out of range parent {}, treating it as a root",
                    index,
                    bone.name,
                    parent
                );
                bone.parent = None;
            }
        }

        check_acyclic(&bones)?;

        // Second pass: absolute positions to parent-relative translations.
        let absolute: Vec<Vec3> = bones.iter().map(|b| b.position).collect();
        for bone in &mut bones {
            bone.translation = match bone.parent {
                Some(parent) => bone.position - absolute[parent],
                None => bone.position,
            };
        }

        let mut names = HashMap::with_capacity(count);
        for (index, bone) in bones.iter().enumerate() {
            names.entry(bone.name.clone()).or_insert(index);
        }

        let mut skeleton = Self {
            bones,
            inverse_bind: Vec::new(),
            names,
        };
        skeleton.inverse_bind = skeleton.compute_inverse_bind();
        Ok(skeleton)
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Index of the first bone with this name.
    pub fn find(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    pub fn inverse_bind_matrices(&self) -> &[Mat4] {
        &self.inverse_bind
    }

    /// Inverse bind matrix of a bone, identity when out of range.
    pub fn inverse_bind(&self, index: usize) -> Mat4 {
        self.inverse_bind.get(index).copied().unwrap_or(Mat4::IDENTITY)
    }

    /// Bind position of every bone in model space, accumulated from the
    /// parent-relative translations. Each parent is resolved once.
    pub fn bind_positions(&self) -> Vec<Vec3> {
        let mut resolved: Vec<Option<Vec3>> = vec![None; self.bones.len()];
        let mut chain = Vec::new();

        for start in 0..self.bones.len() {
            let mut current = Some(start);
            while let Some(index) = current {
                if resolved[index].is_some() {
                    break;
                }
                chain.push(index);
                current = self.bones[index].parent;
            }
            while let Some(index) = chain.pop() {
                let base = self.bones[index]
                    .parent
                    .and_then(|p| resolved[p])
                    .unwrap_or(Vec3::ZERO);
                resolved[index] = Some(base + self.bones[index].translation);
            }
        }

        resolved.into_iter().map(Option::unwrap_or_default).collect()
    }

    /// One translation-only inverse bind matrix per bone.
    pub fn compute_inverse_bind(&self) -> Vec<Mat4> {
        self.bind_positions()
            .into_iter()
            .map(|position| Mat4::from_translation(-position))
            .collect()
    }

    /// Indices of the direct children of a bone.
    pub fn children(&self, index: usize) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(move |(_, bone)| bone.parent == Some(index))
            .map(|(child, _)| child)
    }

    /// Indices of the bones without a parent.
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, bone)| bone.parent.is_none())
            .map(|(index, _)| index)
    }
}

fn check_acyclic(bones: &[Bone]) -> Result<()> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        Unvisited,
        InProgress,
        Done,
    }

    let mut marks = vec![Mark::Unvisited; bones.len()];
    let mut chain = Vec::new();

    for start in 0..bones.len() {
        let mut current = Some(start);
        while let Some(index) = current {
            match marks[index] {
                Mark::Done => break,
                Mark::InProgress => {
                    return Err(PmxError::InvalidBoneHierarchy(format!(
                        "bone {} '{}' is its own ancestor",
                        index, bones[index].name
                    )));
                }
                Mark::Unvisited => {
                    marks[index] = Mark::InProgress;
                    chain.push(index);
                    current = bones[index].parent;
                }
            }
        }
        for index in chain.drain(..) {
            marks[index] = Mark::Done;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain() -> Vec<Bone> {
        vec![
            Bone::new("root", Vec3::ZERO, None),
            Bone::new("mid", Vec3::new(0.0, 1.0, 0.0), Some(0)),
            Bone::new("tip", Vec3::new(0.0, 3.0, 0.0), Some(1)),
        ]
    }

    #[test]
    fn test_translations_are_parent_relative() {
        let skeleton = Skeleton::new(chain()).unwrap();
        assert_eq!(skeleton.bones()[1].translation, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(skeleton.bones()[2].translation, Vec3::new(0.0, 2.0, 0.0));
    }

    #[test]
    fn test_inverse_bind_undoes_bind_position() {
        let skeleton = Skeleton::new(chain()).unwrap();
        let tip = skeleton.inverse_bind(2).transform_point3(Vec3::new(0.0, 3.0, 0.0));
        assert!(tip.length() < 0.001);
        assert_eq!(skeleton.inverse_bind(99), Mat4::IDENTITY);
    }

    #[test]
    fn test_out_of_range_parent_becomes_root() {
        let mut bones = chain();
        bones[2].parent = Some(42);
        let skeleton = Skeleton::new(bones).unwrap();
        assert_eq!(skeleton.bones()[2].parent, None);
        assert_eq!(skeleton.bones()[2].translation, Vec3::new(0.0, 3.0, 0.0));
        assert_eq!(skeleton.roots().collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut bones = chain();
        bones[0].parent = Some(2);
        let err = Skeleton::new(bones).unwrap_err();
        assert!(matches!(err, PmxError::InvalidBoneHierarchy(_)));

        let mut bones = chain();
        bones[1].parent = Some(1);
        assert!(Skeleton::new(bones).is_err());
    }

    #[test]
    fn test_name_lookup_prefers_first() {
        let mut bones = chain();
        bones.push(Bone::new("mid", Vec3::ZERO, None));
        let skeleton = Skeleton::new(bones).unwrap();
        assert_eq!(skeleton.find("mid"), Some(1));
        assert_eq!(skeleton.find("missing"), None);
        assert_eq!(skeleton.children(0).collect::<Vec<_>>(), vec![1]);
    }
}
