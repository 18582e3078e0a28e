//! Raw keyframe records as stored in the file

use std::io::Write;

use glam::{Quat, Vec3};
use mmd_data::BinaryReader;
use mmd_data::io_ext::WriteExt;
use mmd_data::types::DataW;

use crate::error::Result;

pub const BONE_NAME_SIZE: usize = 15;
pub const MORPH_NAME_SIZE: usize = 15;
pub const INTERPOLATION_SIZE: usize = 64;

/// Encoded size of one bone keyframe.
pub const BONE_KEYFRAME_SIZE: usize = BONE_NAME_SIZE + 4 + 12 + 16 + INTERPOLATION_SIZE;
/// Encoded size of one morph keyframe.
pub const MORPH_KEYFRAME_SIZE: usize = MORPH_NAME_SIZE + 4 + 4;

/// Linear easing handles for the four channels (X, Y, Z, rotation).
pub const LINEAR_INTERPOLATION: [u8; INTERPOLATION_SIZE] = {
    let mut table = [0u8; INTERPOLATION_SIZE];
    let mut i = 0;
    while i < INTERPOLATION_SIZE {
        table[i] = if i % 16 < 8 { 20 } else { 107 };
        i += 1;
    }
    table
};

#[derive(Debug, Clone, PartialEq)]
pub struct BoneKeyframe {
    pub bone_name: String,
    pub frame: u32,
    pub translation: Vec3,
    pub rotation: Quat,
    /// Bezier easing handles. Kept for writing; playback snaps to keyframes.
    pub interpolation: [u8; INTERPOLATION_SIZE],
}

impl BoneKeyframe {
    pub fn new(bone_name: impl Into<String>, frame: u32, translation: Vec3, rotation: Quat) -> Self {
        Self {
            bone_name: bone_name.into(),
            frame,
            translation,
            rotation,
            interpolation: LINEAR_INTERPOLATION,
        }
    }

    pub fn parse(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let bone_name = reader.read_fixed_str(BONE_NAME_SIZE)?;
        let frame = reader.read_u32()?;
        let translation: Vec3 = reader.read()?;
        let rotation: Quat = reader.read()?;
        let mut interpolation = [0u8; INTERPOLATION_SIZE];
        interpolation.copy_from_slice(reader.bytes(INTERPOLATION_SIZE)?);
        Ok(Self {
            bone_name,
            frame,
            translation,
            rotation,
            interpolation,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_fixed_str(&self.bone_name, BONE_NAME_SIZE)?;
        writer.write_u32_le(self.frame)?;
        self.translation.write_to(writer)?;
        self.rotation.write_to(writer)?;
        writer.write_all(&self.interpolation)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MorphKeyframe {
    pub morph_name: String,
    pub frame: u32,
    pub weight: f32,
}

impl MorphKeyframe {
    pub fn new(morph_name: impl Into<String>, frame: u32, weight: f32) -> Self {
        Self {
            morph_name: morph_name.into(),
            frame,
            weight,
        }
    }

    pub fn parse(reader: &mut BinaryReader<'_>) -> Result<Self> {
        Ok(Self {
            morph_name: reader.read_fixed_str(MORPH_NAME_SIZE)?,
            frame: reader.read()?,
            weight: reader.read()?,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_fixed_str(&self.morph_name, MORPH_NAME_SIZE)?;
        self.frame.write_to(writer)?;
        self.weight.write_to(writer)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bone_keyframe_size() {
        let keyframe = BoneKeyframe::new("center", 30, Vec3::X, Quat::IDENTITY);
        let mut data = Vec::new();
        keyframe.write(&mut data).unwrap();
        assert_eq!(data.len(), 111);
        assert_eq!(data.len(), BONE_KEYFRAME_SIZE);

        let parsed = BoneKeyframe::parse(&mut BinaryReader::new(&data)).unwrap();
        assert_eq!(parsed, keyframe);
    }

    #[test]
    fn test_morph_keyframe_size() {
        let mut data = Vec::new();
        MorphKeyframe::new("blink", 5, 1.0).write(&mut data).unwrap();
        assert_eq!(data.len(), MORPH_KEYFRAME_SIZE);
    }
}
