use std::fs;
use std::io::Write;
use std::path::Path;

use mmd_data::BinaryReader;
use mmd_data::io_ext::WriteExt;

use crate::error::Result;
use crate::header::VmdHeader;
use crate::keyframe::{BONE_KEYFRAME_SIZE, BoneKeyframe, MORPH_KEYFRAME_SIZE, MorphKeyframe};
use crate::track::{KeyframeTrack, MorphTrack, build_morph_tracks, build_tracks};

pub const MAX_BONE_KEYFRAMES: usize = 16_777_216;
pub const MAX_MORPH_KEYFRAMES: usize = 16_777_216;

/// A parsed VMD motion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VmdMotion {
    pub header: VmdHeader,
    /// Bone keyframes in file order.
    pub bone_keyframes: Vec<BoneKeyframe>,
    /// Morph keyframes in file order.
    pub morph_keyframes: Vec<MorphKeyframe>,
}

impl VmdMotion {
    /// Parse a motion from an in-memory buffer
    ///
    /// The header and bone section are required. A missing or damaged morph
    /// section is logged and leaves `morph_keyframes` empty. Camera, light
    /// and shadow sections are not read.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut reader = BinaryReader::new(data);
        let header = VmdHeader::parse(&mut reader)?;

        let count = reader.read_u32()?;
        let count = reader.checked_count(count, BONE_KEYFRAME_SIZE, MAX_BONE_KEYFRAMES, "bone keyframe")?;
        let mut bone_keyframes = Vec::with_capacity(count);
        for _ in 0..count {
            bone_keyframes.push(BoneKeyframe::parse(&mut reader)?);
        }

        let morph_keyframes = if reader.is_empty() {
            Vec::new()
        } else {
            parse_morphs(&mut reader).unwrap_or_else(|e| {
                log::warn!("Ignoring morph section: {}", e);
                Vec::new()
            })
        };

        log::debug!(
            "Parsed {} bone and {} morph keyframes",
            bone_keyframes.len(),
            morph_keyframes.len()
        );

        Ok(Self {
            header,
            bone_keyframes,
            morph_keyframes,
        })
    }

    /// Load a motion from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = fs::read(path)?;
        Self::parse(&data)
    }

    /// Save a motion to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut data = Vec::new();
        self.write(&mut data)?;
        fs::write(path, data)?;
        Ok(())
    }

    /// Write the motion in VMD layout, with empty camera, light and shadow
    /// sections.
    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        self.header.write(writer)?;

        writer.write_u32_le(self.bone_keyframes.len() as u32)?;
        for keyframe in &self.bone_keyframes {
            keyframe.write(writer)?;
        }

        writer.write_u32_le(self.morph_keyframes.len() as u32)?;
        for keyframe in &self.morph_keyframes {
            keyframe.write(writer)?;
        }

        // camera, light, shadow
        for _ in 0..3 {
            writer.write_u32_le(0)?;
        }
        Ok(())
    }

    /// Bone keyframes grouped into time-sorted tracks.
    pub fn bone_tracks(&self) -> Vec<KeyframeTrack> {
        build_tracks(&self.bone_keyframes)
    }

    pub fn morph_tracks(&self) -> Vec<MorphTrack> {
        build_morph_tracks(&self.morph_keyframes)
    }

    /// Last keyframe frame number across bones and morphs.
    pub fn last_frame(&self) -> u32 {
        let bones = self.bone_keyframes.iter().map(|k| k.frame);
        let morphs = self.morph_keyframes.iter().map(|k| k.frame);
        bones.chain(morphs).max().unwrap_or(0)
    }
}

fn parse_morphs(reader: &mut BinaryReader<'_>) -> Result<Vec<MorphKeyframe>> {
    let count = reader.read_u32()?;
    let count = reader.checked_count(count, MORPH_KEYFRAME_SIZE, MAX_MORPH_KEYFRAMES, "morph keyframe")?;
    let mut keyframes = Vec::with_capacity(count);
    for _ in 0..count {
        keyframes.push(MorphKeyframe::parse(reader)?);
    }
    Ok(keyframes)
}

/// Parse a motion buffer straight into per-bone keyframe tracks.
pub fn parse_tracks(data: &[u8]) -> Result<Vec<KeyframeTrack>> {
    Ok(VmdMotion::parse(data)?.bone_tracks())
}
