//! Vertex records and skin weight normalisation

use std::io::Write;

use glam::{Vec2, Vec3, Vec4};
use mmd_data::io_ext::WriteExt;
use mmd_data::{BinaryReader, IndexDomain};

use crate::error::{PmxError, Result};
use crate::header::PmxHeader;

/// Sum of the fixed-point weights of every vertex.
pub const WEIGHT_SCALE: u8 = 255;

/// Raw bone deformation as stored in the file.
#[derive(Debug, Clone, PartialEq)]
pub enum Deform {
    Bdef1 {
        bone: Option<usize>,
    },
    Bdef2 {
        bones: [Option<usize>; 2],
        /// Weight of the first bone; the second gets `1 - weight`.
        weight: f32,
    },
    Bdef4 {
        bones: [Option<usize>; 4],
        weights: [f32; 4],
    },
    /// Spherical deform, blended like BDEF2 for linear skinning.
    Sdef {
        bones: [Option<usize>; 2],
        weight: f32,
        c: Vec3,
        r0: Vec3,
        r1: Vec3,
    },
    /// Dual quaternion deform, blended like BDEF4 for linear skinning.
    Qdef {
        bones: [Option<usize>; 4],
        weights: [f32; 4],
    },
}

impl Default for Deform {
    fn default() -> Self {
        Self::Bdef1 { bone: Some(0) }
    }
}

impl Deform {
    fn kind(&self) -> u8 {
        match self {
            Self::Bdef1 { .. } => 0,
            Self::Bdef2 { .. } => 1,
            Self::Bdef4 { .. } => 2,
            Self::Sdef { .. } => 3,
            Self::Qdef { .. } => 4,
        }
    }

    /// Influences as up to four `(bone, weight)` pairs, unused slots empty.
    pub fn influences(&self) -> [(Option<usize>, f32); 4] {
        match *self {
            Self::Bdef1 { bone } => [(bone, 1.0), (None, 0.0), (None, 0.0), (None, 0.0)],
            Self::Bdef2 { bones, weight } | Self::Sdef { bones, weight, .. } => [
                (bones[0], weight),
                (bones[1], 1.0 - weight),
                (None, 0.0),
                (None, 0.0),
            ],
            Self::Bdef4 { bones, weights } | Self::Qdef { bones, weights } => [
                (bones[0], weights[0]),
                (bones[1], weights[1]),
                (bones[2], weights[2]),
                (bones[3], weights[3]),
            ],
        }
    }

    fn parse(reader: &mut BinaryReader<'_>, header: &PmxHeader) -> Result<Self> {
        let widths = &header.index_widths;
        let kind = reader.read_u8()?;
        Ok(match kind {
            0 => Self::Bdef1 {
                bone: reader.read_index(widths, IndexDomain::Bone)?,
            },
            1 => {
                let bones = [
                    reader.read_index(widths, IndexDomain::Bone)?,
                    reader.read_index(widths, IndexDomain::Bone)?,
                ];
                Self::Bdef2 {
                    bones,
                    weight: reader.read_f32()?,
                }
            }
            2 | 4 => {
                let mut bones = [None; 4];
                for bone in &mut bones {
                    *bone = reader.read_index(widths, IndexDomain::Bone)?;
                }
                let weights: [f32; 4] = [
                    reader.read_f32()?,
                    reader.read_f32()?,
                    reader.read_f32()?,
                    reader.read_f32()?,
                ];
                if kind == 2 {
                    Self::Bdef4 { bones, weights }
                } else {
                    Self::Qdef { bones, weights }
                }
            }
            3 => {
                let bones = [
                    reader.read_index(widths, IndexDomain::Bone)?,
                    reader.read_index(widths, IndexDomain::Bone)?,
                ];
                Self::Sdef {
                    bones,
                    weight: reader.read_f32()?,
                    c: reader.read_vec3()?,
                    r0: reader.read_vec3()?,
                    r1: reader.read_vec3()?,
                }
            }
            other => {
                return Err(PmxError::ParseError(format!(
                    "Unknown vertex deform type {}",
                    other
                )));
            }
        })
    }

    fn write<W: Write>(&self, writer: &mut W, header: &PmxHeader) -> Result<()> {
        let width = header.index_widths.get(IndexDomain::Bone);
        writer.write_u8(self.kind())?;
        match self {
            Self::Bdef1 { bone } => writer.write_signed_index(width, *bone)?,
            Self::Bdef2 { bones, weight } => {
                for bone in bones {
                    writer.write_signed_index(width, *bone)?;
                }
                writer.write_f32_le(*weight)?;
            }
            Self::Bdef4 { bones, weights } | Self::Qdef { bones, weights } => {
                for bone in bones {
                    writer.write_signed_index(width, *bone)?;
                }
                for weight in weights {
                    writer.write_f32_le(*weight)?;
                }
            }
            Self::Sdef {
                bones,
                weight,
                c,
                r0,
                r1,
            } => {
                for bone in bones {
                    writer.write_signed_index(width, *bone)?;
                }
                writer.write_f32_le(*weight)?;
                writer.write_vec3(*c)?;
                writer.write_vec3(*r0)?;
                writer.write_vec3(*r1)?;
            }
        }
        Ok(())
    }
}

/// Four skin influences normalised to fixed-point weights summing to 255.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct SkinWeights {
    pub bones: [u32; 4],
    pub weights: [u8; 4],
}

impl SkinWeights {
    /// Normalise raw influences against a skeleton of `bone_count` bones.
    ///
    /// Influences pointing outside the skeleton are clamped to bone 0 with
    /// zero weight. The quantisation remainder goes to the largest valid
    /// weight, the first one on ties. If no valid weight is positive the
    /// vertex binds fully to its first valid bone, or bone 0.
    pub fn normalize(influences: [(Option<usize>, f32); 4], bone_count: usize) -> Self {
        let mut bones = [0u32; 4];
        let mut raw = [0.0f32; 4];
        let mut valid = [false; 4];

        for (slot, (bone, weight)) in influences.into_iter().enumerate() {
            if let Some(bone) = bone.filter(|&b| b < bone_count) {
                bones[slot] = bone as u32;
                valid[slot] = true;
                raw[slot] = if weight.is_finite() { weight.max(0.0) } else { 0.0 };
            }
        }

        let sum: f32 = raw.iter().sum();
        if sum <= 0.0 || !sum.is_finite() {
            let mut weights = [0u8; 4];
            match valid.iter().position(|&v| v) {
                Some(slot) => {
                    weights[slot] = WEIGHT_SCALE;
                    let mut out = [0u32; 4];
                    out[slot] = bones[slot];
                    return Self {
                        bones: out,
                        weights,
                    };
                }
                None => {
                    weights[0] = WEIGHT_SCALE;
                    return Self {
                        bones: [0; 4],
                        weights,
                    };
                }
            }
        }

        let mut quantised = [0i32; 4];
        for slot in 0..4 {
            if valid[slot] {
                quantised[slot] = (raw[slot] / sum * f32::from(WEIGHT_SCALE)).round() as i32;
            }
        }

        let remainder = i32::from(WEIGHT_SCALE) - quantised.iter().sum::<i32>();
        if remainder != 0 {
            let mut largest: Option<usize> = None;
            for slot in (0..4).filter(|&s| valid[s]) {
                if largest.is_none_or(|l| quantised[slot] > quantised[l]) {
                    largest = Some(slot);
                }
            }
            if let Some(slot) = largest {
                quantised[slot] += remainder;
            }
        }

        let mut weights = [0u8; 4];
        for slot in 0..4 {
            weights[slot] = quantised[slot].clamp(0, i32::from(WEIGHT_SCALE)) as u8;
            if !valid[slot] {
                bones[slot] = 0;
            }
        }
        Self { bones, weights }
    }

    pub fn total(&self) -> u32 {
        self.weights.iter().map(|&w| u32::from(w)).sum()
    }

    /// Weights as fractions of one.
    pub fn as_f32(&self) -> [f32; 4] {
        self.weights.map(|w| f32::from(w) / f32::from(WEIGHT_SCALE))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub additional_uvs: Vec<Vec4>,
    pub deform: Deform,
    /// Filled in once the bone count is known.
    pub weights: SkinWeights,
    pub edge_scale: f32,
}

impl Vertex {
    pub fn new(position: Vec3, deform: Deform) -> Self {
        Self {
            position,
            normal: Vec3::Y,
            deform,
            edge_scale: 1.0,
            ..Default::default()
        }
    }

    pub fn parse(reader: &mut BinaryReader<'_>, header: &PmxHeader) -> Result<Self> {
        let position = reader.read_vec3()?;
        let normal = reader.read_vec3()?;
        let uv = reader.read_vec2()?;
        let mut additional_uvs = Vec::with_capacity(usize::from(header.additional_uv_count));
        for _ in 0..header.additional_uv_count {
            additional_uvs.push(reader.read_vec4()?);
        }
        let deform = Deform::parse(reader, header)?;
        let edge_scale = reader.read_f32()?;

        Ok(Self {
            position,
            normal,
            uv,
            additional_uvs,
            deform,
            weights: SkinWeights::default(),
            edge_scale,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W, header: &PmxHeader) -> Result<()> {
        writer.write_vec3(self.position)?;
        writer.write_vec3(self.normal)?;
        writer.write_vec2(self.uv)?;
        for slot in 0..usize::from(header.additional_uv_count) {
            writer.write_vec4(self.additional_uvs.get(slot).copied().unwrap_or(Vec4::ZERO))?;
        }
        self.deform.write(writer, header)?;
        writer.write_f32_le(self.edge_scale)?;
        Ok(())
    }

    /// Smallest possible encoded size, used to sanity check counts.
    pub fn min_size(header: &PmxHeader) -> usize {
        32 + 16 * usize::from(header.additional_uv_count) + 1 + 1 + 4
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case([(Some(0), 1.0), (None, 0.0), (None, 0.0), (None, 0.0)], 3 ; "single bone")]
    #[test_case([(Some(0), 0.5), (Some(1), 0.5), (None, 0.0), (None, 0.0)], 3 ; "even split")]
    #[test_case([(Some(0), 0.3), (Some(1), 0.3), (Some(2), 0.3), (None, 0.0)], 3 ; "thirds")]
    #[test_case([(Some(0), 0.1), (Some(1), 0.2), (Some(2), 0.3), (Some(0), 0.4)], 3 ; "four way")]
    #[test_case([(Some(9), 0.7), (Some(1), 0.3), (None, 0.0), (None, 0.0)], 3 ; "out of range bone")]
    #[test_case([(Some(0), 0.0), (Some(1), 0.0), (None, 0.0), (None, 0.0)], 3 ; "all zero")]
    #[test_case([(Some(0), -2.0), (Some(1), f32::NAN), (None, 0.0), (None, 0.0)], 3 ; "garbage weights")]
    #[test_case([(Some(5), 1.0), (None, 1.0), (None, 0.0), (None, 0.0)], 2 ; "no valid bone")]
    fn test_weights_sum_to_scale(influences: [(Option<usize>, f32); 4], bone_count: usize) {
        let weights = SkinWeights::normalize(influences, bone_count);
        assert_eq!(weights.total(), u32::from(WEIGHT_SCALE));
        assert!(weights.bones.iter().all(|&b| (b as usize) < bone_count.max(1)));
    }

    #[test]
    fn test_remainder_goes_to_largest() {
        // 0.5 / 0.5 rounds to 128 + 128, one too many.
        let weights = SkinWeights::normalize(
            [(Some(0), 0.5), (Some(1), 0.5), (None, 0.0), (None, 0.0)],
            2,
        );
        assert_eq!(weights.weights, [127, 128, 0, 0]);
    }

    #[test]
    fn test_invalid_bone_gets_zero_weight() {
        let weights = SkinWeights::normalize(
            [(Some(7), 0.9), (Some(1), 0.1), (None, 0.0), (None, 0.0)],
            2,
        );
        assert_eq!(weights.bones, [0, 1, 0, 0]);
        assert_eq!(weights.weights, [0, 255, 0, 0]);
    }

    #[test]
    fn test_zero_sum_binds_first_valid_bone() {
        let weights = SkinWeights::normalize(
            [(None, 0.0), (Some(2), 0.0), (Some(1), 0.0), (None, 0.0)],
            3,
        );
        assert_eq!(weights.bones, [0, 2, 0, 0]);
        assert_eq!(weights.weights, [0, 255, 0, 0]);
    }

    #[test]
    fn test_sdef_blends_like_bdef2() {
        let deform = Deform::Sdef {
            bones: [Some(0), Some(1)],
            weight: 0.25,
            c: Vec3::ZERO,
            r0: Vec3::ZERO,
            r1: Vec3::ZERO,
        };
        let weights = SkinWeights::normalize(deform.influences(), 2);
        assert_eq!(weights.weights[0], 64);
        assert_eq!(weights.weights[1], 191);
    }
}
