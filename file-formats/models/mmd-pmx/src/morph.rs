//! Morph and display frame sections
//!
//! Neither section is used downstream. They are walked only so the cursor
//! lands on the rigidbody section, with every count checked against the
//! bytes left so a corrupt length cannot trigger a huge skip.

use mmd_data::{BinaryReader, IndexDomain};

use crate::error::{PmxError, Result};
use crate::header::PmxHeader;

pub const MAX_MORPHS: usize = 65_536;
pub const MAX_MORPH_OFFSETS: usize = 16_777_216;
pub const MAX_DISPLAY_FRAMES: usize = 65_536;
pub const MAX_DISPLAY_FRAME_ELEMENTS: usize = 65_536;

/// Morph kinds, by their type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MorphKind {
    Group,
    Vertex,
    Bone,
    /// Base UV or one of the four additional UV channels
    Uv(u8),
    Material,
    Flip,
    Impulse,
}

impl TryFrom<u8> for MorphKind {
    type Error = PmxError;

    fn try_from(value: u8) -> Result<Self> {
        Ok(match value {
            0 => Self::Group,
            1 => Self::Vertex,
            2 => Self::Bone,
            3..=7 => Self::Uv(value - 3),
            8 => Self::Material,
            9 => Self::Flip,
            10 => Self::Impulse,
            _ => {
                return Err(PmxError::ParseError(format!(
                    "Unknown morph type {}",
                    value
                )));
            }
        })
    }
}

impl MorphKind {
    /// Encoded size of one offset record.
    pub fn offset_size(self, header: &PmxHeader) -> usize {
        let width = |domain| header.index_widths.get(domain).size();
        match self {
            Self::Group | Self::Flip => width(IndexDomain::Morph) + 4,
            Self::Vertex => width(IndexDomain::Vertex) + 12,
            Self::Bone => width(IndexDomain::Bone) + 12 + 16,
            Self::Uv(_) => width(IndexDomain::Vertex) + 16,
            Self::Material => width(IndexDomain::Material) + 1 + 16 + 12 + 4 + 12 + 16 + 4 + 16 * 3,
            Self::Impulse => width(IndexDomain::Rigidbody) + 1 + 12 + 12,
        }
    }
}

/// Skip the morph section, returning how many morphs it held.
pub fn skip_morphs(reader: &mut BinaryReader<'_>, header: &PmxHeader) -> Result<usize> {
    let count = reader.read_i32()?;
    let count = reader.checked_count(count, 4 + 4 + 1 + 1 + 4, MAX_MORPHS, "morph")?;

    for _ in 0..count {
        reader.read_text(header.encoding)?;
        reader.read_text(header.encoding)?;
        let _panel = reader.read_u8()?;
        let kind = MorphKind::try_from(reader.read_u8()?)?;
        let offsets = reader.read_i32()?;
        let size = kind.offset_size(header);
        let offsets = reader.checked_count(offsets, size, MAX_MORPH_OFFSETS, "morph offset")?;
        reader.skip(offsets * size)?;
    }

    log::debug!("Skipped {} morphs", count);
    Ok(count)
}

/// Skip the display frame section, returning how many frames it held.
pub fn skip_display_frames(reader: &mut BinaryReader<'_>, header: &PmxHeader) -> Result<usize> {
    let widths = &header.index_widths;
    let count = reader.read_i32()?;
    let count = reader.checked_count(count, 4 + 4 + 1 + 4, MAX_DISPLAY_FRAMES, "display frame")?;

    for _ in 0..count {
        reader.read_text(header.encoding)?;
        reader.read_text(header.encoding)?;
        let _special = reader.read_u8()?;
        let elements = reader.read_i32()?;
        let elements = reader.checked_count(
            elements,
            2,
            MAX_DISPLAY_FRAME_ELEMENTS,
            "display frame element",
        )?;
        for _ in 0..elements {
            let domain = match reader.read_u8()? {
                0 => IndexDomain::Bone,
                1 => IndexDomain::Morph,
                other => {
                    return Err(PmxError::ParseError(format!(
                        "Unknown display frame element type {}",
                        other
                    )));
                }
            };
            reader.skip(widths.get(domain).size())?;
        }
    }

    log::debug!("Skipped {} display frames", count);
    Ok(count)
}
