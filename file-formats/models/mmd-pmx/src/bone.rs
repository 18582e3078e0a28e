use std::io::Write;

use glam::Vec3;
use mmd_data::io_ext::WriteExt;
use mmd_data::{BinaryReader, IndexDomain};

use crate::error::Result;
use crate::header::PmxHeader;

/// Upper bound on links in one IK chain.
pub const MAX_IK_LINKS: usize = 1024;

bitflags::bitflags! {
    /// Bone flags as defined in the PMX format
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct BoneFlags: u16 {
        /// Tail is given as a bone index instead of an offset
        const TAIL_IS_BONE = 0x0001;
        const ROTATABLE = 0x0002;
        const TRANSLATABLE = 0x0004;
        const VISIBLE = 0x0008;
        const ENABLED = 0x0010;
        /// Bone drives an IK chain
        const IK = 0x0020;
        /// Append uses the parent's local transform
        const APPEND_LOCAL = 0x0080;
        /// Inherit rotation from the append parent
        const APPEND_ROTATE = 0x0100;
        /// Inherit translation from the append parent
        const APPEND_TRANSLATE = 0x0200;
        const FIXED_AXIS = 0x0400;
        const LOCAL_AXES = 0x0800;
        /// Deform after physics
        const PHYSICS_AFTER_DEFORM = 0x1000;
        const EXTERNAL_PARENT = 0x2000;
    }
}

impl BoneFlags {
    const LAYOUT: Self = Self::TAIL_IS_BONE
        .union(Self::IK)
        .union(Self::APPEND_ROTATE)
        .union(Self::APPEND_TRANSLATE)
        .union(Self::FIXED_AXIS)
        .union(Self::LOCAL_AXES)
        .union(Self::EXTERNAL_PARENT);
}

/// Where the bone's display tail points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoneTail {
    Bone(Option<usize>),
    Offset(Vec3),
}

impl Default for BoneTail {
    fn default() -> Self {
        Self::Bone(None)
    }
}

/// Inherited ("append") transform from another bone.
///
/// The parent index is kept as read. It is resolved against the skeleton
/// only when a pose is evaluated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppendTransform {
    pub parent: Option<usize>,
    pub ratio: f32,
    pub rotate: bool,
    pub translate: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IkLink {
    pub bone: Option<usize>,
    /// Lower and upper Euler angle limits, radians.
    pub limits: Option<(Vec3, Vec3)>,
}

/// IK chain metadata. Parsed and kept, never solved.
#[derive(Debug, Clone, PartialEq)]
pub struct IkChain {
    pub target: Option<usize>,
    pub loop_count: i32,
    pub limit_angle: f32,
    pub links: Vec<IkLink>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bone {
    pub name: String,
    pub english_name: String,
    /// Bind position in model space, as stored in the file.
    pub position: Vec3,
    /// Bind translation relative to the parent, derived from `position`.
    pub translation: Vec3,
    pub parent: Option<usize>,
    pub layer: i32,
    pub flags: BoneFlags,
    pub tail: BoneTail,
    pub append: Option<AppendTransform>,
    pub fixed_axis: Option<Vec3>,
    /// Local X and Z axes.
    pub local_axes: Option<(Vec3, Vec3)>,
    pub external_parent: Option<i32>,
    pub ik: Option<IkChain>,
}

impl Bone {
    pub fn new(name: impl Into<String>, position: Vec3, parent: Option<usize>) -> Self {
        Self {
            name: name.into(),
            position,
            parent,
            flags: BoneFlags::ROTATABLE | BoneFlags::VISIBLE | BoneFlags::ENABLED,
            ..Default::default()
        }
    }

    pub fn parse(reader: &mut BinaryReader<'_>, header: &PmxHeader) -> Result<Self> {
        let widths = &header.index_widths;
        let name = reader.read_text(header.encoding)?;
        let english_name = reader.read_text(header.encoding)?;
        let position = reader.read_vec3()?;
        let parent = reader.read_index(widths, IndexDomain::Bone)?;
        let layer = reader.read_i32()?;
        let flags = BoneFlags::from_bits_retain(reader.read_u16()?);

        let tail = if flags.contains(BoneFlags::TAIL_IS_BONE) {
            BoneTail::Bone(reader.read_index(widths, IndexDomain::Bone)?)
        } else {
            BoneTail::Offset(reader.read_vec3()?)
        };

        let rotate = flags.contains(BoneFlags::APPEND_ROTATE);
        let translate = flags.contains(BoneFlags::APPEND_TRANSLATE);
        let append = if rotate || translate {
            Some(AppendTransform {
                parent: reader.read_index(widths, IndexDomain::Bone)?,
                ratio: reader.read_f32()?,
                rotate,
                translate,
            })
        } else {
            None
        };

        let fixed_axis = if flags.contains(BoneFlags::FIXED_AXIS) {
            Some(reader.read_vec3()?)
        } else {
            None
        };

        let local_axes = if flags.contains(BoneFlags::LOCAL_AXES) {
            Some((reader.read_vec3()?, reader.read_vec3()?))
        } else {
            None
        };

        let external_parent = if flags.contains(BoneFlags::EXTERNAL_PARENT) {
            Some(reader.read_i32()?)
        } else {
            None
        };

        let ik = if flags.contains(BoneFlags::IK) {
            Some(IkChain::parse(reader, header)?)
        } else {
            None
        };

        Ok(Self {
            name,
            english_name,
            position,
            translation: Vec3::ZERO,
            parent,
            layer,
            flags,
            tail,
            append,
            fixed_axis,
            local_axes,
            external_parent,
            ik,
        })
    }

    /// Flags with the layout bits recomputed from the optional fields.
    pub fn effective_flags(&self) -> BoneFlags {
        let mut flags = self.flags.difference(BoneFlags::LAYOUT);
        flags.set(
            BoneFlags::TAIL_IS_BONE,
            matches!(self.tail, BoneTail::Bone(_)),
        );
        if let Some(append) = &self.append {
            flags.set(BoneFlags::APPEND_ROTATE, append.rotate);
            flags.set(BoneFlags::APPEND_TRANSLATE, append.translate);
        }
        flags.set(BoneFlags::FIXED_AXIS, self.fixed_axis.is_some());
        flags.set(BoneFlags::LOCAL_AXES, self.local_axes.is_some());
        flags.set(BoneFlags::EXTERNAL_PARENT, self.external_parent.is_some());
        flags.set(BoneFlags::IK, self.ik.is_some());
        flags
    }

    pub fn write<W: Write>(&self, writer: &mut W, header: &PmxHeader) -> Result<()> {
        let width = header.index_widths.get(IndexDomain::Bone);
        let flags = self.effective_flags();
        writer.write_text(header.encoding, &self.name)?;
        writer.write_text(header.encoding, &self.english_name)?;
        writer.write_vec3(self.position)?;
        writer.write_signed_index(width, self.parent)?;
        writer.write_i32_le(self.layer)?;
        writer.write_u16_le(flags.bits())?;

        match self.tail {
            BoneTail::Bone(bone) => writer.write_signed_index(width, bone)?,
            BoneTail::Offset(offset) => writer.write_vec3(offset)?,
        }
        if let Some(append) = self.append.filter(|a| a.rotate || a.translate) {
            writer.write_signed_index(width, append.parent)?;
            writer.write_f32_le(append.ratio)?;
        }
        if let Some(axis) = self.fixed_axis {
            writer.write_vec3(axis)?;
        }
        if let Some((x, z)) = self.local_axes {
            writer.write_vec3(x)?;
            writer.write_vec3(z)?;
        }
        if let Some(key) = self.external_parent {
            writer.write_i32_le(key)?;
        }
        if let Some(ik) = &self.ik {
            ik.write(writer, header)?;
        }
        Ok(())
    }
}

impl IkChain {
    fn parse(reader: &mut BinaryReader<'_>, header: &PmxHeader) -> Result<Self> {
        let widths = &header.index_widths;
        let target = reader.read_index(widths, IndexDomain::Bone)?;
        let loop_count = reader.read_i32()?;
        let limit_angle = reader.read_f32()?;
        let link_count = reader.read_i32()?;
        let link_count = reader.checked_count(
            link_count,
            widths.get(IndexDomain::Bone).size() + 1,
            MAX_IK_LINKS,
            "IK link",
        )?;

        let mut links = Vec::with_capacity(link_count);
        for _ in 0..link_count {
            let bone = reader.read_index(widths, IndexDomain::Bone)?;
            let limits = if reader.read_u8()? != 0 {
                Some((reader.read_vec3()?, reader.read_vec3()?))
            } else {
                None
            };
            links.push(IkLink { bone, limits });
        }

        Ok(Self {
            target,
            loop_count,
            limit_angle,
            links,
        })
    }

    fn write<W: Write>(&self, writer: &mut W, header: &PmxHeader) -> Result<()> {
        let width = header.index_widths.get(IndexDomain::Bone);
        writer.write_signed_index(width, self.target)?;
        writer.write_i32_le(self.loop_count)?;
        writer.write_f32_le(self.limit_angle)?;
        writer.write_i32_le(self.links.len() as i32)?;
        for link in &self.links {
            writer.write_signed_index(width, link.bone)?;
            match link.limits {
                Some((lower, upper)) => {
                    writer.write_u8(1)?;
                    writer.write_vec3(lower)?;
                    writer.write_vec3(upper)?;
                }
                None => writer.write_u8(0)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmd_data::TextEncoding;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bone_with_optional_blocks() {
        let header = PmxHeader::new("m", TextEncoding::Utf16Le);
        let bone = Bone {
            name: "左足ＩＫ".to_string(),
            position: Vec3::new(1.0, 2.0, 3.0),
            parent: Some(0),
            tail: BoneTail::Offset(Vec3::Y),
            append: Some(AppendTransform {
                parent: Some(4),
                ratio: -0.5,
                rotate: true,
                translate: false,
            }),
            local_axes: Some((Vec3::X, Vec3::Z)),
            ik: Some(IkChain {
                target: Some(2),
                loop_count: 40,
                limit_angle: 2.0,
                links: vec![
                    IkLink {
                        bone: Some(1),
                        limits: Some((Vec3::new(-3.1, 0.0, 0.0), Vec3::new(-0.01, 0.0, 0.0))),
                    },
                    IkLink {
                        bone: Some(0),
                        limits: None,
                    },
                ],
            }),
            ..Bone::new("", Vec3::ZERO, None)
        };

        let mut data = Vec::new();
        bone.write(&mut data, &header).unwrap();
        let mut reader = BinaryReader::new(&data);
        let parsed = Bone::parse(&mut reader, &header).unwrap();
        assert!(reader.is_empty());

        assert_eq!(parsed.name, bone.name);
        assert_eq!(parsed.append, bone.append);
        assert_eq!(parsed.local_axes, bone.local_axes);
        assert_eq!(parsed.ik, bone.ik);
        assert!(parsed.flags.contains(BoneFlags::IK | BoneFlags::APPEND_ROTATE));
        assert!(!parsed.flags.contains(BoneFlags::TAIL_IS_BONE));
    }

    #[test]
    fn test_effective_flags_clear_stale_bits() {
        let mut bone = Bone::new("b", Vec3::ZERO, None);
        bone.flags |= BoneFlags::IK | BoneFlags::FIXED_AXIS;
        let flags = bone.effective_flags();
        assert!(!flags.contains(BoneFlags::IK));
        assert!(!flags.contains(BoneFlags::FIXED_AXIS));
        assert!(flags.contains(BoneFlags::TAIL_IS_BONE | BoneFlags::ROTATABLE));
    }
}
