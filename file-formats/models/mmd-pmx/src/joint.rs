use std::io::Write;

use glam::{Mat4, Vec3};
use mmd_data::io_ext::WriteExt;
use mmd_data::{BinaryReader, IndexDomain};

use crate::error::Result;
use crate::header::PmxHeader;
use crate::rigidbody::euler_zxy;

pub const MAX_JOINTS: usize = 65_536;

/// Six degree of freedom spring joint between two rigidbodies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Joint {
    pub name: String,
    pub english_name: String,
    /// Joint type byte. Every type shares the spring 6-DOF layout.
    pub kind: u8,
    pub rigidbody_a: Option<usize>,
    pub rigidbody_b: Option<usize>,
    pub position: Vec3,
    /// Euler radians applied Z, X, Y.
    pub rotation: Vec3,
    pub linear_lower: Vec3,
    pub linear_upper: Vec3,
    pub angular_lower: Vec3,
    pub angular_upper: Vec3,
    pub linear_spring: Vec3,
    pub angular_spring: Vec3,
}

impl Joint {
    pub fn parse(reader: &mut BinaryReader<'_>, header: &PmxHeader) -> Result<Self> {
        let widths = &header.index_widths;
        Ok(Self {
            name: reader.read_text(header.encoding)?,
            english_name: reader.read_text(header.encoding)?,
            kind: reader.read_u8()?,
            rigidbody_a: reader.read_index(widths, IndexDomain::Rigidbody)?,
            rigidbody_b: reader.read_index(widths, IndexDomain::Rigidbody)?,
            position: reader.read_vec3()?,
            rotation: reader.read_vec3()?,
            linear_lower: reader.read_vec3()?,
            linear_upper: reader.read_vec3()?,
            angular_lower: reader.read_vec3()?,
            angular_upper: reader.read_vec3()?,
            linear_spring: reader.read_vec3()?,
            angular_spring: reader.read_vec3()?,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W, header: &PmxHeader) -> Result<()> {
        let width = header.index_widths.get(IndexDomain::Rigidbody);
        writer.write_text(header.encoding, &self.name)?;
        writer.write_text(header.encoding, &self.english_name)?;
        writer.write_u8(self.kind)?;
        writer.write_signed_index(width, self.rigidbody_a)?;
        writer.write_signed_index(width, self.rigidbody_b)?;
        for v in [
            self.position,
            self.rotation,
            self.linear_lower,
            self.linear_upper,
            self.angular_lower,
            self.angular_upper,
            self.linear_spring,
            self.angular_spring,
        ] {
            writer.write_vec3(v)?;
        }
        Ok(())
    }

    /// Bind pose pivot transform in model space.
    pub fn transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(euler_zxy(self.rotation), self.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmd_data::{IndexWidth, IndexWidths, TextEncoding};

    #[test]
    fn test_joint_round_trip() {
        let header = PmxHeader {
            encoding: TextEncoding::Utf8,
            index_widths: IndexWidths::uniform(IndexWidth::One),
            ..Default::default()
        };
        let joint = Joint {
            name: "j".to_string(),
            rigidbody_a: Some(0),
            rigidbody_b: None,
            position: Vec3::new(0.0, 2.0, 0.0),
            angular_lower: Vec3::splat(-0.5),
            angular_upper: Vec3::splat(0.5),
            angular_spring: Vec3::new(10.0, 0.0, 0.0),
            ..Default::default()
        };
        let mut data = Vec::new();
        joint.write(&mut data, &header).unwrap();
        assert_eq!(data.len(), 5 + 4 + 1 + 1 + 1 + 8 * 12);
        let parsed = Joint::parse(&mut BinaryReader::new(&data), &header).unwrap();
        assert_eq!(parsed, joint);
    }
}
