use std::cell::OnceCell;
use std::io::Write;

use glam::{EulerRot, Mat4, Quat, Vec3};
use mmd_data::io_ext::WriteExt;
use mmd_data::{BinaryReader, IndexDomain};

use crate::error::{PmxError, Result};
use crate::header::PmxHeader;

pub const MAX_RIGIDBODIES: usize = 65_536;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RigidbodyShape {
    #[default]
    Sphere,
    Box,
    Capsule,
}

impl TryFrom<u8> for RigidbodyShape {
    type Error = PmxError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Sphere),
            1 => Ok(Self::Box),
            2 => Ok(Self::Capsule),
            _ => Err(PmxError::ParseError(format!(
                "Unknown rigidbody shape {}",
                value
            ))),
        }
    }
}

impl From<RigidbodyShape> for u8 {
    fn from(value: RigidbodyShape) -> Self {
        match value {
            RigidbodyShape::Sphere => 0,
            RigidbodyShape::Box => 1,
            RigidbodyShape::Capsule => 2,
        }
    }
}

/// Physics mode byte of a rigidbody record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum RigidbodyMode {
    /// Moved by its bone
    #[default]
    FollowBone,
    /// Fully simulated, drives its bone
    Dynamic,
    /// Simulated rotation, translation kept from the bone
    DynamicWithBonePosition,
}

impl TryFrom<u8> for RigidbodyMode {
    type Error = PmxError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::FollowBone),
            1 => Ok(Self::Dynamic),
            2 => Ok(Self::DynamicWithBonePosition),
            _ => Err(PmxError::ParseError(format!(
                "Unknown rigidbody mode {}",
                value
            ))),
        }
    }
}

impl From<RigidbodyMode> for u8 {
    fn from(value: RigidbodyMode) -> Self {
        match value {
            RigidbodyMode::FollowBone => 0,
            RigidbodyMode::Dynamic => 1,
            RigidbodyMode::DynamicWithBonePosition => 2,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Rigidbody {
    pub name: String,
    pub english_name: String,
    pub bone: Option<usize>,
    pub group: u8,
    /// Bit `n` set means the body collides with group `n`. Zero collides
    /// with nothing.
    pub collision_mask: u16,
    pub shape: RigidbodyShape,
    /// Sphere: x = radius. Box: half extents. Capsule: x = radius, y = height.
    pub size: Vec3,
    /// Bind pose position in model space.
    pub position: Vec3,
    /// Bind pose rotation, Euler radians applied Z, X, Y.
    pub rotation: Vec3,
    pub mass: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub restitution: f32,
    pub friction: f32,
    pub mode: RigidbodyMode,
    body_offset: OnceCell<Mat4>,
}

impl PartialEq for Rigidbody {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.english_name == other.english_name
            && self.bone == other.bone
            && self.group == other.group
            && self.collision_mask == other.collision_mask
            && self.shape == other.shape
            && self.size == other.size
            && self.position == other.position
            && self.rotation == other.rotation
            && self.mass == other.mass
            && self.linear_damping == other.linear_damping
            && self.angular_damping == other.angular_damping
            && self.restitution == other.restitution
            && self.friction == other.friction
            && self.mode == other.mode
    }
}

impl Rigidbody {
    /// Unit sphere following `bone`, colliding with every group.
    pub fn new(name: impl Into<String>, bone: Option<usize>) -> Self {
        Self {
            name: name.into(),
            bone,
            collision_mask: 0xffff,
            size: Vec3::ONE,
            mass: 1.0,
            linear_damping: 0.5,
            angular_damping: 0.5,
            friction: 0.5,
            ..Default::default()
        }
    }

    pub fn parse(reader: &mut BinaryReader<'_>, header: &PmxHeader) -> Result<Self> {
        let name = reader.read_text(header.encoding)?;
        let english_name = reader.read_text(header.encoding)?;
        let bone = reader.read_index(&header.index_widths, IndexDomain::Bone)?;
        let group = reader.read_u8()?;
        let collision_mask = reader.read_u16()?;
        let shape = RigidbodyShape::try_from(reader.read_u8()?)?;
        let size = reader.read_vec3()?;
        let position = reader.read_vec3()?;
        let rotation = reader.read_vec3()?;
        let mass = reader.read_f32()?;
        let linear_damping = reader.read_f32()?;
        let angular_damping = reader.read_f32()?;
        let restitution = reader.read_f32()?;
        let friction = reader.read_f32()?;
        let mode = RigidbodyMode::try_from(reader.read_u8()?)?;

        Ok(Self {
            name,
            english_name,
            bone,
            group,
            collision_mask,
            shape,
            size,
            position,
            rotation,
            mass,
            linear_damping,
            angular_damping,
            restitution,
            friction,
            mode,
            body_offset: OnceCell::new(),
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W, header: &PmxHeader) -> Result<()> {
        writer.write_text(header.encoding, &self.name)?;
        writer.write_text(header.encoding, &self.english_name)?;
        writer.write_signed_index(header.index_widths.get(IndexDomain::Bone), self.bone)?;
        writer.write_u8(self.group)?;
        writer.write_u16_le(self.collision_mask)?;
        writer.write_u8(self.shape.into())?;
        writer.write_vec3(self.size)?;
        writer.write_vec3(self.position)?;
        writer.write_vec3(self.rotation)?;
        writer.write_f32_le(self.mass)?;
        writer.write_f32_le(self.linear_damping)?;
        writer.write_f32_le(self.angular_damping)?;
        writer.write_f32_le(self.restitution)?;
        writer.write_f32_le(self.friction)?;
        writer.write_u8(self.mode.into())?;
        Ok(())
    }

    /// Bind pose rotation as a quaternion.
    pub fn rotation_quat(&self) -> Quat {
        euler_zxy(self.rotation)
    }

    /// Bind pose shape transform in model space.
    pub fn shape_transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation_quat(), self.position)
    }

    /// Bone-relative body transform, `inverse_bind[bone] × shape`.
    ///
    /// Computed on first use and cached. A missing bone or inverse bind
    /// entry resolves to identity.
    pub fn body_offset(&self, inverse_bind: &[Mat4]) -> Mat4 {
        *self.body_offset.get_or_init(|| {
            let bone_inverse = self
                .bone
                .and_then(|bone| inverse_bind.get(bone))
                .copied()
                .unwrap_or(Mat4::IDENTITY);
            bone_inverse * self.shape_transform()
        })
    }

    /// True when the shape has no usable volume.
    pub fn is_degenerate(&self) -> bool {
        let finite = self.size.is_finite();
        match self.shape {
            RigidbodyShape::Sphere => !finite || self.size.x <= 0.0,
            RigidbodyShape::Box => !finite || self.size.min_element() <= 0.0,
            RigidbodyShape::Capsule => !finite || self.size.x <= 0.0 || self.size.y < 0.0,
        }
    }
}

/// Euler angles applied in Z, X, Y order.
pub fn euler_zxy(angles: Vec3) -> Quat {
    Quat::from_euler(EulerRot::ZXY, angles.z, angles.x, angles.y)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmd_data::TextEncoding;

    fn body() -> Rigidbody {
        Rigidbody {
            name: "hair".to_string(),
            bone: Some(1),
            group: 3,
            collision_mask: 0xfff7,
            shape: RigidbodyShape::Capsule,
            size: Vec3::new(0.5, 2.0, 0.0),
            position: Vec3::new(0.0, 5.0, 0.0),
            rotation: Vec3::new(0.0, 0.0, std::f32::consts::FRAC_PI_2),
            mass: 1.0,
            linear_damping: 0.5,
            angular_damping: 0.5,
            friction: 0.5,
            mode: RigidbodyMode::Dynamic,
            ..Default::default()
        }
    }

    #[test]
    fn test_rigidbody_round_trip() {
        let header = PmxHeader::new("m", TextEncoding::Utf8);
        let mut data = Vec::new();
        body().write(&mut data, &header).unwrap();
        let mut reader = BinaryReader::new(&data);
        assert_eq!(Rigidbody::parse(&mut reader, &header).unwrap(), body());
        assert!(reader.is_empty());
    }

    #[test]
    fn test_body_offset_is_bone_relative() {
        let inverse_bind = [
            Mat4::IDENTITY,
            Mat4::from_translation(Vec3::new(0.0, -4.0, 0.0)),
        ];
        let rigidbody = body();
        let offset = rigidbody.body_offset(&inverse_bind);
        let origin = offset.transform_point3(Vec3::ZERO);
        assert!((origin - Vec3::new(0.0, 1.0, 0.0)).length() < 0.001);

        // The first result is cached.
        let again = rigidbody.body_offset(&[]);
        assert_eq!(offset, again);
    }

    #[test]
    fn test_euler_single_axis() {
        let q = euler_zxy(Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));
        let x = q * Vec3::X;
        assert!((x - Vec3::new(0.0, 0.0, -1.0)).length() < 0.001);
    }

    #[test]
    fn test_unknown_shape() {
        assert!(RigidbodyShape::try_from(3).is_err());
        assert!(RigidbodyMode::try_from(7).is_err());
    }

    #[test]
    fn test_degenerate_shapes() {
        let mut rigidbody = body();
        assert!(!rigidbody.is_degenerate());
        rigidbody.size.x = 0.0;
        assert!(rigidbody.is_degenerate());
        rigidbody.shape = RigidbodyShape::Box;
        rigidbody.size = Vec3::new(1.0, f32::NAN, 1.0);
        assert!(rigidbody.is_degenerate());
    }
}
