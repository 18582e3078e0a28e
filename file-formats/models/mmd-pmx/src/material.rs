use std::io::Write;

use glam::{Vec3, Vec4};
use mmd_data::io_ext::WriteExt;
use mmd_data::{BinaryReader, IndexDomain};

use crate::error::Result;
use crate::header::PmxHeader;

bitflags::bitflags! {
    /// Material drawing flags
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct MaterialFlags: u8 {
        /// Draw both faces
        const NO_CULL = 0x01;
        const GROUND_SHADOW = 0x02;
        const DRAW_SHADOW = 0x04;
        const RECEIVE_SHADOW = 0x08;
        /// Draw the outline edge
        const EDGE = 0x10;
        /// 2.1: use the first additional UV as vertex colour
        const VERTEX_COLOR = 0x20;
        /// 2.1: point drawing
        const POINT = 0x40;
        /// 2.1: line drawing
        const LINE = 0x80;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SphereMode {
    #[default]
    Disabled,
    Multiply,
    Add,
    /// Sphere map sampled with the first additional UV
    SubTexture,
}

impl From<u8> for SphereMode {
    fn from(value: u8) -> Self {
        match value {
            1 => Self::Multiply,
            2 => Self::Add,
            3 => Self::SubTexture,
            _ => Self::Disabled,
        }
    }
}

impl From<SphereMode> for u8 {
    fn from(value: SphereMode) -> Self {
        match value {
            SphereMode::Disabled => 0,
            SphereMode::Multiply => 1,
            SphereMode::Add => 2,
            SphereMode::SubTexture => 3,
        }
    }
}

/// Toon ramp reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToonRef {
    /// Index into the model's texture table
    Texture(Option<usize>),
    /// One of the ten shared toon ramps (`toon01.bmp` .. `toon10.bmp`)
    Shared(u8),
}

impl Default for ToonRef {
    fn default() -> Self {
        Self::Texture(None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub name: String,
    pub english_name: String,
    pub diffuse: Vec4,
    pub specular: Vec3,
    pub specular_strength: f32,
    pub ambient: Vec3,
    pub flags: MaterialFlags,
    pub edge_color: Vec4,
    pub edge_size: f32,
    pub texture: Option<usize>,
    pub sphere_texture: Option<usize>,
    pub sphere_mode: SphereMode,
    pub toon: ToonRef,
    pub memo: String,
    /// Number of face indices (three per triangle) drawn with this material.
    pub face_count: u32,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            name: String::new(),
            english_name: String::new(),
            diffuse: Vec4::ONE,
            specular: Vec3::ZERO,
            specular_strength: 5.0,
            ambient: Vec3::splat(0.5),
            flags: MaterialFlags::empty(),
            edge_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
            edge_size: 1.0,
            texture: None,
            sphere_texture: None,
            sphere_mode: SphereMode::Disabled,
            toon: ToonRef::default(),
            memo: String::new(),
            face_count: 0,
        }
    }
}

impl Material {
    pub fn parse(reader: &mut BinaryReader<'_>, header: &PmxHeader) -> Result<Self> {
        let widths = &header.index_widths;
        let name = reader.read_text(header.encoding)?;
        let english_name = reader.read_text(header.encoding)?;
        let diffuse = reader.read_vec4()?;
        let specular = reader.read_vec3()?;
        let specular_strength = reader.read_f32()?;
        let ambient = reader.read_vec3()?;
        let flags = MaterialFlags::from_bits_retain(reader.read_u8()?);
        let edge_color = reader.read_vec4()?;
        let edge_size = reader.read_f32()?;
        let texture = reader.read_index(widths, IndexDomain::Texture)?;
        let sphere_texture = reader.read_index(widths, IndexDomain::Texture)?;
        let sphere_mode = SphereMode::from(reader.read_u8()?);
        let toon = if reader.read_u8()? == 0 {
            ToonRef::Texture(reader.read_index(widths, IndexDomain::Texture)?)
        } else {
            ToonRef::Shared(reader.read_u8()?)
        };
        let memo = reader.read_text(header.encoding)?;
        let face_count = reader.read_i32()?.max(0) as u32;

        Ok(Self {
            name,
            english_name,
            diffuse,
            specular,
            specular_strength,
            ambient,
            flags,
            edge_color,
            edge_size,
            texture,
            sphere_texture,
            sphere_mode,
            toon,
            memo,
            face_count,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W, header: &PmxHeader) -> Result<()> {
        let texture_width = header.index_widths.get(IndexDomain::Texture);
        writer.write_text(header.encoding, &self.name)?;
        writer.write_text(header.encoding, &self.english_name)?;
        writer.write_vec4(self.diffuse)?;
        writer.write_vec3(self.specular)?;
        writer.write_f32_le(self.specular_strength)?;
        writer.write_vec3(self.ambient)?;
        writer.write_u8(self.flags.bits())?;
        writer.write_vec4(self.edge_color)?;
        writer.write_f32_le(self.edge_size)?;
        writer.write_signed_index(texture_width, self.texture)?;
        writer.write_signed_index(texture_width, self.sphere_texture)?;
        writer.write_u8(self.sphere_mode.into())?;
        match self.toon {
            ToonRef::Texture(texture) => {
                writer.write_u8(0)?;
                writer.write_signed_index(texture_width, texture)?;
            }
            ToonRef::Shared(slot) => {
                writer.write_u8(1)?;
                writer.write_u8(slot)?;
            }
        }
        writer.write_text(header.encoding, &self.memo)?;
        writer.write_i32_le(self.face_count as i32)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mmd_data::TextEncoding;

    #[test]
    fn test_material_round_trip() {
        let header = PmxHeader::new("m", TextEncoding::Utf8);
        let material = Material {
            name: "skin".to_string(),
            flags: MaterialFlags::NO_CULL | MaterialFlags::EDGE,
            texture: Some(2),
            sphere_mode: SphereMode::Add,
            toon: ToonRef::Shared(3),
            face_count: 36,
            ..Default::default()
        };

        let mut data = Vec::new();
        material.write(&mut data, &header).unwrap();
        let mut reader = BinaryReader::new(&data);
        let parsed = Material::parse(&mut reader, &header).unwrap();
        assert_eq!(parsed, material);
        assert!(reader.is_empty());
    }
}
