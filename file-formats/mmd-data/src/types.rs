use std::io::Write;

use glam::{Quat, Vec2, Vec3, Vec4};

use crate::error::Result;
use crate::io_ext::WriteExt;
use crate::reader::BinaryReader;

/// A fixed-layout value that can be decoded from a [`BinaryReader`].
pub trait DataR: Sized {
    fn read_from(reader: &mut BinaryReader<'_>) -> Result<Self>;
}

/// A fixed-layout value that can be encoded to a writer.
pub trait DataW {
    fn write_to<W: Write>(&self, writer: &mut W) -> Result<()>;

    /// Encoded size in bytes.
    fn data_size(&self) -> usize;
}

macro_rules! impl_data_primitive {
    ($ty:ty, $read:ident, $write:ident, $size:expr) => {
        impl DataR for $ty {
            fn read_from(reader: &mut BinaryReader<'_>) -> Result<Self> {
                reader.$read()
            }
        }

        impl DataW for $ty {
            fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
                writer.$write(*self)?;
                Ok(())
            }

            fn data_size(&self) -> usize {
                $size
            }
        }
    };
}

impl_data_primitive!(u8, read_u8, write_u8, 1);
impl_data_primitive!(i8, read_i8, write_i8, 1);
impl_data_primitive!(u16, read_u16, write_u16_le, 2);
impl_data_primitive!(i16, read_i16, write_i16_le, 2);
impl_data_primitive!(u32, read_u32, write_u32_le, 4);
impl_data_primitive!(i32, read_i32, write_i32_le, 4);
impl_data_primitive!(f32, read_f32, write_f32_le, 4);
impl_data_primitive!(Vec2, read_vec2, write_vec2, 8);
impl_data_primitive!(Vec3, read_vec3, write_vec3, 12);
impl_data_primitive!(Vec4, read_vec4, write_vec4, 16);
impl_data_primitive!(Quat, read_quat, write_quat, 16);
