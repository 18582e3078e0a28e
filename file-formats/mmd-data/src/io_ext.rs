use std::io::{Result, Write};

use glam::{Quat, Vec2, Vec3, Vec4};

use crate::index::IndexWidth;
use crate::text::{TextEncoding, encode_shift_jis};

/// Extension trait for writing little-endian values to a writer
pub trait WriteExt: Write {
    fn write_u8(&mut self, n: u8) -> Result<()> {
        self.write_all(&[n])
    }

    fn write_u16_le(&mut self, n: u16) -> Result<()> {
        self.write_all(&n.to_le_bytes())
    }

    fn write_u32_le(&mut self, n: u32) -> Result<()> {
        self.write_all(&n.to_le_bytes())
    }

    fn write_i8(&mut self, n: i8) -> Result<()> {
        self.write_all(&n.to_le_bytes())
    }

    fn write_i16_le(&mut self, n: i16) -> Result<()> {
        self.write_all(&n.to_le_bytes())
    }

    fn write_i32_le(&mut self, n: i32) -> Result<()> {
        self.write_all(&n.to_le_bytes())
    }

    fn write_f32_le(&mut self, n: f32) -> Result<()> {
        self.write_all(&n.to_le_bytes())
    }

    fn write_vec2(&mut self, v: Vec2) -> Result<()> {
        self.write_f32_le(v.x)?;
        self.write_f32_le(v.y)
    }

    fn write_vec3(&mut self, v: Vec3) -> Result<()> {
        self.write_f32_le(v.x)?;
        self.write_f32_le(v.y)?;
        self.write_f32_le(v.z)
    }

    fn write_vec4(&mut self, v: Vec4) -> Result<()> {
        self.write_f32_le(v.x)?;
        self.write_f32_le(v.y)?;
        self.write_f32_le(v.z)?;
        self.write_f32_le(v.w)
    }

    fn write_quat(&mut self, q: Quat) -> Result<()> {
        self.write_f32_le(q.x)?;
        self.write_f32_le(q.y)?;
        self.write_f32_le(q.z)?;
        self.write_f32_le(q.w)
    }

    /// Signed index field, `None` written as -1.
    fn write_signed_index(&mut self, width: IndexWidth, index: Option<usize>) -> Result<()> {
        let value = index.map_or(-1, |i| i as i64);
        match width {
            IndexWidth::One => self.write_i8(value as i8),
            IndexWidth::Two => self.write_i16_le(value as i16),
            IndexWidth::Four => self.write_i32_le(value as i32),
        }
    }

    fn write_unsigned_index(&mut self, width: IndexWidth, index: usize) -> Result<()> {
        match width {
            IndexWidth::One => self.write_u8(index as u8),
            IndexWidth::Two => self.write_u16_le(index as u16),
            IndexWidth::Four => self.write_i32_le(index as i32),
        }
    }

    /// Length-prefixed text in the given encoding.
    fn write_text(&mut self, encoding: TextEncoding, text: &str) -> Result<()> {
        let bytes = encoding.encode(text);
        self.write_i32_le(bytes.len() as i32)?;
        self.write_all(&bytes)
    }

    /// Fixed-width legacy name field, NUL padded and truncated to `len` bytes.
    fn write_fixed_str(&mut self, text: &str, len: usize) -> Result<()> {
        let mut bytes = encode_shift_jis(text);
        bytes.resize(len, 0);
        self.write_all(&bytes)
    }
}

impl<W: Write + ?Sized> WriteExt for W {}
