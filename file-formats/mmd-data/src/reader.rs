//! Bounds-checked cursor over an in-memory buffer
//!
//! Every read checks the remaining length first and fails with
//! [`DataError::OutOfBounds`] instead of panicking, so a truncated file
//! surfaces as an error at the exact offset where data ran out.
//!
//! # Example
//!
//! ```
//! use mmd_data::BinaryReader;
//!
//! let data = [0x2a, 0x00, 0x00, 0x80, 0x3f];
//! let mut reader = BinaryReader::new(&data);
//! assert_eq!(reader.read_u8().unwrap(), 42);
//! assert_eq!(reader.read_f32().unwrap(), 1.0);
//! assert_eq!(reader.remaining(), 0);
//! ```

use glam::{Quat, Vec2, Vec3, Vec4};

use crate::error::{DataError, Result};
use crate::index::{IndexDomain, IndexWidth, IndexWidths};
use crate::text::{TextEncoding, decode_shift_jis, trim_nul};
use crate::types::DataR;

/// Little-endian reader over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BinaryReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Current offset from the start of the buffer.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes left after the cursor.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let available = self.remaining();
        if len > available {
            return Err(DataError::OutOfBounds {
                offset: self.pos,
                requested: len,
                available,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.bytes(len).map(|_| ())
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    /// Decode any [`DataR`] value at the cursor.
    pub fn read<T: DataR>(&mut self) -> Result<T> {
        T::read_from(self)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(i8::from_le_bytes(self.array()?))
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.array()?))
    }

    pub fn read_vec2(&mut self) -> Result<Vec2> {
        Ok(Vec2::new(self.read_f32()?, self.read_f32()?))
    }

    pub fn read_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.read_f32()?, self.read_f32()?, self.read_f32()?))
    }

    pub fn read_vec4(&mut self) -> Result<Vec4> {
        Ok(Vec4::new(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }

    /// Quaternion stored as x, y, z, w.
    pub fn read_quat(&mut self) -> Result<Quat> {
        Ok(Quat::from_xyzw(
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ))
    }

    /// Read a signed index field. Negative values mean "no reference".
    pub fn read_signed_index(&mut self, width: IndexWidth) -> Result<Option<usize>> {
        let raw = match width {
            IndexWidth::One => i32::from(self.read_i8()?),
            IndexWidth::Two => i32::from(self.read_i16()?),
            IndexWidth::Four => self.read_i32()?,
        };
        Ok(usize::try_from(raw).ok())
    }

    /// Read an unsigned index field.
    pub fn read_unsigned_index(&mut self, width: IndexWidth) -> Result<usize> {
        Ok(match width {
            IndexWidth::One => usize::from(self.read_u8()?),
            IndexWidth::Two => usize::from(self.read_u16()?),
            // Four byte vertex indices are stored as i32 but never negative in practice.
            IndexWidth::Four => self.read_i32()? as u32 as usize,
        })
    }

    /// Read an index of the given domain using the resolved width table.
    ///
    /// Vertex indices are unsigned and always present; every other domain
    /// is signed and may be absent.
    pub fn read_index(&mut self, widths: &IndexWidths, domain: IndexDomain) -> Result<Option<usize>> {
        let width = widths.get(domain);
        if domain.is_unsigned() {
            self.read_unsigned_index(width).map(Some)
        } else {
            self.read_signed_index(width)
        }
    }

    /// Read an `i32` byte length followed by that many bytes of text.
    pub fn read_text(&mut self, encoding: TextEncoding) -> Result<String> {
        let len = self.read_i32()?;
        let len = usize::try_from(len).map_err(|_| DataError::ImplausibleCount {
            what: "text byte",
            count: i64::from(len),
            limit: i32::MAX as usize,
        })?;
        let bytes = self.bytes(len)?;
        Ok(encoding.decode(bytes))
    }

    /// Read a fixed-width, NUL-terminated legacy name field.
    pub fn read_fixed_str(&mut self, len: usize) -> Result<String> {
        let bytes = self.bytes(len)?;
        Ok(decode_shift_jis(trim_nul(bytes)))
    }

    /// Validate a declared element count.
    ///
    /// Negative counts and counts above `limit` are [`DataError::ImplausibleCount`].
    /// A count that would need more than the remaining bytes at
    /// `min_element_size` bytes each is a truncation, reported as
    /// [`DataError::OutOfBounds`]. Accepts both the signed PMX and unsigned
    /// VMD count fields.
    pub fn checked_count(
        &self,
        raw: impl Into<i64>,
        min_element_size: usize,
        limit: usize,
        what: &'static str,
    ) -> Result<usize> {
        let raw: i64 = raw.into();
        let implausible = || DataError::ImplausibleCount {
            what,
            count: raw,
            limit,
        };
        let count = usize::try_from(raw).map_err(|_| implausible())?;
        if count > limit {
            return Err(implausible());
        }
        let requested = count.saturating_mul(min_element_size);
        let available = self.remaining();
        if requested > available {
            return Err(DataError::OutOfBounds {
                offset: self.pos,
                requested,
                available,
            });
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_primitive_reads() {
        let mut data = Vec::new();
        data.extend_from_slice(&(-2i16).to_le_bytes());
        data.extend_from_slice(&0xdead_beef_u32.to_le_bytes());
        data.extend_from_slice(&2.5f32.to_le_bytes());

        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_i16().unwrap(), -2);
        assert_eq!(reader.read_u32().unwrap(), 0xdead_beef);
        assert!((reader.read_f32().unwrap() - 2.5).abs() < f32::EPSILON);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_out_of_bounds_reports_offset() {
        let data = [1u8, 2, 3];
        let mut reader = BinaryReader::new(&data);
        reader.skip(2).unwrap();
        match reader.read_u32() {
            Err(DataError::OutOfBounds {
                offset,
                requested,
                available,
            }) => {
                assert_eq!(offset, 2);
                assert_eq!(requested, 4);
                assert_eq!(available, 1);
            }
            other => panic!("Expected OutOfBounds, got {:?}", other),
        }
        // A failed read leaves the cursor where it was.
        assert_eq!(reader.position(), 2);
    }

    #[test]
    fn test_signed_index_none() {
        let data = [0xff, 0xff, 0x05, 0x00];
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_signed_index(IndexWidth::Two).unwrap(), None);
        assert_eq!(reader.read_signed_index(IndexWidth::Two).unwrap(), Some(5));
    }

    #[test]
    fn test_vertex_index_is_unsigned() {
        let widths = IndexWidths::uniform(IndexWidth::One);
        let data = [0xff, 0xff];
        let mut reader = BinaryReader::new(&data);
        assert_eq!(
            reader.read_index(&widths, IndexDomain::Vertex).unwrap(),
            Some(255)
        );
        assert_eq!(reader.read_index(&widths, IndexDomain::Bone).unwrap(), None);
    }

    #[test]
    fn test_read_text() {
        let mut data = Vec::new();
        data.extend_from_slice(&4i32.to_le_bytes());
        data.extend_from_slice(&[0x61, 0x00, 0x62, 0x00]);
        data.extend_from_slice(&3i32.to_le_bytes());
        data.extend_from_slice(b"xyz");

        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_text(TextEncoding::Utf16Le).unwrap(), "ab");
        assert_eq!(reader.read_text(TextEncoding::Utf8).unwrap(), "xyz");
    }

    #[test]
    fn test_text_length_past_end() {
        let mut data = Vec::new();
        data.extend_from_slice(&100i32.to_le_bytes());
        data.extend_from_slice(b"short");
        let mut reader = BinaryReader::new(&data);
        let err = reader.read_text(TextEncoding::Utf8).unwrap_err();
        assert!(err.is_out_of_bounds());

        let data = (-3i32).to_le_bytes();
        let err = BinaryReader::new(&data)
            .read_text(TextEncoding::Utf8)
            .unwrap_err();
        assert!(err.is_implausible_count());
    }

    #[test]
    fn test_checked_count() {
        let data = [0u8; 16];
        let reader = BinaryReader::new(&data);
        assert_eq!(reader.checked_count(4, 4, 100, "bone").unwrap(), 4);
        assert!(reader.checked_count(-1, 4, 100, "bone").is_err());
        assert!(reader.checked_count(5, 4, 100, "bone").unwrap_err().is_out_of_bounds());
        assert!(reader.checked_count(101, 0, 100, "bone").unwrap_err().is_implausible_count());
        assert_eq!(reader.checked_count(2u32, 8, 100, "keyframe").unwrap(), 2);
        assert!(reader.checked_count(u32::MAX, 0, 100, "keyframe").is_err());
    }

    #[test]
    fn test_fixed_str_stops_at_nul() {
        let data = *b"abc\0\0\0\0\0";
        let mut reader = BinaryReader::new(&data);
        assert_eq!(reader.read_fixed_str(8).unwrap(), "abc");
        assert_eq!(reader.position(), 8);
    }
}
