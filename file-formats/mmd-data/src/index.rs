//! Variable width index fields
//!
//! PMX stores six independent index kinds, each with its own byte width
//! declared once in the header. The widths are resolved into an
//! [`IndexWidths`] table immediately after the header so every later read
//! goes through the same lookup.

use crate::error::{DataError, Result};

/// Byte width of an index field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum IndexWidth {
    #[default]
    One,
    Two,
    Four,
}

impl IndexWidth {
    /// Size of the field in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::One => 1,
            Self::Two => 2,
            Self::Four => 4,
        }
    }

    /// Smallest width able to hold `count` elements as a signed index.
    pub fn for_signed_count(count: usize) -> Self {
        if count <= i8::MAX as usize {
            Self::One
        } else if count <= i16::MAX as usize {
            Self::Two
        } else {
            Self::Four
        }
    }

    /// Smallest width able to hold `count` elements as a vertex index.
    pub fn for_vertex_count(count: usize) -> Self {
        if count <= u8::MAX as usize {
            Self::One
        } else if count <= u16::MAX as usize {
            Self::Two
        } else {
            Self::Four
        }
    }
}

impl TryFrom<u8> for IndexWidth {
    type Error = DataError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            4 => Ok(Self::Four),
            _ => Err(DataError::InvalidIndexWidth(value)),
        }
    }
}

impl From<IndexWidth> for u8 {
    fn from(value: IndexWidth) -> Self {
        value.size() as u8
    }
}

/// The index kinds with a configurable width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexDomain {
    Vertex,
    Texture,
    Material,
    Bone,
    Morph,
    Rigidbody,
}

impl IndexDomain {
    pub const ALL: [Self; 6] = [
        Self::Vertex,
        Self::Texture,
        Self::Material,
        Self::Bone,
        Self::Morph,
        Self::Rigidbody,
    ];

    /// Vertex indices are unsigned, every other domain is signed with -1 as "none".
    pub fn is_unsigned(self) -> bool {
        matches!(self, Self::Vertex)
    }

    fn slot(self) -> usize {
        match self {
            Self::Vertex => 0,
            Self::Texture => 1,
            Self::Material => 2,
            Self::Bone => 3,
            Self::Morph => 4,
            Self::Rigidbody => 5,
        }
    }
}

/// Per-domain index widths, resolved once from the header globals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct IndexWidths {
    widths: [IndexWidth; 6],
}

impl IndexWidths {
    /// Build the table from the six raw header bytes, in file order.
    pub fn from_raw(raw: [u8; 6]) -> Result<Self> {
        let mut widths = [IndexWidth::One; 6];
        for (width, byte) in widths.iter_mut().zip(raw) {
            *width = IndexWidth::try_from(byte)?;
        }
        Ok(Self { widths })
    }

    /// Raw header bytes, in file order.
    pub fn to_raw(&self) -> [u8; 6] {
        self.widths.map(u8::from)
    }

    pub fn get(&self, domain: IndexDomain) -> IndexWidth {
        self.widths[domain.slot()]
    }

    pub fn set(&mut self, domain: IndexDomain, width: IndexWidth) {
        self.widths[domain.slot()] = width;
    }

    /// Same width for every domain.
    pub fn uniform(width: IndexWidth) -> Self {
        Self { widths: [width; 6] }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(1, IndexWidth::One)]
    #[test_case(2, IndexWidth::Two)]
    #[test_case(4, IndexWidth::Four)]
    fn test_width_from_byte(raw: u8, expected: IndexWidth) {
        assert_eq!(IndexWidth::try_from(raw).unwrap(), expected);
        assert_eq!(u8::from(expected), raw);
    }

    #[test]
    fn test_invalid_width() {
        assert!(matches!(
            IndexWidth::try_from(3),
            Err(DataError::InvalidIndexWidth(3))
        ));
    }

    #[test]
    fn test_table_keeps_domains_independent() {
        let table = IndexWidths::from_raw([4, 1, 1, 2, 1, 2]).unwrap();
        assert_eq!(table.get(IndexDomain::Vertex), IndexWidth::Four);
        assert_eq!(table.get(IndexDomain::Texture), IndexWidth::One);
        assert_eq!(table.get(IndexDomain::Bone), IndexWidth::Two);
        assert_eq!(table.get(IndexDomain::Rigidbody), IndexWidth::Two);
        assert_eq!(table.to_raw(), [4, 1, 1, 2, 1, 2]);
    }

    #[test]
    fn test_width_for_count() {
        assert_eq!(IndexWidth::for_signed_count(127), IndexWidth::One);
        assert_eq!(IndexWidth::for_signed_count(128), IndexWidth::Two);
        assert_eq!(IndexWidth::for_vertex_count(255), IndexWidth::One);
        assert_eq!(IndexWidth::for_vertex_count(70_000), IndexWidth::Four);
    }
}
