//! PMX file header
//!
//! ```text
//! "PMX "            4 bytes
//! version           f32 (2.0 to 2.2; newer versions are logged and read as 2.x)
//! globals count     u8 (8 for every known revision)
//! globals           [u8; count]
//!   [0] text encoding (0 = UTF-16LE, 1 = UTF-8)
//!   [1] additional vec4 UV channels (0..=4)
//!   [2] vertex index width
//!   [3] texture index width
//!   [4] material index width
//!   [5] bone index width
//!   [6] morph index width
//!   [7] rigidbody index width
//! model name, english name, comment, english comment (text)
//! ```

use std::io::Write;

use mmd_data::io_ext::WriteExt;
use mmd_data::{BinaryReader, IndexWidth, IndexWidths, TextEncoding};

use crate::error::{PmxError, Result};

/// File signature.
pub const PMX_MAGIC: [u8; 4] = *b"PMX ";

/// Oldest version this parser accepts.
pub const MIN_VERSION: f32 = 2.0;

/// Newest version known to share the 2.0 layout for the sections we read.
pub const MAX_KNOWN_VERSION: f32 = 2.2;

const GLOBALS_COUNT: u8 = 8;
const MAX_ADDITIONAL_UVS: u8 = 4;

/// Header and model information block.
#[derive(Debug, Clone, PartialEq)]
pub struct PmxHeader {
    pub version: f32,
    pub encoding: TextEncoding,
    pub additional_uv_count: u8,
    pub index_widths: IndexWidths,
    pub name: String,
    pub english_name: String,
    pub comment: String,
    pub english_comment: String,
}

impl Default for PmxHeader {
    fn default() -> Self {
        Self {
            version: MIN_VERSION,
            encoding: TextEncoding::Utf16Le,
            additional_uv_count: 0,
            index_widths: IndexWidths::uniform(IndexWidth::Four),
            name: String::new(),
            english_name: String::new(),
            comment: String::new(),
            english_comment: String::new(),
        }
    }
}

impl PmxHeader {
    pub fn new(name: impl Into<String>, encoding: TextEncoding) -> Self {
        Self {
            name: name.into(),
            encoding,
            ..Default::default()
        }
    }

    pub fn parse(reader: &mut BinaryReader<'_>) -> Result<Self> {
        let magic = reader.bytes(4)?;
        if magic != PMX_MAGIC {
            return Err(PmxError::InvalidMagic {
                expected: String::from_utf8_lossy(&PMX_MAGIC).into_owned(),
                actual: String::from_utf8_lossy(magic).into_owned(),
            });
        }

        let version = reader.read_f32()?;
        if !version.is_finite() || version < MIN_VERSION {
            return Err(PmxError::UnsupportedVersion(version));
        }
        if version > MAX_KNOWN_VERSION {
            log::warn!(
                "PMX version {} is newer than {}, parsing as 2.x",
                version,
                MAX_KNOWN_VERSION
            );
        }

        let globals_count = reader.read_u8()?;
        if globals_count < GLOBALS_COUNT {
            return Err(PmxError::InvalidHeader(format!(
                "expected at least {} globals, got {}",
                GLOBALS_COUNT, globals_count
            )));
        }
        let globals = reader.bytes(usize::from(globals_count))?;

        let encoding = TextEncoding::try_from(globals[0])
            .map_err(|e| PmxError::InvalidHeader(e.to_string()))?;
        let additional_uv_count = globals[1];
        if additional_uv_count > MAX_ADDITIONAL_UVS {
            return Err(PmxError::InvalidHeader(format!(
                "additional UV count {} exceeds {}",
                additional_uv_count, MAX_ADDITIONAL_UVS
            )));
        }
        let index_widths = IndexWidths::from_raw([
            globals[2], globals[3], globals[4], globals[5], globals[6], globals[7],
        ])
        .map_err(|e| PmxError::InvalidHeader(e.to_string()))?;

        let name = reader.read_text(encoding)?;
        let english_name = reader.read_text(encoding)?;
        let comment = reader.read_text(encoding)?;
        let english_comment = reader.read_text(encoding)?;

        log::debug!(
            "PMX {} header: encoding {:?}, {} extra UVs, widths {:?}",
            version,
            encoding,
            additional_uv_count,
            index_widths.to_raw()
        );

        Ok(Self {
            version,
            encoding,
            additional_uv_count,
            index_widths,
            name,
            english_name,
            comment,
            english_comment,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&PMX_MAGIC)?;
        writer.write_f32_le(self.version)?;
        writer.write_u8(GLOBALS_COUNT)?;
        writer.write_u8(self.encoding.into())?;
        writer.write_u8(self.additional_uv_count)?;
        writer.write_all(&self.index_widths.to_raw())?;
        writer.write_text(self.encoding, &self.name)?;
        writer.write_text(self.encoding, &self.english_name)?;
        writer.write_text(self.encoding, &self.comment)?;
        writer.write_text(self.encoding, &self.english_comment)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_bytes(magic: &[u8], version: f32, globals: &[u8]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(magic);
        data.write_f32_le(version).unwrap();
        data.write_u8(globals.len() as u8).unwrap();
        data.extend_from_slice(globals);
        for _ in 0..4 {
            data.write_i32_le(0).unwrap();
        }
        data
    }

    #[test]
    fn test_parse_header() {
        let data = header_bytes(b"PMX ", 2.0, &[1, 2, 2, 1, 1, 2, 1, 1]);
        let mut reader = BinaryReader::new(&data);
        let header = PmxHeader::parse(&mut reader).unwrap();
        assert_eq!(header.encoding, TextEncoding::Utf8);
        assert_eq!(header.additional_uv_count, 2);
        assert_eq!(header.index_widths.to_raw(), [2, 1, 1, 2, 1, 1]);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_bad_magic() {
        let data = header_bytes(b"Pmd ", 2.0, &[0, 0, 1, 1, 1, 1, 1, 1]);
        let err = PmxHeader::parse(&mut BinaryReader::new(&data)).unwrap_err();
        assert!(matches!(err, PmxError::InvalidMagic { .. }));
    }

    #[test]
    fn test_old_version_rejected() {
        let data = header_bytes(b"PMX ", 1.0, &[0, 0, 1, 1, 1, 1, 1, 1]);
        let err = PmxHeader::parse(&mut BinaryReader::new(&data)).unwrap_err();
        assert!(matches!(err, PmxError::UnsupportedVersion(v) if (v - 1.0).abs() < 0.001));
    }

    #[test]
    fn test_newer_version_tolerated() {
        let data = header_bytes(b"PMX ", 2.5, &[0, 0, 1, 1, 1, 1, 1, 1]);
        let header = PmxHeader::parse(&mut BinaryReader::new(&data)).unwrap();
        assert!((header.version - 2.5).abs() < 0.001);
    }

    #[test]
    fn test_invalid_width_is_header_error() {
        let data = header_bytes(b"PMX ", 2.0, &[0, 0, 3, 1, 1, 1, 1, 1]);
        let err = PmxHeader::parse(&mut BinaryReader::new(&data)).unwrap_err();
        assert!(matches!(err, PmxError::InvalidHeader(_)));
    }
}
