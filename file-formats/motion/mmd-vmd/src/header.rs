use std::io::Write;

use mmd_data::BinaryReader;
use mmd_data::io_ext::WriteExt;
use mmd_data::text::trim_nul;

use crate::error::{Result, VmdError};

/// Size of the signature field.
pub const SIGNATURE_SIZE: usize = 30;

pub const SIGNATURE_V2: &[u8] = b"Vocaloid Motion Data 0002";
pub const SIGNATURE_V1: &[u8] = b"Vocaloid Motion Data file";

/// Signature revision, which decides the model name width.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum VmdVersion {
    /// `Vocaloid Motion Data file`, 10 byte model name
    Legacy,
    /// `Vocaloid Motion Data 0002`, 20 byte model name
    #[default]
    V2,
}

impl VmdVersion {
    pub fn signature(self) -> &'static [u8] {
        match self {
            Self::Legacy => SIGNATURE_V1,
            Self::V2 => SIGNATURE_V2,
        }
    }

    pub fn model_name_size(self) -> usize {
        match self {
            Self::Legacy => 10,
            Self::V2 => 20,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VmdHeader {
    pub version: VmdVersion,
    /// Name of the model the motion was recorded for.
    pub model_name: String,
}

impl VmdHeader {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            version: VmdVersion::V2,
            model_name: model_name.into(),
        }
    }

    pub fn parse(reader: &mut BinaryReader<'_>) -> Result<Self> {
        // Bytes after the signature text are padding, sometimes not zeroed.
        let raw = reader.bytes(SIGNATURE_SIZE)?;
        let version = if raw.starts_with(SIGNATURE_V2) {
            VmdVersion::V2
        } else if raw.starts_with(SIGNATURE_V1) {
            VmdVersion::Legacy
        } else {
            return Err(VmdError::InvalidMagic {
                expected: String::from_utf8_lossy(SIGNATURE_V2).into_owned(),
                actual: String::from_utf8_lossy(trim_nul(raw)).into_owned(),
            });
        };

        let model_name = reader.read_fixed_str(version.model_name_size())?;
        log::debug!("VMD {:?} for model '{}'", version, model_name);
        Ok(Self {
            version,
            model_name,
        })
    }

    pub fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let mut signature = self.version.signature().to_vec();
        signature.resize(SIGNATURE_SIZE, 0);
        writer.write_all(&signature)?;
        writer.write_fixed_str(&self.model_name, self.version.model_name_size())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_signature() {
        let header = VmdHeader {
            version: VmdVersion::Legacy,
            model_name: "miku".to_string(),
        };
        let mut data = Vec::new();
        header.write(&mut data).unwrap();
        assert_eq!(data.len(), 40);

        let mut reader = BinaryReader::new(&data);
        assert_eq!(VmdHeader::parse(&mut reader).unwrap(), header);
        assert!(reader.is_empty());
    }

    #[test]
    fn test_unknown_signature() {
        let mut data = b"Vocaloid Motion Data 0003".to_vec();
        data.resize(50, 0);
        let err = VmdHeader::parse(&mut BinaryReader::new(&data)).unwrap_err();
        assert!(err.is_format_error());
    }
}
