//! Text decoding for the two container formats
//!
//! PMX strings are length-prefixed UTF-16LE or UTF-8. VMD names are
//! fixed-width, NUL-terminated Shift-JIS.

use crate::error::{DataError, Result};

/// PMX text encoding, selected by the first header global.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    /// Double byte, little endian.
    #[default]
    Utf16Le,
    /// Single byte.
    Utf8,
}

impl TryFrom<u8> for TextEncoding {
    type Error = DataError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Utf16Le),
            1 => Ok(Self::Utf8),
            _ => Err(DataError::InvalidTextEncoding(value)),
        }
    }
}

impl From<TextEncoding> for u8 {
    fn from(value: TextEncoding) -> Self {
        match value {
            TextEncoding::Utf16Le => 0,
            TextEncoding::Utf8 => 1,
        }
    }
}

impl TextEncoding {
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Utf16Le => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
        }
    }

    pub fn encode(self, text: &str) -> Vec<u8> {
        match self {
            Self::Utf8 => text.as_bytes().to_vec(),
            Self::Utf16Le => text.encode_utf16().flat_map(u16::to_le_bytes).collect(),
        }
    }
}

/// Slice a fixed-width field at its first NUL.
pub fn trim_nul(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    }
}

/// Decode a legacy Shift-JIS field.
#[cfg(feature = "shift-jis")]
pub fn decode_shift_jis(bytes: &[u8]) -> String {
    let (text, had_errors) = encoding_rs::SHIFT_JIS.decode_without_bom_handling(bytes);
    if had_errors {
        log::debug!("Malformed Shift-JIS sequence in {:02x?}", bytes);
    }
    text.into_owned()
}

/// Decode a legacy Shift-JIS field.
///
/// Without the codec every byte maps to the code point of the same value so
/// that names stay distinct and can be re-encoded losslessly.
#[cfg(not(feature = "shift-jis"))]
pub fn decode_shift_jis(bytes: &[u8]) -> String {
    decode_latin1(bytes)
}

/// Encode text for a legacy Shift-JIS field.
#[cfg(feature = "shift-jis")]
pub fn encode_shift_jis(text: &str) -> Vec<u8> {
    let (bytes, _, _) = encoding_rs::SHIFT_JIS.encode(text);
    bytes.into_owned()
}

/// Encode text for a legacy Shift-JIS field.
#[cfg(not(feature = "shift-jis"))]
pub fn encode_shift_jis(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Byte-preserving decode.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf16_round_trip() {
        let bytes = TextEncoding::Utf16Le.encode("センター");
        assert_eq!(bytes.len(), 8);
        assert_eq!(TextEncoding::Utf16Le.decode(&bytes), "センター");
    }

    #[test]
    fn test_trim_nul() {
        assert_eq!(trim_nul(b"abc\0\xfd\xfd"), b"abc");
        assert_eq!(trim_nul(b"abc"), b"abc");
    }

    #[test]
    fn test_latin1_is_byte_preserving() {
        let decoded = decode_latin1(&[0x83, 0x5a, 0x41]);
        let bytes: Vec<u8> = decoded.chars().map(|c| c as u8).collect();
        assert_eq!(bytes, vec![0x83, 0x5a, 0x41]);
    }

    #[cfg(feature = "shift-jis")]
    #[test]
    fn test_shift_jis_bone_name() {
        // "センター" (center)
        let bytes = [0x83, 0x5a, 0x83, 0x93, 0x83, 0x5e, 0x81, 0x5b];
        assert_eq!(decode_shift_jis(&bytes), "センター");
        assert_eq!(encode_shift_jis("センター"), bytes.to_vec());
    }
}
