//! Shared binary reading for the PMX and VMD container formats.
//!
//! This crate holds the pieces both parsers need: a bounds-checked
//! little-endian [`BinaryReader`], the variable width index table used by
//! PMX, the text codecs, and the matching write helpers used by the
//! container writers and test fixtures.

pub mod error;
pub mod index;
pub mod io_ext;
pub mod reader;
pub mod text;
pub mod types;

pub use error::{DataError, Result};
pub use index::{IndexDomain, IndexWidth, IndexWidths};
pub use reader::BinaryReader;
pub use text::TextEncoding;

pub mod prelude {
    pub use crate::error::{DataError, Result as DataResult};
    pub use crate::index::{IndexDomain, IndexWidth, IndexWidths};
    pub use crate::io_ext::WriteExt;
    pub use crate::reader::BinaryReader;
    pub use crate::text::TextEncoding;
    pub use crate::types::{DataR, DataW};
}
