//! A descriptor-driven PLY (Polygon File Format) reader and writer.
//!
//! Callers describe the data they want with [`Descriptor`]s: which element,
//! which of its properties, and in what scalar type. The file facade parses the
//! header, plans the byte layout of every element, and decodes each descriptor
//! into a freshly allocated, typed [`ScalarBuffer`]. Writing works the other way
//! round: descriptors carry the source buffers and the elements of the header
//! are derived from them.
//!
//! Both ASCII and binary (little and big endian) files are supported, as are
//! list properties such as the vertex indices of a face.
//!
//! # Example
//!
//! ```rust
//! use ply_codec::{Descriptor, PlyFile, ScalarType};
//! use std::io::Cursor;
//!
//! let ply_data = "ply
//! format ascii 1.0
//! element vertex 2
//! property float x
//! property float y
//! property float z
//! element face 1
//! property list uchar int vertex_indices
//! end_header
//! 0 0 0
//! 1 0 0
//! 2 0 1
//! ";
//!
//! let mut ply = PlyFile::from_reader(Cursor::new(ply_data));
//! let vertices = ply
//!     .add_descriptor(Descriptor::new("vertex", &["x", "y", "z"], ScalarType::F32))
//!     .unwrap();
//! let faces = ply
//!     .add_descriptor(Descriptor::new("face", &["vertex_indices"], ScalarType::U32))
//!     .unwrap();
//! ply.read().unwrap();
//!
//! let vertices = ply.take_decoded(vertices).unwrap();
//! assert_eq!(vertices.count, 2);
//! assert_eq!(vertices.as_slice::<f32>().unwrap(), &[0.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
//!
//! let faces = ply.take_decoded(faces).unwrap();
//! assert_eq!(faces.as_slice::<u32>().unwrap(), &[0, 1]);
//! assert_eq!(faces.list_counts_as::<u8>().unwrap(), &[2]);
//! ```

mod buffer;
mod de;
mod descriptor;
mod error;
mod header;
mod layout;
mod ply_file;
mod ser;

pub use buffer::{DecodedBuffer, PlyScalar, ScalarBuffer};
pub use descriptor::{Descriptor, DescriptorId};
pub use error::{error_message, PlyError};
pub use header::{ElementDef, PlyHeader, PropertySchema};
pub use ply_file::{OpenMode, PlyFile};
pub use ser::WRITE_CHUNK_SIZE;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// PLY file format (ascii or binary)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlyFormat {
    Ascii,
    BinaryLittleEndian,
    BinaryBigEndian,
}

impl PlyFormat {
    /// The binary format matching the byte order of the host.
    pub fn native() -> Self {
        if cfg!(target_endian = "little") {
            PlyFormat::BinaryLittleEndian
        } else {
            PlyFormat::BinaryBigEndian
        }
    }

    /// Token used for this format on the `format` header line.
    pub fn as_str(&self) -> &'static str {
        match self {
            PlyFormat::Ascii => "ascii",
            PlyFormat::BinaryLittleEndian => "binary_little_endian",
            PlyFormat::BinaryBigEndian => "binary_big_endian",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ascii" => Some(PlyFormat::Ascii),
            "binary_little_endian" => Some(PlyFormat::BinaryLittleEndian),
            "binary_big_endian" => Some(PlyFormat::BinaryBigEndian),
            _ => None,
        }
    }

    pub fn is_binary(&self) -> bool {
        !matches!(self, PlyFormat::Ascii)
    }
}

impl fmt::Display for PlyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for PlyFormat {
    type Err = PlyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| PlyError::InvalidFormat(s.to_string()))
    }
}

/// PLY scalar data types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    #[serde(rename = "char")]
    I8,
    #[serde(rename = "uchar")]
    U8,
    #[serde(rename = "short")]
    I16,
    #[serde(rename = "ushort")]
    U16,
    #[serde(rename = "int")]
    I32,
    #[serde(rename = "uint")]
    U32,
    #[serde(rename = "float")]
    F32,
    #[serde(rename = "double")]
    F64,
}

impl ScalarType {
    /// Maps a header type name to a scalar type. Accepts both the classic
    /// names (`uchar`, `int`, ...) and the sized aliases (`uint8`, `int32`, ...).
    ///
    /// Unknown names yield `None`; the header parser reports them as a
    /// malformed property command.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "char" | "int8" => Some(ScalarType::I8),
            "uchar" | "uint8" => Some(ScalarType::U8),
            "short" | "int16" => Some(ScalarType::I16),
            "ushort" | "uint16" => Some(ScalarType::U16),
            "int" | "int32" => Some(ScalarType::I32),
            "uint" | "uint32" => Some(ScalarType::U32),
            "float" | "float32" => Some(ScalarType::F32),
            "double" | "float64" => Some(ScalarType::F64),
            _ => None,
        }
    }

    pub fn size_bytes(&self) -> usize {
        match self {
            ScalarType::I8 | ScalarType::U8 => 1,
            ScalarType::I16 | ScalarType::U16 => 2,
            ScalarType::I32 | ScalarType::U32 | ScalarType::F32 => 4,
            ScalarType::F64 => 8,
        }
    }

    /// Canonical header name, used when writing headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScalarType::I8 => "char",
            ScalarType::U8 => "uchar",
            ScalarType::I16 => "short",
            ScalarType::U16 => "ushort",
            ScalarType::I32 => "int",
            ScalarType::U32 => "uint",
            ScalarType::F32 => "float",
            ScalarType::F64 => "double",
        }
    }

    pub fn is_integral(&self) -> bool {
        !matches!(self, ScalarType::F32 | ScalarType::F64)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for ScalarType {
    type Err = PlyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| PlyError::UnknownScalarType(s.to_string()))
    }
}
