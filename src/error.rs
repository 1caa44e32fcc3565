use std::{
    num::{ParseFloatError, ParseIntError},
    path::PathBuf,
};

use thiserror::Error;

use crate::ScalarType;

/// Errors produced while parsing, reading or writing PLY files.
///
/// Every kind has a stable numeric code (see [`PlyError::code`]) which can be
/// turned back into a static message with [`error_message`].
#[derive(Error, Debug)]
pub enum PlyError {
    #[error("Invalid PLY file: first line must be 'ply'")]
    InvalidFile,

    #[error("Invalid PLY file: unrecognized format '{0}'")]
    InvalidFormat(String),

    #[error("Could not open file {path:?}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File is not open for {0}")]
    FileNotOpen(&'static str),

    #[error("Invalid PLY file: could not parse header line {0}")]
    LineParse(usize),

    #[error("Invalid PLY file: malformed format command on line {0}")]
    FormatCmd(usize),

    #[error("Invalid PLY file: malformed element command on line {0}")]
    ElementCmd(usize),

    #[error("Invalid PLY file: malformed property command on line {0}")]
    PropertyCmd(usize),

    #[error("Could not find element '{0}'")]
    ElementNotFound(String),

    #[error("Could not find property '{property}' in element '{element}'")]
    PropertyNotFound { element: String, property: String },

    #[error("Error reading binary data of element '{0}'")]
    BinaryParse(String),

    #[error("Element '{element}' has {declared} records but descriptor provides {requested}")]
    ConflictingNumberOfElements {
        element: String,
        declared: usize,
        requested: usize,
    },

    #[error("Invalid PLY file: unrecognized command '{0}'")]
    UnrecognizedCommand(String),

    #[error("There are no descriptors to read or write")]
    NoRequests,

    #[error("Invalid descriptor: element name is empty")]
    EmptyElementName,

    #[error("Invalid descriptor: a property name is empty")]
    EmptyPropertyName,

    #[error("Invalid descriptor: no properties requested")]
    NoRequestedProperties,

    #[error("Invalid descriptor: no data buffer for element '{0}'")]
    MissingData(String),

    #[error("Invalid descriptor: data type {declared} does not match buffer of {found}")]
    InvalidDataType {
        declared: ScalarType,
        found: ScalarType,
    },

    #[error("Invalid descriptor: list type {0} is not an integer type")]
    InvalidListType(ScalarType),

    #[error("Error reading ASCII data of element '{0}'")]
    AsciiFileRead(String),

    #[error("Reached end of file while reading ASCII element '{0}'")]
    AsciiFileEof(String),

    #[error("Property '{property}' of element '{element}' is not provided by any descriptor")]
    WriteRequiredPropertyMissing { element: String, property: String },

    #[error("Invalid PLY file: stream ended before 'end_header'")]
    HeaderEof,

    #[error("Invalid PLY file: element '{0}' declared twice")]
    DuplicateElement(String),

    #[error("Property '{property}' declared twice in element '{element}'")]
    DuplicateProperty { element: String, property: String },

    #[error("List '{property}' of element '{element}' has {found} items, expected {expected}")]
    ListSizeMismatch {
        element: String,
        property: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid list count {0}")]
    InvalidListCount(f64),

    #[error("Buffer for element '{element}' holds {found} values, expected {expected}")]
    BufferSizeMismatch {
        element: String,
        expected: usize,
        found: usize,
    },

    #[error("Descriptor for element '{0}' has no list counts and no list size hint")]
    MissingListCounts(String),

    #[error("Property type mismatch for '{property}': expected {expected}, found {found}")]
    TypeMismatch {
        property: String,
        expected: String,
        found: String,
    },

    #[error("Too many values on a record line of element '{0}'")]
    TooManyValues(String),

    #[error("Failed to read next ASCII property")]
    NoPropertyFound,

    #[error("Error parsing integer: {0}")]
    ParseIntError(#[from] ParseIntError),

    #[error("Error parsing float: {0}")]
    ParseFloatError(#[from] ParseFloatError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown scalar type '{0}'")]
    UnknownScalarType(String),
}

static ERROR_MESSAGES: [&str; 38] = [
    "No errors.",
    "Invalid PLY file.",
    "Invalid PLY file: Invalid format in ply file.",
    "Could not open file.",
    "File was not open. Please open file first.",
    "Invalid PLY file: Could not parse line in a header.",
    "Invalid PLY file: Format of format command is invalid.",
    "Invalid PLY file: Format of element command is invalid.",
    "Invalid PLY file: Format of property command is invalid.",
    "Could not find requested element in the input ply file.",
    "Could not find requested property in the input ply file.",
    "Error reading binary file.",
    "Number of requested elements does not match the descriptor.",
    "Invalid PLY file: Unrecognized command in a ply file.",
    "There are no requests for data to be read or written.",
    "Invalid descriptor: Element name is empty.",
    "Invalid descriptor: One of the property names is empty.",
    "Invalid descriptor: Number of requested properties is zero.",
    "Invalid descriptor: Data buffer is missing.",
    "Invalid descriptor: Incorrect data type.",
    "Invalid descriptor: Incorrect list type. List type cannot be float or double.",
    "Error reading ASCII PLY file.",
    "Reached EOF when reading ASCII PLY file.",
    "When writing file, a declared property is not provided by any descriptor.",
    "Invalid PLY file: Reached EOF before end of header.",
    "Invalid PLY file: Element declared more than once.",
    "Property declared more than once in an element.",
    "List length does not match the list size hint.",
    "List count is negative or not an integer.",
    "Buffer size does not match the number of records.",
    "List property has neither list counts nor a list size hint.",
    "Property type does not match the declared type.",
    "Too many values on an ASCII record line.",
    "Missing value on an ASCII record line.",
    "Could not parse integer value.",
    "Could not parse floating point value.",
    "IO error.",
    "Unknown scalar type name.",
];

impl PlyError {
    /// Stable numeric code of this error kind. Zero is reserved for "no error".
    pub fn code(&self) -> i32 {
        match self {
            PlyError::InvalidFile => 1,
            PlyError::InvalidFormat(_) => 2,
            PlyError::FileOpen { .. } => 3,
            PlyError::FileNotOpen(_) => 4,
            PlyError::LineParse(_) => 5,
            PlyError::FormatCmd(_) => 6,
            PlyError::ElementCmd(_) => 7,
            PlyError::PropertyCmd(_) => 8,
            PlyError::ElementNotFound(_) => 9,
            PlyError::PropertyNotFound { .. } => 10,
            PlyError::BinaryParse(_) => 11,
            PlyError::ConflictingNumberOfElements { .. } => 12,
            PlyError::UnrecognizedCommand(_) => 13,
            PlyError::NoRequests => 14,
            PlyError::EmptyElementName => 15,
            PlyError::EmptyPropertyName => 16,
            PlyError::NoRequestedProperties => 17,
            PlyError::MissingData(_) => 18,
            PlyError::InvalidDataType { .. } => 19,
            PlyError::InvalidListType(_) => 20,
            PlyError::AsciiFileRead(_) => 21,
            PlyError::AsciiFileEof(_) => 22,
            PlyError::WriteRequiredPropertyMissing { .. } => 23,
            PlyError::HeaderEof => 24,
            PlyError::DuplicateElement(_) => 25,
            PlyError::DuplicateProperty { .. } => 26,
            PlyError::ListSizeMismatch { .. } => 27,
            PlyError::InvalidListCount(_) => 28,
            PlyError::BufferSizeMismatch { .. } => 29,
            PlyError::MissingListCounts(_) => 30,
            PlyError::TypeMismatch { .. } => 31,
            PlyError::TooManyValues(_) => 32,
            PlyError::NoPropertyFound => 33,
            PlyError::ParseIntError(_) => 34,
            PlyError::ParseFloatError(_) => 35,
            PlyError::Io(_) => 36,
            PlyError::UnknownScalarType(_) => 37,
        }
    }
}

/// Static message for an error code returned by [`PlyError::code`].
pub fn error_message(code: i32) -> &'static str {
    usize::try_from(code)
        .ok()
        .and_then(|idx| ERROR_MESSAGES.get(idx))
        .copied()
        .unwrap_or("Unknown error code.")
}
