//! Error types for schema parsing, encoding, decoding and schema resolution

use thiserror::Error;

/// Errors that can occur during schema operations
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Schema document is structurally invalid
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
    /// Unknown or unsupported type name
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),
    /// Schema document is not valid JSON
    #[error("Parse error: {0}")]
    ParseError(String),
    /// A named type or a record field was defined twice
    #[error("Duplicate name: {0}")]
    DuplicateName(String),
    /// Reference to a named type that was never defined
    #[error("Unresolved named type reference: '{0}'")]
    UnresolvedReference(String),
    /// Field default literal does not fit the field's type
    #[error("Invalid default for field '{field}': {message}")]
    InvalidDefault { field: String, message: String },
}

/// Errors that can occur while encoding a value against a schema
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Value variant does not correspond to the schema node
    #[error("Type mismatch: {0}")]
    TypeMismatch(String),
    /// Value has the right kind but an unacceptable content
    #[error("Invalid value: {0}")]
    InvalidValue(String),
    /// Record value lacks a field that has no default
    #[error("Missing field '{0}' with no default")]
    MissingField(String),
    /// Named type reference not present in the schema registry
    #[error("Unresolved named type reference: '{0}'")]
    UnresolvedName(String),
}

/// Errors that can occur during decoding
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Invalid Avro data
    #[error("Invalid data: {0}")]
    InvalidData(String),
    /// Unexpected end of data
    #[error("Unexpected end of data")]
    UnexpectedEof,
    /// Invalid varint encoding
    #[error("Invalid varint encoding")]
    InvalidVarint,
    /// String is not valid UTF-8
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    /// Named type reference not present in the schema registry
    #[error("Unresolved named type reference: '{0}'")]
    UnresolvedName(String),
}

/// Errors raised when writer data cannot be reinterpreted under a reader schema
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    /// Writer and reader kinds differ and no promotion applies
    #[error("Incompatible types: writer {writer}, reader {reader}")]
    IncompatibleTypes { writer: String, reader: String },
    /// Reader field is absent from the writer and has no default
    #[error("Reader field '{0}' not in writer schema and has no default")]
    MissingDefault(String),
    /// Reader field default could not be turned into a value
    #[error("Invalid default for field '{field}': {message}")]
    InvalidDefault { field: String, message: String },
    /// Writer enum symbol unknown to the reader, and no reader default
    #[error("Enum symbol '{symbol}' not in reader enum '{name}' and no default is declared")]
    UnknownSymbol { name: String, symbol: String },
    /// Writer union member has no counterpart in the reader schema
    #[error("No reader union branch matches writer type {0}")]
    NoMatchingBranch(String),
}

/// Top-level error type for operations spanning several stages
#[derive(Debug, Error)]
pub enum CodecError {
    /// Schema error
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Encode error
    #[error("Encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Decode error
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Resolution error
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),
}

impl CodecError {
    /// Returns true when the failure came from writer/reader incompatibility.
    pub fn is_resolution(&self) -> bool {
        matches!(self, CodecError::Resolution(_))
    }

    /// Returns true when the failure came from truncated or corrupt input.
    pub fn is_decode(&self) -> bool {
        matches!(self, CodecError::Decode(_))
    }
}
