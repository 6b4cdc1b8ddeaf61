//! Schema-driven Avro binary codec
//!
//! This library converts values between an in-memory value model and the
//! Avro binary encoding, guided by a schema written as a JSON document. Data
//! written under one schema can be read under a different, compatible
//! reader schema.
//!
//! # Example
//! ```
//! use contrail::{decode, encode, AvroValue, Schema};
//!
//! let schema = Schema::parse(r#"{
//!     "type": "record", "name": "Point",
//!     "fields": [{"name": "x", "type": "int"}, {"name": "y", "type": "int"}]
//! }"#).unwrap();
//!
//! let point = AvroValue::record([("x", AvroValue::Int(1)), ("y", AvroValue::Int(2))]);
//! let bytes = encode(&schema, &point).unwrap();
//! assert_eq!(&bytes[..], &[0x02, 0x04]);
//! assert_eq!(decode(&schema, &bytes).unwrap(), point);
//! ```

pub mod convert;
pub mod error;
pub mod reader;
pub mod schema;
pub mod value;
pub mod varint;
pub mod writer;

// Re-export main types
pub use convert::{from_json, to_json, RecordInstance, RecordType, TypeFactory};
pub use error::{CodecError, DecodeError, EncodeError, ResolutionError, SchemaError};
pub use reader::{decode, decode_with_reader, Decoder};
pub use schema::{
    parse_schema, parse_schema_with_options, parse_schemata, AvroSchema, EnumSchema, FieldSchema,
    FixedSchema, LogicalType, LogicalTypeName, ParseOptions, RecordSchema, ResolvedSchema, Schema,
    SchemaParser, SchemaResolutionContext, TypePromotion,
};
pub use value::AvroValue;
pub use writer::{encode, EncodeBuffer, Encoder, EncoderConfig};
