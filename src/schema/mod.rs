//! Avro schema types and parsing.
//!
//! This module defines the complete Avro schema type system including
//! primitives, complex types, logical types, JSON parsing, the named type
//! registry, and reader/writer schema resolution.

mod model;
mod parser;
mod reader_writer_resolution;
mod resolution;
mod types;

pub use model::{parse_schemata, Schema};
pub use parser::{parse_schema, parse_schema_with_options, ParseOptions, SchemaParser};
pub use reader_writer_resolution::{
    apply_promotion, json_to_avro_value, EnumResolution, FieldAction, RecordResolution,
    ResolvedNode, ResolvedSchema, TypePromotion,
};
pub(crate) use reader_writer_resolution::decode_resolved;
pub use resolution::SchemaResolutionContext;
pub use types::*;
