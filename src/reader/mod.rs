//! Avro binary decoding.
//!
//! [`decode`] holds the wire-level primitives and schema-driven value
//! decoding; [`Decoder`] binds them to a parsed schema, optionally read
//! through a reader schema.

pub mod decode;
mod decoder;

pub use decode::{
    // Primitive type decoders
    decode_boolean,
    decode_bytes,
    decode_double,
    decode_enum,
    decode_enum_index,
    decode_fixed,
    decode_float,
    decode_int,
    decode_long,
    decode_null,
    decode_string,
    decode_union_index,
    // Complex type decoders with resolution context
    decode_array_with_context,
    decode_map_with_context,
    decode_record_with_context,
    decode_union_with_context,
    decode_value_with_context,
    // Skip functions
    skip_bytes,
    skip_fixed,
    skip_value_with_context,
    skip_varint,
    MAX_ZERO_WIDTH_ITEMS,
};
pub use decoder::{decode, decode_with_reader, Decoder};
