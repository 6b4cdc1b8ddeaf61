//! Avro binary encoding.
//!
//! [`Encoder`] binds the value writer in [`encode`] to a parsed schema and
//! produces immutable [`bytes::Bytes`] through an [`EncodeBuffer`].

pub mod buffer;
pub mod encode;
mod encoder;

pub use buffer::EncodeBuffer;
pub use encode::{
    encode_boolean, encode_bytes, encode_double, encode_float, encode_int, encode_long,
    encode_string,
};
pub use encoder::{encode, Encoder, EncoderConfig};
