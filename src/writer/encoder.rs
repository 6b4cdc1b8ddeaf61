//! Schema-bound encoder.

use bytes::Bytes;

use super::buffer::{EncodeBuffer, DEFAULT_INITIAL_CAPACITY};
use super::encode::ValueEncoder;
use crate::error::EncodeError;
use crate::schema::Schema;
use crate::value::AvroValue;

/// Configuration for encoding.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    /// Starting output buffer capacity in bytes (default: 256)
    pub initial_capacity: usize,
    /// Maximum items per array/map block (default: all items in one block)
    pub block_size: Option<usize>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            block_size: None,
        }
    }
}

impl EncoderConfig {
    /// Create a new encoder configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the starting buffer capacity.
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Cap the number of items written per array/map block.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = Some(block_size);
        self
    }
}

/// Encodes [`AvroValue`]s as Avro binary datums of one schema.
///
/// # Example
/// ```
/// use contrail::{AvroValue, Encoder, Schema};
///
/// let schema = Schema::parse(r#""string""#).unwrap();
/// let encoder = Encoder::new(&schema);
/// let bytes = encoder.encode(&AvroValue::from("foo")).unwrap();
/// assert_eq!(&bytes[..], &[0x06, b'f', b'o', b'o']);
/// ```
#[derive(Debug, Clone)]
pub struct Encoder {
    schema: Schema,
    config: EncoderConfig,
}

impl Encoder {
    /// Create an encoder with the default configuration.
    pub fn new(schema: &Schema) -> Self {
        Self::with_config(schema, EncoderConfig::default())
    }

    /// Create an encoder with an explicit configuration.
    pub fn with_config(schema: &Schema, config: EncoderConfig) -> Self {
        Self {
            schema: schema.clone(),
            config,
        }
    }

    /// The schema values are encoded against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The active configuration.
    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Encode one value. Nothing is returned unless the whole value encodes.
    pub fn encode(&self, value: &AvroValue) -> Result<Bytes, EncodeError> {
        let mut buf = EncodeBuffer::with_capacity(self.config.initial_capacity);
        self.encode_into(&mut buf, value)?;
        Ok(buf.freeze())
    }

    /// Append one encoded value to an existing buffer.
    ///
    /// On error the buffer may hold a partial datum.
    pub fn encode_into(&self, buf: &mut EncodeBuffer, value: &AvroValue) -> Result<(), EncodeError> {
        ValueEncoder::new(self.schema.context(), self.config.block_size).encode(
            buf,
            self.schema.root(),
            value,
        )
    }
}

/// Encode one value with the default configuration.
pub fn encode(schema: &Schema, value: &AvroValue) -> Result<Bytes, EncodeError> {
    Encoder::new(schema).encode(value)
}
