//! Schema-bound decoders.
//!
//! A [`Decoder`] reads datums written under one schema. When constructed
//! with a distinct reader schema it compiles a [`ResolvedSchema`] once and
//! follows that plan for every datum.

use std::sync::Arc;

use tracing::debug;

use super::decode::decode_value_with_context;
use crate::error::{CodecError, DecodeError};
use crate::schema::{decode_resolved, ResolvedSchema, Schema};
use crate::value::AvroValue;

#[derive(Debug, Clone)]
enum DecodeMode {
    /// Reader and writer schema are the same.
    Direct(Schema),
    /// Writer data read through a compiled resolution plan.
    Resolved(Arc<ResolvedSchema>),
}

/// Decodes Avro binary datums into [`AvroValue`]s.
///
/// A decoder is immutable once built and may be shared between threads.
///
/// # Example
/// ```
/// use contrail::{AvroValue, Decoder, Schema};
///
/// let schema = Schema::parse(r#""long""#).unwrap();
/// let decoder = Decoder::new(&schema);
/// assert_eq!(decoder.decode(&[0x54]).unwrap(), AvroValue::Long(42));
/// ```
#[derive(Debug, Clone)]
pub struct Decoder {
    mode: DecodeMode,
}

impl Decoder {
    /// Decoder for data written and read with the same schema.
    pub fn new(schema: &Schema) -> Self {
        Self {
            mode: DecodeMode::Direct(schema.clone()),
        }
    }

    /// Decoder for data written with `writer` and read as `reader` values.
    ///
    /// Fails if the schemas cannot be reconciled at a position every datum
    /// passes through.
    pub fn with_reader(writer: &Schema, reader: &Schema) -> Result<Self, CodecError> {
        let plan = ResolvedSchema::new(writer, reader)?;
        debug!(
            writer = %writer.root().kind(),
            reader = %reader.root().kind(),
            "built resolving decoder"
        );
        Ok(Self {
            mode: DecodeMode::Resolved(Arc::new(plan)),
        })
    }

    /// Decoder following an already compiled plan.
    pub fn from_plan(plan: Arc<ResolvedSchema>) -> Self {
        Self {
            mode: DecodeMode::Resolved(plan),
        }
    }

    /// The schema the data was written with.
    pub fn writer_schema(&self) -> &Schema {
        match &self.mode {
            DecodeMode::Direct(schema) => schema,
            DecodeMode::Resolved(plan) => plan.writer(),
        }
    }

    /// The schema values are produced in.
    pub fn reader_schema(&self) -> &Schema {
        match &self.mode {
            DecodeMode::Direct(schema) => schema,
            DecodeMode::Resolved(plan) => plan.reader(),
        }
    }

    /// Decode one datum from the start of `data`.
    ///
    /// Bytes after the datum are ignored; use [`decode_from`](Self::decode_from)
    /// to read consecutive datums.
    pub fn decode(&self, data: &[u8]) -> Result<AvroValue, CodecError> {
        let mut cursor = data;
        self.decode_from(&mut cursor)
    }

    /// Decode one datum and advance the cursor past it.
    pub fn decode_from(&self, data: &mut &[u8]) -> Result<AvroValue, CodecError> {
        match &self.mode {
            DecodeMode::Direct(schema) => {
                Ok(decode_value_with_context(data, schema.root(), schema.context())?)
            }
            DecodeMode::Resolved(plan) => decode_resolved(data, plan.root(), plan),
        }
    }

    /// Decode consecutive datums until the input is exhausted.
    pub fn decode_all(&self, data: &[u8]) -> Result<Vec<AvroValue>, CodecError> {
        let mut cursor = data;
        let mut values = Vec::new();
        while !cursor.is_empty() {
            values.push(self.decode_from(&mut cursor)?);
        }
        Ok(values)
    }
}

/// Decode one datum written and read with `schema`.
pub fn decode(schema: &Schema, data: &[u8]) -> Result<AvroValue, DecodeError> {
    let mut cursor = data;
    decode_value_with_context(&mut cursor, schema.root(), schema.context())
}

/// Decode one datum written with `writer` as a value of `reader`.
pub fn decode_with_reader(
    writer: &Schema,
    reader: &Schema,
    data: &[u8],
) -> Result<AvroValue, CodecError> {
    Decoder::with_reader(writer, reader)?.decode(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let schema = Schema::parse(r#""int""#).unwrap();
        assert_eq!(decode(&schema, &[0x02, 0xFF, 0xFF]).unwrap(), AvroValue::Int(1));
    }

    #[test]
    fn test_decode_from_advances_cursor() {
        let schema = Schema::parse(r#""string""#).unwrap();
        let decoder = Decoder::new(&schema);
        let data = [0x02, b'a', 0x04, b'b', b'c'];
        let mut cursor = &data[..];

        assert_eq!(decoder.decode_from(&mut cursor).unwrap(), AvroValue::from("a"));
        assert_eq!(cursor.len(), 3);
        assert_eq!(decoder.decode_from(&mut cursor).unwrap(), AvroValue::from("bc"));
        assert!(cursor.is_empty());
    }

    #[test]
    fn test_decode_all() {
        let schema = Schema::parse(r#""long""#).unwrap();
        let values = Decoder::new(&schema).decode_all(&[0x02, 0x04, 0x06]).unwrap();
        assert_eq!(
            values,
            vec![AvroValue::Long(1), AvroValue::Long(2), AvroValue::Long(3)]
        );
    }

    #[test]
    fn test_resolving_decoder_reports_schemas() {
        let writer = Schema::parse(r#""int""#).unwrap();
        let reader = Schema::parse(r#""long""#).unwrap();
        let decoder = Decoder::with_reader(&writer, &reader).unwrap();

        assert_eq!(decoder.writer_schema(), &writer);
        assert_eq!(decoder.reader_schema(), &reader);
        assert_eq!(decoder.decode(&[0x54]).unwrap(), AvroValue::Long(42));
    }

    #[test]
    fn test_incompatible_reader_is_rejected_up_front() {
        let writer = Schema::parse(r#""string""#).unwrap();
        let reader = Schema::parse(r#""int""#).unwrap();
        let err = Decoder::with_reader(&writer, &reader).unwrap_err();
        assert!(err.is_resolution());
    }

    #[test]
    fn test_truncated_input() {
        let schema = Schema::parse(r#""double""#).unwrap();
        let err = Decoder::new(&schema).decode(&[0x00, 0x00]).unwrap_err();
        assert!(err.is_decode());
    }
}
