//! Avro binary encoder for primitive and complex types.
//!
//! The inverse of [`crate::reader::decode`]: values are written in schema
//! order into an [`EncodeBuffer`]. Named references are followed through the
//! schema's registry and logical types encode as their base type.

use std::collections::HashSet;

use crate::error::EncodeError;
use crate::schema::{
    json_to_avro_value, AvroSchema, EnumSchema, RecordSchema, SchemaResolutionContext,
};
use crate::value::AvroValue;
use crate::varint::{write_zigzag, MAX_VARINT_LEN};

use super::buffer::EncodeBuffer;

/// Write a long as a zig-zag varint.
#[inline]
pub fn encode_long(buf: &mut EncodeBuffer, value: i64) {
    let mut scratch = [0u8; MAX_VARINT_LEN];
    let len = write_zigzag(value, &mut scratch);
    buf.put_slice(&scratch[..len]);
}

/// Write an int as a zig-zag varint.
#[inline]
pub fn encode_int(buf: &mut EncodeBuffer, value: i32) {
    encode_long(buf, value as i64);
}

/// Write a boolean as a single 0/1 byte.
#[inline]
pub fn encode_boolean(buf: &mut EncodeBuffer, value: bool) {
    buf.put_u8(u8::from(value));
}

/// Write a float as 4 little-endian bytes.
#[inline]
pub fn encode_float(buf: &mut EncodeBuffer, value: f32) {
    buf.put_slice(&value.to_le_bytes());
}

/// Write a double as 8 little-endian bytes.
#[inline]
pub fn encode_double(buf: &mut EncodeBuffer, value: f64) {
    buf.put_slice(&value.to_le_bytes());
}

/// Write length-prefixed bytes.
pub fn encode_bytes(buf: &mut EncodeBuffer, value: &[u8]) {
    encode_long(buf, value.len() as i64);
    buf.put_slice(value);
}

/// Write a length-prefixed UTF-8 string.
pub fn encode_string(buf: &mut EncodeBuffer, value: &str) {
    encode_bytes(buf, value.as_bytes());
}

/// Schema-driven value writer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ValueEncoder<'a> {
    context: &'a SchemaResolutionContext,
    /// Maximum items per array/map block; `None` writes one block
    block_size: Option<usize>,
}

impl<'a> ValueEncoder<'a> {
    pub(crate) fn new(context: &'a SchemaResolutionContext, block_size: Option<usize>) -> Self {
        Self {
            context,
            block_size: block_size.filter(|&n| n > 0),
        }
    }

    fn resolve(&self, schema: &'a AvroSchema) -> Result<&'a AvroSchema, EncodeError> {
        match self.context.lookup(schema) {
            Some(resolved) => Ok(resolved.base()),
            None => Err(EncodeError::UnresolvedName(
                schema.fullname().unwrap_or_default(),
            )),
        }
    }

    /// Encode `value` as an instance of `schema`.
    pub(crate) fn encode(
        &self,
        buf: &mut EncodeBuffer,
        schema: &'a AvroSchema,
        value: &AvroValue,
    ) -> Result<(), EncodeError> {
        let schema = self.resolve(schema)?;

        match (schema, value) {
            (AvroSchema::Null, AvroValue::Null) => Ok(()),
            (AvroSchema::Boolean, AvroValue::Boolean(b)) => {
                encode_boolean(buf, *b);
                Ok(())
            }
            (AvroSchema::Int, AvroValue::Int(v)) => {
                encode_int(buf, *v);
                Ok(())
            }
            (AvroSchema::Long, AvroValue::Int(v)) => {
                encode_long(buf, *v as i64);
                Ok(())
            }
            (AvroSchema::Long, AvroValue::Long(v)) => {
                encode_long(buf, *v);
                Ok(())
            }
            (AvroSchema::Float, AvroValue::Int(v)) => {
                encode_float(buf, *v as f32);
                Ok(())
            }
            (AvroSchema::Float, AvroValue::Long(v)) => {
                encode_float(buf, *v as f32);
                Ok(())
            }
            (AvroSchema::Float, AvroValue::Float(v)) => {
                encode_float(buf, *v);
                Ok(())
            }
            (AvroSchema::Double, AvroValue::Int(v)) => {
                encode_double(buf, *v as f64);
                Ok(())
            }
            (AvroSchema::Double, AvroValue::Long(v)) => {
                encode_double(buf, *v as f64);
                Ok(())
            }
            (AvroSchema::Double, AvroValue::Float(v)) => {
                encode_double(buf, *v as f64);
                Ok(())
            }
            (AvroSchema::Double, AvroValue::Double(v)) => {
                encode_double(buf, *v);
                Ok(())
            }
            (AvroSchema::Bytes, AvroValue::Bytes(b)) => {
                encode_bytes(buf, b);
                Ok(())
            }
            (AvroSchema::Bytes, AvroValue::String(s)) => {
                encode_bytes(buf, s.as_bytes());
                Ok(())
            }
            (AvroSchema::String, AvroValue::String(s)) => {
                encode_string(buf, s);
                Ok(())
            }
            (AvroSchema::String, AvroValue::Bytes(b)) => {
                let s = std::str::from_utf8(b).map_err(|e| {
                    EncodeError::InvalidValue(format!("bytes for a string are not UTF-8: {}", e))
                })?;
                encode_string(buf, s);
                Ok(())
            }
            (AvroSchema::Fixed(fixed), AvroValue::Fixed(b) | AvroValue::Bytes(b)) => {
                if b.len() != fixed.size {
                    return Err(EncodeError::InvalidValue(format!(
                        "fixed '{}' needs {} bytes, got {}",
                        fixed.name,
                        fixed.size,
                        b.len()
                    )));
                }
                buf.put_slice(b);
                Ok(())
            }
            (AvroSchema::Enum(enum_schema), AvroValue::Enum(index, symbol)) => {
                let position = symbol_position(enum_schema, symbol)?;
                if *index as usize != position || *index < 0 {
                    return Err(EncodeError::InvalidValue(format!(
                        "enum index {} does not match symbol '{}' at {}",
                        index, symbol, position
                    )));
                }
                encode_long(buf, position as i64);
                Ok(())
            }
            (AvroSchema::Enum(enum_schema), AvroValue::String(symbol)) => {
                let position = symbol_position(enum_schema, symbol)?;
                encode_long(buf, position as i64);
                Ok(())
            }
            (AvroSchema::Array(items), AvroValue::Array(values)) => {
                self.encode_blocks(buf, values, |buf, item| self.encode(buf, items, item))
            }
            (AvroSchema::Map(value_schema), AvroValue::Map(entries)) => {
                let mut seen = HashSet::with_capacity(entries.len());
                for (key, _) in entries {
                    if !seen.insert(key.as_str()) {
                        return Err(EncodeError::InvalidValue(format!(
                            "duplicate map key '{}'",
                            key
                        )));
                    }
                }
                self.encode_blocks(buf, entries, |buf, (key, value)| {
                    encode_string(buf, key);
                    self.encode(buf, value_schema, value)
                })
            }
            (AvroSchema::Union(variants), value) => self.encode_union(buf, variants, value),
            (AvroSchema::Record(record), AvroValue::Record(fields)) => {
                self.encode_record(buf, record, fields)
            }
            (schema, value) => Err(EncodeError::TypeMismatch(format!(
                "expected {}, got {} value",
                schema.kind(),
                value.kind()
            ))),
        }
    }

    fn encode_blocks<T>(
        &self,
        buf: &mut EncodeBuffer,
        items: &[T],
        mut write: impl FnMut(&mut EncodeBuffer, &T) -> Result<(), EncodeError>,
    ) -> Result<(), EncodeError> {
        if !items.is_empty() {
            let block_size = self.block_size.unwrap_or(items.len());
            for block in items.chunks(block_size) {
                encode_long(buf, block.len() as i64);
                for item in block {
                    write(buf, item)?;
                }
            }
        }
        encode_long(buf, 0);
        Ok(())
    }

    fn encode_union(
        &self,
        buf: &mut EncodeBuffer,
        variants: &'a [AvroSchema],
        value: &AvroValue,
    ) -> Result<(), EncodeError> {
        let (index, inner) = match value {
            AvroValue::Union(index, inner) => {
                let index = usize::try_from(*index)
                    .ok()
                    .filter(|&i| i < variants.len())
                    .ok_or_else(|| {
                        EncodeError::InvalidValue(format!(
                            "union index {} out of range for {} members",
                            index,
                            variants.len()
                        ))
                    })?;
                (index, inner.as_ref())
            }
            bare => (self.infer_branch(variants, bare)?, bare),
        };

        encode_long(buf, index as i64);
        self.encode(buf, &variants[index], inner)
    }

    /// Pick the union member for a value that does not name one: first an
    /// exact kind match, then the first member the value widens into.
    pub(crate) fn infer_branch(
        &self,
        variants: &'a [AvroSchema],
        value: &AvroValue,
    ) -> Result<usize, EncodeError> {
        let resolved: Vec<Option<&AvroSchema>> = variants
            .iter()
            .map(|v| self.resolve(v).ok())
            .collect();

        let exact = resolved
            .iter()
            .position(|member| matches!(member, Some(s) if fits_exactly(s, value)));

        exact
            .or_else(|| {
                resolved
                    .iter()
                    .position(|member| matches!(member, Some(s) if fits_widened(s, value)))
            })
            .ok_or_else(|| {
                EncodeError::TypeMismatch(format!("no union member accepts a {} value", value.kind()))
            })
    }

    fn encode_record(
        &self,
        buf: &mut EncodeBuffer,
        record: &'a RecordSchema,
        fields: &[(String, AvroValue)],
    ) -> Result<(), EncodeError> {
        if let Some((unknown, _)) = fields
            .iter()
            .find(|(name, _)| record.field(name).is_none())
        {
            return Err(EncodeError::InvalidValue(format!(
                "record '{}' has no field '{}'",
                record.name, unknown
            )));
        }

        for field in &record.fields {
            match fields.iter().find(|(name, _)| *name == field.name) {
                Some((_, value)) => self.encode(buf, &field.schema, value)?,
                None => {
                    let default = field
                        .default
                        .as_ref()
                        .ok_or_else(|| EncodeError::MissingField(field.name.clone()))?;
                    let value = json_to_avro_value(default, &field.schema, self.context)?;
                    self.encode(buf, &field.schema, &value)?;
                }
            }
        }
        Ok(())
    }
}

fn symbol_position(schema: &EnumSchema, symbol: &str) -> Result<usize, EncodeError> {
    schema.symbol_index(symbol).ok_or_else(|| {
        EncodeError::InvalidValue(format!(
            "'{}' is not a symbol of enum '{}'",
            symbol, schema.name
        ))
    })
}

fn fits_exactly(schema: &AvroSchema, value: &AvroValue) -> bool {
    match (schema, value) {
        (AvroSchema::Null, AvroValue::Null)
        | (AvroSchema::Boolean, AvroValue::Boolean(_))
        | (AvroSchema::Int, AvroValue::Int(_))
        | (AvroSchema::Long, AvroValue::Long(_))
        | (AvroSchema::Float, AvroValue::Float(_))
        | (AvroSchema::Double, AvroValue::Double(_))
        | (AvroSchema::Bytes, AvroValue::Bytes(_))
        | (AvroSchema::String, AvroValue::String(_))
        | (AvroSchema::Array(_), AvroValue::Array(_))
        | (AvroSchema::Map(_), AvroValue::Map(_)) => true,
        (AvroSchema::Fixed(fixed), AvroValue::Fixed(b)) => b.len() == fixed.size,
        (AvroSchema::Enum(e), AvroValue::Enum(_, symbol)) => e.symbol_index(symbol).is_some(),
        (AvroSchema::Record(record), AvroValue::Record(fields)) => record_accepts(record, fields),
        _ => false,
    }
}

fn fits_widened(schema: &AvroSchema, value: &AvroValue) -> bool {
    match (schema, value) {
        (AvroSchema::Long | AvroSchema::Float | AvroSchema::Double, AvroValue::Int(_))
        | (AvroSchema::Float | AvroSchema::Double, AvroValue::Long(_))
        | (AvroSchema::Double, AvroValue::Float(_))
        | (AvroSchema::Bytes, AvroValue::String(_)) => true,
        (AvroSchema::String, AvroValue::Bytes(b)) => std::str::from_utf8(b).is_ok(),
        (AvroSchema::Fixed(fixed), AvroValue::Bytes(b)) => b.len() == fixed.size,
        (AvroSchema::Enum(e), AvroValue::String(symbol)) => e.symbol_index(symbol).is_some(),
        _ => false,
    }
}

/// True if every supplied field exists and every absent one has a default.
fn record_accepts(record: &RecordSchema, fields: &[(String, AvroValue)]) -> bool {
    fields.iter().all(|(name, _)| record.field(name).is_some())
        && record
            .fields
            .iter()
            .all(|f| f.default.is_some() || fields.iter().any(|(name, _)| *name == f.name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSchema, FixedSchema};
    use serde_json::json;

    fn encode_with(schema: &AvroSchema, value: &AvroValue) -> Result<Vec<u8>, EncodeError> {
        let context = SchemaResolutionContext::build_from_schema(schema);
        let mut buf = EncodeBuffer::new();
        ValueEncoder::new(&context, None).encode(&mut buf, schema, value)?;
        Ok(buf.as_slice().to_vec())
    }

    #[test]
    fn test_encode_primitives() {
        assert_eq!(encode_with(&AvroSchema::Null, &AvroValue::Null).unwrap(), Vec::<u8>::new());
        assert_eq!(encode_with(&AvroSchema::Boolean, &true.into()).unwrap(), vec![0x01]);
        assert_eq!(encode_with(&AvroSchema::Long, &AvroValue::Long(1)).unwrap(), vec![0x02]);
        assert_eq!(encode_with(&AvroSchema::Int, &AvroValue::Int(-1)).unwrap(), vec![0x01]);
        assert_eq!(
            encode_with(&AvroSchema::String, &"foo".into()).unwrap(),
            vec![0x06, b'f', b'o', b'o']
        );
        assert_eq!(
            encode_with(&AvroSchema::Float, &AvroValue::Float(1.0)).unwrap(),
            1.0f32.to_le_bytes().to_vec()
        );
    }

    #[test]
    fn test_encode_widening() {
        assert_eq!(
            encode_with(&AvroSchema::Double, &AvroValue::Int(3)).unwrap(),
            3.0f64.to_le_bytes().to_vec()
        );
        assert_eq!(encode_with(&AvroSchema::Long, &AvroValue::Int(1)).unwrap(), vec![0x02]);
        assert!(matches!(
            encode_with(&AvroSchema::Int, &AvroValue::Long(1)),
            Err(EncodeError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_string_and_bytes_interchangeable() {
        let as_string = encode_with(&AvroSchema::String, &"hi".into()).unwrap();
        let as_bytes = encode_with(&AvroSchema::String, &AvroValue::Bytes(b"hi".to_vec())).unwrap();
        assert_eq!(as_string, as_bytes);
        assert!(encode_with(&AvroSchema::String, &AvroValue::Bytes(vec![0xFF])).is_err());
    }

    #[test]
    fn test_fixed_size_checked() {
        let schema = AvroSchema::Fixed(FixedSchema::new("F", 2));
        assert_eq!(
            encode_with(&schema, &AvroValue::Fixed(vec![1, 2])).unwrap(),
            vec![1, 2]
        );
        assert!(matches!(
            encode_with(&schema, &AvroValue::Bytes(vec![1])),
            Err(EncodeError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_enum_by_symbol() {
        let schema = AvroSchema::Enum(EnumSchema::new(
            "Suit",
            vec!["CLUBS".into(), "DIAMONDS".into()],
        ));
        assert_eq!(encode_with(&schema, &"DIAMONDS".into()).unwrap(), vec![0x02]);
        assert_eq!(
            encode_with(&schema, &AvroValue::Enum(1, "DIAMONDS".into())).unwrap(),
            vec![0x02]
        );
        assert!(encode_with(&schema, &AvroValue::Enum(0, "DIAMONDS".into())).is_err());
        assert!(encode_with(&schema, &"JOKER".into()).is_err());
    }

    #[test]
    fn test_array_blocks() {
        let schema = AvroSchema::Array(Box::new(AvroSchema::Long));
        let value = AvroValue::Array(vec![AvroValue::Long(1), AvroValue::Long(2), AvroValue::Long(3)]);
        assert_eq!(
            encode_with(&schema, &value).unwrap(),
            vec![0x06, 0x02, 0x04, 0x06, 0x00]
        );
        assert_eq!(
            encode_with(&schema, &AvroValue::Array(vec![])).unwrap(),
            vec![0x00]
        );

        let context = SchemaResolutionContext::new();
        let mut buf = EncodeBuffer::new();
        ValueEncoder::new(&context, Some(2))
            .encode(&mut buf, &schema, &value)
            .unwrap();
        assert_eq!(buf.as_slice(), &[0x04, 0x02, 0x04, 0x02, 0x06, 0x00]);
    }

    #[test]
    fn test_map_rejects_duplicate_keys() {
        let schema = AvroSchema::Map(Box::new(AvroSchema::Int));
        let value = AvroValue::map([("a", AvroValue::Int(1)), ("a", AvroValue::Int(2))]);
        assert!(matches!(
            encode_with(&schema, &value),
            Err(EncodeError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_union_inference_prefers_exact_kind() {
        let schema = AvroSchema::Union(vec![AvroSchema::Null, AvroSchema::Long, AvroSchema::Int]);
        assert_eq!(encode_with(&schema, &AvroValue::Int(1)).unwrap(), vec![0x04, 0x02]);
        assert_eq!(encode_with(&schema, &AvroValue::Null).unwrap(), vec![0x00]);

        let widening = AvroSchema::Union(vec![AvroSchema::Null, AvroSchema::Double]);
        assert_eq!(
            encode_with(&widening, &AvroValue::Int(1)).unwrap()[0],
            0x02
        );
        assert!(encode_with(&widening, &"x".into()).is_err());
    }

    #[test]
    fn test_union_explicit_index() {
        let schema = AvroSchema::Union(vec![AvroSchema::String, AvroSchema::Null]);
        assert_eq!(
            encode_with(&schema, &AvroValue::union(1, AvroValue::Null)).unwrap(),
            vec![0x02]
        );
        assert!(encode_with(&schema, &AvroValue::union(2, AvroValue::Null)).is_err());
    }

    #[test]
    fn test_record_fields_by_name_and_defaults() {
        let schema = AvroSchema::Record(RecordSchema::new(
            "R",
            vec![
                FieldSchema::new("a", AvroSchema::Int),
                FieldSchema::new("b", AvroSchema::String).with_default(json!("x")),
            ],
        ));

        // Value order does not matter
        let value = AvroValue::record([("b", AvroValue::from("y")), ("a", AvroValue::Int(1))]);
        assert_eq!(encode_with(&schema, &value).unwrap(), vec![0x02, 0x02, b'y']);

        let defaulted = AvroValue::record([("a", AvroValue::Int(1))]);
        assert_eq!(encode_with(&schema, &defaulted).unwrap(), vec![0x02, 0x02, b'x']);

        let missing = AvroValue::record([("b", AvroValue::from("y"))]);
        assert!(matches!(
            encode_with(&schema, &missing),
            Err(EncodeError::MissingField(name)) if name == "a"
        ));

        let unknown = AvroValue::record([("a", AvroValue::Int(1)), ("zzz", AvroValue::Null)]);
        assert!(matches!(
            encode_with(&schema, &unknown),
            Err(EncodeError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_unresolved_name() {
        assert!(matches!(
            encode_with(&AvroSchema::Named("Ghost".into()), &AvroValue::Null),
            Err(EncodeError::UnresolvedName(name)) if name == "Ghost"
        ));
    }
}
