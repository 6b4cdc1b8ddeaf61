//! Avro binary decoder for primitive and complex types.
//!
//! This module provides functions to decode Avro binary data into
//! [`AvroValue`]s. The decoder follows the Avro binary encoding:
//! - Varints use zigzag encoding for signed integers
//! - Floats and doubles are little-endian IEEE 754
//! - Bytes and strings are length-prefixed
//! - Arrays and maps are sequences of counted blocks ending with a zero count
//!
//! All functions take a `&mut &[u8]` cursor and advance it past what they
//! consume. Logical types decode as their base type.

use std::collections::HashMap;

use crate::error::DecodeError;
use crate::schema::{AvroSchema, EnumSchema, RecordSchema, SchemaResolutionContext};
use crate::value::AvroValue;
use crate::varint;

/// Decode a null value (no-op, consumes no bytes).
///
/// Avro null values have no binary representation.
#[inline]
pub fn decode_null(_data: &mut &[u8]) -> Result<(), DecodeError> {
    Ok(())
}

/// Decode a boolean value.
///
/// Avro booleans are encoded as a single byte: 0x00 for false, 0x01 for true.
#[inline]
pub fn decode_boolean(data: &mut &[u8]) -> Result<bool, DecodeError> {
    let Some((&byte, rest)) = data.split_first() else {
        return Err(DecodeError::UnexpectedEof);
    };
    *data = rest;
    match byte {
        0 => Ok(false),
        1 => Ok(true),
        _ => Err(DecodeError::InvalidData(format!(
            "Invalid boolean value: {}, expected 0 or 1",
            byte
        ))),
    }
}

/// Decode a 32-bit signed integer (zigzag varint encoded).
#[inline]
pub fn decode_int(data: &mut &[u8]) -> Result<i32, DecodeError> {
    let long = decode_long(data)?;
    i32::try_from(long).map_err(|_| {
        DecodeError::InvalidData(format!("Integer overflow: {} does not fit in i32", long))
    })
}

/// Decode a 64-bit signed integer (zigzag varint encoded).
///
/// The zigzag encoding maps signed integers to unsigned integers:
/// 0 -> 0, -1 -> 1, 1 -> 2, -2 -> 3, 2 -> 4, ...
#[inline]
pub fn decode_long(data: &mut &[u8]) -> Result<i64, DecodeError> {
    varint::decode_zigzag(data)
}

/// Decode a 32-bit IEEE 754 floating-point number (little-endian).
#[inline]
pub fn decode_float(data: &mut &[u8]) -> Result<f32, DecodeError> {
    let bytes = take_array::<4>(data)?;
    Ok(f32::from_le_bytes(bytes))
}

/// Decode a 64-bit IEEE 754 floating-point number (little-endian).
#[inline]
pub fn decode_double(data: &mut &[u8]) -> Result<f64, DecodeError> {
    let bytes = take_array::<8>(data)?;
    Ok(f64::from_le_bytes(bytes))
}

#[inline]
fn take_array<const N: usize>(data: &mut &[u8]) -> Result<[u8; N], DecodeError> {
    if data.len() < N {
        return Err(DecodeError::UnexpectedEof);
    }
    let (head, rest) = data.split_at(N);
    *data = rest;
    let mut bytes = [0u8; N];
    bytes.copy_from_slice(head);
    Ok(bytes)
}

/// Decode a length prefix for bytes or strings.
#[inline]
fn decode_length(data: &mut &[u8]) -> Result<usize, DecodeError> {
    let len = decode_long(data)?;
    if len < 0 {
        return Err(DecodeError::InvalidData(format!(
            "Negative bytes length: {}",
            len
        )));
    }
    let len = len as usize;
    if data.len() < len {
        return Err(DecodeError::UnexpectedEof);
    }
    Ok(len)
}

/// Decode a byte array (length-prefixed).
#[inline]
pub fn decode_bytes(data: &mut &[u8]) -> Result<Vec<u8>, DecodeError> {
    let len = decode_length(data)?;
    let (bytes, rest) = data.split_at(len);
    *data = rest;
    Ok(bytes.to_vec())
}

/// Decode a UTF-8 string (length-prefixed).
#[inline]
pub fn decode_string(data: &mut &[u8]) -> Result<String, DecodeError> {
    let bytes = decode_bytes(data)?;
    String::from_utf8(bytes).map_err(DecodeError::from)
}

/// Decode a fixed-size byte array (no length prefix).
#[inline]
pub fn decode_fixed(data: &mut &[u8], size: usize) -> Result<Vec<u8>, DecodeError> {
    if data.len() < size {
        return Err(DecodeError::UnexpectedEof);
    }
    let (bytes, rest) = data.split_at(size);
    *data = rest;
    Ok(bytes.to_vec())
}

/// Decode an enum value.
///
/// Avro enums are encoded as an int index into the symbol list.
///
/// # Returns
/// A tuple of (index, symbol_name)
#[inline]
pub fn decode_enum(data: &mut &[u8], schema: &EnumSchema) -> Result<(i32, String), DecodeError> {
    let index = decode_enum_index(data, schema.symbols.len())?;
    Ok((index, schema.symbols[index as usize].clone()))
}

/// Decode an enum index and check it against the number of symbols.
#[inline]
pub fn decode_enum_index(data: &mut &[u8], num_symbols: usize) -> Result<i32, DecodeError> {
    let index = decode_int(data)?;

    if index < 0 || index as usize >= num_symbols {
        return Err(DecodeError::InvalidData(format!(
            "Enum index {} out of range (0..{})",
            index, num_symbols
        )));
    }

    Ok(index)
}

/// Decode a union branch index and check it against the number of variants.
#[inline]
pub fn decode_union_index(data: &mut &[u8], num_variants: usize) -> Result<i32, DecodeError> {
    let index = decode_int(data)?;

    if index < 0 || index as usize >= num_variants {
        return Err(DecodeError::InvalidData(format!(
            "Union index {} out of range (0..{})",
            index, num_variants
        )));
    }

    Ok(index)
}

/// Read the header of an array or map block.
///
/// Each block starts with a long count. A negative count means the absolute
/// value is the count and a long byte size follows (read and discarded
/// here). Returns `None` for the zero count that ends the sequence.
#[inline]
pub fn decode_block_count(data: &mut &[u8]) -> Result<Option<usize>, DecodeError> {
    let count = decode_long(data)?;
    if count == 0 {
        return Ok(None);
    }
    if count < 0 {
        let byte_size = decode_long(data)?;
        if byte_size < 0 {
            return Err(DecodeError::InvalidData(format!(
                "Negative block byte size: {}",
                byte_size
            )));
        }
    }
    Ok(Some(count.unsigned_abs() as usize))
}

/// Largest item count accepted for one array whose items occupy no bytes
/// on the wire. Every other collection is bounded by the remaining input.
pub const MAX_ZERO_WIDTH_ITEMS: usize = 1 << 20;

/// Checks the block counts of one array or map against the input.
///
/// Items that take at least one byte cannot outnumber the bytes left.
/// Zero-width items (nulls, records of nulls) are capped in total at
/// [`MAX_ZERO_WIDTH_ITEMS`].
#[derive(Debug)]
pub(crate) struct BlockLimit {
    zero_width: bool,
    total: usize,
}

impl BlockLimit {
    pub(crate) fn new(zero_width: bool) -> Self {
        Self {
            zero_width,
            total: 0,
        }
    }

    /// Read the next block header; `None` ends the sequence.
    pub(crate) fn next_block(&mut self, data: &mut &[u8]) -> Result<Option<usize>, DecodeError> {
        match decode_block_count(data)? {
            Some(count) => self.admit(count, data.len()).map(Some),
            None => Ok(None),
        }
    }

    pub(crate) fn admit(&mut self, count: usize, remaining: usize) -> Result<usize, DecodeError> {
        if self.zero_width {
            self.total = self.total.saturating_add(count);
            if self.total > MAX_ZERO_WIDTH_ITEMS {
                return Err(DecodeError::InvalidData(format!(
                    "{} zero-width items exceed the limit of {}",
                    self.total, MAX_ZERO_WIDTH_ITEMS
                )));
            }
        } else if count > remaining {
            return Err(DecodeError::InvalidData(format!(
                "Block count {} exceeds the {} remaining bytes",
                count, remaining
            )));
        }
        Ok(count)
    }
}

/// True if values of `schema` occupy no bytes on the wire.
pub(crate) fn is_zero_width(schema: &AvroSchema, context: &SchemaResolutionContext) -> bool {
    zero_width_walk(schema, context, &mut Vec::new())
}

fn zero_width_walk(
    schema: &AvroSchema,
    context: &SchemaResolutionContext,
    visiting: &mut Vec<String>,
) -> bool {
    match schema {
        AvroSchema::Null => true,
        AvroSchema::Fixed(fixed) => fixed.size == 0,
        AvroSchema::Logical(logical) => zero_width_walk(&logical.base, context, visiting),
        AvroSchema::Named(_) => context
            .lookup(schema)
            .is_some_and(|resolved| zero_width_walk(resolved, context, visiting)),
        AvroSchema::Record(record) => {
            let name = record.fullname();
            if visiting.contains(&name) {
                return false;
            }
            visiting.push(name);
            let empty = record
                .fields
                .iter()
                .all(|field| zero_width_walk(&field.schema, context, visiting));
            visiting.pop();
            empty
        }
        _ => false,
    }
}

/// Collects map entries, keeping the last value for a repeated key in the
/// position where the key first appeared.
#[derive(Debug, Default)]
pub(crate) struct MapEntries {
    entries: Vec<(String, AvroValue)>,
    positions: HashMap<String, usize>,
}

impl MapEntries {
    pub(crate) fn reserve(&mut self, additional: usize) {
        self.entries.reserve(additional);
    }

    pub(crate) fn insert(&mut self, key: String, value: AvroValue) {
        match self.positions.get(&key) {
            Some(&pos) => self.entries[pos].1 = value,
            None => {
                self.positions.insert(key.clone(), self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    pub(crate) fn into_value(self) -> AvroValue {
        AvroValue::Map(self.entries)
    }
}

/// Decode any Avro value based on its schema, resolving named type references.
///
/// This is the main entry point for decoding Avro data when reader and
/// writer schemas are the same.
///
/// # Arguments
/// * `data` - The input byte slice (cursor is advanced)
/// * `schema` - The schema describing the value to decode
/// * `context` - The resolution context containing named type definitions
pub fn decode_value_with_context(
    data: &mut &[u8],
    schema: &AvroSchema,
    context: &SchemaResolutionContext,
) -> Result<AvroValue, DecodeError> {
    match schema {
        AvroSchema::Null => {
            decode_null(data)?;
            Ok(AvroValue::Null)
        }
        AvroSchema::Boolean => Ok(AvroValue::Boolean(decode_boolean(data)?)),
        AvroSchema::Int => Ok(AvroValue::Int(decode_int(data)?)),
        AvroSchema::Long => Ok(AvroValue::Long(decode_long(data)?)),
        AvroSchema::Float => Ok(AvroValue::Float(decode_float(data)?)),
        AvroSchema::Double => Ok(AvroValue::Double(decode_double(data)?)),
        AvroSchema::Bytes => Ok(AvroValue::Bytes(decode_bytes(data)?)),
        AvroSchema::String => Ok(AvroValue::String(decode_string(data)?)),

        AvroSchema::Record(record_schema) => {
            let fields = decode_record_with_context(data, record_schema, context)?;
            Ok(AvroValue::Record(fields))
        }
        AvroSchema::Enum(enum_schema) => {
            let (index, symbol) = decode_enum(data, enum_schema)?;
            Ok(AvroValue::Enum(index, symbol))
        }
        AvroSchema::Array(item_schema) => {
            let items = decode_array_with_context(data, item_schema, context)?;
            Ok(AvroValue::Array(items))
        }
        AvroSchema::Map(value_schema) => decode_map_with_context(data, value_schema, context),
        AvroSchema::Union(variants) => {
            let (index, value) = decode_union_with_context(data, variants, context)?;
            Ok(AvroValue::Union(index, Box::new(value)))
        }
        AvroSchema::Fixed(fixed_schema) => {
            let bytes = decode_fixed(data, fixed_schema.size)?;
            Ok(AvroValue::Fixed(bytes))
        }

        AvroSchema::Named(name) => match context.lookup(schema) {
            Some(resolved_schema) => decode_value_with_context(data, resolved_schema, context),
            None => Err(DecodeError::UnresolvedName(name.clone())),
        },

        // Logical types don't change the wire format
        AvroSchema::Logical(logical) => decode_value_with_context(data, &logical.base, context),
    }
}

/// Decode a record's fields in schema order.
pub fn decode_record_with_context(
    data: &mut &[u8],
    schema: &RecordSchema,
    context: &SchemaResolutionContext,
) -> Result<Vec<(String, AvroValue)>, DecodeError> {
    let mut fields = Vec::with_capacity(schema.fields.len());

    for field in &schema.fields {
        let value = decode_value_with_context(data, &field.schema, context)?;
        fields.push((field.name.clone(), value));
    }

    Ok(fields)
}

/// Decode an array of values.
pub fn decode_array_with_context(
    data: &mut &[u8],
    item_schema: &AvroSchema,
    context: &SchemaResolutionContext,
) -> Result<Vec<AvroValue>, DecodeError> {
    let mut items = Vec::new();
    let mut limit = BlockLimit::new(is_zero_width(item_schema, context));

    while let Some(item_count) = limit.next_block(data)? {
        items.reserve(item_count);

        for _ in 0..item_count {
            items.push(decode_value_with_context(data, item_schema, context)?);
        }
    }

    Ok(items)
}

/// Decode a map with string keys.
///
/// A key repeated within one map keeps its last value.
pub fn decode_map_with_context(
    data: &mut &[u8],
    value_schema: &AvroSchema,
    context: &SchemaResolutionContext,
) -> Result<AvroValue, DecodeError> {
    let mut entries = MapEntries::default();
    // Every entry carries at least its key length.
    let mut limit = BlockLimit::new(false);

    while let Some(entry_count) = limit.next_block(data)? {
        entries.reserve(entry_count);

        for _ in 0..entry_count {
            let key = decode_string(data)?;
            let value = decode_value_with_context(data, value_schema, context)?;
            entries.insert(key, value);
        }
    }

    Ok(entries.into_value())
}

/// Decode a union value.
///
/// # Returns
/// A tuple of (variant_index, decoded_value)
pub fn decode_union_with_context(
    data: &mut &[u8],
    variants: &[AvroSchema],
    context: &SchemaResolutionContext,
) -> Result<(i32, AvroValue), DecodeError> {
    let index = decode_union_index(data, variants.len())?;
    let value = decode_value_with_context(data, &variants[index as usize], context)?;
    Ok((index, value))
}

// ============================================================================
// Skip functions
// ============================================================================

/// Skip over a varint-encoded value.
#[inline]
pub fn skip_varint(data: &mut &[u8]) -> Result<(), DecodeError> {
    varint::skip_varint(data)
}

/// Skip over a fixed-size value.
#[inline]
pub fn skip_fixed(data: &mut &[u8], size: usize) -> Result<(), DecodeError> {
    if data.len() < size {
        return Err(DecodeError::UnexpectedEof);
    }
    *data = &data[size..];
    Ok(())
}

/// Skip over a bytes or string value.
#[inline]
pub fn skip_bytes(data: &mut &[u8]) -> Result<(), DecodeError> {
    let len = decode_length(data)?;
    *data = &data[len..];
    Ok(())
}

/// Skip over any Avro value based on its schema, resolving named type references.
///
/// Used to step over writer fields the reader does not want.
pub fn skip_value_with_context(
    data: &mut &[u8],
    schema: &AvroSchema,
    context: &SchemaResolutionContext,
) -> Result<(), DecodeError> {
    match schema {
        AvroSchema::Null => Ok(()),
        AvroSchema::Boolean => skip_fixed(data, 1),
        AvroSchema::Int | AvroSchema::Long | AvroSchema::Enum(_) => skip_varint(data),
        AvroSchema::Float => skip_fixed(data, 4),
        AvroSchema::Double => skip_fixed(data, 8),
        AvroSchema::Bytes | AvroSchema::String => skip_bytes(data),
        AvroSchema::Fixed(fixed_schema) => skip_fixed(data, fixed_schema.size),
        AvroSchema::Array(item_schema) => skip_blocks(
            data,
            is_zero_width(item_schema, context),
            |data| skip_value_with_context(data, item_schema, context),
        ),
        AvroSchema::Map(value_schema) => skip_blocks(data, false, |data| {
            skip_bytes(data)?; // key
            skip_value_with_context(data, value_schema, context)
        }),
        AvroSchema::Union(variants) => {
            let index = decode_union_index(data, variants.len())?;
            skip_value_with_context(data, &variants[index as usize], context)
        }
        AvroSchema::Record(record_schema) => {
            for field in &record_schema.fields {
                skip_value_with_context(data, &field.schema, context)?;
            }
            Ok(())
        }
        AvroSchema::Named(name) => match context.lookup(schema) {
            Some(resolved_schema) => skip_value_with_context(data, resolved_schema, context),
            None => Err(DecodeError::UnresolvedName(name.clone())),
        },
        AvroSchema::Logical(logical) => skip_value_with_context(data, &logical.base, context),
    }
}

/// Skip a blocked sequence (array or map).
///
/// Blocks that carry a byte size are skipped in one step.
fn skip_blocks<F>(data: &mut &[u8], zero_width: bool, mut skip_item: F) -> Result<(), DecodeError>
where
    F: FnMut(&mut &[u8]) -> Result<(), DecodeError>,
{
    let mut limit = BlockLimit::new(zero_width);
    loop {
        let count = decode_long(data)?;
        if count == 0 {
            break;
        }

        if count < 0 {
            let byte_size = decode_long(data)?;
            if byte_size < 0 {
                return Err(DecodeError::InvalidData(format!(
                    "Negative block byte size: {}",
                    byte_size
                )));
            }
            skip_fixed(data, byte_size as usize)?;
            continue;
        }

        for _ in 0..limit.admit(count as usize, data.len())? {
            skip_item(data)?;
        }
    }
    Ok(())
}
