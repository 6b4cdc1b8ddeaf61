//! Generic mapping view: `AvroValue` ↔ `serde_json::Value`.
//!
//! Records and maps become objects, unions collapse to their member's value,
//! enums become their symbol and bytes/fixed become base64 strings. Going
//! the other way the schema supplies the structure that JSON lacks.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Number, Value};

use crate::error::EncodeError;
use crate::schema::{json_to_avro_value, AvroSchema, RecordSchema, Schema, SchemaResolutionContext};
use crate::value::AvroValue;

/// Convert a value to its JSON mapping view.
///
/// Non-finite floats have no JSON number form and become the strings
/// `"NaN"`, `"Infinity"` and `"-Infinity"`, which [`from_json`] accepts back.
pub fn to_json(value: &AvroValue) -> Value {
    match value {
        AvroValue::Null => Value::Null,
        AvroValue::Boolean(b) => Value::Bool(*b),
        AvroValue::Int(i) => Value::Number((*i).into()),
        AvroValue::Long(l) => Value::Number((*l).into()),
        AvroValue::Float(f) => float_to_json(f64::from(*f)),
        AvroValue::Double(d) => float_to_json(*d),
        AvroValue::Bytes(b) | AvroValue::Fixed(b) => Value::String(STANDARD.encode(b)),
        AvroValue::String(s) => Value::String(s.clone()),
        AvroValue::Record(fields) | AvroValue::Map(fields) => {
            let mut map = Map::new();
            for (name, value) in fields {
                map.insert(name.clone(), to_json(value));
            }
            Value::Object(map)
        }
        AvroValue::Enum(_index, symbol) => Value::String(symbol.clone()),
        AvroValue::Array(items) => Value::Array(items.iter().map(to_json).collect()),
        AvroValue::Union(_index, value) => to_json(value),
    }
}

/// Convert a JSON host value into a value of `schema`.
///
/// Applies the encoder's shape checks. Bytes and fixed values are expected
/// as base64 strings; union members are inferred from the JSON kind.
pub fn from_json(json: &Value, schema: &Schema) -> Result<AvroValue, EncodeError> {
    JsonReader {
        context: schema.context(),
    }
    .read(json, schema.root())
}

struct JsonReader<'a> {
    context: &'a SchemaResolutionContext,
}

impl<'a> JsonReader<'a> {
    fn read(&self, json: &Value, schema: &'a AvroSchema) -> Result<AvroValue, EncodeError> {
        let schema = self
            .context
            .lookup(schema)
            .ok_or_else(|| EncodeError::UnresolvedName(schema.fullname().unwrap_or_default()))?
            .base();

        match (json, schema) {
            (Value::Null, AvroSchema::Null) => Ok(AvroValue::Null),
            (Value::Bool(b), AvroSchema::Boolean) => Ok(AvroValue::Boolean(*b)),
            (Value::Number(n), AvroSchema::Int) => n
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(AvroValue::Int)
                .ok_or_else(|| EncodeError::InvalidValue(format!("{} is not a valid int", n))),
            (Value::Number(n), AvroSchema::Long) => n
                .as_i64()
                .map(AvroValue::Long)
                .ok_or_else(|| EncodeError::InvalidValue(format!("{} is not a valid long", n))),
            (Value::Number(n), AvroSchema::Float) => n
                .as_f64()
                .map(|v| AvroValue::Float(v as f32))
                .ok_or_else(|| EncodeError::InvalidValue(format!("{} is not a valid float", n))),
            (Value::Number(n), AvroSchema::Double) => n
                .as_f64()
                .map(AvroValue::Double)
                .ok_or_else(|| EncodeError::InvalidValue(format!("{} is not a valid double", n))),
            (Value::String(s), AvroSchema::Float | AvroSchema::Double) => {
                let v = non_finite_from_json(s).ok_or_else(|| {
                    EncodeError::TypeMismatch(format!("expected {}, got JSON string", schema.kind()))
                })?;
                Ok(match schema {
                    AvroSchema::Float => AvroValue::Float(v as f32),
                    _ => AvroValue::Double(v),
                })
            }
            (Value::String(s), AvroSchema::String) => Ok(AvroValue::String(s.clone())),
            (Value::String(s), AvroSchema::Bytes) => Ok(AvroValue::Bytes(decode_base64(s)?)),
            (Value::String(s), AvroSchema::Fixed(fixed)) => {
                let bytes = decode_base64(s)?;
                if bytes.len() != fixed.size {
                    return Err(EncodeError::InvalidValue(format!(
                        "fixed '{}' needs {} bytes, got {}",
                        fixed.name,
                        fixed.size,
                        bytes.len()
                    )));
                }
                Ok(AvroValue::Fixed(bytes))
            }
            (Value::String(s), AvroSchema::Enum(enum_schema)) => enum_schema
                .symbol_index(s)
                .map(|i| AvroValue::Enum(i as i32, s.clone()))
                .ok_or_else(|| {
                    EncodeError::InvalidValue(format!(
                        "'{}' is not a symbol of enum '{}'",
                        s, enum_schema.name
                    ))
                }),
            (Value::Array(items), AvroSchema::Array(item_schema)) => items
                .iter()
                .map(|item| self.read(item, item_schema))
                .collect::<Result<Vec<_>, _>>()
                .map(AvroValue::Array),
            (Value::Object(obj), AvroSchema::Map(value_schema)) => obj
                .iter()
                .map(|(k, v)| Ok((k.clone(), self.read(v, value_schema)?)))
                .collect::<Result<Vec<_>, EncodeError>>()
                .map(AvroValue::Map),
            (Value::Object(obj), AvroSchema::Record(record)) => self.read_record(obj, record),
            (json, AvroSchema::Union(variants)) => self.read_union(json, variants),
            (json, schema) => Err(EncodeError::TypeMismatch(format!(
                "expected {}, got JSON {}",
                schema.kind(),
                json_kind(json)
            ))),
        }
    }

    fn read_record(
        &self,
        obj: &Map<String, Value>,
        record: &'a RecordSchema,
    ) -> Result<AvroValue, EncodeError> {
        if let Some(unknown) = obj.keys().find(|k| record.field(k).is_none()) {
            return Err(EncodeError::InvalidValue(format!(
                "record '{}' has no field '{}'",
                record.name, unknown
            )));
        }
        let fields = record
            .fields
            .iter()
            .map(|field| {
                let value = match (obj.get(&field.name), &field.default) {
                    (Some(v), _) => self.read(v, &field.schema)?,
                    (None, Some(default)) => {
                        json_to_avro_value(default, &field.schema, self.context)?
                    }
                    (None, None) => return Err(EncodeError::MissingField(field.name.clone())),
                };
                Ok((field.name.clone(), value))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(AvroValue::Record(fields))
    }

    /// Members whose kind is the natural reading of the JSON value are tried
    /// first, in declaration order, then every other member.
    fn read_union(&self, json: &Value, variants: &'a [AvroSchema]) -> Result<AvroValue, EncodeError> {
        let natural: Vec<bool> = variants
            .iter()
            .map(|v| {
                self.context
                    .lookup(v)
                    .is_some_and(|s| is_natural(json, s.base()))
            })
            .collect();

        let preferred = (0..variants.len()).filter(|&i| natural[i]);
        let fallback = (0..variants.len()).filter(|&i| !natural[i]);

        for index in preferred.chain(fallback) {
            if let Ok(value) = self.read(json, &variants[index]) {
                return Ok(AvroValue::Union(index as i32, Box::new(value)));
            }
        }
        Err(EncodeError::TypeMismatch(format!(
            "no union member accepts JSON {}",
            json_kind(json)
        )))
    }
}

fn float_to_json(v: f64) -> Value {
    match Number::from_f64(v) {
        Some(n) => Value::Number(n),
        None if v.is_nan() => Value::String("NaN".to_string()),
        None if v > 0.0 => Value::String("Infinity".to_string()),
        None => Value::String("-Infinity".to_string()),
    }
}

fn non_finite_from_json(s: &str) -> Option<f64> {
    match s {
        "NaN" => Some(f64::NAN),
        "Infinity" => Some(f64::INFINITY),
        "-Infinity" => Some(f64::NEG_INFINITY),
        _ => None,
    }
}

fn is_natural(json: &Value, schema: &AvroSchema) -> bool {
    match (json, schema) {
        (Value::Null, AvroSchema::Null)
        | (Value::Bool(_), AvroSchema::Boolean)
        | (Value::String(_), AvroSchema::String)
        | (Value::Array(_), AvroSchema::Array(_))
        | (Value::Object(_), AvroSchema::Record(_) | AvroSchema::Map(_)) => true,
        (Value::Number(n), AvroSchema::Int | AvroSchema::Long) => n.is_i64(),
        (Value::Number(n), AvroSchema::Float | AvroSchema::Double) => n.is_f64(),
        _ => false,
    }
}

fn json_kind(json: &Value) -> &'static str {
    match json {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn decode_base64(s: &str) -> Result<Vec<u8>, EncodeError> {
    STANDARD
        .decode(s)
        .map_err(|e| EncodeError::InvalidValue(format!("invalid base64 bytes: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_json_collapses_unions_and_enums() {
        let value = AvroValue::record([
            ("name", AvroValue::from("Alyssa")),
            ("favorite_number", AvroValue::union(1, AvroValue::Int(256))),
            ("suit", AvroValue::Enum(2, "HEARTS".into())),
            ("raw", AvroValue::Bytes(vec![1, 2, 3])),
        ]);
        assert_eq!(
            to_json(&value),
            json!({"name": "Alyssa", "favorite_number": 256, "suit": "HEARTS", "raw": "AQID"})
        );
    }

    #[test]
    fn test_non_finite_floats_as_strings() {
        assert_eq!(to_json(&AvroValue::Double(f64::NAN)), json!("NaN"));
        assert_eq!(to_json(&AvroValue::Float(f32::INFINITY)), json!("Infinity"));
        assert_eq!(to_json(&AvroValue::Double(f64::NEG_INFINITY)), json!("-Infinity"));

        let schema = Schema::parse(r#"["null", "double"]"#).unwrap();
        match from_json(&json!("NaN"), &schema).unwrap() {
            AvroValue::Union(1, value) => assert!(matches!(*value, AvroValue::Double(d) if d.is_nan())),
            other => panic!("unexpected value {:?}", other),
        }
        let schema = Schema::parse(r#""float""#).unwrap();
        assert_eq!(
            from_json(&json!("-Infinity"), &schema).unwrap(),
            AvroValue::Float(f32::NEG_INFINITY)
        );
        assert!(matches!(
            from_json(&json!("1.5"), &schema),
            Err(EncodeError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_from_json_record_with_union_inference() {
        let schema = Schema::parse(
            r#"{"type": "record", "name": "User", "fields": [
                {"name": "name", "type": "string"},
                {"name": "favorite_number", "type": ["int", "null"]},
                {"name": "favorite_color", "type": ["string", "null"], "default": "green"}]}"#,
        )
        .unwrap();

        let value = from_json(&json!({"name": "Ben", "favorite_number": null}), &schema).unwrap();
        assert_eq!(
            value,
            AvroValue::record([
                ("name", AvroValue::from("Ben")),
                ("favorite_number", AvroValue::union(1, AvroValue::Null)),
                ("favorite_color", AvroValue::union(0, AvroValue::from("green"))),
            ])
        );
    }

    #[test]
    fn test_from_json_prefers_natural_member() {
        let schema = Schema::parse(r#"["double", "long"]"#).unwrap();
        assert_eq!(
            from_json(&json!(3), &schema).unwrap(),
            AvroValue::union(1, AvroValue::Long(3))
        );
        assert_eq!(
            from_json(&json!(1.5), &schema).unwrap(),
            AvroValue::union(0, AvroValue::Double(1.5))
        );
    }

    #[test]
    fn test_from_json_rejects_bad_shapes() {
        let schema = Schema::parse(
            r#"{"type": "record", "name": "R", "fields": [{"name": "a", "type": "int"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            from_json(&json!({}), &schema),
            Err(EncodeError::MissingField(_))
        ));
        assert!(matches!(
            from_json(&json!({"a": 1, "b": 2}), &schema),
            Err(EncodeError::InvalidValue(_))
        ));
        assert!(matches!(
            from_json(&json!({"a": "x"}), &schema),
            Err(EncodeError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_bytes_round_trip_through_base64() {
        let schema = Schema::parse(r#""bytes""#).unwrap();
        let value = AvroValue::Bytes(vec![0, 255, 7]);
        assert_eq!(from_json(&to_json(&value), &schema).unwrap(), value);
    }
}
