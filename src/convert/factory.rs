//! Object view: per-record constructors generated from a schema.
//!
//! A [`TypeFactory`] holds one [`RecordType`] for every named record in a
//! schema. Each record type validates and completes field values and yields
//! [`RecordInstance`]s, the object form of a decoded or constructed record.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use super::json::to_json;
use crate::error::EncodeError;
use crate::schema::{json_to_avro_value, AvroSchema, RecordSchema, Schema};
use crate::value::AvroValue;
use crate::writer::encode::ValueEncoder;
use crate::writer::EncodeBuffer;

/// Record constructors for every named record type of a schema.
///
/// # Example
/// ```
/// use contrail::{AvroValue, Schema, TypeFactory};
///
/// let schema = Schema::parse(r#"{
///     "type": "record", "name": "User", "namespace": "example.avro",
///     "fields": [
///         {"name": "name", "type": "string"},
///         {"name": "favorite_number", "type": ["int", "null"]}
///     ]
/// }"#).unwrap();
/// let factory = TypeFactory::new(&schema);
/// let user = factory.get("User").unwrap().construct([("name", AvroValue::from("Alyssa"))]).unwrap();
/// assert!(user.get("favorite_number").unwrap().is_null());
/// ```
#[derive(Debug, Clone)]
pub struct TypeFactory {
    types: HashMap<String, RecordType>,
}

impl TypeFactory {
    /// Build constructors for all records registered in `schema`.
    pub fn new(schema: &Schema) -> Self {
        let types: HashMap<String, RecordType> = schema
            .context()
            .named_types()
            .iter()
            .filter_map(|(fullname, definition)| match definition {
                AvroSchema::Record(record) => Some((
                    fullname.clone(),
                    RecordType {
                        schema: schema.clone(),
                        record: record.clone(),
                    },
                )),
                _ => None,
            })
            .collect();
        debug!(record_types = types.len(), "built type factory");
        Self { types }
    }

    /// Look up a record type by full name, or by short name when unambiguous.
    pub fn get(&self, name: &str) -> Option<&RecordType> {
        if let Some(record_type) = self.types.get(name) {
            return Some(record_type);
        }
        let mut matches = self
            .types
            .values()
            .filter(|t| t.record.name == name);
        match (matches.next(), matches.next()) {
            (Some(record_type), None) => Some(record_type),
            _ => None,
        }
    }

    /// Full names of all record types, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of record types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True if the schema defines no records.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Constructor for one record type.
#[derive(Debug, Clone)]
pub struct RecordType {
    schema: Schema,
    record: RecordSchema,
}

impl RecordType {
    /// Fully qualified record name.
    pub fn name(&self) -> String {
        self.record.fullname()
    }

    /// The record definition.
    pub fn record_schema(&self) -> &RecordSchema {
        &self.record
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.record.fields.iter().map(|f| f.name.as_str())
    }

    /// Build an instance from named field values.
    ///
    /// Every supplied value must fit its field. Missing fields take the
    /// field default, or null when the field is a union containing null;
    /// otherwise construction fails. Bare values for union fields are
    /// wrapped in the member they were matched to.
    pub fn construct<I, K>(&self, fields: I) -> Result<RecordInstance, EncodeError>
    where
        I: IntoIterator<Item = (K, AvroValue)>,
        K: Into<String>,
    {
        let mut supplied: Vec<(String, AvroValue)> =
            fields.into_iter().map(|(k, v)| (k.into(), v)).collect();

        if let Some((unknown, _)) = supplied
            .iter()
            .find(|(name, _)| self.record.field(name).is_none())
        {
            return Err(EncodeError::InvalidValue(format!(
                "record '{}' has no field '{}'",
                self.record.name, unknown
            )));
        }

        let context = self.schema.context();
        let encoder = ValueEncoder::new(context, None);
        let mut scratch = EncodeBuffer::with_capacity(64);

        let mut values = Vec::with_capacity(self.record.fields.len());
        for field in &self.record.fields {
            let value = match supplied.iter().position(|(name, _)| *name == field.name) {
                Some(pos) => {
                    let (_, value) = supplied.swap_remove(pos);
                    scratch.clear();
                    encoder.encode(&mut scratch, &field.schema, &value)?;
                    self.canonical_union(&encoder, &field.schema, value)?
                }
                None => self.missing_field(&field.name, &field.schema, field.default.as_ref())?,
            };
            values.push((field.name.clone(), value));
        }

        Ok(RecordInstance {
            type_name: self.record.fullname(),
            fields: values,
        })
    }

    /// Object view of a decoded record value of this type.
    pub fn instantiate(&self, value: &AvroValue) -> Result<RecordInstance, EncodeError> {
        match value.unwrap_union() {
            AvroValue::Record(fields) => self.construct(fields.iter().cloned()),
            other => Err(EncodeError::TypeMismatch(format!(
                "expected record '{}', got {} value",
                self.record.name,
                other.kind()
            ))),
        }
    }

    fn missing_field(
        &self,
        name: &str,
        schema: &AvroSchema,
        default: Option<&Value>,
    ) -> Result<AvroValue, EncodeError> {
        let context = self.schema.context();
        if let Some(default) = default {
            return json_to_avro_value(default, schema, context);
        }
        let null_index = context
            .lookup(schema)
            .and_then(AvroSchema::union_variants)
            .and_then(|variants| variants.iter().position(|v| matches!(v, AvroSchema::Null)));
        match null_index {
            Some(index) => Ok(AvroValue::Union(index as i32, Box::new(AvroValue::Null))),
            None => Err(EncodeError::MissingField(name.to_string())),
        }
    }

    fn canonical_union<'s>(
        &'s self,
        encoder: &ValueEncoder<'s>,
        schema: &'s AvroSchema,
        value: AvroValue,
    ) -> Result<AvroValue, EncodeError> {
        let variants = self
            .schema
            .context()
            .lookup(schema)
            .and_then(AvroSchema::union_variants);
        match variants {
            Some(variants) if !matches!(value, AvroValue::Union(..)) => {
                let index = encoder.infer_branch(variants, &value)?;
                Ok(AvroValue::Union(index as i32, Box::new(value)))
            }
            _ => Ok(value),
        }
    }
}

/// A record in object form.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordInstance {
    type_name: String,
    fields: Vec<(String, AvroValue)>,
}

impl RecordInstance {
    /// Fully qualified record type name.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Field value by name.
    pub fn get(&self, name: &str) -> Option<&AvroValue> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[(String, AvroValue)] {
        &self.fields
    }

    /// JSON mapping view of this record.
    pub fn to_json(&self) -> Value {
        to_json(&AvroValue::Record(self.fields.clone()))
    }

    /// The record as a plain value, ready to encode.
    pub fn into_value(self) -> AvroValue {
        AvroValue::Record(self.fields)
    }
}

impl From<RecordInstance> for AvroValue {
    fn from(instance: RecordInstance) -> Self {
        instance.into_value()
    }
}
