//! Named type registry.
//!
//! Named types (records, enums, fixed) are stored once, keyed by their fully
//! qualified name. Everywhere else in a schema they are referred to through
//! `AvroSchema::Named` handles, which the encoder and decoder look up here.
//! This keeps recursive schemas finite.

use std::collections::HashMap;

use crate::error::SchemaError;
use crate::schema::AvroSchema;

/// A registry of named type definitions.
///
/// The registry holds the full definition of every record, enum and fixed
/// type of a schema (plus any types imported from referenced schemas).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaResolutionContext {
    /// Registry of named types by their fully qualified name
    named_types: HashMap<String, AvroSchema>,
}

impl SchemaResolutionContext {
    /// Create a new empty resolution context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a resolution context from a HashMap of named types.
    pub fn from_named_types(named_types: HashMap<String, AvroSchema>) -> Self {
        Self { named_types }
    }

    /// Register a named type in the context.
    ///
    /// # Arguments
    /// * `name` - The fully qualified name of the type
    /// * `schema` - The schema definition
    pub fn register(&mut self, name: String, schema: AvroSchema) {
        self.named_types.insert(name, schema);
    }

    /// Get a named type from the context.
    pub fn get(&self, name: &str) -> Option<&AvroSchema> {
        self.named_types.get(name)
    }

    /// Check if a named type exists in the context.
    pub fn contains(&self, name: &str) -> bool {
        self.named_types.contains_key(name)
    }

    /// Get all registered named types.
    pub fn named_types(&self) -> &HashMap<String, AvroSchema> {
        &self.named_types
    }

    /// Number of registered named types.
    pub fn len(&self) -> usize {
        self.named_types.len()
    }

    /// True if no named types are registered.
    pub fn is_empty(&self) -> bool {
        self.named_types.is_empty()
    }

    /// Follow a `Named` reference to its definition.
    ///
    /// Any other schema is returned unchanged. Returns `None` only for a
    /// reference that is not registered.
    pub fn lookup<'a>(&'a self, schema: &'a AvroSchema) -> Option<&'a AvroSchema> {
        match schema {
            AvroSchema::Named(name) => match self.named_types.get(name) {
                // Registry entries are definitions, never references.
                Some(AvroSchema::Named(_)) => None,
                other => other,
            },
            other => Some(other),
        }
    }

    /// Build a resolution context by extracting all named types from a schema.
    ///
    /// This recursively traverses the schema and registers all named types
    /// (records, enums, fixed) that it encounters.
    pub fn build_from_schema(schema: &AvroSchema) -> Self {
        let mut context = Self::new();
        context.extract_named_types(schema);
        context
    }

    /// Extract and register all named types from a schema.
    fn extract_named_types(&mut self, schema: &AvroSchema) {
        match schema {
            AvroSchema::Record(record) => {
                self.named_types.insert(record.fullname(), schema.clone());
                for field in &record.fields {
                    self.extract_named_types(&field.schema);
                }
            }
            AvroSchema::Enum(enum_schema) => {
                self.named_types
                    .insert(enum_schema.fullname(), schema.clone());
            }
            AvroSchema::Fixed(fixed_schema) => {
                self.named_types
                    .insert(fixed_schema.fullname(), schema.clone());
            }
            AvroSchema::Array(item_schema) => {
                self.extract_named_types(item_schema);
            }
            AvroSchema::Map(value_schema) => {
                self.extract_named_types(value_schema);
            }
            AvroSchema::Union(variants) => {
                for variant in variants {
                    self.extract_named_types(variant);
                }
            }
            AvroSchema::Logical(logical) => {
                self.extract_named_types(&logical.base);
            }
            // Primitives and Named references don't contain named type definitions
            _ => {}
        }
    }

    /// Check that every `Named` reference reachable from `schema` is registered.
    pub fn validate_references(&self, schema: &AvroSchema) -> Result<(), SchemaError> {
        match schema {
            AvroSchema::Named(name) => {
                if self.contains(name) {
                    Ok(())
                } else {
                    Err(SchemaError::UnresolvedReference(name.clone()))
                }
            }
            AvroSchema::Record(record) => record
                .fields
                .iter()
                .try_for_each(|f| self.validate_references(&f.schema)),
            AvroSchema::Array(inner) | AvroSchema::Map(inner) => self.validate_references(inner),
            AvroSchema::Union(variants) => variants
                .iter()
                .try_for_each(|v| self.validate_references(v)),
            AvroSchema::Logical(logical) => self.validate_references(&logical.base),
            _ => Ok(()),
        }
    }

    /// Merge the definitions of `other` into this registry.
    ///
    /// Fails if both registries define the same name differently.
    pub(crate) fn import(&mut self, other: &SchemaResolutionContext) -> Result<(), SchemaError> {
        for (name, schema) in &other.named_types {
            match self.named_types.get(name) {
                Some(existing) if existing != schema => {
                    return Err(SchemaError::DuplicateName(format!(
                        "'{}' is defined differently by two referenced schemas",
                        name
                    )));
                }
                Some(_) => {}
                None => {
                    self.named_types.insert(name.clone(), schema.clone());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumSchema, FieldSchema, FixedSchema, RecordSchema};

    #[test]
    fn test_build_context_from_simple_record() {
        let record = RecordSchema::new(
            "User",
            vec![
                FieldSchema::new("id", AvroSchema::Long),
                FieldSchema::new("name", AvroSchema::String),
            ],
        )
        .with_namespace("com.example");

        let schema = AvroSchema::Record(record);
        let context = SchemaResolutionContext::build_from_schema(&schema);

        assert!(context.contains("com.example.User"));
        assert_eq!(context.len(), 1);
    }

    #[test]
    fn test_build_context_with_enum_and_fixed() {
        let color_enum = EnumSchema::new(
            "Color",
            vec!["RED".to_string(), "GREEN".to_string(), "BLUE".to_string()],
        )
        .with_namespace("com.example");

        let hash_fixed = FixedSchema::new("Hash", 32).with_namespace("com.example");

        let record = RecordSchema::new(
            "Item",
            vec![
                FieldSchema::new("color", AvroSchema::Enum(color_enum)),
                FieldSchema::new("hash", AvroSchema::Fixed(hash_fixed)),
            ],
        )
        .with_namespace("com.example");

        let schema = AvroSchema::Record(record);
        let context = SchemaResolutionContext::build_from_schema(&schema);

        assert!(context.contains("com.example.Item"));
        assert!(context.contains("com.example.Color"));
        assert!(context.contains("com.example.Hash"));
    }

    #[test]
    fn test_lookup_follows_named_reference() {
        let user = RecordSchema::new("User", vec![FieldSchema::new("name", AvroSchema::String)]);
        let mut context = SchemaResolutionContext::new();
        context.register("User".to_string(), AvroSchema::Record(user));

        let named_ref = AvroSchema::Named("User".to_string());
        match context.lookup(&named_ref) {
            Some(AvroSchema::Record(r)) => assert_eq!(r.name, "User"),
            other => panic!("Expected Record schema, got {:?}", other),
        }

        assert_eq!(context.lookup(&AvroSchema::Int), Some(&AvroSchema::Int));
        assert!(context
            .lookup(&AvroSchema::Named("Missing".to_string()))
            .is_none());
    }

    #[test]
    fn test_validate_references_reports_missing_name() {
        let record = RecordSchema::new(
            "Node",
            vec![FieldSchema::new(
                "next",
                AvroSchema::Union(vec![AvroSchema::Null, AvroSchema::Named("Other".into())]),
            )],
        );
        let schema = AvroSchema::Record(record);
        let context = SchemaResolutionContext::build_from_schema(&schema);

        let err = context.validate_references(&schema).unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedReference(name) if name == "Other"));
    }

    #[test]
    fn test_recursive_reference_is_valid() {
        let record = RecordSchema::new(
            "LinkedList",
            vec![
                FieldSchema::new("value", AvroSchema::Int),
                FieldSchema::new(
                    "next",
                    AvroSchema::Union(vec![
                        AvroSchema::Null,
                        AvroSchema::Named("LinkedList".into()),
                    ]),
                ),
            ],
        );
        let schema = AvroSchema::Record(record);
        let context = SchemaResolutionContext::build_from_schema(&schema);
        assert!(context.validate_references(&schema).is_ok());
    }

    #[test]
    fn test_import_rejects_conflicting_definitions() {
        let mut a = SchemaResolutionContext::new();
        a.register("X".into(), AvroSchema::Fixed(FixedSchema::new("X", 4)));
        let mut b = SchemaResolutionContext::new();
        b.register("X".into(), AvroSchema::Fixed(FixedSchema::new("X", 8)));

        assert!(a.clone().import(&a.clone()).is_ok());
        assert!(matches!(a.import(&b), Err(SchemaError::DuplicateName(_))));
    }
}
