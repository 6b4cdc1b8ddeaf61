//! The parsed, shareable schema handle.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

use crate::error::SchemaError;
use crate::schema::parser::{parse_json, ParseOptions, SchemaParser};
use crate::schema::{AvroSchema, SchemaResolutionContext};

/// An immutable parsed schema together with its named type registry.
///
/// Cloning is cheap (the contents are reference counted) and a `Schema` can
/// be shared freely between threads. Encoders and decoders hold clones.
///
/// # Example
/// ```
/// use contrail::Schema;
///
/// let schema = Schema::parse(r#"{
///     "type": "record", "name": "Node",
///     "fields": [
///         {"name": "value", "type": "int"},
///         {"name": "next", "type": ["null", "Node"]}
///     ]
/// }"#).unwrap();
/// assert!(schema.named_type("Node").is_some());
/// ```
#[derive(Clone)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

#[derive(Debug)]
struct SchemaInner {
    root: AvroSchema,
    context: SchemaResolutionContext,
}

impl Schema {
    /// Parse a schema document in permissive mode.
    pub fn parse(json: &str) -> Result<Self, SchemaError> {
        Self::parse_with_options(json, ParseOptions::default())
    }

    /// Parse a schema document with explicit validation options.
    pub fn parse_with_options(json: &str, options: ParseOptions) -> Result<Self, SchemaError> {
        let value = parse_json(json)?;
        Self::build(&value, options, &[])
    }

    /// Parse a schema document that may refer to named types defined by
    /// previously parsed schemas.
    ///
    /// # Example
    /// ```
    /// use contrail::Schema;
    ///
    /// let contig = Schema::parse(
    ///     r#"{"type": "record", "name": "Contig", "namespace": "org.pyavroc",
    ///         "fields": [{"name": "id", "type": "string"}]}"#,
    /// ).unwrap();
    /// let optional = Schema::parse_with_references(r#"["null", "org.pyavroc.Contig"]"#, &[&contig]).unwrap();
    /// assert_eq!(optional.root().union_variants().map(|v| v.len()), Some(2));
    /// ```
    pub fn parse_with_references(json: &str, references: &[&Schema]) -> Result<Self, SchemaError> {
        let value = parse_json(json)?;
        Self::build(&value, ParseOptions::default(), references)
    }

    /// Build a schema from an already decoded JSON document.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        Self::build(value, ParseOptions::default(), &[])
    }

    /// Wrap a programmatically built schema tree.
    ///
    /// Named types defined inline are registered; every `Named` reference
    /// must point at one of them.
    pub fn from_avro_schema(root: AvroSchema) -> Result<Self, SchemaError> {
        let context = SchemaResolutionContext::build_from_schema(&root);
        context.validate_references(&root)?;
        Ok(Self {
            inner: Arc::new(SchemaInner { root, context }),
        })
    }

    fn build(value: &Value, options: ParseOptions, references: &[&Schema]) -> Result<Self, SchemaError> {
        let mut parser = SchemaParser::new().with_strict(options.strict);
        for reference in references {
            parser = parser.with_references(reference.context())?;
        }
        let root = parser.parse(value)?;
        parser.check_defaults()?;
        Ok(Self {
            inner: Arc::new(SchemaInner {
                root,
                context: parser.into_context(),
            }),
        })
    }

    /// The root schema node.
    pub fn root(&self) -> &AvroSchema {
        &self.inner.root
    }

    /// The named type registry.
    pub fn context(&self) -> &SchemaResolutionContext {
        &self.inner.context
    }

    /// Look up a named type by full name, or by unqualified name when it is
    /// unambiguous.
    pub fn named_type(&self, name: &str) -> Option<&AvroSchema> {
        if let Some(schema) = self.inner.context.get(name) {
            return Some(schema);
        }
        let mut matches = self
            .inner
            .context
            .named_types()
            .iter()
            .filter(|(fullname, _)| fullname.rsplit('.').next() == Some(name));
        match (matches.next(), matches.next()) {
            (Some((_, schema)), None) => Some(schema),
            _ => None,
        }
    }

    /// Follow a `Named` reference through this schema's registry.
    pub fn lookup<'a>(&'a self, schema: &'a AvroSchema) -> Option<&'a AvroSchema> {
        self.inner.context.lookup(schema)
    }

    /// Render the schema as JSON text that parses back to an equal schema.
    pub fn to_json(&self) -> String {
        self.inner.root.to_json()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("root", &self.inner.root)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
            || (self.inner.root == other.inner.root && self.inner.context == other.inner.context)
    }
}

impl FromStr for Schema {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parse several schema documents in order; each may refer to the named
/// types of the ones before it.
pub fn parse_schemata(documents: &[&str]) -> Result<Vec<Schema>, SchemaError> {
    let mut schemata: Vec<Schema> = Vec::with_capacity(documents.len());
    for document in documents {
        let references: Vec<&Schema> = schemata.iter().collect();
        let schema = Schema::parse_with_references(document, &references)?;
        schemata.push(schema);
    }
    Ok(schemata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldSchema, RecordSchema};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_schema_is_send_sync() {
        assert_send_sync::<Schema>();
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        assert!(matches!(
            Schema::parse("NOT_A_VALID_JSON"),
            Err(SchemaError::ParseError(_))
        ));
        assert!(matches!(Schema::parse("1"), Err(SchemaError::InvalidSchema(_))));
    }

    #[test]
    fn test_named_type_by_short_name() {
        let schema = Schema::parse(
            r#"{"type": "record", "name": "User", "namespace": "example.avro",
                "fields": [{"name": "name", "type": "string"}]}"#,
        )
        .unwrap();
        assert!(schema.named_type("example.avro.User").is_some());
        assert!(schema.named_type("User").is_some());
        assert!(schema.named_type("Nobody").is_none());
    }

    #[test]
    fn test_to_json_round_trip() {
        let json = r#"{"type": "record", "name": "R", "namespace": "n",
            "fields": [{"name": "e", "type": {"type": "enum", "name": "E", "symbols": ["A"]}},
                       {"name": "again", "type": "E", "default": "A"}]}"#;
        let schema = Schema::parse(json).unwrap();
        let reparsed = Schema::parse(&schema.to_json()).unwrap();
        assert_eq!(schema, reparsed);
    }

    #[test]
    fn test_from_avro_schema_validates_references() {
        let record = RecordSchema::new(
            "R",
            vec![FieldSchema::new("x", AvroSchema::Named("Nope".into()))],
        );
        assert!(matches!(
            Schema::from_avro_schema(AvroSchema::Record(record)),
            Err(SchemaError::UnresolvedReference(_))
        ));
    }

    #[test]
    fn test_parse_schemata_chains_references() {
        let schemata = parse_schemata(&[
            r#"{"type": "enum", "name": "Suit", "symbols": ["CLUBS", "DIAMONDS", "HEARTS", "SPADES"]}"#,
            r#"{"type": "array", "items": "Suit"}"#,
        ])
        .unwrap();
        assert_eq!(schemata.len(), 2);
        assert!(schemata[1].context().contains("Suit"));
    }

    #[test]
    fn test_equality_includes_referenced_types() {
        let red = Schema::parse(r#"{"type": "enum", "name": "Color", "symbols": ["RED"]}"#).unwrap();
        let blue = Schema::parse(r#"{"type": "enum", "name": "Color", "symbols": ["BLUE"]}"#).unwrap();
        let document = r#"{"type": "array", "items": "Color"}"#;

        let of_red = Schema::parse_with_references(document, &[&red]).unwrap();
        let of_blue = Schema::parse_with_references(document, &[&blue]).unwrap();
        assert_eq!(of_red.root(), of_blue.root());
        assert_ne!(of_red, of_blue);
        assert_eq!(of_red, Schema::parse_with_references(document, &[&red]).unwrap());
    }
}
