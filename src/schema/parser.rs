//! JSON schema parser for Avro schemas.
//!
//! Parses Avro schema JSON into the AvroSchema type hierarchy. Every named
//! type is registered in a [`SchemaResolutionContext`] at its first
//! definition; later occurrences become `AvroSchema::Named` references.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::SchemaError;
use crate::schema::reader_writer_resolution::json_to_avro_value;
use crate::schema::{
    AvroSchema, EnumSchema, FieldOrder, FieldSchema, FixedSchema, LogicalType, LogicalTypeName,
    RecordSchema, SchemaResolutionContext,
};

/// Options controlling how strictly schema documents are validated.
///
/// Structural errors (unknown types, duplicate definitions, bad defaults,
/// ambiguous unions) always fail. In strict mode, names that break the
/// `[A-Za-z_][A-Za-z0-9_]*` rule and nested unions fail too; otherwise they
/// are reported with `tracing::warn!` and accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Whether to enforce naming rules and reject nested unions.
    pub strict: bool,
}

impl ParseOptions {
    /// Permissive options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Strict options.
    pub fn strict() -> Self {
        Self { strict: true }
    }

    /// Set whether to use strict schema validation.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// Parse an Avro schema from a JSON string.
///
/// # Example
/// ```
/// use contrail::schema::{parse_schema, AvroSchema};
///
/// let schema = parse_schema(r#""string""#).unwrap();
/// assert_eq!(schema, AvroSchema::String);
/// ```
pub fn parse_schema(json: &str) -> Result<AvroSchema, SchemaError> {
    parse_schema_with_options(json, ParseOptions::default())
}

/// Parse an Avro schema from a JSON string with validation options.
///
/// # Example
/// ```
/// use contrail::schema::{parse_schema_with_options, ParseOptions};
///
/// // Permissive mode - the hyphenated name only produces a warning
/// let doc = r#"{"type": "fixed", "name": "md5-hash", "size": 16}"#;
/// assert!(parse_schema_with_options(doc, ParseOptions::new()).is_ok());
///
/// // Strict mode - fails on the invalid name
/// assert!(parse_schema_with_options(doc, ParseOptions::strict()).is_err());
/// ```
pub fn parse_schema_with_options(
    json: &str,
    options: ParseOptions,
) -> Result<AvroSchema, SchemaError> {
    let value = parse_json(json)?;
    let mut parser = SchemaParser::new().with_strict(options.strict);
    let schema = parser.parse(&value)?;
    parser.check_defaults()?;
    Ok(schema)
}

/// Parse schema document text into a JSON value.
pub(crate) fn parse_json(json: &str) -> Result<Value, SchemaError> {
    serde_json::from_str(json).map_err(|e| SchemaError::ParseError(format!("Invalid JSON: {}", e)))
}

/// Schema parser with named type resolution context.
///
/// Maintains a registry of named types (records, enums, fixed) for resolving
/// type references during parsing.
#[derive(Debug, Default)]
pub struct SchemaParser {
    /// Registry of named types by their fully qualified name
    named_types: SchemaResolutionContext,
    /// Current namespace for resolving unqualified names
    current_namespace: Option<String>,
    /// Whether to enforce strict schema validation
    strict_schema: bool,
}

impl SchemaParser {
    /// Create a new SchemaParser with default settings (permissive mode).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new SchemaParser with strict validation enabled.
    pub fn new_strict() -> Self {
        Self::new().with_strict(true)
    }

    /// Set whether to use strict schema validation.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict_schema = strict;
        self
    }

    /// Make the named types of a previously parsed schema visible.
    ///
    /// Referenced types can be used by name but not redefined.
    pub fn with_references(
        mut self,
        references: &SchemaResolutionContext,
    ) -> Result<Self, SchemaError> {
        self.named_types.import(references)?;
        Ok(self)
    }

    /// Parse a JSON value into an AvroSchema.
    pub fn parse(&mut self, value: &Value) -> Result<AvroSchema, SchemaError> {
        match value {
            Value::String(s) => self.parse_string_schema(s),
            Value::Object(obj) => self.parse_object_schema(obj),
            Value::Array(arr) => self.parse_union_schema(arr),
            other => Err(SchemaError::InvalidSchema(format!(
                "Expected string, object, or array, found: {}",
                other
            ))),
        }
    }

    /// Check every field default in the registry against its field type.
    ///
    /// Runs after the whole document is parsed so defaults may mention types
    /// defined later in the document.
    pub fn check_defaults(&self) -> Result<(), SchemaError> {
        for schema in self.named_types.named_types().values() {
            let AvroSchema::Record(record) = schema else {
                continue;
            };
            for field in &record.fields {
                if let Some(default) = &field.default {
                    json_to_avro_value(default, &field.schema, &self.named_types).map_err(|e| {
                        SchemaError::InvalidDefault {
                            field: format!("{}.{}", record.fullname(), field.name),
                            message: e.to_string(),
                        }
                    })?;
                }
            }
        }
        Ok(())
    }

    /// Get a named type from the registry.
    pub fn get_named_type(&self, name: &str) -> Option<&AvroSchema> {
        self.named_types.get(name)
    }

    /// Get the registry of named types.
    pub fn named_types(&self) -> &SchemaResolutionContext {
        &self.named_types
    }

    /// Consume the parser, returning its registry.
    pub fn into_context(self) -> SchemaResolutionContext {
        self.named_types
    }

    /// Parse a primitive type or named type reference from a string.
    fn parse_string_schema(&self, s: &str) -> Result<AvroSchema, SchemaError> {
        match primitive(s) {
            Some(schema) => Ok(schema),
            None => self.resolve_reference(s),
        }
    }

    /// Parse a complex type from a JSON object.
    fn parse_object_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let type_value = obj
            .get("type")
            .ok_or_else(|| SchemaError::InvalidSchema("Missing 'type' field".to_string()))?;

        let type_str = match type_value {
            Value::String(s) => s.as_str(),
            // {"type": {...}} and {"type": [...]} wrap another schema
            nested => return self.parse(nested),
        };

        let schema = match type_str {
            "record" | "error" => return self.parse_record_schema(obj),
            "enum" => return self.parse_enum_schema(obj),
            "array" => return self.parse_array_schema(obj),
            "map" => return self.parse_map_schema(obj),
            "fixed" => self.parse_fixed_schema(obj)?,
            other => match primitive(other) {
                Some(schema) => schema,
                None => {
                    return self.resolve_reference(other).map_err(|_| {
                        SchemaError::UnsupportedType(format!("Unknown type: {}", other))
                    })
                }
            },
        };

        match obj.get("logicalType") {
            Some(logical_type) => self.parse_logical_type(obj, logical_type, schema),
            None => Ok(schema),
        }
    }

    /// Parse a union schema from a JSON array.
    fn parse_union_schema(&mut self, arr: &[Value]) -> Result<AvroSchema, SchemaError> {
        if arr.is_empty() {
            return Err(SchemaError::InvalidSchema(
                "Union schema cannot be empty".to_string(),
            ));
        }

        let variants = arr
            .iter()
            .map(|v| self.parse(v))
            .collect::<Result<Vec<_>, _>>()?;

        self.validate_union(&variants)?;

        Ok(AvroSchema::Union(variants))
    }

    /// Parse a record schema.
    fn parse_record_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let (name, namespace) = self.parse_name(obj, "Record")?;
        let fullname = join_name(&namespace, &name);

        // Register before parsing fields so the record can refer to itself
        self.define(&fullname, AvroSchema::Named(fullname.clone()))?;

        let fields_value = obj
            .get("fields")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                SchemaError::InvalidSchema(format!("Record '{}' missing 'fields' array", fullname))
            })?;

        // Nested definitions inherit the record's namespace
        let prev_namespace = std::mem::replace(&mut self.current_namespace, namespace.clone());
        let fields = fields_value
            .iter()
            .map(|f| self.parse_field_schema(f))
            .collect::<Result<Vec<_>, _>>();
        self.current_namespace = prev_namespace;
        let fields = fields?;

        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::DuplicateName(format!(
                    "field '{}' appears twice in record '{}'",
                    field.name, fullname
                )));
            }
        }

        let record = RecordSchema {
            name,
            namespace,
            fields,
            doc: string_attr(obj, "doc"),
            aliases: self.parse_aliases(obj),
        };

        let schema = AvroSchema::Record(record);

        // Replace the placeholder with the full definition
        self.named_types.register(fullname, schema.clone());

        Ok(schema)
    }

    /// Parse a field schema within a record.
    fn parse_field_schema(&mut self, value: &Value) -> Result<FieldSchema, SchemaError> {
        let obj = value
            .as_object()
            .ok_or_else(|| SchemaError::InvalidSchema("Field must be an object".to_string()))?;

        let name = obj
            .get("name")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SchemaError::InvalidSchema("Field missing 'name'".to_string()))?
            .to_string();

        self.validate_name(&name, "Field")?;

        let type_value = obj.get("type").ok_or_else(|| {
            SchemaError::InvalidSchema(format!("Field '{}' missing 'type'", name))
        })?;

        let schema = self.parse(type_value)?;

        let order = match obj.get("order").and_then(|v| v.as_str()) {
            None | Some("ascending") => FieldOrder::Ascending,
            Some("descending") => FieldOrder::Descending,
            Some("ignore") => FieldOrder::Ignore,
            Some(other) => {
                return Err(SchemaError::InvalidSchema(format!(
                    "Field '{}' has invalid order '{}'",
                    name, other
                )))
            }
        };

        Ok(FieldSchema {
            name,
            schema,
            default: obj.get("default").cloned(),
            doc: string_attr(obj, "doc"),
            order,
            aliases: self.parse_aliases(obj),
        })
    }

    /// Parse an enum schema.
    fn parse_enum_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let (name, namespace) = self.parse_name(obj, "Enum")?;
        let fullname = join_name(&namespace, &name);

        let symbol_values = obj
            .get("symbols")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                SchemaError::InvalidSchema(format!("Enum '{}' missing 'symbols' array", fullname))
            })?;

        if symbol_values.is_empty() {
            return Err(SchemaError::InvalidSchema(format!(
                "Enum '{}' must have at least one symbol",
                fullname
            )));
        }

        let mut symbols = Vec::with_capacity(symbol_values.len());
        for value in symbol_values {
            let symbol = value.as_str().ok_or_else(|| {
                SchemaError::InvalidSchema(format!(
                    "Enum '{}' symbol must be a string, found {}",
                    fullname, value
                ))
            })?;
            self.validate_name(symbol, "Enum symbol")?;
            if symbols.iter().any(|s| s == symbol) {
                return Err(SchemaError::DuplicateName(format!(
                    "symbol '{}' appears twice in enum '{}'",
                    symbol, fullname
                )));
            }
            symbols.push(symbol.to_string());
        }

        let default = match obj.get("default") {
            None => None,
            Some(Value::String(s)) if symbols.contains(s) => Some(s.clone()),
            Some(other) => {
                return Err(SchemaError::InvalidSchema(format!(
                    "Enum '{}' default {} is not one of its symbols",
                    fullname, other
                )))
            }
        };

        let schema = AvroSchema::Enum(EnumSchema {
            name,
            namespace,
            symbols,
            doc: string_attr(obj, "doc"),
            aliases: self.parse_aliases(obj),
            default,
        });
        self.define(&fullname, schema.clone())?;

        Ok(schema)
    }

    /// Parse an array schema.
    fn parse_array_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let items = obj
            .get("items")
            .ok_or_else(|| SchemaError::InvalidSchema("Array missing 'items' field".to_string()))?;

        let item_schema = self.parse(items)?;
        Ok(AvroSchema::Array(Box::new(item_schema)))
    }

    /// Parse a map schema.
    fn parse_map_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let values = obj
            .get("values")
            .ok_or_else(|| SchemaError::InvalidSchema("Map missing 'values' field".to_string()))?;

        let value_schema = self.parse(values)?;
        Ok(AvroSchema::Map(Box::new(value_schema)))
    }

    /// Parse a fixed schema.
    fn parse_fixed_schema(&mut self, obj: &Map<String, Value>) -> Result<AvroSchema, SchemaError> {
        let (name, namespace) = self.parse_name(obj, "Fixed")?;
        let fullname = join_name(&namespace, &name);

        let size = obj.get("size").and_then(|v| v.as_u64()).ok_or_else(|| {
            SchemaError::InvalidSchema(format!(
                "Fixed '{}' missing non-negative integer 'size'",
                fullname
            ))
        })?;
        let size = usize::try_from(size).map_err(|_| {
            SchemaError::InvalidSchema(format!("Fixed '{}' size {} is too large", fullname, size))
        })?;

        let schema = AvroSchema::Fixed(FixedSchema {
            name,
            namespace,
            size,
            doc: string_attr(obj, "doc"),
            aliases: self.parse_aliases(obj),
        });
        self.define(&fullname, schema.clone())?;

        Ok(schema)
    }

    /// Parse a logical type annotation over an already parsed base.
    ///
    /// Unknown logical types, and known ones on an unsuitable base, are
    /// ignored and the base type is used.
    fn parse_logical_type(
        &self,
        obj: &Map<String, Value>,
        logical_type_value: &Value,
        base: AvroSchema,
    ) -> Result<AvroSchema, SchemaError> {
        let Some(logical_type_name) = logical_type_value.as_str() else {
            return Err(SchemaError::InvalidSchema(
                "logicalType must be a string".to_string(),
            ));
        };

        let logical_type = match logical_type_name {
            "decimal" => {
                let Some(precision) = obj.get("precision").and_then(|v| v.as_u64()) else {
                    warn!("decimal logical type without 'precision'; using the base type");
                    return Ok(base);
                };
                let scale = obj.get("scale").and_then(|v| v.as_u64()).unwrap_or(0);
                if precision == 0 || scale > precision {
                    warn!(precision, scale, "invalid decimal parameters; using the base type");
                    return Ok(base);
                }
                LogicalTypeName::Decimal {
                    precision: precision as u32,
                    scale: scale as u32,
                }
            }
            "uuid" => LogicalTypeName::Uuid,
            "date" => LogicalTypeName::Date,
            "time-millis" => LogicalTypeName::TimeMillis,
            "time-micros" => LogicalTypeName::TimeMicros,
            "timestamp-millis" => LogicalTypeName::TimestampMillis,
            "timestamp-micros" => LogicalTypeName::TimestampMicros,
            "duration" => LogicalTypeName::Duration,
            "local-timestamp-millis" => LogicalTypeName::LocalTimestampMillis,
            "local-timestamp-micros" => LogicalTypeName::LocalTimestampMicros,
            other => {
                debug!(logical_type = other, "ignoring unknown logical type");
                return Ok(base);
            }
        };

        if !logical_type_fits(&logical_type, &base) {
            warn!(
                logical_type = logical_type.name(),
                base = base.kind(),
                "logical type does not apply to its base type; using the base type"
            );
            return Ok(base);
        }

        Ok(AvroSchema::Logical(LogicalType::new(base, logical_type)))
    }

    /// Read `name` and `namespace` of a named type definition.
    ///
    /// A dotted name carries its own namespace; otherwise an explicit
    /// `namespace` attribute wins over the enclosing one.
    fn parse_name(
        &self,
        obj: &Map<String, Value>,
        context: &str,
    ) -> Result<(String, Option<String>), SchemaError> {
        let raw = obj.get("name").and_then(|v| v.as_str()).ok_or_else(|| {
            SchemaError::InvalidSchema(format!("{} missing 'name' field", context))
        })?;

        let (namespace, name) = match raw.rsplit_once('.') {
            Some((ns, name)) => (Some(ns.to_string()), name.to_string()),
            None => {
                let namespace = match obj.get("namespace") {
                    Some(Value::String(ns)) => Some(ns.clone()),
                    Some(Value::Null) => None,
                    Some(other) => {
                        return Err(SchemaError::InvalidSchema(format!(
                            "{} '{}' namespace must be a string, found {}",
                            context, raw, other
                        )))
                    }
                    None => self.current_namespace.clone(),
                };
                (namespace.filter(|ns| !ns.is_empty()), raw.to_string())
            }
        };

        self.validate_name(&name, context)?;
        if let Some(ns) = &namespace {
            for part in ns.split('.') {
                self.validate_name(part, "Namespace")?;
            }
        }

        Ok((name, namespace))
    }

    fn parse_aliases(&self, obj: &Map<String, Value>) -> Vec<String> {
        obj.get("aliases")
            .and_then(|v| v.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Register a new named type, rejecting redefinitions.
    fn define(&mut self, fullname: &str, schema: AvroSchema) -> Result<(), SchemaError> {
        if self.named_types.contains(fullname) {
            return Err(SchemaError::DuplicateName(format!(
                "named type '{}' is defined more than once",
                fullname
            )));
        }
        self.named_types.register(fullname.to_string(), schema);
        Ok(())
    }

    /// Resolve a type name against the registry.
    ///
    /// Unqualified names are tried in the enclosing namespace first, then
    /// as given.
    fn resolve_reference(&self, name: &str) -> Result<AvroSchema, SchemaError> {
        if !name.contains('.') {
            if let Some(ns) = &self.current_namespace {
                let qualified = format!("{}.{}", ns, name);
                if self.named_types.contains(&qualified) {
                    return Ok(AvroSchema::Named(qualified));
                }
            }
        }
        if self.named_types.contains(name) {
            return Ok(AvroSchema::Named(name.to_string()));
        }
        Err(SchemaError::UnresolvedReference(name.to_string()))
    }

    /// Report a soft violation: an error in strict mode, a warning otherwise.
    fn soft_violation(&self, msg: String) -> Result<(), SchemaError> {
        if self.strict_schema {
            Err(SchemaError::InvalidSchema(msg))
        } else {
            warn!("{}", msg);
            Ok(())
        }
    }

    /// Validate that a name follows Avro naming rules.
    ///
    /// Avro names must:
    /// - Start with [A-Za-z_]
    /// - Contain only [A-Za-z0-9_]
    fn validate_name(&self, name: &str, context: &str) -> Result<(), SchemaError> {
        let mut chars = name.chars();
        let Some(first_char) = chars.next() else {
            return self.soft_violation(format!("{} name cannot be empty", context));
        };

        if !first_char.is_ascii_alphabetic() && first_char != '_' {
            return self.soft_violation(format!(
                "{} name '{}' must start with a letter or underscore",
                context, name
            ));
        }

        if let Some(ch) = chars.find(|ch| !ch.is_ascii_alphanumeric() && *ch != '_') {
            return self.soft_violation(format!(
                "{} name '{}' contains invalid character '{}' (only alphanumeric and underscore allowed)",
                context, name, ch
            ));
        }

        Ok(())
    }

    /// Validate union schema rules.
    ///
    /// Avro unions must not contain two members of the same unnamed kind or
    /// two named types with the same full name. Nested unions are a soft
    /// violation.
    fn validate_union(&self, variants: &[AvroSchema]) -> Result<(), SchemaError> {
        for (i, variant) in variants.iter().enumerate() {
            if matches!(variant, AvroSchema::Union(_)) {
                self.soft_violation(format!(
                    "Union contains nested union at position {} (unions cannot be nested)",
                    i
                ))?;
            }
        }

        let mut seen_types = HashSet::new();
        for (i, variant) in variants.iter().enumerate() {
            let type_key = get_type_key(variant);
            if !seen_types.insert(type_key.clone()) {
                return Err(SchemaError::InvalidSchema(format!(
                    "Union contains duplicate type '{}' at position {}",
                    type_key, i
                )));
            }
        }

        Ok(())
    }
}

/// Map a primitive type name to its schema.
fn primitive(name: &str) -> Option<AvroSchema> {
    match name {
        "null" => Some(AvroSchema::Null),
        "boolean" => Some(AvroSchema::Boolean),
        "int" => Some(AvroSchema::Int),
        "long" => Some(AvroSchema::Long),
        "float" => Some(AvroSchema::Float),
        "double" => Some(AvroSchema::Double),
        "bytes" => Some(AvroSchema::Bytes),
        "string" => Some(AvroSchema::String),
        _ => None,
    }
}

fn join_name(namespace: &Option<String>, name: &str) -> String {
    match namespace {
        Some(ns) => format!("{}.{}", ns, name),
        None => name.to_string(),
    }
}

fn string_attr(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(|v| v.as_str()).map(String::from)
}

/// Whether a logical type annotation applies to the given base type.
fn logical_type_fits(logical_type: &LogicalTypeName, base: &AvroSchema) -> bool {
    match logical_type {
        LogicalTypeName::Decimal { .. } => {
            matches!(base, AvroSchema::Bytes | AvroSchema::Fixed(_))
        }
        LogicalTypeName::Uuid => match base {
            AvroSchema::String => true,
            AvroSchema::Fixed(f) => f.size == 16,
            _ => false,
        },
        LogicalTypeName::Date | LogicalTypeName::TimeMillis => matches!(base, AvroSchema::Int),
        LogicalTypeName::TimeMicros
        | LogicalTypeName::TimestampMillis
        | LogicalTypeName::TimestampMicros
        | LogicalTypeName::LocalTimestampMillis
        | LogicalTypeName::LocalTimestampMicros => matches!(base, AvroSchema::Long),
        LogicalTypeName::Duration => matches!(base, AvroSchema::Fixed(f) if f.size == 12),
    }
}

/// Get a unique key for a schema type (for duplicate detection in unions).
///
/// Named types are keyed by full name, whether they appear as a definition
/// or as a reference; everything else by kind.
fn get_type_key(schema: &AvroSchema) -> String {
    match schema {
        AvroSchema::Record(_) | AvroSchema::Enum(_) | AvroSchema::Fixed(_) | AvroSchema::Named(_) => {
            format!("named:{}", schema.fullname().unwrap_or_default())
        }
        AvroSchema::Logical(lt) => get_type_key(&lt.base),
        other => other.kind().to_string(),
    }
}
