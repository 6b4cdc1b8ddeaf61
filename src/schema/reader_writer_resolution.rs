//! Schema resolution for reader/writer schema evolution.
//!
//! Data written under one schema (the writer schema) can be read as values
//! of another compatible schema (the reader schema). The pair is compiled
//! once into a [`ResolvedSchema`], a plan that the decoder then follows.
//! It handles:
//! - Field defaults for missing fields
//! - Field reordering and skipping of fields the reader dropped
//! - Type promotions (int→long, float→double, etc.)
//! - Enum symbol remapping
//! - Union branch re-indexing
//!
//! Kind mismatches at a fixed position fail when the plan is compiled.
//! Mismatches reachable only through a union branch or an enum symbol are
//! recorded in the plan and reported when data actually selects them.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::error::{CodecError, DecodeError, EncodeError, ResolutionError};
use crate::reader::decode::{
    decode_boolean, decode_bytes, decode_double, decode_enum_index, decode_fixed, decode_float,
    decode_int, decode_long, decode_string, decode_union_index, is_zero_width,
    skip_value_with_context, BlockLimit, MapEntries,
};
use crate::schema::{
    AvroSchema, EnumSchema, FieldSchema, RecordSchema, Schema, SchemaResolutionContext,
};
use crate::value::AvroValue;

/// Type promotions supported by Avro schema resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypePromotion {
    /// int → long
    IntToLong,
    /// int → float
    IntToFloat,
    /// int → double
    IntToDouble,
    /// long → float
    LongToFloat,
    /// long → double
    LongToDouble,
    /// float → double
    FloatToDouble,
    /// string → bytes
    StringToBytes,
    /// bytes → string
    BytesToString,
}

impl TypePromotion {
    /// Determine the type promotion needed between writer and reader types.
    ///
    /// Returns `None` if no promotion is needed (types are identical),
    /// `Some(promotion)` if a valid promotion exists, or an error if
    /// the types are incompatible.
    pub fn from_schemas(
        writer: &AvroSchema,
        reader: &AvroSchema,
    ) -> Result<Option<Self>, ResolutionError> {
        match (writer.base(), reader.base()) {
            // Same types - no promotion needed
            (AvroSchema::Null, AvroSchema::Null)
            | (AvroSchema::Boolean, AvroSchema::Boolean)
            | (AvroSchema::Int, AvroSchema::Int)
            | (AvroSchema::Long, AvroSchema::Long)
            | (AvroSchema::Float, AvroSchema::Float)
            | (AvroSchema::Double, AvroSchema::Double)
            | (AvroSchema::Bytes, AvroSchema::Bytes)
            | (AvroSchema::String, AvroSchema::String) => Ok(None),

            // int promotions
            (AvroSchema::Int, AvroSchema::Long) => Ok(Some(TypePromotion::IntToLong)),
            (AvroSchema::Int, AvroSchema::Float) => Ok(Some(TypePromotion::IntToFloat)),
            (AvroSchema::Int, AvroSchema::Double) => Ok(Some(TypePromotion::IntToDouble)),

            // long promotions
            (AvroSchema::Long, AvroSchema::Float) => Ok(Some(TypePromotion::LongToFloat)),
            (AvroSchema::Long, AvroSchema::Double) => Ok(Some(TypePromotion::LongToDouble)),

            // float promotion
            (AvroSchema::Float, AvroSchema::Double) => Ok(Some(TypePromotion::FloatToDouble)),

            // string/bytes interchangeable
            (AvroSchema::String, AvroSchema::Bytes) => Ok(Some(TypePromotion::StringToBytes)),
            (AvroSchema::Bytes, AvroSchema::String) => Ok(Some(TypePromotion::BytesToString)),

            // Complex types of the same kind are resolved structurally
            (AvroSchema::Record(_), AvroSchema::Record(_))
            | (AvroSchema::Enum(_), AvroSchema::Enum(_))
            | (AvroSchema::Array(_), AvroSchema::Array(_))
            | (AvroSchema::Map(_), AvroSchema::Map(_))
            | (AvroSchema::Union(_), AvroSchema::Union(_))
            | (AvroSchema::Fixed(_), AvroSchema::Fixed(_)) => Ok(None),

            (writer_base, reader_base) => Err(incompatible(writer_base, reader_base)),
        }
    }

    /// Read the writer's value for this promotion from the cursor.
    fn decode_source(self, data: &mut &[u8]) -> Result<AvroValue, DecodeError> {
        Ok(match self {
            TypePromotion::IntToLong | TypePromotion::IntToFloat | TypePromotion::IntToDouble => {
                AvroValue::Int(decode_int(data)?)
            }
            TypePromotion::LongToFloat | TypePromotion::LongToDouble => {
                AvroValue::Long(decode_long(data)?)
            }
            TypePromotion::FloatToDouble => AvroValue::Float(decode_float(data)?),
            TypePromotion::StringToBytes => AvroValue::String(decode_string(data)?),
            TypePromotion::BytesToString => AvroValue::Bytes(decode_bytes(data)?),
        })
    }
}

/// Apply a type promotion to a decoded value.
///
/// This function converts a value from the writer type to the reader type
/// according to Avro's promotion rules.
pub fn apply_promotion(value: AvroValue, promotion: TypePromotion) -> Result<AvroValue, DecodeError> {
    match (value, promotion) {
        (AvroValue::Int(v), TypePromotion::IntToLong) => Ok(AvroValue::Long(v as i64)),
        (AvroValue::Int(v), TypePromotion::IntToFloat) => Ok(AvroValue::Float(v as f32)),
        (AvroValue::Int(v), TypePromotion::IntToDouble) => Ok(AvroValue::Double(v as f64)),
        (AvroValue::Long(v), TypePromotion::LongToFloat) => Ok(AvroValue::Float(v as f32)),
        (AvroValue::Long(v), TypePromotion::LongToDouble) => Ok(AvroValue::Double(v as f64)),
        (AvroValue::Float(v), TypePromotion::FloatToDouble) => Ok(AvroValue::Double(v as f64)),
        (AvroValue::String(s), TypePromotion::StringToBytes) => Ok(AvroValue::Bytes(s.into_bytes())),
        (AvroValue::Bytes(b), TypePromotion::BytesToString) => {
            let s = String::from_utf8(b).map_err(|e| {
                DecodeError::InvalidData(format!("Cannot convert bytes to string: {}", e))
            })?;
            Ok(AvroValue::String(s))
        }
        (value, promotion) => Err(DecodeError::InvalidData(format!(
            "Cannot apply {:?} promotion to {} value",
            promotion,
            value.kind()
        ))),
    }
}

/// One step of a compiled resolution plan.
#[derive(Debug, Clone)]
pub enum ResolvedNode {
    Null,
    Boolean,
    Int,
    Long,
    Float,
    Double,
    Bytes,
    String,
    /// Read the writer primitive and convert it.
    Promote(TypePromotion),
    /// Fixed of the given size.
    Fixed(usize),
    /// Enum with writer symbols mapped to reader symbols.
    Enum(EnumResolution),
    Array(Box<ResolvedNode>),
    Map(Box<ResolvedNode>),
    /// Index into the plan's record table.
    Record(usize),
    /// Writer union; one plan per writer branch, selected by the wire index.
    WriterUnion(Vec<ResolvedNode>),
    /// Non-union writer read into one branch of a reader union.
    ReaderUnion { index: i32, node: Box<ResolvedNode> },
    /// Writer branch with no reader counterpart; fails if the data selects it.
    Unresolvable(ResolutionError),
}

/// Writer enum symbols mapped to reader `(index, symbol)` pairs.
#[derive(Debug, Clone)]
pub struct EnumResolution {
    symbols: Vec<Result<(i32, String), ResolutionError>>,
}

impl EnumResolution {
    fn new(writer: &EnumSchema, reader: &EnumSchema) -> Self {
        let fallback = reader
            .default
            .as_ref()
            .and_then(|d| reader.symbol_index(d).map(|i| (i as i32, d.clone())));

        let symbols = writer
            .symbols
            .iter()
            .map(|symbol| match reader.symbol_index(symbol) {
                Some(index) => Ok((index as i32, symbol.clone())),
                None => fallback.clone().ok_or_else(|| ResolutionError::UnknownSymbol {
                    name: reader.fullname(),
                    symbol: symbol.clone(),
                }),
            })
            .collect();

        Self { symbols }
    }

    /// Reader symbol for a writer index.
    pub fn resolve(&self, writer_index: usize) -> Result<(i32, String), ResolutionError> {
        match self.symbols.get(writer_index) {
            Some(result) => result.clone(),
            None => Err(ResolutionError::NoMatchingBranch(format!(
                "enum index {}",
                writer_index
            ))),
        }
    }
}

/// What to do with one writer field.
#[derive(Debug, Clone)]
pub enum FieldAction {
    /// Decode into the reader field at `reader_index`.
    Read {
        reader_index: usize,
        node: ResolvedNode,
    },
    /// The reader has no such field; step over the writer's value.
    Skip(AvroSchema),
}

/// Field mapping for one (writer record, reader record) pair.
#[derive(Debug, Clone)]
pub struct RecordResolution {
    /// Fully qualified writer record name
    pub writer_name: String,
    /// Fully qualified reader record name
    pub reader_name: String,
    /// Reader field names in reader order
    pub field_names: Vec<String>,
    /// One action per writer field, in writer order
    pub actions: Vec<FieldAction>,
    /// Pre-evaluated defaults for reader fields absent from the writer
    pub defaults: Vec<(usize, AvroValue)>,
}

impl RecordResolution {
    /// Check if writer fields appear in a different order than the reader's.
    pub fn needs_reordering(&self) -> bool {
        let mut last = None;
        for action in &self.actions {
            if let FieldAction::Read { reader_index, .. } = action {
                if matches!(last, Some(prev) if *reader_index < prev) {
                    return true;
                }
                last = Some(*reader_index);
            }
        }
        false
    }

    /// Check if any type promotions are needed at the top level of the record.
    pub fn needs_promotions(&self) -> bool {
        self.actions.iter().any(|a| {
            matches!(
                a,
                FieldAction::Read {
                    node: ResolvedNode::Promote(_),
                    ..
                }
            )
        })
    }

    /// Check if any default values are needed.
    pub fn needs_defaults(&self) -> bool {
        !self.defaults.is_empty()
    }

    /// Writer field positions that are skipped.
    pub fn skipped_fields(&self) -> Vec<usize> {
        self.actions
            .iter()
            .enumerate()
            .filter(|(_, a)| matches!(a, FieldAction::Skip(_)))
            .map(|(i, _)| i)
            .collect()
    }
}

/// A compiled writer/reader resolution plan.
///
/// Built once per schema pair, immutable afterwards, and shareable across
/// threads.
#[derive(Debug)]
pub struct ResolvedSchema {
    writer: Schema,
    reader: Schema,
    root: ResolvedNode,
    records: Vec<Result<RecordResolution, ResolutionError>>,
}

impl ResolvedSchema {
    /// Compile the plan for reading `writer` data as `reader` values.
    pub fn new(writer: &Schema, reader: &Schema) -> Result<Self, ResolutionError> {
        let mut compiler = PlanCompiler::new(writer.context(), reader.context());
        let root = compiler.compile(writer.root(), reader.root())?;
        debug!(
            records = compiler.records.len(),
            "compiled reader/writer resolution plan"
        );
        Ok(Self {
            writer: writer.clone(),
            reader: reader.clone(),
            root,
            records: compiler.records,
        })
    }

    /// The writer schema.
    pub fn writer(&self) -> &Schema {
        &self.writer
    }

    /// The reader schema.
    pub fn reader(&self) -> &Schema {
        &self.reader
    }

    /// The plan for the root value.
    pub fn root(&self) -> &ResolvedNode {
        &self.root
    }

    /// A record mapping by plan index.
    pub fn record(&self, index: usize) -> Result<&RecordResolution, ResolutionError> {
        match self.records.get(index) {
            Some(Ok(record)) => Ok(record),
            Some(Err(err)) => Err(err.clone()),
            None => Err(ResolutionError::NoMatchingBranch(format!(
                "record plan {}",
                index
            ))),
        }
    }

    /// Find the mapping compiled for a (writer, reader) record name pair.
    pub fn record_by_name(&self, writer: &str, reader: &str) -> Option<&RecordResolution> {
        self.records
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .find(|r| r.writer_name == writer && r.reader_name == reader)
    }

    /// Decode one datum, advancing the cursor past it.
    pub fn decode(&self, data: &mut &[u8]) -> Result<AvroValue, CodecError> {
        decode_resolved(data, &self.root, self)
    }
}

struct PlanCompiler<'a> {
    writer_ctx: &'a SchemaResolutionContext,
    reader_ctx: &'a SchemaResolutionContext,
    records: Vec<Result<RecordResolution, ResolutionError>>,
    record_index: HashMap<(String, String), usize>,
    failed: HashMap<(String, String), ResolutionError>,
}

impl<'a> PlanCompiler<'a> {
    fn new(writer_ctx: &'a SchemaResolutionContext, reader_ctx: &'a SchemaResolutionContext) -> Self {
        Self {
            writer_ctx,
            reader_ctx,
            records: Vec::new(),
            record_index: HashMap::new(),
            failed: HashMap::new(),
        }
    }

    fn compile(
        &mut self,
        writer: &'a AvroSchema,
        reader: &'a AvroSchema,
    ) -> Result<ResolvedNode, ResolutionError> {
        let writer = deref(self.writer_ctx, writer)?;
        let reader = deref(self.reader_ctx, reader)?;

        match (writer, reader) {
            (AvroSchema::Union(branches), _) => {
                let nodes = branches
                    .iter()
                    .map(|branch| {
                        self.compile(branch, reader)
                            .unwrap_or_else(ResolvedNode::Unresolvable)
                    })
                    .collect();
                Ok(ResolvedNode::WriterUnion(nodes))
            }
            (_, AvroSchema::Union(branches)) => {
                let index = self
                    .match_branch(writer, branches)
                    .ok_or_else(|| ResolutionError::NoMatchingBranch(describe(writer)))?;
                debug!(writer = %describe(writer), index, "matched reader union branch");
                let node = self.compile(writer, &branches[index])?;
                Ok(ResolvedNode::ReaderUnion {
                    index: index as i32,
                    node: Box::new(node),
                })
            }
            (AvroSchema::Record(w), AvroSchema::Record(r)) if names_match(writer, reader) => {
                Ok(ResolvedNode::Record(self.record(w, r)?))
            }
            (AvroSchema::Enum(w), AvroSchema::Enum(r)) if names_match(writer, reader) => {
                Ok(ResolvedNode::Enum(EnumResolution::new(w, r)))
            }
            (AvroSchema::Fixed(w), AvroSchema::Fixed(r))
                if w.size == r.size && names_match(writer, reader) =>
            {
                Ok(ResolvedNode::Fixed(w.size))
            }
            (AvroSchema::Array(w), AvroSchema::Array(r)) => {
                Ok(ResolvedNode::Array(Box::new(self.compile(w, r)?)))
            }
            (AvroSchema::Map(w), AvroSchema::Map(r)) => {
                Ok(ResolvedNode::Map(Box::new(self.compile(w, r)?)))
            }
            _ if writer.is_primitive() => match TypePromotion::from_schemas(writer, reader)? {
                Some(promotion) => Ok(ResolvedNode::Promote(promotion)),
                None => identity(writer).ok_or_else(|| incompatible(writer, reader)),
            },
            _ => Err(incompatible(writer, reader)),
        }
    }

    /// Pick the reader union branch for a non-union writer type.
    ///
    /// The first branch of the same kind wins (for named types the name must
    /// match too); failing that, the first branch reachable by promotion.
    fn match_branch(&self, writer: &AvroSchema, branches: &'a [AvroSchema]) -> Option<usize> {
        let resolved: Vec<Option<&AvroSchema>> = branches
            .iter()
            .map(|b| deref(self.reader_ctx, b).ok())
            .collect();

        let exact = resolved.iter().position(|branch| match branch {
            Some(branch) if std::mem::discriminant(*branch) == std::mem::discriminant(writer) => {
                !writer.is_named() || names_match(writer, branch)
            }
            _ => false,
        });

        exact.or_else(|| {
            resolved.iter().position(|branch| {
                matches!(branch, Some(b) if matches!(TypePromotion::from_schemas(writer, b), Ok(Some(_))))
            })
        })
    }

    fn record(
        &mut self,
        writer: &'a RecordSchema,
        reader: &'a RecordSchema,
    ) -> Result<usize, ResolutionError> {
        let key = (writer.fullname(), reader.fullname());
        if let Some(err) = self.failed.get(&key) {
            return Err(err.clone());
        }
        if let Some(&index) = self.record_index.get(&key) {
            // Already compiled, or being compiled further up a recursive path
            return Ok(index);
        }

        let index = self.records.len();
        self.records.push(Err(incompatible_names(&key.0, &key.1)));
        self.record_index.insert(key.clone(), index);

        match self.build_record(writer, reader) {
            Ok(resolution) => {
                self.records[index] = Ok(resolution);
                Ok(index)
            }
            Err(err) => {
                self.records[index] = Err(err.clone());
                self.failed.insert(key, err.clone());
                Err(err)
            }
        }
    }

    fn build_record(
        &mut self,
        writer: &'a RecordSchema,
        reader: &'a RecordSchema,
    ) -> Result<RecordResolution, ResolutionError> {
        // writer field position -> reader field position
        let mut targets: Vec<Option<usize>> = vec![None; writer.fields.len()];
        let mut defaults = Vec::new();

        for (reader_index, reader_field) in reader.fields.iter().enumerate() {
            let writer_match = find_matching_writer_field(writer, reader_field)
                .filter(|&writer_index| targets[writer_index].is_none());

            match writer_match {
                Some(writer_index) => targets[writer_index] = Some(reader_index),
                None => {
                    let default = reader_field
                        .default
                        .as_ref()
                        .ok_or_else(|| ResolutionError::MissingDefault(reader_field.name.clone()))?;
                    let value = json_to_avro_value(default, &reader_field.schema, self.reader_ctx)
                        .map_err(|e| ResolutionError::InvalidDefault {
                            field: reader_field.name.clone(),
                            message: e.to_string(),
                        })?;
                    defaults.push((reader_index, value));
                }
            }
        }

        let mut actions = Vec::with_capacity(writer.fields.len());
        for (writer_field, target) in writer.fields.iter().zip(targets) {
            match target {
                Some(reader_index) => {
                    let node =
                        self.compile(&writer_field.schema, &reader.fields[reader_index].schema)?;
                    actions.push(FieldAction::Read { reader_index, node });
                }
                None => actions.push(FieldAction::Skip(writer_field.schema.clone())),
            }
        }

        Ok(RecordResolution {
            writer_name: writer.fullname(),
            reader_name: reader.fullname(),
            field_names: reader.fields.iter().map(|f| f.name.clone()).collect(),
            actions,
            defaults,
        })
    }
}

/// Follow named references and strip logical annotations.
fn deref<'a>(
    context: &'a SchemaResolutionContext,
    schema: &'a AvroSchema,
) -> Result<&'a AvroSchema, ResolutionError> {
    context
        .lookup(schema)
        .map(AvroSchema::base)
        .ok_or_else(|| ResolutionError::IncompatibleTypes {
            writer: describe(schema),
            reader: "an unresolved named type".to_string(),
        })
}

fn identity(schema: &AvroSchema) -> Option<ResolvedNode> {
    Some(match schema {
        AvroSchema::Null => ResolvedNode::Null,
        AvroSchema::Boolean => ResolvedNode::Boolean,
        AvroSchema::Int => ResolvedNode::Int,
        AvroSchema::Long => ResolvedNode::Long,
        AvroSchema::Float => ResolvedNode::Float,
        AvroSchema::Double => ResolvedNode::Double,
        AvroSchema::Bytes => ResolvedNode::Bytes,
        AvroSchema::String => ResolvedNode::String,
        _ => return None,
    })
}

/// Named types match on unqualified name, or when a reader alias names the
/// writer type.
fn names_match(writer: &AvroSchema, reader: &AvroSchema) -> bool {
    let (Some(writer_name), Some(reader_name)) = (writer.name(), reader.name()) else {
        return false;
    };
    if writer_name == reader_name {
        return true;
    }
    let writer_fullname = writer.fullname().unwrap_or_default();
    reader
        .aliases()
        .iter()
        .any(|alias| *alias == writer_fullname || alias.rsplit('.').next() == Some(writer_name))
}

/// Find a matching writer field by reader field name, then by its aliases.
fn find_matching_writer_field(writer: &RecordSchema, reader_field: &FieldSchema) -> Option<usize> {
    if let Some((index, _)) = writer.field(&reader_field.name) {
        return Some(index);
    }
    reader_field
        .aliases
        .iter()
        .find_map(|alias| writer.field(alias).map(|(index, _)| index))
}

fn describe(schema: &AvroSchema) -> String {
    match schema.fullname() {
        Some(name) => format!("{} {}", schema.kind(), name),
        None => schema.kind().to_string(),
    }
}

fn incompatible(writer: &AvroSchema, reader: &AvroSchema) -> ResolutionError {
    ResolutionError::IncompatibleTypes {
        writer: describe(writer),
        reader: describe(reader),
    }
}

fn incompatible_names(writer: &str, reader: &str) -> ResolutionError {
    ResolutionError::IncompatibleTypes {
        writer: format!("record {}", writer),
        reader: format!("record {}", reader),
    }
}

/// Decode one value by following a plan node.
pub(crate) fn decode_resolved(
    data: &mut &[u8],
    node: &ResolvedNode,
    plan: &ResolvedSchema,
) -> Result<AvroValue, CodecError> {
    let value = match node {
        ResolvedNode::Null => AvroValue::Null,
        ResolvedNode::Boolean => AvroValue::Boolean(decode_boolean(data)?),
        ResolvedNode::Int => AvroValue::Int(decode_int(data)?),
        ResolvedNode::Long => AvroValue::Long(decode_long(data)?),
        ResolvedNode::Float => AvroValue::Float(decode_float(data)?),
        ResolvedNode::Double => AvroValue::Double(decode_double(data)?),
        ResolvedNode::Bytes => AvroValue::Bytes(decode_bytes(data)?),
        ResolvedNode::String => AvroValue::String(decode_string(data)?),
        ResolvedNode::Promote(promotion) => {
            let source = promotion.decode_source(data)?;
            apply_promotion(source, *promotion)?
        }
        ResolvedNode::Fixed(size) => AvroValue::Fixed(decode_fixed(data, *size)?),
        ResolvedNode::Enum(resolution) => {
            let writer_index = decode_enum_index(data, resolution.symbols.len())?;
            let (index, symbol) = resolution.resolve(writer_index as usize)?;
            AvroValue::Enum(index, symbol)
        }
        ResolvedNode::Array(item) => {
            let mut items = Vec::new();
            let mut limit = BlockLimit::new(node_is_zero_width(item, plan, &mut Vec::new()));
            while let Some(count) = limit.next_block(data)? {
                items.reserve(count);
                for _ in 0..count {
                    items.push(decode_resolved(data, item, plan)?);
                }
            }
            AvroValue::Array(items)
        }
        ResolvedNode::Map(value_node) => {
            let mut entries = MapEntries::default();
            let mut limit = BlockLimit::new(false);
            while let Some(count) = limit.next_block(data)? {
                entries.reserve(count);
                for _ in 0..count {
                    let key = decode_string(data)?;
                    let value = decode_resolved(data, value_node, plan)?;
                    entries.insert(key, value);
                }
            }
            entries.into_value()
        }
        ResolvedNode::Record(index) => decode_resolved_record(data, plan.record(*index)?, plan)?,
        ResolvedNode::WriterUnion(branches) => {
            let index = decode_union_index(data, branches.len())?;
            decode_resolved(data, &branches[index as usize], plan)?
        }
        ResolvedNode::ReaderUnion { index, node } => {
            AvroValue::Union(*index, Box::new(decode_resolved(data, node, plan)?))
        }
        ResolvedNode::Unresolvable(err) => return Err(err.clone().into()),
    };
    Ok(value)
}

/// True if the writer data read by `node` occupies no bytes.
fn node_is_zero_width(node: &ResolvedNode, plan: &ResolvedSchema, visiting: &mut Vec<usize>) -> bool {
    match node {
        ResolvedNode::Null => true,
        ResolvedNode::Fixed(size) => *size == 0,
        ResolvedNode::ReaderUnion { node, .. } => node_is_zero_width(node, plan, visiting),
        ResolvedNode::Record(index) => {
            let Ok(record) = plan.record(*index) else {
                return false;
            };
            if visiting.contains(index) {
                return false;
            }
            visiting.push(*index);
            let empty = record.actions.iter().all(|action| match action {
                FieldAction::Read { node, .. } => node_is_zero_width(node, plan, visiting),
                FieldAction::Skip(schema) => is_zero_width(schema, plan.writer.context()),
            });
            visiting.pop();
            empty
        }
        _ => false,
    }
}

fn decode_resolved_record(
    data: &mut &[u8],
    record: &RecordResolution,
    plan: &ResolvedSchema,
) -> Result<AvroValue, CodecError> {
    let mut values: Vec<Option<AvroValue>> = vec![None; record.field_names.len()];

    for action in &record.actions {
        match action {
            FieldAction::Read { reader_index, node } => {
                values[*reader_index] = Some(decode_resolved(data, node, plan)?);
            }
            FieldAction::Skip(schema) => {
                skip_value_with_context(data, schema, plan.writer.context())?;
            }
        }
    }

    for (reader_index, default) in &record.defaults {
        values[*reader_index] = Some(default.clone());
    }

    let fields = record
        .field_names
        .iter()
        .zip(values)
        .map(|(name, value)| {
            value.map(|v| (name.clone(), v)).ok_or_else(|| {
                DecodeError::InvalidData(format!("reader field '{}' received no value", name))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(AvroValue::Record(fields))
}

/// Convert a JSON default value to an AvroValue.
///
/// Follows the Avro rules for default literals: bytes and fixed defaults are
/// strings whose code points (0-255) are the byte values, enum defaults are
/// symbol names, and a union default belongs to the union's first branch.
pub fn json_to_avro_value(
    json: &Value,
    schema: &AvroSchema,
    context: &SchemaResolutionContext,
) -> Result<AvroValue, EncodeError> {
    match (json, schema) {
        (json, AvroSchema::Named(name)) => match context.lookup(schema) {
            Some(resolved) => json_to_avro_value(json, resolved, context),
            None => Err(EncodeError::UnresolvedName(name.clone())),
        },

        // Logical types - defaults are given in the base type
        (json, AvroSchema::Logical(logical)) => json_to_avro_value(json, &logical.base, context),

        (Value::Null, AvroSchema::Null) => Ok(AvroValue::Null),

        (Value::Bool(b), AvroSchema::Boolean) => Ok(AvroValue::Boolean(*b)),

        (Value::Number(n), AvroSchema::Int) => {
            let v = n
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .ok_or_else(|| EncodeError::InvalidValue(format!("{} is not a valid int", n)))?;
            Ok(AvroValue::Int(v))
        }
        (Value::Number(n), AvroSchema::Long) => {
            let v = n
                .as_i64()
                .ok_or_else(|| EncodeError::InvalidValue(format!("{} is not a valid long", n)))?;
            Ok(AvroValue::Long(v))
        }
        (Value::Number(n), AvroSchema::Float) => {
            let v = n
                .as_f64()
                .ok_or_else(|| EncodeError::InvalidValue(format!("{} is not a valid float", n)))?;
            Ok(AvroValue::Float(v as f32))
        }
        (Value::Number(n), AvroSchema::Double) => {
            let v = n
                .as_f64()
                .ok_or_else(|| EncodeError::InvalidValue(format!("{} is not a valid double", n)))?;
            Ok(AvroValue::Double(v))
        }

        (Value::String(s), AvroSchema::String) => Ok(AvroValue::String(s.clone())),
        (Value::String(s), AvroSchema::Bytes) => Ok(AvroValue::Bytes(latin1_bytes(s)?)),
        (Value::String(s), AvroSchema::Fixed(fixed)) => {
            let bytes = latin1_bytes(s)?;
            if bytes.len() != fixed.size {
                return Err(EncodeError::InvalidValue(format!(
                    "Fixed default has wrong size: expected {}, got {}",
                    fixed.size,
                    bytes.len()
                )));
            }
            Ok(AvroValue::Fixed(bytes))
        }

        (Value::String(s), AvroSchema::Enum(enum_schema)) => {
            let index = enum_schema.symbol_index(s).ok_or_else(|| {
                EncodeError::InvalidValue(format!(
                    "Unknown enum symbol '{}' for enum '{}'",
                    s, enum_schema.name
                ))
            })?;
            Ok(AvroValue::Enum(index as i32, s.clone()))
        }

        (Value::Array(arr), AvroSchema::Array(item_schema)) => {
            let items = arr
                .iter()
                .map(|item| json_to_avro_value(item, item_schema, context))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(AvroValue::Array(items))
        }

        (Value::Object(obj), AvroSchema::Map(value_schema)) => {
            let entries = obj
                .iter()
                .map(|(k, v)| Ok((k.clone(), json_to_avro_value(v, value_schema, context)?)))
                .collect::<Result<Vec<_>, EncodeError>>()?;
            Ok(AvroValue::Map(entries))
        }

        (Value::Object(obj), AvroSchema::Record(record_schema)) => {
            let fields = record_schema
                .fields
                .iter()
                .map(|field| {
                    let value = match obj.get(&field.name).or(field.default.as_ref()) {
                        Some(v) => json_to_avro_value(v, &field.schema, context)?,
                        None => return Err(EncodeError::MissingField(field.name.clone())),
                    };
                    Ok((field.name.clone(), value))
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(AvroValue::Record(fields))
        }

        (json, AvroSchema::Union(variants)) => {
            let first = variants
                .first()
                .ok_or_else(|| EncodeError::InvalidValue("Empty union".to_string()))?;
            let value = json_to_avro_value(json, first, context)?;
            Ok(AvroValue::Union(0, Box::new(value)))
        }

        (json, schema) => Err(EncodeError::TypeMismatch(format!(
            "default {} does not fit {}",
            json,
            describe(schema)
        ))),
    }
}

/// Bytes of a JSON string whose code points are all in 0..=255.
fn latin1_bytes(s: &str) -> Result<Vec<u8>, EncodeError> {
    s.chars()
        .map(|c| {
            u8::try_from(u32::from(c)).map_err(|_| {
                EncodeError::InvalidValue(format!(
                    "character '{}' in bytes default is outside 0-255",
                    c
                ))
            })
        })
        .collect()
}
