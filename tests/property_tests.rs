//! Property-based tests for contrail.
//!
//! Schemas and matching values are generated together so every generated
//! value is valid for its schema.

use proptest::prelude::*;

use contrail::schema::*;
use contrail::varint::{decode_varint, decode_zigzag, write_varint, write_zigzag, MAX_VARINT_LEN};
use contrail::{decode, decode_with_reader, AvroValue, Decoder, Encoder, EncoderConfig};

// ============================================================================
// Schema Generators
// ============================================================================

fn arb_primitive_schema() -> impl Strategy<Value = AvroSchema> {
    prop_oneof![
        Just(AvroSchema::Null),
        Just(AvroSchema::Boolean),
        Just(AvroSchema::Int),
        Just(AvroSchema::Long),
        Just(AvroSchema::Float),
        Just(AvroSchema::Double),
        Just(AvroSchema::Bytes),
        Just(AvroSchema::String),
    ]
}

fn arb_leaf_schema() -> impl Strategy<Value = AvroSchema> {
    prop_oneof![
        4 => arb_primitive_schema(),
        1 => (1usize..4).prop_map(|n| {
            let symbols = ["A", "B", "C", "D"][..n].iter().map(|s| s.to_string()).collect();
            AvroSchema::Enum(EnumSchema::new("E", symbols))
        }),
        1 => (1usize..9).prop_map(|size| AvroSchema::Fixed(FixedSchema::new("F", size))),
    ]
}

/// Nested schemas built from arrays, maps, nullable unions and records.
///
/// Named types get placeholder names; [`assign_names`] makes them unique.
fn arb_schema() -> impl Strategy<Value = AvroSchema> {
    arb_leaf_schema()
        .prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                inner.clone().prop_map(|s| AvroSchema::Array(Box::new(s))),
                inner.clone().prop_map(|s| AvroSchema::Map(Box::new(s))),
                inner
                    .clone()
                    .prop_filter("union members must differ", |s| {
                        !matches!(s, AvroSchema::Null | AvroSchema::Union(_))
                    })
                    .prop_map(|s| AvroSchema::Union(vec![AvroSchema::Null, s])),
                prop::collection::vec(inner, 1..4).prop_map(|types| {
                    let fields = types
                        .into_iter()
                        .enumerate()
                        .map(|(i, s)| FieldSchema::new(format!("f{}", i), s))
                        .collect();
                    AvroSchema::Record(RecordSchema::new("R", fields))
                }),
            ]
        })
        .prop_map(|mut schema| {
            assign_names(&mut schema, &mut 0);
            schema
        })
}

fn assign_names(schema: &mut AvroSchema, next: &mut usize) {
    match schema {
        AvroSchema::Record(record) => {
            record.name = format!("Record{}", next);
            *next += 1;
            for field in &mut record.fields {
                assign_names(&mut field.schema, next);
            }
        }
        AvroSchema::Enum(e) => {
            e.name = format!("Enum{}", next);
            *next += 1;
        }
        AvroSchema::Fixed(f) => {
            f.name = format!("Fixed{}", next);
            *next += 1;
        }
        AvroSchema::Array(inner) | AvroSchema::Map(inner) => assign_names(inner, next),
        AvroSchema::Union(variants) => {
            for variant in variants {
                assign_names(variant, next);
            }
        }
        _ => {}
    }
}

// ============================================================================
// Value Generators
// ============================================================================

/// Values valid for `schema`. Floats stay finite so equality holds.
fn arb_value(schema: &AvroSchema) -> BoxedStrategy<AvroValue> {
    match schema {
        AvroSchema::Null => Just(AvroValue::Null).boxed(),
        AvroSchema::Boolean => any::<bool>().prop_map(AvroValue::Boolean).boxed(),
        AvroSchema::Int => any::<i32>().prop_map(AvroValue::Int).boxed(),
        AvroSchema::Long => any::<i64>().prop_map(AvroValue::Long).boxed(),
        AvroSchema::Float => (-1.0e6f32..1.0e6f32).prop_map(AvroValue::Float).boxed(),
        AvroSchema::Double => (-1.0e12f64..1.0e12f64).prop_map(AvroValue::Double).boxed(),
        AvroSchema::Bytes => prop::collection::vec(any::<u8>(), 0..32)
            .prop_map(AvroValue::Bytes)
            .boxed(),
        AvroSchema::String => "\\PC{0,16}".prop_map(AvroValue::String).boxed(),
        AvroSchema::Enum(e) => {
            let symbols = e.symbols.clone();
            (0..symbols.len())
                .prop_map(move |i| AvroValue::Enum(i as i32, symbols[i].clone()))
                .boxed()
        }
        AvroSchema::Fixed(f) => prop::collection::vec(any::<u8>(), f.size)
            .prop_map(AvroValue::Fixed)
            .boxed(),
        AvroSchema::Array(items) => prop::collection::vec(arb_value(items), 0..5)
            .prop_map(AvroValue::Array)
            .boxed(),
        AvroSchema::Map(values) => {
            prop::collection::btree_map("[a-z]{1,6}", arb_value(values), 0..5)
                .prop_map(|entries| AvroValue::Map(entries.into_iter().collect()))
                .boxed()
        }
        AvroSchema::Union(variants) => {
            let branches: Vec<BoxedStrategy<AvroValue>> = variants
                .iter()
                .enumerate()
                .map(|(i, v)| arb_value(v).prop_map(move |value| AvroValue::union(i as i32, value)).boxed())
                .collect();
            proptest::strategy::Union::new(branches).boxed()
        }
        AvroSchema::Record(record) => {
            let names: Vec<String> = record.fields.iter().map(|f| f.name.clone()).collect();
            let fields: Vec<BoxedStrategy<AvroValue>> =
                record.fields.iter().map(|f| arb_value(&f.schema)).collect();
            fields
                .prop_map(move |values| AvroValue::record(names.clone().into_iter().zip(values)))
                .boxed()
        }
        other => panic!("generator does not produce {:?}", other),
    }
}

fn arb_schema_and_value() -> impl Strategy<Value = (Schema, AvroValue)> {
    arb_schema().prop_flat_map(|root| {
        let value = arb_value(&root);
        let schema = Schema::from_avro_schema(root).unwrap();
        (Just(schema), value)
    })
}

// ============================================================================
// Codec Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Decoding an encoded value yields the same value.
    #[test]
    fn prop_encode_decode_round_trip((schema, value) in arb_schema_and_value()) {
        let bytes = Encoder::new(&schema).encode(&value).unwrap();
        prop_assert_eq!(decode(&schema, &bytes).unwrap(), value);
    }

    /// Block size changes the bytes but never the decoded value.
    #[test]
    fn prop_blocked_encoding_decodes_identically(
        (schema, value) in arb_schema_and_value(),
        block_size in 1usize..4,
    ) {
        let config = EncoderConfig::new().with_block_size(block_size);
        let bytes = Encoder::with_config(&schema, config).encode(&value).unwrap();
        prop_assert_eq!(decode(&schema, &bytes).unwrap(), value);
    }

    /// Every strict prefix of an encoding is rejected.
    #[test]
    fn prop_truncation_is_detected((schema, value) in arb_schema_and_value()) {
        let bytes = Encoder::new(&schema).encode(&value).unwrap();
        for cut in 0..bytes.len() {
            prop_assert!(decode(&schema, &bytes[..cut]).is_err());
        }
    }

    /// A decoder consumes exactly one datum from a stream.
    #[test]
    fn prop_consecutive_datums((schema, value) in arb_schema_and_value()) {
        let encoder = Encoder::new(&schema);
        let mut stream = encoder.encode(&value).unwrap().to_vec();
        // Zero-width datums cannot be counted in a stream.
        prop_assume!(!stream.is_empty());
        stream.extend_from_slice(&encoder.encode(&value).unwrap());

        let values = Decoder::new(&schema).decode_all(&stream).unwrap();
        prop_assert_eq!(values, vec![value.clone(), value]);
    }

    /// Resolving a schema against itself matches direct decoding.
    #[test]
    fn prop_identity_resolution((schema, value) in arb_schema_and_value()) {
        let bytes = Encoder::new(&schema).encode(&value).unwrap();
        let resolved = decode_with_reader(&schema, &schema, &bytes).unwrap();
        prop_assert_eq!(resolved, value);
    }

    /// Rendered schema JSON parses back to the same schema.
    #[test]
    fn prop_schema_json_round_trip(root in arb_schema()) {
        let schema = Schema::from_avro_schema(root).unwrap();
        let reparsed = Schema::parse(&schema.to_json()).unwrap();
        prop_assert_eq!(reparsed.root(), schema.root());
    }
}

// ============================================================================
// Varint Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_varint_round_trip(value in any::<u64>()) {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let len = write_varint(value, &mut buf);
        let mut cursor = &buf[..len];
        prop_assert_eq!(decode_varint(&mut cursor).unwrap(), value);
        prop_assert!(cursor.is_empty());
    }

    #[test]
    fn prop_zigzag_round_trip(value in any::<i64>()) {
        let mut buf = [0u8; MAX_VARINT_LEN];
        let len = write_zigzag(value, &mut buf);
        let mut cursor = &buf[..len];
        prop_assert_eq!(decode_zigzag(&mut cursor).unwrap(), value);
        prop_assert!(cursor.is_empty());
    }

    /// Small magnitudes take fewer bytes regardless of sign.
    #[test]
    fn prop_zigzag_small_values_are_short(value in -64i64..64) {
        let mut buf = [0u8; MAX_VARINT_LEN];
        prop_assert_eq!(write_zigzag(value, &mut buf), 1);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Arbitrary input never hangs or panics the decoder.
    #[test]
    fn prop_garbage_input_terminates(
        root in arb_schema(),
        bytes in prop::collection::vec(any::<u8>(), 0..32),
    ) {
        let schema = Schema::from_avro_schema(root).unwrap();
        let _ = decode(&schema, &bytes);
    }
}
