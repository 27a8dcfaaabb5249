// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

//! Encoding values into binary data, driven by the schema.
//!
//! The encoder accepts loosely-typed input and coerces it where the schema
//! allows: integral values widen to `long`, coerce to `boolean` (zero is
//! false) and to the float kinds, a map stands in for a record, and a string
//! or an ordinal stands in for an enum symbol. `string` and `bytes` never
//! convert into each other.
//!
//! Union branches are resolved first-match in declaration order through
//! [`crate::validate`], so a value that validates always encodes, to the
//! same branch.

use crate::{
    AvroResult,
    error::EncodeError,
    schema::{
        ArraySchema, EnumSchema, FixedSchema, MapSchema, Names, RecordSchema, Schema, SchemaGraph,
        UnionSchema,
    },
    types::Value,
    util::{write_all, zig_i32, zig_i64},
    validate::{mismatch, union_branch},
};
use log::error;
use std::io::Write;

/// Encode a value against the root node of `graph`.
///
/// Errors are reported with the dotted field path of the offending value.
/// On error, bytes already encoded for earlier fields may have reached the
/// sink; use [`encode_to_vec`] or a [`Writer`](crate::Writer) when that
/// matters.
pub fn encode<W: Write>(value: &Value, graph: &SchemaGraph, writer: &mut W) -> AvroResult<()> {
    encode_internal(value, graph.root(), graph.names(), writer).map_err(|e| {
        match graph.root_record_name() {
            Some(name) => e.at(&name),
            None => e,
        }
    })
}

/// Encode a value against the root node of `graph` into a fresh buffer.
pub fn encode_to_vec(value: &Value, graph: &SchemaGraph) -> AvroResult<Vec<u8>> {
    let mut buffer = Vec::new();
    encode(value, graph, &mut buffer)?;
    Ok(buffer)
}

pub(crate) fn encode_bytes<B: AsRef<[u8]> + ?Sized, W: Write>(
    s: &B,
    writer: &mut W,
) -> AvroResult<()> {
    let bytes = s.as_ref();
    encode_long(bytes.len() as i64, writer)?;
    write_all(writer, bytes)
}

pub(crate) fn encode_long<W: Write>(i: i64, writer: &mut W) -> AvroResult<()> {
    zig_i64(i, writer)
}

pub(crate) fn encode_int<W: Write>(i: i32, writer: &mut W) -> AvroResult<()> {
    zig_i32(i, writer)
}

pub(crate) fn encode_internal<W: Write>(
    value: &Value,
    schema: &Schema,
    names: &Names,
    writer: &mut W,
) -> AvroResult<()> {
    match schema {
        Schema::Ref { name } => {
            let resolved = names
                .get(name)
                .ok_or_else(|| EncodeError::UnresolvedRef(name.fullname(&None)))?;
            encode_internal(value, resolved, names, writer)
        }
        Schema::Null => match value {
            Value::Null => Ok(()),
            other => Err(mismatch(schema, other).into()),
        },
        Schema::Boolean => match value.coerce_boolean() {
            Some(b) => write_all(writer, &[u8::from(b)]),
            None => Err(mismatch(schema, value).into()),
        },
        Schema::Int => match value.coerce_int() {
            Some(i) => encode_int(i, writer),
            None => Err(mismatch(schema, value).into()),
        },
        Schema::Long => match value.coerce_long() {
            Some(i) => encode_long(i, writer),
            None => Err(mismatch(schema, value).into()),
        },
        Schema::Float => match value.coerce_float() {
            Some(x) => write_all(writer, &x.to_le_bytes()),
            None => Err(mismatch(schema, value).into()),
        },
        Schema::Double => match value.coerce_double() {
            Some(x) => write_all(writer, &x.to_le_bytes()),
            None => Err(mismatch(schema, value).into()),
        },
        Schema::Bytes => match value {
            Value::Bytes(bytes) => encode_bytes(bytes, writer),
            other => Err(mismatch(schema, other).into()),
        },
        Schema::String => match value {
            Value::String(s) => encode_bytes(s, writer),
            other => Err(mismatch(schema, other).into()),
        },
        Schema::Fixed(FixedSchema { size, .. }) => match value {
            Value::Fixed(_, bytes) | Value::Bytes(bytes) => {
                if bytes.len() == *size {
                    write_all(writer, bytes)
                } else {
                    Err(EncodeError::FixedSizeMismatch {
                        size: *size,
                        actual: bytes.len(),
                    }
                    .into())
                }
            }
            other => Err(mismatch(schema, other).into()),
        },
        Schema::Enum(EnumSchema { symbols, .. }) => {
            let ordinal = match value {
                Value::Enum(symbol) => symbols
                    .iter()
                    .position(|s| s == symbol.symbol())
                    .ok_or_else(|| EncodeError::UnknownEnumSymbol(symbol.symbol().to_string()))?,
                Value::String(s) => symbols
                    .iter()
                    .position(|item| item == s)
                    .ok_or_else(|| EncodeError::UnknownEnumSymbol(s.clone()))?,
                Value::Int(_) | Value::Long(_) => {
                    let ordinal = value.coerce_long().expect("integral value");
                    if ordinal < 0 || ordinal as usize >= symbols.len() {
                        return Err(EncodeError::OrdinalOutOfRange {
                            ordinal,
                            symbols: symbols.len(),
                        }
                        .into());
                    }
                    ordinal as usize
                }
                other => return Err(mismatch(schema, other).into()),
            };
            encode_int(ordinal as i32, writer)
        }
        Schema::Array(ArraySchema { items }) => match value {
            Value::Array(values) => {
                if !values.is_empty() {
                    encode_long(values.len() as i64, writer)?;
                    for item in values {
                        encode_internal(item, items, names, writer)?;
                    }
                }
                write_all(writer, &[0u8])
            }
            other => {
                error!("invalid value for Array schema: {other:?}");
                Err(mismatch(schema, other).into())
            }
        },
        Schema::Map(MapSchema { values }) => match value {
            Value::Map(entries) => {
                if !entries.is_empty() {
                    encode_long(entries.len() as i64, writer)?;
                    for (key, entry) in entries {
                        encode_bytes(key, writer)?;
                        encode_internal(entry, values, names, writer)
                            .map_err(|e| e.at(key))?;
                    }
                }
                write_all(writer, &[0u8])
            }
            other => {
                error!("invalid value for Map schema: {other:?}");
                Err(mismatch(schema, other).into())
            }
        },
        Schema::Record(rs @ RecordSchema { fields, .. }) => {
            match value {
                Value::Record(record) => {
                    let rtype = record.record_type();
                    if *rtype.name() != rs.name {
                        return Err(EncodeError::RecordNameMismatch {
                            expected: rs.name.fullname(&None),
                            actual: rtype.name().fullname(&None),
                        }
                        .into());
                    }
                    for field in fields {
                        let value = record.get(&field.name).ok_or_else(|| {
                            EncodeError::MissingField(field.name.clone()).at(&field.name)
                        })?;
                        encode_internal(value, &field.schema, names, writer)
                            .map_err(|e| e.at(&field.name))?;
                    }
                    Ok(())
                }
                Value::Map(entries) => {
                    for field in fields {
                        let value = entries.get(&field.name).ok_or_else(|| {
                            EncodeError::MissingField(field.name.clone()).at(&field.name)
                        })?;
                        encode_internal(value, &field.schema, names, writer)
                            .map_err(|e| e.at(&field.name))?;
                    }
                    Ok(())
                }
                other => {
                    error!("invalid value for Record schema: {other:?}");
                    Err(mismatch(schema, other).into())
                }
            }
        }
        Schema::Union(union @ UnionSchema { schemas, .. }) => {
            let index = union_branch(value, union, names)?;
            encode_long(index as i64, writer)?;
            encode_internal(value, &schemas[index as usize], names, writer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use hex_literal::hex;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn encode_str(value: &Value, schema: &str) -> AvroResult<Vec<u8>> {
        let graph = SchemaGraph::parse_str(schema).unwrap();
        encode_to_vec(value, &graph)
    }

    #[test]
    fn test_encode_scalars_wire_format() {
        assert_eq!(encode_str(&Value::Null, r#""null""#).unwrap(), b"");
        assert_eq!(
            encode_str(&Value::Boolean(true), r#""boolean""#).unwrap(),
            hex!("01")
        );
        assert_eq!(encode_str(&Value::Int(1), r#""int""#).unwrap(), hex!("02"));
        assert_eq!(
            encode_str(&Value::Long(-64), r#""long""#).unwrap(),
            hex!("7f")
        );
        assert_eq!(
            encode_str(&Value::Double(1.0), r#""double""#).unwrap(),
            hex!("000000000000f03f")
        );
        assert_eq!(
            encode_str(&Value::String("foo".into()), r#""string""#).unwrap(),
            hex!("06666f6f")
        );
    }

    #[test]
    fn test_encode_widens_int_to_long_and_double() {
        assert_eq!(
            encode_str(&Value::Int(3), r#""long""#).unwrap(),
            encode_str(&Value::Long(3), r#""long""#).unwrap()
        );
        assert_eq!(
            encode_str(&Value::Int(3), r#""double""#).unwrap(),
            encode_str(&Value::Double(3.0), r#""double""#).unwrap()
        );
    }

    #[test]
    fn test_encode_never_narrows_silently() {
        let err = encode_str(&Value::Long(1 << 40), r#""int""#).unwrap_err();
        assert!(matches!(
            err,
            Error::Encode(EncodeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_encode_boolean_coerces_integers() {
        assert_eq!(
            encode_str(&Value::Int(0), r#""boolean""#).unwrap(),
            hex!("00")
        );
        assert_eq!(
            encode_str(&Value::Long(33), r#""boolean""#).unwrap(),
            hex!("01")
        );
    }

    #[test]
    fn test_encode_empty_array() {
        assert_eq!(
            encode_str(&Value::Array(vec![]), r#"{"type": "array", "items": "int"}"#).unwrap(),
            hex!("00")
        );
    }

    #[test]
    fn test_encode_array_single_block() {
        assert_eq!(
            encode_str(
                &Value::Array(vec![Value::Int(1), Value::Int(2)]),
                r#"{"type": "array", "items": "int"}"#
            )
            .unwrap(),
            hex!("04 02 04 00")
        );
    }

    #[test]
    fn test_encode_empty_map() {
        assert_eq!(
            encode_str(
                &Value::Map(HashMap::new()),
                r#"{"type": "map", "values": "int"}"#
            )
            .unwrap(),
            hex!("00")
        );
    }

    #[test]
    fn test_encode_enum_by_symbol_string_and_ordinal() {
        let schema = r#"{"type": "enum", "name": "Color", "symbols": ["BLUE", "GREEN", "BROWN"]}"#;
        // "BROWN" is at index 2, zigzag(2) == 4
        assert_eq!(
            encode_str(&Value::String("BROWN".into()), schema).unwrap(),
            hex!("04")
        );
        assert_eq!(encode_str(&Value::Int(2), schema).unwrap(), hex!("04"));
        assert!(encode_str(&Value::String("PINK".into()), schema).is_err());
        assert!(encode_str(&Value::Int(3), schema).is_err());
    }

    #[test]
    fn test_encode_fixed_checks_size() {
        let schema = r#"{"type": "fixed", "name": "F", "size": 2}"#;
        assert_eq!(
            encode_str(&Value::Fixed(2, vec![0xab, 0xcd]), schema).unwrap(),
            hex!("abcd")
        );
        assert_eq!(
            encode_str(&Value::Bytes(vec![0xab, 0xcd]), schema).unwrap(),
            hex!("abcd")
        );
        assert!(encode_str(&Value::Bytes(vec![0xab]), schema).is_err());
    }

    #[test]
    fn test_encode_union_writes_branch_index() {
        let schema = r#"["null", "string"]"#;
        assert_eq!(encode_str(&Value::Null, schema).unwrap(), hex!("00"));
        assert_eq!(
            encode_str(&Value::String("a".into()), schema).unwrap(),
            hex!("02 02 61")
        );
    }

    #[test]
    fn test_encode_mismatch_names_field_path() {
        let schema = r#"
            {
                "type": "record",
                "name": "Rec1",
                "fields": [{"name": "attr1", "type": "int"}]
            }
        "#;
        let value = Value::Map(HashMap::from([(
            "attr1".to_string(),
            Value::String("not an int".to_string()),
        )]));
        let err = encode_str(&value, schema).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Rec1.attr1"), "message was: {message}");
        match err {
            Error::Encode(e) => assert_eq!(e.path(), Some("Rec1.attr1")),
            other => panic!("expected an encode error, got {other:?}"),
        }
    }

    #[test]
    fn test_encode_recursive_record() {
        let schema = r#"
            {
                "type": "record",
                "name": "LongList",
                "fields": [
                    {"name": "value", "type": "long"},
                    {"name": "next", "type": ["null", "LongList"]}
                ]
            }
        "#;
        let graph = SchemaGraph::parse_str(schema).unwrap();
        let rtype = graph
            .types()
            .record_type(&crate::schema::Name::new("LongList").unwrap())
            .unwrap();
        let mut inner = crate::types::Record::new(rtype.clone());
        inner.put("value", 2i64);
        let mut outer = crate::types::Record::new(rtype);
        outer.put("value", 1i64);
        outer.put("next", inner);
        // value 1; branch 1 (LongList); value 2; branch 0 (null)
        assert_eq!(
            encode_to_vec(&Value::Record(outer), &graph).unwrap(),
            hex!("02 02 04 00")
        );
    }
}
