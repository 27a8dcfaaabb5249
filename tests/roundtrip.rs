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

use avrora::{Codec, Reader, Record, SchemaGraph, Value, Writer, from_avro_datum, to_avro_datum};
use pretty_assertions::assert_eq;
use std::collections::HashMap;

type TestResult = anyhow::Result<()>;

fn datum_roundtrip(schema: &str, value: Value) -> TestResult {
    let graph = SchemaGraph::parse_str(schema)?;
    let bytes = to_avro_datum(&graph, value.clone())?;
    let decoded = from_avro_datum(&graph, &mut &bytes[..])?;
    assert_eq!(decoded, value, "schema: {schema}");
    Ok(())
}

#[test]
fn test_scalar_roundtrips() -> TestResult {
    datum_roundtrip(r#""null""#, Value::Null)?;
    datum_roundtrip(r#""boolean""#, Value::Boolean(true))?;
    datum_roundtrip(r#""int""#, Value::Int(-12))?;
    datum_roundtrip(r#""int""#, Value::Int(i32::MIN))?;
    datum_roundtrip(r#""long""#, Value::Long(i64::MAX))?;
    datum_roundtrip(r#""float""#, Value::Float(3.5))?;
    datum_roundtrip(r#""double""#, Value::Double(-0.75))?;
    datum_roundtrip(r#""bytes""#, Value::Bytes(vec![0, 1, 255]))?;
    datum_roundtrip(r#""string""#, Value::String("snowflake ❄".to_string()))?;
    Ok(())
}

#[test]
fn test_float_roundtrip_is_bit_exact() -> TestResult {
    for bits in [0x0000_0001u32, 0x7f80_0000, 0x8000_0000, 0x3f80_0001] {
        let value = f32::from_bits(bits);
        let graph = SchemaGraph::parse_str(r#""float""#)?;
        let bytes = to_avro_datum(&graph, Value::Float(value))?;
        match from_avro_datum(&graph, &mut &bytes[..])? {
            Value::Float(back) => assert_eq!(back.to_bits(), bits),
            other => panic!("expected a float, got {other:?}"),
        }
    }
    Ok(())
}

#[test]
fn test_collection_roundtrips() -> TestResult {
    datum_roundtrip(
        r#"{"type": "array", "items": "long"}"#,
        Value::Array(vec![Value::Long(1), Value::Long(-1), Value::Long(64)]),
    )?;
    datum_roundtrip(
        r#"{"type": "map", "values": "string"}"#,
        Value::Map(HashMap::from([
            ("a".to_string(), Value::String("x".to_string())),
            ("b".to_string(), Value::String("y".to_string())),
        ])),
    )?;
    datum_roundtrip(
        r#"{"type": "fixed", "name": "F", "size": 3}"#,
        Value::Fixed(3, vec![7, 8, 9]),
    )?;
    Ok(())
}

#[test]
fn test_record_roundtrip() -> TestResult {
    let schema = r#"
        {
            "type": "record",
            "name": "Everything",
            "fields": [
                {"name": "id", "type": "long"},
                {"name": "name", "type": "string"},
                {"name": "tags", "type": {"type": "array", "items": "string"}},
                {"name": "props", "type": {"type": "map", "values": "int"}},
                {"name": "maybe", "type": ["null", "double"]}
            ]
        }
    "#;
    let graph = SchemaGraph::parse_str(schema)?;
    let rtype = graph
        .types()
        .record_type(&"Everything".parse()?)
        .expect("record descriptor");
    let mut record = Record::new(rtype);
    record.put("id", 7i64);
    record.put("name", "thing");
    record.put(
        "tags",
        Value::Array(vec![Value::String("red".into()), Value::String("blue".into())]),
    );
    record.put(
        "props",
        Value::Map(HashMap::from([("n".to_string(), Value::Int(4))])),
    );
    record.put("maybe", 0.5f64);

    let value = Value::Record(record);
    let bytes = to_avro_datum(&graph, value.clone())?;
    assert_eq!(from_avro_datum(&graph, &mut &bytes[..])?, value);
    Ok(())
}

#[test]
fn test_container_roundtrip() -> TestResult {
    let graph = SchemaGraph::parse_str(r#""long""#)?;
    let mut writer = Writer::new(&graph, Vec::new());
    for i in 0..100i64 {
        writer.append(i)?;
    }
    let bytes = writer.into_inner()?;

    let values: Vec<Value> = Reader::new(&bytes[..])?.collect::<Result<_, _>>()?;
    assert_eq!(values, (0..100).map(Value::Long).collect::<Vec<_>>());
    Ok(())
}

#[test]
fn test_container_roundtrip_multiple_blocks() -> TestResult {
    let graph = SchemaGraph::parse_str(r#""string""#)?;
    // A tiny block size forces a flush on nearly every append.
    let mut writer = Writer::with_codec_and_block_size(&graph, Vec::new(), Codec::Null, 8);
    for word in ["one", "two", "three", "four", "five"] {
        writer.append(word)?;
    }
    let bytes = writer.into_inner()?;

    let values: Vec<Value> = Reader::new(&bytes[..])?.collect::<Result<_, _>>()?;
    assert_eq!(
        values,
        ["one", "two", "three", "four", "five"]
            .map(|w| Value::String(w.to_string()))
            .to_vec()
    );
    Ok(())
}

#[test]
fn test_container_roundtrip_deflate() -> TestResult {
    let graph = SchemaGraph::parse_str(r#""string""#)?;
    let mut writer = Writer::with_codec(&graph, Vec::new(), Codec::Deflate);
    for _ in 0..50 {
        writer.append("a very compressible string, repeated")?;
    }
    let bytes = writer.into_inner()?;

    let values: Vec<Value> = Reader::new(&bytes[..])?.collect::<Result<_, _>>()?;
    assert_eq!(values.len(), 50);
    assert_eq!(
        values[49],
        Value::String("a very compressible string, repeated".to_string())
    );
    Ok(())
}

#[test]
fn test_empty_write_produces_valid_empty_file() -> TestResult {
    let graph = SchemaGraph::parse_str(r#""long""#)?;
    let mut writer = Writer::new(&graph, Vec::new());
    writer.close()?;
    let bytes = writer.into_inner()?;
    assert!(!bytes.is_empty());

    let mut reader = Reader::new(&bytes[..])?;
    assert!(reader.next().is_none());
    Ok(())
}

#[test]
fn test_user_metadata_roundtrip() -> TestResult {
    let graph = SchemaGraph::parse_str(r#""long""#)?;
    let mut writer = Writer::new(&graph, Vec::new());
    writer.add_user_metadata("stamp".to_string(), b"v1")?;
    writer.append(5i64)?;
    let bytes = writer.into_inner()?;

    let reader = Reader::new(&bytes[..])?;
    assert_eq!(
        reader.user_metadata().get("stamp"),
        Some(&b"v1".to_vec())
    );
    assert_eq!(reader.schema_json(), graph.json()?);
    Ok(())
}

#[test]
fn test_schema_override_reader() -> TestResult {
    // Same logical schema parsed twice: decode against the caller's copy.
    let writer_graph = SchemaGraph::parse_str(r#""long""#)?;
    let reader_graph = SchemaGraph::parse_str(r#""long""#)?;
    let mut writer = Writer::new(&writer_graph, Vec::new());
    writer.append(9i64)?;
    let bytes = writer.into_inner()?;

    let values: Vec<Value> =
        Reader::with_schema(&reader_graph, &bytes[..])?.collect::<Result<_, _>>()?;
    assert_eq!(values, vec![Value::Long(9)]);
    Ok(())
}
