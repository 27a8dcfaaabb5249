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

//! Decoding binary data against a schema, recursively dispatched on the
//! node kind.
//!
//! The decoder reads exactly what the current node demands and nothing
//! more; it does no buffering of its own, so it can run against any
//! [`Read`] without a seek requirement.

use crate::{
    AvroResult,
    error::DecodeError,
    registry::TypeRegistry,
    schema::{
        ArraySchema, EnumSchema, FixedSchema, MapSchema, Names, RecordSchema, Schema, SchemaGraph,
        UnionSchema,
    },
    types::{EnumSymbol, Record, Value},
    util::{read_exact, read_long, safe_len},
};
use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

/// Decode one value from `reader` against the root node of `graph`.
pub(crate) fn decode<R: Read>(graph: &SchemaGraph, reader: &mut R) -> AvroResult<Value> {
    decode_with_types(graph, graph.types(), reader)
}

/// Decode against a bare, anonymous node (no named types). Used for the
/// container header metadata map.
pub(crate) fn decode_node<R: Read>(schema: &Schema, reader: &mut R) -> AvroResult<Value> {
    decode_internal(schema, &Names::new(), &TypeRegistry::default(), reader)
}

/// Decode one value, building records and enums with descriptors from
/// `types` (identity-preserving when the registry was reused).
pub(crate) fn decode_with_types<R: Read>(
    graph: &SchemaGraph,
    types: &TypeRegistry,
    reader: &mut R,
) -> AvroResult<Value> {
    decode_internal(graph.root(), graph.names(), types, reader).map_err(|e| {
        match graph.root_record_name() {
            Some(name) => e.at(&name),
            None => e,
        }
    })
}

fn decode_internal<R: Read>(
    schema: &Schema,
    names: &Names,
    types: &TypeRegistry,
    reader: &mut R,
) -> AvroResult<Value> {
    match schema {
        Schema::Ref { name } => {
            let resolved = names
                .get(name)
                .ok_or_else(|| DecodeError::UnresolvedRef(name.fullname(&None)))?;
            decode_internal(resolved, names, types, reader)
        }
        Schema::Null => Ok(Value::Null),
        Schema::Boolean => {
            let mut buf = [0u8; 1];
            read_exact(reader, &mut buf, "boolean")?;
            Ok(Value::Boolean(buf[0] != 0))
        }
        Schema::Int => {
            let i = read_long(reader)?;
            let i = i32::try_from(i).map_err(|_| DecodeError::Overflow("int"))?;
            Ok(Value::Int(i))
        }
        Schema::Long => Ok(Value::Long(read_long(reader)?)),
        Schema::Float => {
            let mut buf = [0u8; 4];
            read_exact(reader, &mut buf, "float")?;
            Ok(Value::Float(f32::from_le_bytes(buf)))
        }
        Schema::Double => {
            let mut buf = [0u8; 8];
            read_exact(reader, &mut buf, "double")?;
            Ok(Value::Double(f64::from_le_bytes(buf)))
        }
        Schema::Bytes => Ok(Value::Bytes(decode_len_prefixed(reader, "bytes")?)),
        Schema::String => {
            let buf = decode_len_prefixed(reader, "string")?;
            String::from_utf8(buf)
                .map(Value::String)
                .map_err(|e| DecodeError::InvalidUtf8(e).into())
        }
        Schema::Fixed(FixedSchema { size, .. }) => {
            let mut buf = vec![0u8; safe_len(*size)?];
            read_exact(reader, &mut buf, "fixed")?;
            Ok(Value::Fixed(*size, buf))
        }
        Schema::Enum(es @ EnumSchema { symbols, .. }) => {
            let ordinal = read_long(reader)?;
            if ordinal < 0 || ordinal as usize >= symbols.len() {
                return Err(DecodeError::EnumOrdinalOutOfRange {
                    ordinal,
                    symbols: symbols.len(),
                }
                .into());
            }
            let etype = types
                .enum_type(&es.name)
                .unwrap_or_else(|| Arc::new(crate::registry::EnumType::from_schema(es)));
            Ok(Value::Enum(EnumSymbol::new(etype, ordinal as u32)?))
        }
        Schema::Array(ArraySchema { items }) => {
            let mut collected = Vec::new();
            while let Some(count) = decode_block_count(reader)? {
                collected.reserve(safe_len(count)?);
                for _ in 0..count {
                    collected.push(decode_internal(items, names, types, reader)?);
                }
            }
            Ok(Value::Array(collected))
        }
        Schema::Map(MapSchema { values }) => {
            let mut collected = HashMap::new();
            while let Some(count) = decode_block_count(reader)? {
                collected.reserve(safe_len(count)?);
                for _ in 0..count {
                    let key = match decode_internal(&Schema::String, names, types, reader)? {
                        Value::String(key) => key,
                        _ => unreachable!("string schema decodes to a string value"),
                    };
                    let value = decode_internal(values, names, types, reader)
                        .map_err(|e| e.at(&key))?;
                    collected.insert(key, value);
                }
            }
            Ok(Value::Map(collected))
        }
        Schema::Record(rs @ RecordSchema { fields, .. }) => {
            let rtype = types
                .record_type(&rs.name)
                .unwrap_or_else(|| Arc::new(crate::registry::RecordType::from_schema(rs)));
            let mut collected = Vec::with_capacity(fields.len());
            for field in fields {
                let value = decode_internal(&field.schema, names, types, reader)
                    .map_err(|e| e.at(&field.name))?;
                collected.push(value);
            }
            Ok(Value::Record(Record::with_fields(rtype, collected)?))
        }
        Schema::Union(UnionSchema { schemas, .. }) => {
            let index = read_long(reader)?;
            let branch = usize::try_from(index)
                .ok()
                .and_then(|i| schemas.get(i))
                .ok_or(DecodeError::UnionIndexOutOfRange {
                    index,
                    branches: schemas.len(),
                })?;
            // The decoded value carries no union marker; callers needing the
            // branch index consult the schema.
            decode_internal(branch, names, types, reader)
        }
    }
}

/// Read a varint length and then that many raw bytes.
fn decode_len_prefixed<R: Read>(reader: &mut R, what: &'static str) -> AvroResult<Vec<u8>> {
    let len = read_long(reader)?;
    if len < 0 {
        return Err(DecodeError::NegativeLength(len).into());
    }
    let mut buf = vec![0u8; safe_len(len as usize)?];
    read_exact(reader, &mut buf, what)?;
    Ok(buf)
}

/// Read the count of the next array/map block.
///
/// Returns `None` on the zero terminator. A negative count means the count
/// is its magnitude, followed by the byte length of the block, which is
/// usable to skip the block on a seekable source; it is read and dropped
/// here.
fn decode_block_count<R: Read>(reader: &mut R) -> AvroResult<Option<usize>> {
    let count = read_long(reader)?;
    if count == 0 {
        return Ok(None);
    }
    let count = if count < 0 {
        let _byte_len = read_long(reader)?;
        count
            .checked_neg()
            .ok_or(DecodeError::Overflow("block count"))?
    } else {
        count
    };
    Ok(Some(count as usize))
}
