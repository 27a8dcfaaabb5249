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

//! Structural validation of values against schemas, without producing bytes.
//!
//! [`validate`] applies exactly the matching and coercion rules of the
//! encoder — the encoder's own union resolution calls into this module — so
//! validation succeeding guarantees the encode will succeed, and both select
//! the same union branch.

use crate::{
    AvroResult,
    error::EncodeError,
    schema::{
        ArraySchema, EnumSchema, FixedSchema, MapSchema, Names, RecordSchema, Schema, SchemaGraph,
        SchemaKind, UnionSchema,
    },
    types::Value,
};

/// Check `value` against the root node of `graph`.
///
/// Returns the union branch index the encoder would select, or `0` when the
/// root is not a union.
pub fn validate(value: &Value, graph: &SchemaGraph) -> AvroResult<u32> {
    validate_internal(value, graph.root(), graph.names()).map_err(|e| {
        let e = match graph.root_record_name() {
            Some(name) => e.at(&name),
            None => e,
        };
        e.into()
    })
}

pub(crate) fn validate_internal(
    value: &Value,
    schema: &Schema,
    names: &Names,
) -> Result<u32, EncodeError> {
    match schema {
        Schema::Ref { name } => {
            let resolved = names
                .get(name)
                .ok_or_else(|| EncodeError::UnresolvedRef(name.fullname(&None)))?;
            validate_internal(value, resolved, names)
        }
        Schema::Union(union) => union_branch(value, union, names),
        Schema::Null => match value {
            Value::Null => Ok(0),
            other => Err(mismatch(schema, other)),
        },
        Schema::Boolean => match value.coerce_boolean() {
            Some(_) => Ok(0),
            None => Err(mismatch(schema, value)),
        },
        Schema::Int => match value.coerce_int() {
            Some(_) => Ok(0),
            None => Err(mismatch(schema, value)),
        },
        Schema::Long => match value.coerce_long() {
            Some(_) => Ok(0),
            None => Err(mismatch(schema, value)),
        },
        Schema::Float => match value.coerce_float() {
            Some(_) => Ok(0),
            None => Err(mismatch(schema, value)),
        },
        Schema::Double => match value.coerce_double() {
            Some(_) => Ok(0),
            None => Err(mismatch(schema, value)),
        },
        Schema::Bytes => match value {
            Value::Bytes(_) => Ok(0),
            other => Err(mismatch(schema, other)),
        },
        Schema::String => match value {
            Value::String(_) => Ok(0),
            other => Err(mismatch(schema, other)),
        },
        Schema::Fixed(FixedSchema { size, .. }) => match value {
            Value::Fixed(_, bytes) | Value::Bytes(bytes) => {
                if bytes.len() == *size {
                    Ok(0)
                } else {
                    Err(EncodeError::FixedSizeMismatch {
                        size: *size,
                        actual: bytes.len(),
                    })
                }
            }
            other => Err(mismatch(schema, other)),
        },
        Schema::Enum(EnumSchema { symbols, .. }) => match value {
            Value::Enum(symbol) => match symbols.iter().position(|s| s == symbol.symbol()) {
                Some(_) => Ok(0),
                None => Err(EncodeError::UnknownEnumSymbol(symbol.symbol().to_string())),
            },
            Value::String(s) => match symbols.iter().position(|item| item == s) {
                Some(_) => Ok(0),
                None => Err(EncodeError::UnknownEnumSymbol(s.clone())),
            },
            Value::Int(_) | Value::Long(_) => {
                let ordinal = value.coerce_long().expect("integral value");
                if ordinal >= 0 && (ordinal as usize) < symbols.len() {
                    Ok(0)
                } else {
                    Err(EncodeError::OrdinalOutOfRange {
                        ordinal,
                        symbols: symbols.len(),
                    })
                }
            }
            other => Err(mismatch(schema, other)),
        },
        Schema::Array(ArraySchema { items }) => match value {
            Value::Array(values) => {
                for item in values {
                    validate_internal(item, items, names)?;
                }
                Ok(0)
            }
            other => Err(mismatch(schema, other)),
        },
        Schema::Map(MapSchema { values }) => match value {
            Value::Map(entries) => {
                for (key, entry) in entries {
                    validate_internal(entry, values, names).map_err(|e| e.at(key))?;
                }
                Ok(0)
            }
            other => Err(mismatch(schema, other)),
        },
        Schema::Record(rs @ RecordSchema { fields, .. }) => match value {
            Value::Record(record) => {
                let rtype = record.record_type();
                if *rtype.name() != rs.name {
                    return Err(EncodeError::RecordNameMismatch {
                        expected: rs.name.fullname(&None),
                        actual: rtype.name().fullname(&None),
                    });
                }
                for field in fields {
                    let value = record.get(&field.name).ok_or_else(|| {
                        EncodeError::MissingField(field.name.clone()).at(&field.name)
                    })?;
                    validate_internal(value, &field.schema, names)
                        .map_err(|e| e.at(&field.name))?;
                }
                Ok(0)
            }
            Value::Map(entries) => {
                for field in fields {
                    let value = entries.get(&field.name).ok_or_else(|| {
                        EncodeError::MissingField(field.name.clone()).at(&field.name)
                    })?;
                    validate_internal(value, &field.schema, names)
                        .map_err(|e| e.at(&field.name))?;
                }
                Ok(0)
            }
            other => Err(mismatch(schema, other)),
        },
    }
}

/// Select the union branch for `value`: the first declared branch the value
/// validates against wins.
pub(crate) fn union_branch(
    value: &Value,
    union: &UnionSchema,
    names: &Names,
) -> Result<u32, EncodeError> {
    for (index, branch) in union.variants().iter().enumerate() {
        if validate_internal(value, branch, names).is_ok() {
            return Ok(index as u32);
        }
    }
    Err(EncodeError::NoMatchingUnionBranch {
        tried: union.variants().iter().map(SchemaKind::from).collect(),
        actual: value.into(),
        value: value.sample(),
    })
}

pub(crate) fn mismatch(schema: &Schema, value: &Value) -> EncodeError {
    EncodeError::TypeMismatch {
        expected: SchemaKind::from(schema),
        actual: value.into(),
        value: value.sample(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn validate_str(value: &Value, schema: &str) -> AvroResult<u32> {
        let graph = SchemaGraph::parse_str(schema).unwrap();
        validate(value, &graph)
    }

    #[test]
    fn test_non_union_success_is_zero() {
        assert_eq!(validate_str(&Value::Long(1), r#""long""#).unwrap(), 0);
        assert_eq!(validate_str(&Value::Int(1), r#""long""#).unwrap(), 0);
    }

    #[test]
    fn test_union_returns_branch_index() {
        let schema = r#"["null", "string", "long"]"#;
        assert_eq!(validate_str(&Value::Null, schema).unwrap(), 0);
        assert_eq!(
            validate_str(&Value::String("x".into()), schema).unwrap(),
            1
        );
        assert_eq!(validate_str(&Value::Long(5), schema).unwrap(), 2);
    }

    #[test]
    fn test_union_first_match_order() {
        // boolean accepts coerced integers and is declared before long, so
        // it wins for any integral value.
        let schema = r#"["null", "boolean", "long"]"#;
        assert_eq!(validate_str(&Value::Long(0), schema).unwrap(), 1);
        assert_eq!(validate_str(&Value::Long(33), schema).unwrap(), 1);
        assert_eq!(validate_str(&Value::Int(12), schema).unwrap(), 1);
    }

    #[test]
    fn test_no_matching_branch() {
        let schema = r#"["null", "long"]"#;
        let err = validate_str(&Value::String("nope".into()), schema).unwrap_err();
        assert!(err.to_string().contains("No union branch"));
    }

    #[test]
    fn test_int_does_not_accept_overflowing_long() {
        assert!(validate_str(&Value::Long(1 << 40), r#""int""#).is_err());
        assert_eq!(validate_str(&Value::Long(7), r#""int""#).unwrap(), 0);
    }

    #[test]
    fn test_no_implicit_stringification() {
        assert!(validate_str(&Value::Long(1), r#""string""#).is_err());
        assert!(validate_str(&Value::String("x".into()), r#""bytes""#).is_err());
        assert!(validate_str(&Value::Bytes(vec![1]), r#""string""#).is_err());
    }

    #[test]
    fn test_map_accepted_for_record() {
        let schema = r#"
            {
                "type": "record",
                "name": "R",
                "fields": [{"name": "a", "type": "int"}]
            }
        "#;
        let value = Value::Map(std::collections::HashMap::from([(
            "a".to_string(),
            Value::Int(1),
        )]));
        assert_eq!(validate_str(&value, schema).unwrap(), 0);

        let missing = Value::Map(std::collections::HashMap::new());
        let err = validate_str(&missing, schema).unwrap_err();
        assert_eq!(err.to_string(), "R.a: Missing field in record: a");
    }
}
