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

use crate::error::ParseError;
use crate::schema::{
    ArraySchema, EnumSchema, FixedSchema, MapSchema, Name, Names, Namespace, RecordField,
    RecordSchema, Schema, UnionSchema,
    name::{validate_enum_symbol_name, validate_record_field_name},
};
use crate::util::MapHelper;
use crate::AvroResult;
use log::{debug, warn};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Builds [`Schema`] nodes out of a JSON schema tree, one document at a time.
///
/// Named types register a placeholder in `resolving_schemas` when their
/// construction starts, so that references from inside their own body
/// (direct or mutual recursion) resolve; the finished definition is moved to
/// `parsed_schemas` when construction completes.
#[derive(Default)]
pub(crate) struct Parser {
    /// Placeholders for named types whose bodies are being parsed right now.
    resolving_schemas: Names,
    /// Completed definitions, keyed by fully-qualified name.
    parsed_schemas: Names,
}

impl Parser {
    /// The fullname-to-definition table, consumed once the document has been
    /// parsed.
    pub(crate) fn into_names(self) -> Names {
        self.parsed_schemas
    }

    /// Create a `Schema` from a `serde_json::Value` node of the schema tree.
    pub(crate) fn parse(
        &mut self,
        value: &Value,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        match *value {
            Value::String(ref t) => self.parse_known_schema(t.as_str(), enclosing_namespace),
            Value::Object(ref data) => self.parse_complex(data, enclosing_namespace),
            Value::Array(ref data) => self.parse_union(data, enclosing_namespace),
            ref other => Err(ParseError::MalformedNode(format!(
                "must be a JSON string, object or array: {other}"
            ))
            .into()),
        }
    }

    /// Parse a string as a primitive type or a reference to a named type.
    fn parse_known_schema(
        &mut self,
        name: &str,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        match name {
            "null" => Ok(Schema::Null),
            "boolean" => Ok(Schema::Boolean),
            "int" => Ok(Schema::Int),
            "long" => Ok(Schema::Long),
            "double" => Ok(Schema::Double),
            "float" => Ok(Schema::Float),
            "bytes" => Ok(Schema::Bytes),
            "string" => Ok(Schema::String),
            _ => self.fetch_schema_ref(name, enclosing_namespace),
        }
    }

    /// Resolve a reference to a named type against the definitions seen so
    /// far, including types whose bodies are still being parsed.
    fn fetch_schema_ref(
        &mut self,
        name: &str,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        let fully_qualified_name = Name::new_with_enclosing_namespace(name, enclosing_namespace)?;

        if self.parsed_schemas.contains_key(&fully_qualified_name)
            || self.resolving_schemas.contains_key(&fully_qualified_name)
        {
            return Ok(Schema::Ref {
                name: fully_qualified_name,
            });
        }

        Err(ParseError::UnknownName(fully_qualified_name.fullname(&None)).into())
    }

    /// Parse a JSON object representing a complex type into a `Schema`.
    fn parse_complex(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        match complex.get("type") {
            Some(Value::String(t)) => match t.as_str() {
                "record" => self.parse_record(complex, enclosing_namespace),
                "enum" => self.parse_enum(complex, enclosing_namespace),
                "array" => self.parse_array(complex, enclosing_namespace),
                "map" => self.parse_map(complex, enclosing_namespace),
                "fixed" => self.parse_fixed(complex, enclosing_namespace),
                other => self.parse_known_schema(other, enclosing_namespace),
            },
            Some(Value::Object(data)) => self.parse_complex(data, enclosing_namespace),
            Some(Value::Array(variants)) => self.parse_union(variants, enclosing_namespace),
            Some(unknown) => Err(ParseError::MalformedNode(format!(
                "`type` must be a string, object or array: {unknown}"
            ))
            .into()),
            None => {
                Err(ParseError::MalformedNode("no `type` field in schema object".to_string())
                    .into())
            }
        }
    }

    /// Reserve a fullname and install a placeholder so the type's own body
    /// can refer back to it.
    fn register_resolving_schema(&mut self, name: &Name) -> AvroResult<()> {
        if self.parsed_schemas.contains_key(name) || self.resolving_schemas.contains_key(name) {
            return Err(ParseError::DuplicateName(name.fullname(&None)).into());
        }
        self.resolving_schemas
            .insert(name.clone(), Schema::Ref { name: name.clone() });
        Ok(())
    }

    /// Replace the placeholder with the completed definition.
    fn register_parsed_schema(&mut self, fully_qualified_name: &Name, schema: &Schema) {
        self.resolving_schemas.remove(fully_qualified_name);
        self.parsed_schemas
            .insert(fully_qualified_name.clone(), schema.clone());
    }

    /// Parse a JSON object representing a record type into a `Schema`.
    fn parse_record(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        let fully_qualified_name = Name::parse(complex, enclosing_namespace)?;
        self.register_resolving_schema(&fully_qualified_name)?;

        debug!("Going to parse record schema: {fully_qualified_name}");

        let record_namespace = fully_qualified_name.namespace.clone();
        let fields_json = complex
            .get("fields")
            .and_then(|fields| fields.as_array())
            .ok_or_else(|| {
                ParseError::MalformedNode(format!(
                    "no `fields` array in record {fully_qualified_name}"
                ))
            })?;

        let mut fields: Vec<RecordField> = Vec::with_capacity(fields_json.len());
        let mut seen_names: HashSet<String> = HashSet::with_capacity(fields_json.len());
        for (position, field) in fields_json.iter().enumerate() {
            let field = field.as_object().ok_or_else(|| {
                ParseError::MalformedNode(format!(
                    "field {position} of record {fully_qualified_name} is not an object"
                ))
            })?;
            let field = self.parse_field(field, position, &record_namespace)?;
            if !seen_names.insert(field.name.clone()) {
                return Err(ParseError::MalformedNode(format!(
                    "duplicate field `{}` in record {fully_qualified_name}",
                    field.name
                ))
                .into());
            }
            fields.push(field);
        }

        let schema = Schema::Record(RecordSchema {
            name: fully_qualified_name.clone(),
            doc: complex.doc(),
            fields,
        });

        self.register_parsed_schema(&fully_qualified_name, &schema);
        Ok(schema)
    }

    /// Parse a JSON object representing a record field.
    ///
    /// The field object doubles as a complex type node: its `type` key may
    /// hold a primitive name, a reference, an inline definition or a union.
    fn parse_field(
        &mut self,
        field: &Map<String, Value>,
        position: usize,
        record_namespace: &Namespace,
    ) -> AvroResult<RecordField> {
        let name = field
            .name()
            .ok_or_else(|| ParseError::MalformedNode("no `name` in record field".to_string()))?;
        validate_record_field_name(&name)?;

        let schema = self.parse_complex(field, record_namespace)?;
        let default = field.get("default").cloned();

        Ok(RecordField {
            name,
            doc: field.doc(),
            default,
            schema,
            position,
        })
    }

    /// Parse a JSON object representing an enum type into a `Schema`.
    fn parse_enum(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        let fully_qualified_name = Name::parse(complex, enclosing_namespace)?;

        let symbols: Vec<String> = complex
            .get("symbols")
            .and_then(|v| v.as_array())
            .ok_or_else(|| {
                ParseError::MalformedNode(format!(
                    "no `symbols` array in enum {fully_qualified_name}"
                ))
            })
            .and_then(|symbols| {
                symbols
                    .iter()
                    .map(|symbol| symbol.as_str().map(|s| s.to_string()))
                    .collect::<Option<_>>()
                    .ok_or_else(|| {
                        ParseError::MalformedNode(format!(
                            "enum {fully_qualified_name} symbols must be strings"
                        ))
                    })
            })?;

        let mut existing_symbols: HashSet<&String> = HashSet::with_capacity(symbols.len());
        for symbol in symbols.iter() {
            validate_enum_symbol_name(symbol)?;

            if !existing_symbols.insert(symbol) {
                return Err(ParseError::MalformedNode(format!(
                    "duplicate symbol `{symbol}` in enum {fully_qualified_name}"
                ))
                .into());
            }
        }

        let schema = Schema::Enum(EnumSchema {
            name: fully_qualified_name.clone(),
            doc: complex.doc(),
            symbols,
        });

        self.register_resolving_schema(&fully_qualified_name)?;
        self.register_parsed_schema(&fully_qualified_name, &schema);

        Ok(schema)
    }

    /// Parse a JSON object representing an array type into a `Schema`.
    fn parse_array(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        complex
            .get("items")
            .ok_or_else(|| ParseError::MalformedNode("no `items` in array".to_string()).into())
            .and_then(|items| self.parse(items, enclosing_namespace))
            .map(|items| {
                Schema::Array(ArraySchema {
                    items: Box::new(items),
                })
            })
    }

    /// Parse a JSON object representing a map type into a `Schema`.
    fn parse_map(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        complex
            .get("values")
            .ok_or_else(|| ParseError::MalformedNode("no `values` in map".to_string()).into())
            .and_then(|values| self.parse(values, enclosing_namespace))
            .map(|values| {
                Schema::Map(MapSchema {
                    values: Box::new(values),
                })
            })
    }

    /// Parse a JSON array of variants representing a union type.
    fn parse_union(
        &mut self,
        items: &[Value],
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        items
            .iter()
            .map(|v| self.parse(v, enclosing_namespace))
            .collect::<Result<Vec<_>, _>>()
            .and_then(|schemas| {
                if schemas.len() < 2 {
                    warn!(
                        "Union schema with {} member(s)! Consider dropping the union.",
                        schemas.len()
                    );
                }
                Ok(Schema::Union(UnionSchema::new(schemas)?))
            })
    }

    /// Parse a JSON object representing a fixed type into a `Schema`.
    fn parse_fixed(
        &mut self,
        complex: &Map<String, Value>,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Schema> {
        let fully_qualified_name = Name::parse(complex, enclosing_namespace)?;

        let size = match complex.get("size") {
            Some(size) => size.as_u64().ok_or_else(|| {
                ParseError::MalformedNode(format!(
                    "`size` of fixed {fully_qualified_name} must be a positive integer: {size}"
                ))
            }),
            None => Err(ParseError::MalformedNode(format!(
                "no `size` in fixed {fully_qualified_name}"
            ))),
        }?;

        let schema = Schema::Fixed(FixedSchema {
            name: fully_qualified_name.clone(),
            doc: complex.doc(),
            size: size as usize,
        });

        self.register_resolving_schema(&fully_qualified_name)?;
        self.register_parsed_schema(&fully_qualified_name, &schema);

        Ok(schema)
    }
}
