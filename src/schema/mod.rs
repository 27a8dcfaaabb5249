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

//! Logic for parsing and interacting with schemas.
//!
//! A schema document is parsed into a [`SchemaGraph`]: the root [`Schema`]
//! node plus a table mapping every fully-qualified name to its single
//! definition. References to named types (including recursive ones) parse to
//! lightweight [`Schema::Ref`] nodes that resolve through that table, so a
//! name is defined exactly once no matter how often it is used.

mod name;
mod parser;
mod union;

pub use crate::schema::{
    name::{Name, Names, Namespace},
    union::UnionSchema,
};
use crate::{
    AvroResult,
    error::ParseError,
    registry::TypeRegistry,
    schema::parser::Parser,
};
use serde::{Serialize, Serializer, ser::SerializeMap, ser::SerializeSeq};
use serde_json::Value as JsonValue;
use std::fmt;
use std::sync::OnceLock;
use strum::EnumDiscriminants;

/// Represents documentation for complex schemas.
pub type Documentation = Option<String>;

/// Represents any valid schema node.
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(SchemaKind), derive(Hash, Ord, PartialOrd))]
pub enum Schema {
    /// A `null` schema.
    Null,
    /// A `boolean` schema.
    Boolean,
    /// An `int` (32-bit signed) schema.
    Int,
    /// A `long` (64-bit signed) schema.
    Long,
    /// A `float` (single precision) schema.
    Float,
    /// A `double` (double precision) schema.
    Double,
    /// A `bytes` schema, a sequence of 8-bit unsigned bytes.
    Bytes,
    /// A `string` schema, a unicode character sequence.
    String,
    /// An `array` schema. All items have the same schema.
    Array(ArraySchema),
    /// A `map` schema. Keys are strings and all values have the same schema.
    Map(MapSchema),
    /// A `union` schema.
    Union(UnionSchema),
    /// A `record` schema.
    Record(RecordSchema),
    /// An `enum` schema.
    Enum(EnumSchema),
    /// A `fixed` schema: a fixed number of raw bytes.
    Fixed(FixedSchema),
    /// A reference to a named schema defined elsewhere in the same document.
    Ref { name: Name },
}

#[derive(Clone, Debug, PartialEq)]
pub struct ArraySchema {
    pub items: Box<Schema>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct MapSchema {
    pub values: Box<Schema>,
}

/// A description of an enum schema.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    /// The fully-qualified name of the schema.
    pub name: Name,
    /// The documentation of the schema.
    pub doc: Documentation,
    /// The ordered symbol table. Ordinals are positions in this list.
    pub symbols: Vec<String>,
}

/// A description of a fixed schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedSchema {
    /// The fully-qualified name of the schema.
    pub name: Name,
    /// The documentation of the schema.
    pub doc: Documentation,
    /// The exact number of bytes of every value of this schema.
    pub size: usize,
}

/// A description of a record schema.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// The fully-qualified name of the schema.
    pub name: Name,
    /// The documentation of the schema.
    pub doc: Documentation,
    /// The fields of the record, in declaration order.
    ///
    /// This order is load-bearing: values encode and decode field by field
    /// in exactly this order.
    pub fields: Vec<RecordField>,
}

/// Represents a `field` in a `record` schema.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordField {
    /// Name of the field.
    pub name: String,
    /// Documentation of the field.
    pub doc: Documentation,
    /// Default value of the field, kept verbatim as parsed.
    ///
    /// The codec does not interpret defaults; they are carried for callers.
    pub default: Option<JsonValue>,
    /// Schema of the field.
    pub schema: Schema,
    /// Position of the field in the list of fields of its record.
    pub position: usize,
}

impl Schema {
    /// Returns true for the named kinds: `record`, `enum`, `fixed` and
    /// references to them.
    pub fn is_named(&self) -> bool {
        matches!(
            self,
            Schema::Record(_) | Schema::Enum(_) | Schema::Fixed(_) | Schema::Ref { .. }
        )
    }

    /// The fully-qualified name of a named schema, if it has one.
    pub fn name(&self) -> Option<&Name> {
        match self {
            Schema::Record(RecordSchema { name, .. })
            | Schema::Enum(EnumSchema { name, .. })
            | Schema::Fixed(FixedSchema { name, .. })
            | Schema::Ref { name } => Some(name),
            _ => None,
        }
    }
}

impl SchemaKind {
    pub fn is_primitive(self) -> bool {
        matches!(
            self,
            SchemaKind::Null
                | SchemaKind::Boolean
                | SchemaKind::Int
                | SchemaKind::Long
                | SchemaKind::Double
                | SchemaKind::Float
                | SchemaKind::Bytes
                | SchemaKind::String,
        )
    }
}

/// A parsed schema document: the root node plus the table of every named
/// type defined in it.
///
/// Immutable once built; safe to share across threads and across any number
/// of encode/decode calls.
#[derive(Debug)]
pub struct SchemaGraph {
    root: Schema,
    names: Names,
    types: OnceLock<TypeRegistry>,
}

impl SchemaGraph {
    /// Parse a schema from an already-parsed JSON tree.
    pub fn parse(value: &JsonValue) -> AvroResult<Self> {
        let mut parser = Parser::default();
        let root = parser.parse(value, &None)?;
        Ok(Self {
            root,
            names: parser.into_names(),
            types: OnceLock::new(),
        })
    }

    /// Parse a schema from a JSON string.
    pub fn parse_str(input: &str) -> AvroResult<Self> {
        let value = serde_json::from_str(input).map_err(ParseError::ParseSchemaJson)?;
        Self::parse(&value)
    }

    /// The root node of the document.
    pub fn root(&self) -> &Schema {
        &self.root
    }

    /// The fullname-to-definition table of the document.
    pub fn names(&self) -> &Names {
        &self.names
    }

    /// The value-type descriptors derived from this document, built on first
    /// use.
    pub fn types(&self) -> &TypeRegistry {
        self.types.get_or_init(|| TypeRegistry::derive(self, None))
    }

    /// Serialize the schema back to its JSON text, as embedded in container
    /// file headers.
    pub fn json(&self) -> AvroResult<String> {
        serde_json::to_string(&self.root)
            .map_err(|e| ParseError::SerializeSchemaJson(e).into())
    }

    /// Look up a named definition, following a `Ref` if needed.
    pub(crate) fn lookup<'s>(&'s self, schema: &'s Schema) -> Option<&'s Schema> {
        match schema {
            Schema::Ref { name } => self.names.get(name),
            other => Some(other),
        }
    }

    /// The fullname of the root node when it is (or refers to) a record.
    ///
    /// Used to prefix field paths in error messages, e.g. `Rec1.attr1`.
    pub(crate) fn root_record_name(&self) -> Option<String> {
        match self.lookup(&self.root) {
            Some(Schema::Record(RecordSchema { name, .. })) => Some(name.fullname(&None)),
            _ => None,
        }
    }
}

/// The string-to-bytes map schema of the container file header metadata.
pub(crate) fn metadata_schema() -> Schema {
    Schema::Map(MapSchema {
        values: Box::new(Schema::Bytes),
    })
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string(self) {
            Ok(json) => f.write_str(&json),
            Err(_) => Err(fmt::Error),
        }
    }
}

impl Serialize for Schema {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Schema::Null => serializer.serialize_str("null"),
            Schema::Boolean => serializer.serialize_str("boolean"),
            Schema::Int => serializer.serialize_str("int"),
            Schema::Long => serializer.serialize_str("long"),
            Schema::Float => serializer.serialize_str("float"),
            Schema::Double => serializer.serialize_str("double"),
            Schema::Bytes => serializer.serialize_str("bytes"),
            Schema::String => serializer.serialize_str("string"),
            Schema::Array(inner) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "array")?;
                map.serialize_entry("items", &*inner.items)?;
                map.end()
            }
            Schema::Map(inner) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("type", "map")?;
                map.serialize_entry("values", &*inner.values)?;
                map.end()
            }
            Schema::Union(inner) => {
                let variants = inner.variants();
                let mut seq = serializer.serialize_seq(Some(variants.len()))?;
                for v in variants {
                    seq.serialize_element(v)?;
                }
                seq.end()
            }
            Schema::Record(RecordSchema {
                name, doc, fields, ..
            }) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "record")?;
                if let Some(ref n) = name.namespace {
                    map.serialize_entry("namespace", n)?;
                }
                map.serialize_entry("name", &name.name)?;
                if let Some(ref docstr) = doc {
                    map.serialize_entry("doc", docstr)?;
                }
                map.serialize_entry("fields", fields)?;
                map.end()
            }
            Schema::Enum(EnumSchema { name, doc, symbols }) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "enum")?;
                if let Some(ref n) = name.namespace {
                    map.serialize_entry("namespace", n)?;
                }
                map.serialize_entry("name", &name.name)?;
                if let Some(ref docstr) = doc {
                    map.serialize_entry("doc", docstr)?;
                }
                map.serialize_entry("symbols", symbols)?;
                map.end()
            }
            Schema::Fixed(FixedSchema { name, doc, size }) => {
                let mut map = serializer.serialize_map(None)?;
                map.serialize_entry("type", "fixed")?;
                if let Some(ref n) = name.namespace {
                    map.serialize_entry("namespace", n)?;
                }
                map.serialize_entry("name", &name.name)?;
                if let Some(ref docstr) = doc {
                    map.serialize_entry("doc", docstr)?;
                }
                map.serialize_entry("size", size)?;
                map.end()
            }
            Schema::Ref { name } => serializer.serialize_str(&name.fullname(&None)),
        }
    }
}

impl Serialize for RecordField {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(None)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("type", &self.schema)?;
        if let Some(ref default) = self.default {
            map.serialize_entry("default", default)?;
        }
        map.end()
    }
}
