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

//! Value-type descriptors derived from named schema nodes.
//!
//! A [`TypeRegistry`] holds one [`RecordType`] / [`EnumType`] per named node
//! of a schema document. Descriptors are immutable, shared via [`Arc`], and
//! reusable across any number of decode calls: a [`Reader`](crate::Reader)
//! handed an existing registry produces values whose descriptors are
//! *identical* (pointer-equal) to the caller's, while a fresh derivation
//! produces equal data under new identities.

use crate::schema::{EnumSchema, Name, RecordSchema, Schema, SchemaGraph};
use std::collections::HashMap;
use std::sync::Arc;

/// The derived descriptor of a named `record` schema: field names in
/// declaration order, each field's schema, and a name-to-position lookup.
#[derive(Debug)]
pub struct RecordType {
    name: Name,
    fields: Vec<(String, Schema)>,
    lookup: HashMap<String, usize>,
}

impl RecordType {
    /// Build a descriptor from explicit parts.
    pub fn new(name: Name, fields: Vec<(String, Schema)>) -> Self {
        let lookup = fields
            .iter()
            .enumerate()
            .map(|(position, (name, _))| (name.clone(), position))
            .collect();
        Self {
            name,
            fields,
            lookup,
        }
    }

    pub(crate) fn from_schema(schema: &RecordSchema) -> Self {
        Self::new(
            schema.name.clone(),
            schema
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.schema.clone()))
                .collect(),
        )
    }

    /// The fully-qualified name of the record schema this was derived from.
    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    /// Field names in declaration order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// The position of a field, by name.
    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.lookup.get(field).copied()
    }

    /// The schema of the field at `position`.
    pub fn field_schema(&self, position: usize) -> Option<&Schema> {
        self.fields.get(position).map(|(_, schema)| schema)
    }

    fn matches(&self, schema: &RecordSchema) -> bool {
        self.name == schema.name
            && self.fields.len() == schema.fields.len()
            && self
                .fields
                .iter()
                .zip(schema.fields.iter())
                .all(|((name, fs), field)| *name == field.name && *fs == field.schema)
    }
}

/// The derived descriptor of a named `enum` schema: the ordered symbol table.
#[derive(Debug)]
pub struct EnumType {
    name: Name,
    symbols: Vec<String>,
    lookup: HashMap<String, u32>,
}

impl EnumType {
    /// Build a descriptor from explicit parts.
    pub fn new(name: Name, symbols: Vec<String>) -> Self {
        let lookup = symbols
            .iter()
            .enumerate()
            .map(|(ordinal, symbol)| (symbol.clone(), ordinal as u32))
            .collect();
        Self {
            name,
            symbols,
            lookup,
        }
    }

    pub(crate) fn from_schema(schema: &EnumSchema) -> Self {
        Self::new(schema.name.clone(), schema.symbols.clone())
    }

    /// The fully-qualified name of the enum schema this was derived from.
    pub fn name(&self) -> &Name {
        &self.name
    }

    pub fn num_symbols(&self) -> usize {
        self.symbols.len()
    }

    /// The ordered symbol table.
    pub fn symbols(&self) -> &[String] {
        &self.symbols
    }

    /// The symbol at `ordinal`.
    ///
    /// # Panics
    /// Panics when `ordinal` is out of range. An
    /// [`EnumSymbol`](crate::types::EnumSymbol) can only be built with an
    /// in-range ordinal, so going through one is always safe.
    pub fn symbol(&self, ordinal: u32) -> &str {
        &self.symbols[ordinal as usize]
    }

    /// The ordinal of `symbol`, if it is in the table.
    pub fn ordinal_of(&self, symbol: &str) -> Option<u32> {
        self.lookup.get(symbol).copied()
    }

    fn matches(&self, schema: &EnumSchema) -> bool {
        self.name == schema.name && self.symbols == schema.symbols
    }
}

/// Return `reuse` unchanged when it was derived from a node identical to
/// `schema`; derive a fresh descriptor otherwise.
pub fn record_type_for(schema: &RecordSchema, reuse: Option<&Arc<RecordType>>) -> Arc<RecordType> {
    match reuse {
        Some(existing) if existing.matches(schema) => existing.clone(),
        _ => Arc::new(RecordType::from_schema(schema)),
    }
}

/// Return `reuse` unchanged when it was derived from a node identical to
/// `schema`; derive a fresh descriptor otherwise.
pub fn enum_type_for(schema: &EnumSchema, reuse: Option<&Arc<EnumType>>) -> Arc<EnumType> {
    match reuse {
        Some(existing) if existing.matches(schema) => existing.clone(),
        _ => Arc::new(EnumType::from_schema(schema)),
    }
}

/// One descriptor per named node of a schema document.
///
/// Cloning a registry is cheap: the descriptors themselves are shared.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    records: HashMap<Name, Arc<RecordType>>,
    enums: HashMap<Name, Arc<EnumType>>,
}

impl TypeRegistry {
    /// Derive descriptors for every named node of `graph`. Descriptors from
    /// `reuse` keep their identity wherever they match the graph's node of
    /// the same name.
    pub(crate) fn derive(graph: &SchemaGraph, reuse: Option<&TypeRegistry>) -> Self {
        let mut records = HashMap::new();
        let mut enums = HashMap::new();
        for (name, schema) in graph.names() {
            match schema {
                Schema::Record(rs) => {
                    let existing = reuse.and_then(|r| r.records.get(name));
                    records.insert(name.clone(), record_type_for(rs, existing));
                }
                Schema::Enum(es) => {
                    let existing = reuse.and_then(|r| r.enums.get(name));
                    enums.insert(name.clone(), enum_type_for(es, existing));
                }
                _ => {}
            }
        }
        Self { records, enums }
    }

    /// The record descriptor for a fully-qualified name.
    pub fn record_type(&self, name: &Name) -> Option<Arc<RecordType>> {
        self.records.get(name).cloned()
    }

    /// The enum descriptor for a fully-qualified name.
    pub fn enum_type(&self, name: &Name) -> Option<Arc<EnumType>> {
        self.enums.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaGraph;
    use pretty_assertions::assert_eq;

    const SCHEMA: &str = r#"
        {
            "type": "record",
            "name": "Shirt",
            "fields": [
                {"name": "size", "type": "int"},
                {"name": "color", "type": {
                    "type": "enum",
                    "name": "Color",
                    "symbols": ["BLUE", "GREEN", "BROWN"]
                }}
            ]
        }
    "#;

    #[test]
    fn test_descriptors_derived_for_named_nodes() {
        let graph = SchemaGraph::parse_str(SCHEMA).unwrap();
        let types = graph.types();
        let shirt = types.record_type(&Name::new("Shirt").unwrap()).unwrap();
        assert_eq!(shirt.num_fields(), 2);
        assert_eq!(shirt.index_of("color"), Some(1));
        let color = types.enum_type(&Name::new("Color").unwrap()).unwrap();
        assert_eq!(color.symbols(), &["BLUE", "GREEN", "BROWN"]);
        assert_eq!(color.ordinal_of("BROWN"), Some(2));
    }

    #[test]
    fn test_reuse_preserves_identity() {
        let graph = SchemaGraph::parse_str(SCHEMA).unwrap();
        let first = graph.types().clone();
        let reused = TypeRegistry::derive(&graph, Some(&first));
        let name = Name::new("Shirt").unwrap();
        assert!(Arc::ptr_eq(
            &first.record_type(&name).unwrap(),
            &reused.record_type(&name).unwrap()
        ));
    }

    #[test]
    fn test_fresh_derivation_makes_new_identity() {
        let graph = SchemaGraph::parse_str(SCHEMA).unwrap();
        let first = graph.types().clone();
        let fresh = TypeRegistry::derive(&graph, None);
        let name = Name::new("Shirt").unwrap();
        assert!(!Arc::ptr_eq(
            &first.record_type(&name).unwrap(),
            &fresh.record_type(&name).unwrap()
        ));
    }

    #[test]
    fn test_mismatched_reuse_is_rederived() {
        let graph = SchemaGraph::parse_str(SCHEMA).unwrap();
        let other = SchemaGraph::parse_str(
            r#"{"type": "record", "name": "Shirt", "fields": [{"name": "size", "type": "long"}]}"#,
        )
        .unwrap();
        let reused = TypeRegistry::derive(&graph, Some(other.types()));
        let name = Name::new("Shirt").unwrap();
        assert!(!Arc::ptr_eq(
            &other.types().record_type(&name).unwrap(),
            &reused.record_type(&name).unwrap()
        ));
        assert_eq!(reused.record_type(&name).unwrap().num_fields(), 2);
    }
}
