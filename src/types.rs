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

//! The generic value model produced by decoding and accepted for encoding.
//!
//! [`Value`] mirrors the schema kinds. Records and enums carry a shared
//! descriptor ([`RecordType`] / [`EnumType`], see [`crate::registry`]) that
//! supplies field names and symbol tables, which keeps values compact while
//! still printable and comparable.

use crate::{
    AvroResult,
    error::EncodeError,
    registry::{EnumType, RecordType},
};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use strum::EnumDiscriminants;

/// Represents any valid value.
#[derive(Clone, Debug, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(ValueKind), derive(Hash, Ord, PartialOrd))]
pub enum Value {
    /// A `null` value.
    Null,
    /// A `boolean` value.
    Boolean(bool),
    /// An `int` value.
    Int(i32),
    /// A `long` value.
    Long(i64),
    /// A `float` value.
    Float(f32),
    /// A `double` value.
    Double(f64),
    /// A `bytes` value.
    Bytes(Vec<u8>),
    /// A `string` value.
    String(String),
    /// A `fixed` value: the declared size and exactly that many bytes.
    Fixed(usize, Vec<u8>),
    /// An `array` of values, all of the same schema.
    Array(Vec<Value>),
    /// A `map` of string keys to values of the same schema.
    Map(HashMap<String, Value>),
    /// A `record` with its type descriptor and field values in declaration
    /// order.
    Record(Record),
    /// An `enum` symbol.
    Enum(EnumSymbol),
}

/// A record value: field values in declaration order plus a shared
/// back-reference to the [`RecordType`] that names and orders them.
#[derive(Clone, Debug)]
pub struct Record {
    rtype: Arc<RecordType>,
    fields: Vec<Value>,
}

impl Record {
    /// Create a new `Record` with every field set to [`Value::Null`].
    pub fn new(rtype: Arc<RecordType>) -> Self {
        let fields = vec![Value::Null; rtype.num_fields()];
        Self { rtype, fields }
    }

    /// Create a `Record` from field values given positionally, in schema
    /// declaration order.
    pub fn with_fields(rtype: Arc<RecordType>, fields: Vec<Value>) -> AvroResult<Self> {
        if fields.len() != rtype.num_fields() {
            return Err(EncodeError::ArityMismatch {
                expected: rtype.num_fields(),
                actual: fields.len(),
            }
            .into());
        }
        Ok(Self { rtype, fields })
    }

    /// The descriptor this record was built from.
    pub fn record_type(&self) -> &Arc<RecordType> {
        &self.rtype
    }

    /// The field values, in declaration order.
    pub fn fields(&self) -> &[Value] {
        &self.fields
    }

    /// Set the value of a field by name.
    ///
    /// A name the descriptor does not know is ignored.
    pub fn put<V: Into<Value>>(&mut self, field: &str, value: V) {
        if let Some(position) = self.rtype.index_of(field) {
            self.fields[position] = value.into();
        }
    }

    /// Get the value of a field by name.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.rtype.index_of(field).map(|p| &self.fields[p])
    }

    /// Iterate `(field name, value)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.rtype
            .field_names()
            .zip(self.fields.iter())
    }
}

/// Two records are equal when they describe the same record type name and
/// hold field-for-field equal data. Descriptor *identity* is deliberately
/// ignored: a record read back with a fresh [`RecordType`] derivation still
/// compares equal to the one that was written.
impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.rtype.name() == other.rtype.name()
            && self.rtype.field_names().eq(other.rtype.field_names())
            && self.fields == other.fields
    }
}

/// An enum value: an ordinal into the symbol table of a shared [`EnumType`].
#[derive(Clone, Debug)]
pub struct EnumSymbol {
    etype: Arc<EnumType>,
    ordinal: u32,
}

impl EnumSymbol {
    /// Create an `EnumSymbol` from an ordinal.
    pub fn new(etype: Arc<EnumType>, ordinal: u32) -> AvroResult<Self> {
        if (ordinal as usize) < etype.num_symbols() {
            Ok(Self { etype, ordinal })
        } else {
            Err(EncodeError::OrdinalOutOfRange {
                ordinal: ordinal as i64,
                symbols: etype.num_symbols(),
            }
            .into())
        }
    }

    /// Create an `EnumSymbol` from a symbol name.
    pub fn from_symbol(etype: Arc<EnumType>, symbol: &str) -> AvroResult<Self> {
        match etype.ordinal_of(symbol) {
            Some(ordinal) => Ok(Self { etype, ordinal }),
            None => Err(EncodeError::UnknownEnumSymbol(symbol.to_string()).into()),
        }
    }

    /// The descriptor this symbol belongs to.
    pub fn enum_type(&self) -> &Arc<EnumType> {
        &self.etype
    }

    /// The position of this symbol in the enum's symbol table.
    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    /// The string form of this symbol.
    pub fn symbol(&self) -> &str {
        self.etype.symbol(self.ordinal)
    }
}

// Equality, ordering and hashing are by ordinal only, so an `EnumSymbol` is
// usable as a mapping key regardless of which derivation of the descriptor
// it carries.
impl PartialEq for EnumSymbol {
    fn eq(&self, other: &Self) -> bool {
        self.ordinal == other.ordinal
    }
}

impl Eq for EnumSymbol {}

impl PartialOrd for EnumSymbol {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EnumSymbol {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ordinal.cmp(&other.ordinal)
    }
}

impl Hash for EnumSymbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ordinal.hash(state);
    }
}

impl Value {
    /// A boolean, from a boolean or an integral value (zero is false,
    /// anything else is true).
    pub(crate) fn coerce_boolean(&self) -> Option<bool> {
        match *self {
            Value::Boolean(b) => Some(b),
            Value::Int(i) => Some(i != 0),
            Value::Long(i) => Some(i != 0),
            _ => None,
        }
    }

    /// An i32, from an int or a long that fits. Never narrows silently.
    pub(crate) fn coerce_int(&self) -> Option<i32> {
        match *self {
            Value::Int(i) => Some(i),
            Value::Long(i) => i32::try_from(i).ok(),
            _ => None,
        }
    }

    /// An i64, from any integral value (widening).
    pub(crate) fn coerce_long(&self) -> Option<i64> {
        match *self {
            Value::Int(i) => Some(i as i64),
            Value::Long(i) => Some(i),
            _ => None,
        }
    }

    /// An f32, from a float or an integral value.
    pub(crate) fn coerce_float(&self) -> Option<f32> {
        match *self {
            Value::Float(x) => Some(x),
            Value::Int(i) => Some(i as f32),
            Value::Long(i) => Some(i as f32),
            _ => None,
        }
    }

    /// An f64, from a double, a float or an integral value.
    pub(crate) fn coerce_double(&self) -> Option<f64> {
        match *self {
            Value::Double(x) => Some(x),
            Value::Float(x) => Some(x as f64),
            Value::Int(i) => Some(i as f64),
            Value::Long(i) => Some(i as f64),
            _ => None,
        }
    }

    /// A short, single-line rendering used in error messages.
    pub(crate) fn sample(&self) -> String {
        const MAX: usize = 64;
        let mut s = self.format(&FormatOptions::default());
        if s.len() > MAX {
            let mut end = MAX;
            while !s.is_char_boundary(end) {
                end -= 1;
            }
            s.truncate(end);
            s.push_str("..");
        }
        s
    }

    /// Render this value as a string, under the given formatting strategy.
    pub fn format(&self, options: &FormatOptions) -> String {
        let mut out = String::new();
        self.write_to(&mut out, options);
        out
    }

    fn write_to(&self, out: &mut String, options: &FormatOptions) {
        use std::fmt::Write;
        match self {
            Value::Null => out.push_str("null"),
            Value::Boolean(b) => {
                let _ = write!(out, "{b}");
            }
            Value::Int(i) => {
                let _ = write!(out, "{i}");
            }
            Value::Long(i) => {
                let _ = write!(out, "{i}");
            }
            Value::Float(x) => {
                let _ = write!(out, "{x}");
            }
            Value::Double(x) => {
                let _ = write!(out, "{x}");
            }
            Value::Bytes(bytes) | Value::Fixed(_, bytes) => {
                let _ = write!(out, "{bytes:?}");
            }
            Value::String(s) => {
                let _ = write!(out, "{s:?}");
            }
            Value::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_to(out, options);
                }
                out.push(']');
            }
            Value::Map(items) => {
                let mut keys: Vec<&String> = items.keys().collect();
                keys.sort();
                out.push('{');
                for (i, key) in keys.into_iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{key:?}: ");
                    items[key].write_to(out, options);
                }
                out.push('}');
            }
            Value::Record(record) => {
                let _ = write!(out, "{}(", record.record_type().name());
                for (i, (name, value)) in record.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{name}=");
                    value.write_to(out, options);
                }
                out.push(')');
            }
            Value::Enum(symbol) => {
                if options.enums_as_ordinals {
                    let _ = write!(out, "{}", symbol.ordinal());
                } else {
                    out.push_str(symbol.symbol());
                }
            }
        }
    }
}

/// Formatting strategy for [`Value::format`].
///
/// An explicit parameter rather than process-wide state: two callers can
/// print the same values differently without affecting each other.
#[derive(Clone, Copy, Debug, Default)]
pub struct FormatOptions {
    /// Print enum values as their ordinal instead of their symbol.
    pub enums_as_ordinals: bool,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(&FormatOptions::default()))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Value::Record(self.clone()).format(&FormatOptions::default()))
    }
}

impl fmt::Display for EnumSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Self::Null
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Self::Bytes(value.to_vec())
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Self::Record(value)
    }
}

impl From<EnumSymbol> for Value {
    fn from(value: EnumSymbol) -> Self {
        Self::Enum(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

impl<K: Into<String>, V: Into<Value>> From<HashMap<K, V>> for Value {
    fn from(value: HashMap<K, V>) -> Self {
        Self::Map(
            value
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{EnumType, RecordType};
    use crate::schema::{Name, Schema, SchemaGraph};
    use pretty_assertions::assert_eq;

    fn color_type() -> Arc<EnumType> {
        Arc::new(EnumType::new(
            Name::new("Color").unwrap(),
            vec![
                "BLUE".to_string(),
                "GREEN".to_string(),
                "BROWN".to_string(),
            ],
        ))
    }

    #[test]
    fn test_enum_symbol_by_ordinal_and_name() {
        let etype = color_type();
        let brown = EnumSymbol::from_symbol(etype.clone(), "BROWN").unwrap();
        assert_eq!(brown.ordinal(), 2);
        assert_eq!(brown.symbol(), "BROWN");
        assert_eq!(brown, EnumSymbol::new(etype.clone(), 2).unwrap());
        assert!(EnumSymbol::new(etype.clone(), 3).is_err());
        assert!(EnumSymbol::from_symbol(etype, "PINK").is_err());
    }

    #[test]
    fn test_enum_symbol_as_map_key() {
        let etype = color_type();
        let mut counts: HashMap<EnumSymbol, usize> = HashMap::new();
        counts.insert(EnumSymbol::new(etype.clone(), 0).unwrap(), 7);
        counts.insert(EnumSymbol::new(etype.clone(), 1).unwrap(), 9);
        assert_eq!(counts[&EnumSymbol::new(etype, 0).unwrap()], 7);
    }

    #[test]
    fn test_record_put_and_get() {
        let rtype = Arc::new(RecordType::new(
            Name::new("Point").unwrap(),
            vec![
                ("x".to_string(), Schema::Int),
                ("y".to_string(), Schema::Int),
            ],
        ));
        let mut record = Record::new(rtype);
        record.put("x", 3);
        record.put("y", 4);
        record.put("z", 5); // unknown, ignored
        assert_eq!(record.get("x"), Some(&Value::Int(3)));
        assert_eq!(record.get("y"), Some(&Value::Int(4)));
        assert_eq!(record.get("z"), None);
        assert_eq!(record.fields(), &[Value::Int(3), Value::Int(4)]);
    }

    #[test]
    fn test_record_positional_arity_checked() {
        let rtype = Arc::new(RecordType::new(
            Name::new("Point").unwrap(),
            vec![
                ("x".to_string(), Schema::Int),
                ("y".to_string(), Schema::Int),
            ],
        ));
        assert!(Record::with_fields(rtype.clone(), vec![Value::Int(1)]).is_err());
        assert!(Record::with_fields(rtype, vec![Value::Int(1), Value::Int(2)]).is_ok());
    }

    #[test]
    fn test_record_equality_ignores_descriptor_identity() {
        let graph = SchemaGraph::parse_str(
            r#"{"type": "record", "name": "P", "fields": [{"name": "x", "type": "int"}]}"#,
        )
        .unwrap();
        let a = graph.types().record_type(&Name::new("P").unwrap()).unwrap();
        // A second derivation of the same node: new identity, equal data.
        let b = Arc::new(RecordType::new(
            Name::new("P").unwrap(),
            vec![("x".to_string(), Schema::Int)],
        ));
        assert!(!Arc::ptr_eq(&a, &b));
        let ra = Record::with_fields(a, vec![Value::Int(1)]).unwrap();
        let rb = Record::with_fields(b, vec![Value::Int(1)]).unwrap();
        assert_eq!(ra, rb);
    }

    #[test]
    fn test_format_record_and_enum() {
        let rtype = Arc::new(RecordType::new(
            Name::new("Pair").unwrap(),
            vec![
                ("name".to_string(), Schema::String),
                ("color".to_string(), Schema::Null),
            ],
        ));
        let mut record = Record::new(rtype);
        record.put("name", "ball");
        record.put(
            "color",
            EnumSymbol::from_symbol(color_type(), "GREEN").unwrap(),
        );
        let value = Value::Record(record);
        assert_eq!(value.to_string(), "Pair(name=\"ball\", color=GREEN)");
        assert_eq!(
            value.format(&FormatOptions {
                enums_as_ordinals: true
            }),
            "Pair(name=\"ball\", color=1)"
        );
    }
}
