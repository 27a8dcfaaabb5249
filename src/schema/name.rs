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

use crate::{AvroResult, error::ParseError, schema::Schema, util::MapHelper};
use regex_lite::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::OnceLock;

/// Represents names for `record`, `enum` and `fixed` schemas.
///
/// Each of these schemas has a `fullname` composed of a name and an optional
/// namespace. A nested named type inherits the namespace of the enclosing
/// record unless it declares its own.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct Name {
    /// The name part of the fullname.
    pub name: String,
    /// The optional namespace part of the fullname.
    pub namespace: Namespace,
}

/// Represents the namespace of a named schema.
pub type Namespace = Option<String>;
/// Represents schema lookup within a schema document: fullname to definition.
pub type Names = HashMap<Name, Schema>;

impl Name {
    /// Create a new `Name`, parsing the optional namespace out of the string.
    pub fn new(name: &str) -> AvroResult<Self> {
        Self::new_with_enclosing_namespace(name, &None)
    }

    /// Create a new `Name` using `enclosing_namespace` when `name` does not
    /// carry its own.
    pub fn new_with_enclosing_namespace(
        name: &str,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Self> {
        let index_of_name = validate_schema_name(name)?;

        if index_of_name == 0 {
            let namespace = enclosing_namespace.as_deref().filter(|ns| !ns.is_empty());
            if let Some(ns) = namespace {
                validate_namespace(ns)?;
            }
            Ok(Self {
                name: name.to_string(),
                namespace: namespace.map(str::to_string),
            })
        } else {
            Ok(Self {
                name: name[index_of_name..].to_string(),
                namespace: Some(name[..index_of_name - 1].to_string()).filter(|ns| !ns.is_empty()),
            })
        }
    }

    /// Parse a JSON object holding a `name` (and possibly a `namespace`) key.
    pub(crate) fn parse(
        complex: &Map<String, Value>,
        enclosing_namespace: &Namespace,
    ) -> AvroResult<Self> {
        let name_field = complex
            .name()
            .ok_or_else(|| ParseError::MalformedNode("no `name` field".to_string()))?;
        let namespace = complex.string("namespace").or(enclosing_namespace.clone());
        Self::new_with_enclosing_namespace(&name_field, &namespace)
    }

    /// Return the `fullname` of this `Name`: `namespace.name`, or just the
    /// name when there is no namespace.
    pub fn fullname(&self, default_namespace: &Namespace) -> String {
        match self.namespace.as_ref().or(default_namespace.as_ref()) {
            Some(ns) if !ns.is_empty() => format!("{ns}.{}", self.name),
            _ => self.name.clone(),
        }
    }

    /// Construct the fully qualified name, filling a missing namespace from
    /// `enclosing_namespace`.
    pub fn fully_qualified_name(&self, enclosing_namespace: &Namespace) -> Name {
        Name {
            name: self.name.clone(),
            namespace: self
                .namespace
                .clone()
                .or_else(|| enclosing_namespace.clone()),
        }
    }
}

impl TryFrom<&str> for Name {
    type Error = crate::error::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl std::str::FromStr for Name {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.fullname(&None))
    }
}

/// Validates a fullname against the Avro name grammar and returns the start
/// byte of the name part (`0` when there is no namespace).
pub(crate) fn validate_schema_name(schema_name: &str) -> AvroResult<usize> {
    static SCHEMA_NAME_ONCE: OnceLock<Regex> = OnceLock::new();
    let regex = SCHEMA_NAME_ONCE.get_or_init(|| {
        Regex::new(
            // An optional namespace (with optional dots) followed by a name without any dots in it.
            r"^((?P<namespace>([A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*)?)\.)?(?P<name>[A-Za-z_][A-Za-z0-9_]*)$",
        )
        .unwrap()
    });
    let caps = regex
        .captures(schema_name)
        .ok_or_else(|| ParseError::InvalidSchemaName(schema_name.to_string()))?;
    Ok(caps
        .name("name")
        .expect("Regex has no group named `name`")
        .start())
}

pub(crate) fn validate_namespace(ns: &str) -> AvroResult<()> {
    static NAMESPACE_ONCE: OnceLock<Regex> = OnceLock::new();
    let regex = NAMESPACE_ONCE.get_or_init(|| {
        Regex::new(r"^([A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*)?$").unwrap()
    });
    if !regex.is_match(ns) {
        return Err(ParseError::InvalidNamespace(ns.to_string()).into());
    }
    Ok(())
}

pub(crate) fn validate_enum_symbol_name(symbol: &str) -> AvroResult<()> {
    if !simple_name_regex().is_match(symbol) {
        return Err(ParseError::InvalidEnumSymbol(symbol.to_string()).into());
    }
    Ok(())
}

pub(crate) fn validate_record_field_name(field_name: &str) -> AvroResult<()> {
    if !simple_name_regex().is_match(field_name) {
        return Err(ParseError::InvalidFieldName(field_name.to_string()).into());
    }
    Ok(())
}

fn simple_name_regex() -> &'static Regex {
    static SIMPLE_NAME_ONCE: OnceLock<Regex> = OnceLock::new();
    SIMPLE_NAME_ONCE.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_name_with_namespace() {
        let name = Name::new("com.example.Thing").unwrap();
        assert_eq!(name.name, "Thing");
        assert_eq!(name.namespace, Some("com.example".to_string()));
        assert_eq!(name.fullname(&None), "com.example.Thing");
    }

    #[test]
    fn test_name_without_namespace() {
        let name = Name::new("Thing").unwrap();
        assert_eq!(name.name, "Thing");
        assert_eq!(name.namespace, None);
        assert_eq!(name.fullname(&None), "Thing");
    }

    #[test]
    fn test_enclosing_namespace_inherited() {
        let name =
            Name::new_with_enclosing_namespace("Inner", &Some("outer.space".to_string())).unwrap();
        assert_eq!(name.fullname(&None), "outer.space.Inner");
    }

    #[test]
    fn test_embedded_namespace_wins() {
        let name =
            Name::new_with_enclosing_namespace("their.Inner", &Some("ours".to_string())).unwrap();
        assert_eq!(name.fullname(&None), "their.Inner");
    }

    #[test]
    fn test_name_with_whitespace_is_invalid() {
        assert!(Name::new(" ").is_err());
    }

    #[test]
    fn test_name_with_no_name_part_is_invalid() {
        assert!(Name::new("space.").is_err());
    }

    #[test]
    fn test_underscore_names_are_valid() {
        for funny_name in ["_", "_._", "__._", "_.__", "_._._"] {
            assert!(Name::new(funny_name).is_ok(), "{funny_name}");
        }
    }
}
