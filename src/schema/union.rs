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

use crate::AvroResult;
use crate::error::ParseError;
use crate::schema::{Schema, SchemaKind};
use std::collections::BTreeMap;

/// A description of a union schema.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionSchema {
    /// The branches that make up this union, in declaration order.
    pub(crate) schemas: Vec<Schema>,
    // Ensures uniqueness of unnamed branch kinds at build time. Named types
    // (record, enum, fixed) are exempt: they are distinguished by fullname.
    variant_index: BTreeMap<SchemaKind, usize>,
}

impl UnionSchema {
    /// Creates a new `UnionSchema` from a vector of branch schemas.
    ///
    /// # Errors
    /// Returns [`ParseError::InvalidUnion`] if `schemas` contains a union as
    /// an immediate branch, or more than one branch of the same unnamed kind.
    pub fn new(schemas: Vec<Schema>) -> AvroResult<Self> {
        let mut vindex = BTreeMap::new();
        for (i, schema) in schemas.iter().enumerate() {
            if let Schema::Union(_) = schema {
                return Err(
                    ParseError::InvalidUnion("unions may not directly contain a union").into(),
                );
            }
            if !schema.is_named() && vindex.insert(SchemaKind::from(schema), i).is_some() {
                return Err(ParseError::InvalidUnion(
                    "unions cannot contain duplicate unnamed types",
                )
                .into());
            }
        }
        Ok(UnionSchema {
            schemas,
            variant_index: vindex,
        })
    }

    /// Returns a slice of all branches of this union, in declaration order.
    pub fn variants(&self) -> &[Schema] {
        &self.schemas
    }

    /// Returns true if any of the branches of this union is `null`.
    pub fn is_nullable(&self) -> bool {
        self.schemas.iter().any(|x| matches!(x, Schema::Null))
    }
}
