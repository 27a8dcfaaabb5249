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

//! A schema-driven binary codec for the
//! [Apache Avro](https://avro.apache.org/) data format, with support for the
//! object container file format.
//!
//! A schema document (already-parsed JSON, see [`SchemaGraph::parse`], or a
//! JSON string via [`SchemaGraph::parse_str`]) becomes a graph of typed
//! nodes, with named types — including recursive ones — defined once and
//! referenced everywhere else. From that graph the crate derives reusable
//! value-type descriptors ([`RecordType`], [`EnumType`]) and encodes or
//! decodes generic [`Value`]s against it:
//!
//! ```
//! use avrora::{Record, Reader, SchemaGraph, Value, Writer};
//!
//! # fn main() -> avrora::AvroResult<()> {
//! let graph = SchemaGraph::parse_str(
//!     r#"
//!     {
//!         "type": "record",
//!         "name": "User",
//!         "fields": [
//!             {"name": "name", "type": "string"},
//!             {"name": "favorite_number", "type": ["null", "int"]}
//!         ]
//!     }
//! "#,
//! )?;
//!
//! let user = graph.types().record_type(&"User".parse()?).unwrap();
//! let mut record = Record::new(user);
//! record.put("name", "flavia");
//! record.put("favorite_number", 3);
//!
//! let mut writer = Writer::new(&graph, Vec::new());
//! writer.append(record.clone())?;
//! let bytes = writer.into_inner()?;
//!
//! let values: Vec<Value> = Reader::new(&bytes[..])?.collect::<Result<_, _>>()?;
//! assert_eq!(values, vec![Value::Record(record)]);
//! # Ok(())
//! # }
//! ```
//!
//! The encoder accepts loosely-typed input (plain maps for records, strings
//! or ordinals for enum symbols, integral values where the schema widens or
//! coerces them); [`validate`] applies the same rules without producing
//! bytes and reports the union branch the encoder would pick.

mod codec;
mod decode;
mod encode;
mod reader;
mod validate;
mod writer;

pub mod error;
pub mod registry;
pub mod schema;
pub mod types;
pub mod util;

pub use codec::Codec;
pub use error::Error;
pub use reader::{Reader, from_avro_datum};
pub use registry::{EnumType, RecordType, TypeRegistry, enum_type_for, record_type_for};
pub use schema::{Schema, SchemaGraph};
pub use types::{EnumSymbol, FormatOptions, Record, Value};
pub use validate::validate;
pub use writer::{Writer, to_avro_datum};

/// A convenience type alias for `Result`s with `Error`s.
pub type AvroResult<T> = Result<T, Error>;
