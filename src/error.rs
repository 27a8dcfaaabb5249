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

//! Errors raised while building schemas and encoding or decoding data.
//!
//! Errors come in four families: [`ParseError`] (the schema itself is
//! unusable), [`DecodeError`] (the byte stream does not match the schema),
//! [`EncodeError`] (the caller's value does not fit the schema) and
//! [`IoError`] (resource misuse or a failing byte sink/source). All four
//! convert into the top-level [`Error`].

use crate::{schema::SchemaKind, types::ValueKind};

/// Any error this crate can produce.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Io(#[from] IoError),
}

impl Error {
    /// Prepend a field-path segment to the error, if the family carries one.
    ///
    /// Called by each record/collection frame as a failed encode or decode
    /// unwinds, so the final message names the full dotted path.
    pub(crate) fn at(self, segment: &str) -> Self {
        match self {
            Error::Decode(e) => Error::Decode(e.at(segment)),
            Error::Encode(e) => Error::Encode(e.at(segment)),
            other => other,
        }
    }
}

/// Errors raised while turning a JSON schema tree into a [`Schema`](crate::Schema).
///
/// All of these are fatal to the schema graph being built.
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("Unknown schema name: {0}")]
    UnknownName(String),

    #[error("Two schemas with the same fullname: {0}")]
    DuplicateName(String),

    #[error("Invalid union: {0}")]
    InvalidUnion(&'static str),

    #[error("Malformed schema node: {0}")]
    MalformedNode(String),

    #[error("Invalid schema name: {0}")]
    InvalidSchemaName(String),

    #[error("Invalid namespace: {0}")]
    InvalidNamespace(String),

    #[error("Invalid enum symbol name: {0}")]
    InvalidEnumSymbol(String),

    #[error("Invalid record field name: {0}")]
    InvalidFieldName(String),

    #[error("Failed to parse schema from JSON")]
    ParseSchemaJson(#[source] serde_json::Error),

    #[error("Failed to serialize schema to JSON")]
    SerializeSchemaJson(#[source] serde_json::Error),
}

/// Errors raised while decoding a byte stream against a schema.
///
/// Fatal to the current decode call; a container [`Reader`](crate::Reader)
/// terminates its sequence without attempting resynchronization.
#[derive(thiserror::Error, Debug)]
pub enum DecodeError {
    #[error("Unexpected end of input while reading {0}")]
    Truncated(&'static str),

    #[error("Variable-length integer does not fit {0}")]
    Overflow(&'static str),

    #[error("Invalid utf-8 string")]
    InvalidUtf8(#[source] std::string::FromUtf8Error),

    #[error("Negative length: {0}")]
    NegativeLength(i64),

    #[error("Unable to allocate {desired} bytes (maximum allowed: {maximum})")]
    MemoryAllocation { desired: usize, maximum: usize },

    #[error("Enum ordinal {ordinal} out of range: {symbols} symbols")]
    EnumOrdinalOutOfRange { ordinal: i64, symbols: usize },

    #[error("Union index {index} out of range: {branches} branches")]
    UnionIndexOutOfRange { index: i64, branches: usize },

    #[error("Sync marker does not match file header")]
    SyncMismatch,

    #[error("Header magic does not match")]
    BadMagic,

    #[error("No `avro.schema` entry in file header metadata")]
    MissingSchemaMetadata,

    #[error("Codec `{0}` is not supported")]
    CodecNotSupported(String),

    #[error("Malformed `avro.codec` metadata")]
    BadCodecMetadata,

    #[error("Failed to decompress block")]
    Decompress(#[source] std::io::Error),

    #[error("Schema reference {0} cannot be resolved")]
    UnresolvedRef(String),

    #[error("{path}: {source}")]
    At {
        path: String,
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    pub(crate) fn at(self, segment: &str) -> Self {
        match self {
            DecodeError::At { path, source } => DecodeError::At {
                path: format!("{segment}.{path}"),
                source,
            },
            other => DecodeError::At {
                path: segment.to_string(),
                source: Box::new(other),
            },
        }
    }
}

/// Errors raised while encoding or validating a value against a schema.
///
/// The value does not fit the schema. Below the top level, the error is
/// annotated with the dotted field path of the offending value (for example
/// `Rec1.attr1`).
#[derive(thiserror::Error, Debug)]
pub enum EncodeError {
    #[error("Expected {expected:?}, got {actual:?}: {value}")]
    TypeMismatch {
        expected: SchemaKind,
        actual: ValueKind,
        value: String,
    },

    #[error("No union branch in {tried:?} matches {actual:?}: {value}")]
    NoMatchingUnionBranch {
        tried: Vec<SchemaKind>,
        actual: ValueKind,
        value: String,
    },

    #[error("Missing field in record: {0}")]
    MissingField(String),

    #[error("Record has {actual} fields, schema expects {expected}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("Record type {actual} does not match schema record {expected}")]
    RecordNameMismatch { expected: String, actual: String },

    #[error("Enum symbol not found: {0}")]
    UnknownEnumSymbol(String),

    #[error("Enum ordinal {ordinal} out of range: {symbols} symbols")]
    OrdinalOutOfRange { ordinal: i64, symbols: usize },

    #[error("Fixed size mismatch, expected {size} bytes, got {actual}")]
    FixedSizeMismatch { size: usize, actual: usize },

    #[error("Schema reference {0} cannot be resolved")]
    UnresolvedRef(String),

    #[error("{path}: {source}")]
    At {
        path: String,
        #[source]
        source: Box<EncodeError>,
    },
}

impl EncodeError {
    pub(crate) fn at(self, segment: &str) -> Self {
        match self {
            EncodeError::At { path, source } => EncodeError::At {
                path: format!("{segment}.{path}"),
                source,
            },
            other => EncodeError::At {
                path: segment.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The dotted field path this error was annotated with, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            EncodeError::At { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Errors raised by the byte sink/source boundary or by misusing a
/// [`Writer`](crate::Writer) after it was closed or poisoned.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    #[error("Writer is closed or unusable after a previous error")]
    Closed,

    #[error("The file header has already been written")]
    HeaderAlreadyWritten,

    #[error("Metadata keys starting with `avro.` are reserved: {0}")]
    InvalidMetadataKey(String),

    #[error("Failed to {context}")]
    Underlying {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}
