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

//! Reading object container files.

use crate::{
    AvroResult, Codec, Error,
    decode::{decode, decode_node, decode_with_types},
    error::DecodeError,
    registry::TypeRegistry,
    schema::SchemaGraph,
    types::Value,
    util::{self, read_exact},
};
use log::warn;
use serde_json::from_slice;
use std::{collections::HashMap, io::Read, str::FromStr};

/// Internal block reader: header state plus the buffered current block.
struct Block<R> {
    reader: R,
    /// Internal buffering to reduce allocation.
    buf: Vec<u8>,
    buf_idx: usize,
    /// Number of elements expected to exist within this block.
    message_count: usize,
    marker: [u8; 16],
    codec: Codec,
    graph: SchemaGraph,
    schema_json: String,
    user_metadata: HashMap<String, Vec<u8>>,
}

impl<R: Read> Block<R> {
    fn new(reader: R) -> AvroResult<Block<R>> {
        let mut block = Block {
            reader,
            codec: Codec::Null,
            graph: SchemaGraph::parse_str("\"null\"")?,
            schema_json: String::new(),
            buf: vec![],
            buf_idx: 0,
            message_count: 0,
            marker: [0; 16],
            user_metadata: Default::default(),
        };

        block.read_header()?;
        Ok(block)
    }

    /// Read the header and set the embedded schema, the codec and the sync
    /// marker from its content.
    fn read_header(&mut self) -> AvroResult<()> {
        let mut buf = [0u8; 4];
        read_exact(&mut self.reader, &mut buf, "header magic")?;

        if buf != [b'O', b'b', b'j', 1u8] {
            return Err(DecodeError::BadMagic.into());
        }

        let metadata = match decode_node(&crate::schema::metadata_schema(), &mut self.reader)? {
            Value::Map(metadata) => metadata,
            _ => unreachable!("a map schema decodes to a map value"),
        };

        let mut schema_bytes = None;
        for (key, value) in metadata {
            let bytes = match value {
                Value::Bytes(bytes) => bytes,
                _ => unreachable!("a bytes schema decodes to a bytes value"),
            };
            match key.as_str() {
                "avro.schema" => schema_bytes = Some(bytes),
                "avro.codec" => {
                    let name = std::str::from_utf8(&bytes)
                        .map_err(|_| DecodeError::BadCodecMetadata)?;
                    self.codec = Codec::from_str(name)
                        .map_err(|_| DecodeError::CodecNotSupported(name.to_string()))?;
                }
                key if key.starts_with("avro.") => {
                    warn!("Ignoring unknown metadata key: {key}");
                }
                _ => {
                    self.user_metadata.insert(key, bytes);
                }
            }
        }

        let schema_bytes = schema_bytes.ok_or(DecodeError::MissingSchemaMetadata)?;
        let json = from_slice(&schema_bytes).map_err(crate::error::ParseError::ParseSchemaJson)?;
        self.graph = SchemaGraph::parse(&json)?;
        self.schema_json = String::from_utf8(schema_bytes)
            .map_err(DecodeError::InvalidUtf8)?;

        read_exact(&mut self.reader, &mut self.marker, "header sync marker")
    }

    fn fill_buf(&mut self, n: usize) -> AvroResult<()> {
        // The buffer must contain exactly `n` bytes, otherwise the codec
        // would decompress trailing garbage.
        self.buf.resize(util::safe_len(n)?, 0);
        read_exact(&mut self.reader, &mut self.buf, "block payload")?;
        self.buf_idx = 0;
        Ok(())
    }

    /// Try to read the framing of the next data block into the internal
    /// buffer. Reaching end-of-source before the block count starts is the
    /// clean end of the sequence.
    fn read_block_next(&mut self) -> AvroResult<()> {
        match util::read_long(&mut self.reader) {
            Ok(block_count) => {
                self.message_count = usize::try_from(block_count)
                    .map_err(|_| DecodeError::NegativeLength(block_count))?;
                let block_bytes = util::read_long(&mut self.reader)?;
                let block_bytes = usize::try_from(block_bytes)
                    .map_err(|_| DecodeError::NegativeLength(block_bytes))?;
                self.fill_buf(block_bytes)?;

                let mut marker = [0u8; 16];
                read_exact(&mut self.reader, &mut marker, "block sync marker")?;
                if marker != self.marker {
                    return Err(DecodeError::SyncMismatch.into());
                }

                self.codec.decompress(&mut self.buf)
            }
            Err(Error::Decode(DecodeError::Truncated(_))) => {
                // Finished reading cleanly from the stream between blocks.
                self.message_count = 0;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn is_empty(&self) -> bool {
        self.message_count == 0
    }

    fn read_next(
        &mut self,
        read_graph: Option<&SchemaGraph>,
        types: &TypeRegistry,
    ) -> AvroResult<Option<Value>> {
        if self.is_empty() {
            self.read_block_next()?;
            if self.is_empty() {
                return Ok(None);
            }
        }

        let mut block_bytes = &self.buf[self.buf_idx..];
        let b_original = block_bytes.len();

        let graph = read_graph.unwrap_or(&self.graph);
        let item = decode_with_types(graph, types, &mut block_bytes)?;

        self.buf_idx += b_original - block_bytes.len();
        self.message_count -= 1;
        Ok(Some(item))
    }
}

/// Main interface for reading values from an object container file.
///
/// A `Reader` is a lazy, forward-only, single-pass iterator over the decoded
/// values; restart by reopening the source at position zero. The header is
/// read eagerly on construction.
///
/// ```no_run
/// # use avrora::Reader;
/// # use std::io::Cursor;
/// # let input = Cursor::new(Vec::<u8>::new());
/// for value in Reader::new(input).unwrap() {
///     match value {
///         Ok(v) => println!("{v}"),
///         Err(e) => println!("Error: {e}"),
///     };
/// }
/// ```
pub struct Reader<'a, R> {
    block: Block<R>,
    schema_override: Option<&'a SchemaGraph>,
    types: TypeRegistry,
    errored: bool,
}

impl<'a, R: Read> Reader<'a, R> {
    /// Creates a `Reader` that decodes against the schema embedded in the
    /// file header, deriving fresh type descriptors for it.
    pub fn new(reader: R) -> AvroResult<Self> {
        let block = Block::new(reader)?;
        let types = block.graph.types().clone();
        Ok(Self {
            block,
            schema_override: None,
            types,
            errored: false,
        })
    }

    /// Creates a `Reader` that decodes against the given schema instead of
    /// the embedded one.
    ///
    /// No schema resolution is performed: the override must describe the
    /// same wire layout the file was written with.
    pub fn with_schema(graph: &'a SchemaGraph, reader: R) -> AvroResult<Self> {
        let block = Block::new(reader)?;
        let types = graph.types().clone();
        Ok(Self {
            block,
            schema_override: Some(graph),
            types,
            errored: false,
        })
    }

    /// Creates a `Reader` that reuses the caller's type descriptors wherever
    /// they match the embedded schema, deriving fresh ones otherwise.
    ///
    /// Values produced by this reader then carry descriptors that are
    /// pointer-identical to the caller's.
    pub fn with_types(types: &TypeRegistry, reader: R) -> AvroResult<Self> {
        let block = Block::new(reader)?;
        let types = TypeRegistry::derive(&block.graph, Some(types));
        Ok(Self {
            block,
            schema_override: None,
            types,
            errored: false,
        })
    }

    /// The schema embedded in the file header.
    pub fn writer_schema(&self) -> &SchemaGraph {
        &self.block.graph
    }

    /// The verbatim schema JSON text from the file header.
    pub fn schema_json(&self) -> &str {
        &self.block.schema_json
    }

    /// The type descriptors the decoded values carry.
    pub fn types(&self) -> &TypeRegistry {
        &self.types
    }

    /// The user metadata from the file header.
    pub fn user_metadata(&self) -> &HashMap<String, Vec<u8>> {
        &self.block.user_metadata
    }
}

impl<R: Read> Iterator for Reader<'_, R> {
    type Item = AvroResult<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        // A decode error is fatal to the sequence; no resynchronization is
        // attempted.
        if self.errored {
            return None;
        }
        match self.block.read_next(self.schema_override, &self.types) {
            Ok(Some(value)) => Some(Ok(value)),
            Ok(None) => None,
            Err(e) => {
                self.errored = true;
                Some(Err(e))
            }
        }
    }
}

/// Decode a single datum from raw bytes, without container framing.
pub fn from_avro_datum<R: Read>(graph: &SchemaGraph, reader: &mut R) -> AvroResult<Value> {
    decode(graph, reader)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Writer;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bad_magic() {
        let bytes = b"NotAvro".to_vec();
        match Reader::new(&bytes[..]) {
            Err(Error::Decode(DecodeError::BadMagic)) => {}
            Err(other) => panic!("expected BadMagic, got {other:?}"),
            Ok(_) => panic!("expected BadMagic, got a reader"),
        }
    }

    #[test]
    fn test_datum_roundtrip() {
        let graph = SchemaGraph::parse_str(r#""string""#).unwrap();
        let bytes = crate::writer::to_avro_datum(&graph, "hello").unwrap();
        let value = from_avro_datum(&graph, &mut &bytes[..]).unwrap();
        assert_eq!(value, Value::String("hello".to_string()));
    }

    #[test]
    fn test_corrupted_sync_marker() {
        let graph = SchemaGraph::parse_str(r#""long""#).unwrap();
        let mut writer = Writer::new(&graph, Vec::new());
        writer.append(1i64).unwrap();
        let mut bytes = writer.into_inner().unwrap();
        let n = bytes.len();
        bytes[n - 1] ^= 0xff; // corrupt the block's trailing marker

        let mut reader = Reader::new(&bytes[..]).unwrap();
        match reader.next() {
            Some(Err(Error::Decode(DecodeError::SyncMismatch))) => {}
            other => panic!("expected SyncMismatch, got {other:?}"),
        }
        // the sequence has terminated
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_unknown_codec() {
        let graph = SchemaGraph::parse_str(r#""long""#).unwrap();
        let mut writer = Writer::new(&graph, Vec::new());
        writer.append(1i64).unwrap();
        let bytes = writer.into_inner().unwrap();
        // handcraft a header naming a codec this build does not know
        let mut hand = Vec::new();
        hand.extend_from_slice(b"Obj\x01");
        hand.push(0x02); // one metadata entry
        crate::encode::encode_bytes("avro.codec", &mut hand).unwrap();
        crate::encode::encode_bytes("lzo", &mut hand).unwrap();
        hand.push(0x00);
        hand.extend_from_slice(&bytes[bytes.len() - 16..]);
        match Reader::new(&hand[..]) {
            Err(Error::Decode(DecodeError::CodecNotSupported(name))) => assert_eq!(name, "lzo"),
            Err(other) => panic!("expected CodecNotSupported, got {other:?}"),
            Ok(_) => panic!("expected CodecNotSupported, got a reader"),
        }
    }
}
