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

//! Writing object container files.

use crate::{
    AvroResult, Codec,
    encode::{encode_bytes, encode_internal, encode_long, encode_to_vec},
    error::IoError,
    schema::SchemaGraph,
    types::Value,
    util::write_all,
};
use std::collections::HashMap;
use std::io::Write;

const DEFAULT_BLOCK_SIZE: usize = 16000;
const AVRO_OBJECT_HEADER: &[u8] = b"Obj\x01";

#[derive(Clone, Copy, Debug, PartialEq)]
enum WriterState {
    Active,
    /// An append failed; the file is incomplete and no further records are
    /// accepted. `close` still releases the sink.
    Poisoned,
    Closed,
}

/// Main interface for writing values to an object container file.
///
/// Records buffer into blocks; a block is written out (count, byte length,
/// payload, sync marker) when it grows past the block size or on
/// [`flush`](Writer::flush)/[`close`](Writer::close).
///
/// A failed [`append`](Writer::append) leaves the writer unusable: the bad
/// record never reaches the block buffer, but records buffered after the
/// failure are not written either, and the file must be considered
/// incomplete. [`close`](Writer::close) must still be called (or the writer
/// dropped) to release the sink.
pub struct Writer<'a, W: Write> {
    graph: &'a SchemaGraph,
    writer: Option<W>,
    codec: Codec,
    block_size: usize,
    buffer: Vec<u8>,
    scratch: Vec<u8>,
    num_values: usize,
    marker: [u8; 16],
    has_header: bool,
    user_metadata: HashMap<String, Vec<u8>>,
    state: WriterState,
}

impl<'a, W: Write> Writer<'a, W> {
    /// Creates a `Writer` given a schema and something implementing the
    /// [`Write`] trait, with no compression.
    pub fn new(graph: &'a SchemaGraph, writer: W) -> Self {
        Self::with_codec(graph, writer, Codec::Null)
    }

    /// Creates a `Writer` with a specific compression codec.
    pub fn with_codec(graph: &'a SchemaGraph, writer: W, codec: Codec) -> Self {
        Self::with_codec_and_block_size(graph, writer, codec, DEFAULT_BLOCK_SIZE)
    }

    /// Creates a `Writer` with a specific codec and block size threshold in
    /// bytes.
    pub fn with_codec_and_block_size(
        graph: &'a SchemaGraph,
        writer: W,
        codec: Codec,
        block_size: usize,
    ) -> Self {
        Self {
            graph,
            writer: Some(writer),
            codec,
            block_size,
            buffer: Vec::with_capacity(block_size),
            scratch: Vec::new(),
            num_values: 0,
            marker: generate_sync_marker(),
            has_header: false,
            user_metadata: HashMap::new(),
            state: WriterState::Active,
        }
    }

    /// The schema this writer encodes against.
    pub fn schema(&self) -> &'a SchemaGraph {
        self.graph
    }

    /// The sync marker of the file being written.
    pub fn sync_marker(&self) -> &[u8; 16] {
        &self.marker
    }

    /// Append a value, also performing schema validation.
    ///
    /// Returns the number of bytes written to the sink, which may be zero:
    /// records buffer internally until a block fills or the writer is
    /// flushed or closed.
    pub fn append<T: Into<Value>>(&mut self, value: T) -> AvroResult<usize> {
        let avro = value.into();
        self.append_ref(&avro)
    }

    /// Append a value by reference, also performing schema validation.
    pub fn append_ref(&mut self, value: &Value) -> AvroResult<usize> {
        if self.state != WriterState::Active {
            return Err(IoError::Closed.into());
        }

        let n = self.maybe_write_header()?;

        // Encode into the scratch buffer first, so the block buffer only
        // ever holds whole records.
        self.scratch.clear();
        let encoded = encode_internal(
            value,
            self.graph.root(),
            self.graph.names(),
            &mut self.scratch,
        );
        if let Err(e) = encoded {
            self.state = WriterState::Poisoned;
            return Err(match self.graph.root_record_name() {
                Some(name) => e.at(&name),
                None => e,
            });
        }

        self.buffer.extend_from_slice(&self.scratch);
        self.num_values += 1;

        if self.buffer.len() >= self.block_size {
            return self.flush().map(|b| b + n);
        }

        Ok(n)
    }

    /// Adds custom metadata to the file header.
    ///
    /// Only usable before the first record is appended; keys in the `avro.`
    /// namespace are reserved.
    pub fn add_user_metadata<T: AsRef<[u8]>>(&mut self, key: String, value: T) -> AvroResult<()> {
        if self.has_header {
            return Err(IoError::HeaderAlreadyWritten.into());
        }
        if key.starts_with("avro.") {
            return Err(IoError::InvalidMetadataKey(key).into());
        }
        self.user_metadata.insert(key, value.as_ref().to_vec());
        Ok(())
    }

    /// Flush the buffered block (if any) to the sink.
    ///
    /// This also writes the header if it has not been written yet. Returns
    /// the number of bytes written.
    pub fn flush(&mut self) -> AvroResult<usize> {
        if self.state != WriterState::Active {
            return Err(IoError::Closed.into());
        }
        let mut num_bytes = self.maybe_write_header()?;
        if self.num_values == 0 {
            return Ok(num_bytes);
        }

        self.codec.compress(&mut self.buffer)?;

        let mut block_head = Vec::new();
        encode_long(self.num_values as i64, &mut block_head)?;
        encode_long(self.buffer.len() as i64, &mut block_head)?;

        let writer = self.writer.as_mut().ok_or(IoError::Closed)?;
        write_all(writer, &block_head)?;
        write_all(writer, &self.buffer)?;
        write_all(writer, &self.marker)?;
        num_bytes += block_head.len() + self.buffer.len() + self.marker.len();

        self.buffer.clear();
        self.num_values = 0;

        writer.flush().map_err(|e| IoError::Underlying {
            context: "flush byte sink",
            source: e,
        })?;

        Ok(num_bytes)
    }

    /// Close the writer: write the header if needed, flush any buffered
    /// block, and flush the sink.
    ///
    /// Closing after zero appends still produces a valid, empty file.
    /// Closing is idempotent, and closing a poisoned writer releases the
    /// sink without writing the records buffered after the failure.
    pub fn close(&mut self) -> AvroResult<()> {
        match self.state {
            WriterState::Closed => Ok(()),
            WriterState::Poisoned => {
                self.state = WriterState::Closed;
                Ok(())
            }
            WriterState::Active => {
                self.flush()?;
                self.state = WriterState::Closed;
                Ok(())
            }
        }
    }

    /// Close the writer and return the sink.
    pub fn into_inner(mut self) -> AvroResult<W> {
        self.close()?;
        Ok(self
            .writer
            .take()
            .expect("the sink is only taken by into_inner"))
    }

    /// Create the file header: magic, metadata map, sync marker.
    fn header(&self) -> AvroResult<Vec<u8>> {
        let schema_json = self.graph.json()?;

        let mut header = Vec::new();
        header.extend_from_slice(AVRO_OBJECT_HEADER);

        // The metadata map is a string-to-bytes map with the usual block
        // framing.
        let mut metadata: Vec<(&str, &[u8])> = Vec::with_capacity(2 + self.user_metadata.len());
        metadata.push(("avro.schema", schema_json.as_bytes()));
        let codec_name = <&str>::from(self.codec);
        if self.codec != Codec::Null {
            metadata.push(("avro.codec", codec_name.as_bytes()));
        }
        for (key, value) in &self.user_metadata {
            metadata.push((key.as_str(), value.as_slice()));
        }

        encode_long(metadata.len() as i64, &mut header)?;
        for (key, value) in metadata {
            encode_bytes(key, &mut header)?;
            encode_bytes(value, &mut header)?;
        }
        header.push(0u8);

        header.extend_from_slice(&self.marker);

        Ok(header)
    }

    fn maybe_write_header(&mut self) -> AvroResult<usize> {
        if !self.has_header {
            let header = self.header()?;
            let writer = self.writer.as_mut().ok_or(IoError::Closed)?;
            write_all(writer, &header)?;
            self.has_header = true;
            Ok(header.len())
        } else {
            Ok(0)
        }
    }
}

impl<W: Write> Drop for Writer<'_, W> {
    /// Drop the writer, trying to close it and ignoring any errors.
    fn drop(&mut self) {
        if self.writer.is_some() {
            let _ = self.close();
        }
    }
}

/// Encode a single datum to raw bytes, without container framing.
pub fn to_avro_datum<T: Into<Value>>(graph: &SchemaGraph, value: T) -> AvroResult<Vec<u8>> {
    encode_to_vec(&value.into(), graph)
}

fn generate_sync_marker() -> [u8; 16] {
    rand::random()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::schema::SchemaGraph;
    use pretty_assertions::assert_eq;

    fn long_graph() -> SchemaGraph {
        SchemaGraph::parse_str(r#""long""#).unwrap()
    }

    #[test]
    fn test_header_layout() {
        let graph = long_graph();
        let mut writer = Writer::new(&graph, Vec::new());
        writer.append(1i64).unwrap();
        let marker = *writer.sync_marker();
        let bytes = writer.into_inner().unwrap();

        assert_eq!(&bytes[..4], b"Obj\x01");
        // one metadata entry
        assert_eq!(bytes[4], 0x02);
        // "avro.schema" key, length 11 (zigzag 22 == 0x16)
        assert_eq!(bytes[5], 0x16);
        assert_eq!(&bytes[6..17], b"avro.schema");
        // the sync marker closes the header
        let header_end = bytes
            .windows(16)
            .position(|w| w == marker)
            .expect("marker present");
        // ...and shows up once more after the single block
        assert_eq!(&bytes[bytes.len() - 16..], marker);
        assert!(header_end + 16 < bytes.len());
    }

    #[test]
    fn test_append_after_close_fails() {
        let graph = long_graph();
        let mut writer = Writer::new(&graph, Vec::new());
        writer.append(1i64).unwrap();
        writer.close().unwrap();
        let err = writer.append(2i64).unwrap_err();
        assert!(matches!(err, Error::Io(IoError::Closed)));
        // close is idempotent
        writer.close().unwrap();
    }

    #[test]
    fn test_failed_append_poisons_writer() {
        let graph = long_graph();
        let mut writer = Writer::new(&graph, Vec::new());
        writer.append(1i64).unwrap();
        assert!(writer.append("not a long").is_err());
        let err = writer.append(2i64).unwrap_err();
        assert!(matches!(err, Error::Io(IoError::Closed)));
        writer.close().unwrap();
    }

    #[test]
    fn test_metadata_rules() {
        let graph = long_graph();
        let mut writer = Writer::new(&graph, Vec::new());
        assert!(
            writer
                .add_user_metadata("avro.secret".to_string(), b"x")
                .is_err()
        );
        writer.add_user_metadata("mine".to_string(), b"x").unwrap();
        writer.append(1i64).unwrap();
        // too late once the header is out
        assert!(writer.add_user_metadata("more".to_string(), b"y").is_err());
    }

    #[test]
    fn test_to_avro_datum_bytes() {
        let graph = long_graph();
        assert_eq!(to_avro_datum(&graph, 27i64).unwrap(), vec![54u8]);
    }
}
