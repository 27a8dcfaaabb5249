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

//! Block compression codecs for the object container file format.

use crate::AvroResult;
use crate::error::DecodeError;
use strum_macros::{EnumIter, EnumString, IntoStaticStr};

/// The compression codec used to compress container file blocks.
///
/// The codec name travels in the `avro.codec` header metadata; a missing
/// entry means [`Codec::Null`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, EnumIter, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab_case")]
pub enum Codec {
    /// The `Null` codec simply passes through data uncompressed.
    #[default]
    Null,
    /// The `Deflate` codec writes the data block using the deflate algorithm
    /// as specified in RFC 1951. Note that this format (unlike the "zlib
    /// format" in RFC 1950) does not have a checksum.
    Deflate,
}

impl Codec {
    /// Compress a stream of bytes in-place.
    pub fn compress(self, stream: &mut Vec<u8>) -> AvroResult<()> {
        match self {
            Codec::Null => (),
            Codec::Deflate => {
                let compressed = miniz_oxide::deflate::compress_to_vec(
                    stream,
                    miniz_oxide::deflate::CompressionLevel::DefaultLevel as u8,
                );
                *stream = compressed;
            }
        };

        Ok(())
    }

    /// Decompress a stream of bytes in-place.
    pub fn decompress(self, stream: &mut Vec<u8>) -> AvroResult<()> {
        *stream = match self {
            Codec::Null => return Ok(()),
            Codec::Deflate => {
                miniz_oxide::inflate::decompress_to_vec(stream).map_err(|e| {
                    let err = {
                        use miniz_oxide::inflate::TINFLStatus::*;
                        use std::io::{Error, ErrorKind};
                        match e.status {
                            FailedCannotMakeProgress | NeedsMoreInput => {
                                Error::from(ErrorKind::UnexpectedEof)
                            }
                            Adler32Mismatch | Failed => Error::from(ErrorKind::InvalidData),
                            other => Error::other(format!(
                                "unexpected decompression status: {other:?}"
                            )),
                        }
                    };
                    DecodeError::Decompress(err)
                })?
            }
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::{assert_eq, assert_ne};

    const INPUT: &[u8] = b"theanswertolifetheuniverseandeverythingis42theanswertolifetheuniverseandeverythingis4theanswertolifetheuniverseandeverythingis2";

    #[test]
    fn null_compress_and_decompress() -> anyhow::Result<()> {
        let codec = Codec::Null;
        let mut stream = INPUT.to_vec();
        codec.compress(&mut stream)?;
        assert_eq!(INPUT, stream.as_slice());
        codec.decompress(&mut stream)?;
        assert_eq!(INPUT, stream.as_slice());
        Ok(())
    }

    #[test]
    fn deflate_compress_and_decompress() -> anyhow::Result<()> {
        let codec = Codec::Deflate;
        let mut stream = INPUT.to_vec();
        codec.compress(&mut stream)?;
        assert_ne!(INPUT, stream.as_slice());
        assert!(INPUT.len() > stream.len());
        codec.decompress(&mut stream)?;
        assert_eq!(INPUT, stream.as_slice());
        Ok(())
    }

    #[test]
    fn deflate_rejects_garbage() {
        let mut stream = vec![0xde, 0xad, 0xbe, 0xef];
        assert!(Codec::Deflate.decompress(&mut stream).is_err());
    }

    #[test]
    fn codec_to_str() {
        assert_eq!(<&str>::from(Codec::Null), "null");
        assert_eq!(<&str>::from(Codec::Deflate), "deflate");
    }

    #[test]
    fn codec_from_str() {
        use std::str::FromStr;

        assert_eq!(Codec::from_str("null").unwrap(), Codec::Null);
        assert_eq!(Codec::from_str("deflate").unwrap(), Codec::Deflate);
        assert!(Codec::from_str("not a codec").is_err());
    }
}
