//! Content encodings
//!
//! The relay mirrors whatever `Content-Encoding` the upstream used on its
//! last page, so the same closed set of codings is handled in both
//! directions.

use axum::http::StatusCode;
use flate2::read::{DeflateDecoder, MultiGzDecoder};
use flate2::write::{DeflateEncoder, GzEncoder};
use flate2::Compression;
use std::fmt;
use std::io::{self, Read, Write};
use thiserror::Error;

/// Internal buffer size used by the brotli reader and writer
const BROTLI_BUFFER_SIZE: usize = 4096;

/// Brotli quality (0-11). Responses are small JSON arrays, so favour speed.
const BROTLI_QUALITY: u32 = 5;

/// Brotli window size (log2)
const BROTLI_LGWIN: u32 = 22;

/// Which side of the relay rejected an encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Decoding an upstream page
    Decode,
    /// Encoding the aggregated response
    Encode,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Decode => f.write_str("decode"),
            Direction::Encode => f.write_str("encode"),
        }
    }
}

/// Errors raised while decoding or encoding a body.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Encoding outside `"" | gzip | deflate | br`.
    #[error("unexpected encoding type {encoding:?} ({direction})")]
    UnsupportedEncoding { encoding: String, direction: Direction },

    /// The compressed stream could not be read.
    #[error("unable to decode response: {0}")]
    Decode(#[source] io::Error),

    /// The compressor failed while writing the response.
    #[error("unable to encode response: {0}")]
    Encode(#[source] io::Error),
}

impl CodecError {
    /// HTTP status reported to the caller.
    ///
    /// Decoding works on whatever the upstream sent, encoding only ever sees
    /// an encoding that already decoded successfully, so a failure there is
    /// ours.
    pub fn status(&self) -> StatusCode {
        match self {
            CodecError::UnsupportedEncoding {
                direction: Direction::Decode,
                ..
            }
            | CodecError::Decode(_) => StatusCode::BAD_REQUEST,
            CodecError::UnsupportedEncoding {
                direction: Direction::Encode,
                ..
            }
            | CodecError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Supported content codings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentEncoding {
    Identity,
    Gzip,
    /// Raw DEFLATE stream (no zlib header)
    Deflate,
    Brotli,
}

impl ContentEncoding {
    pub const ALL: [ContentEncoding; 4] = [
        ContentEncoding::Identity,
        ContentEncoding::Gzip,
        ContentEncoding::Deflate,
        ContentEncoding::Brotli,
    ];

    /// Parse a `Content-Encoding` header value
    pub fn parse(value: &str, direction: Direction) -> Result<Self, CodecError> {
        match value {
            "" => Ok(ContentEncoding::Identity),
            "gzip" => Ok(ContentEncoding::Gzip),
            "deflate" => Ok(ContentEncoding::Deflate),
            "br" => Ok(ContentEncoding::Brotli),
            other => Err(CodecError::UnsupportedEncoding {
                encoding: other.to_string(),
                direction,
            }),
        }
    }

    /// Header value for this coding (empty for identity)
    pub fn as_str(self) -> &'static str {
        match self {
            ContentEncoding::Identity => "",
            ContentEncoding::Gzip => "gzip",
            ContentEncoding::Deflate => "deflate",
            ContentEncoding::Brotli => "br",
        }
    }
}

/// Decode an upstream body according to its `Content-Encoding`.
///
/// The decompressor is drained to the end before returning and dropped on
/// every path, including read errors.
pub fn decode(encoding: &str, body: &[u8]) -> Result<Vec<u8>, CodecError> {
    let encoding = ContentEncoding::parse(encoding, Direction::Decode)?;

    let mut decoded = Vec::with_capacity(body.len());
    let read = match encoding {
        ContentEncoding::Identity => return Ok(body.to_vec()),
        ContentEncoding::Gzip => MultiGzDecoder::new(body).read_to_end(&mut decoded),
        ContentEncoding::Deflate => DeflateDecoder::new(body).read_to_end(&mut decoded),
        ContentEncoding::Brotli => {
            brotli::Decompressor::new(body, BROTLI_BUFFER_SIZE).read_to_end(&mut decoded)
        }
    };
    read.map_err(CodecError::Decode)?;

    Ok(decoded)
}

/// Encode a response body with the given `Content-Encoding`.
pub fn encode(encoding: &str, body: &[u8]) -> Result<Vec<u8>, CodecError> {
    let encoding = ContentEncoding::parse(encoding, Direction::Encode)?;

    match encoding {
        ContentEncoding::Identity => Ok(body.to_vec()),
        ContentEncoding::Gzip => {
            let mut writer = GzEncoder::new(Vec::new(), Compression::default());
            writer.write_all(body).map_err(CodecError::Encode)?;
            writer.finish().map_err(CodecError::Encode)
        }
        ContentEncoding::Deflate => {
            let mut writer = DeflateEncoder::new(Vec::new(), Compression::default());
            writer.write_all(body).map_err(CodecError::Encode)?;
            writer.finish().map_err(CodecError::Encode)
        }
        ContentEncoding::Brotli => {
            let mut writer = brotli::CompressorWriter::new(
                Vec::new(),
                BROTLI_BUFFER_SIZE,
                BROTLI_QUALITY,
                BROTLI_LGWIN,
            );
            writer.write_all(body).map_err(CodecError::Encode)?;
            writer.flush().map_err(CodecError::Encode)?;
            // into_inner finishes the stream
            Ok(writer.into_inner())
        }
    }
}
