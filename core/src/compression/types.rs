//! compression/types.rs
//! Codec identifiers, errors and the compressor traits.
use std::fmt;
use std::str::FromStr;

use num_enum::TryFromPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compression::constants::codec_ids;

/// Compression codec selectable for a pipeline.
#[repr(u16)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, TryFromPrimitive, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionCodec {
    /// No compression stage at all.
    None = codec_ids::NONE,
    Gzip = codec_ids::GZIP,
    Zstd = codec_ids::ZSTD,
}

impl Default for CompressionCodec {
    fn default() -> Self {
        CompressionCodec::Gzip
    }
}

impl CompressionCodec {
    pub fn verify(raw: u16) -> Result<Self, CompressionError> {
        Self::try_from_primitive(raw).map_err(|_| CompressionError::UnsupportedCodec { codec_id: raw })
    }

    pub fn id(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            CompressionCodec::None => "none",
            CompressionCodec::Gzip => "gzip",
            CompressionCodec::Zstd => "zstd",
        }
    }

    pub fn is_none(self) -> bool {
        self == CompressionCodec::None
    }
}

impl fmt::Display for CompressionCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CompressionCodec {
    type Err = CompressionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(CompressionCodec::None),
            "gzip" | "gz" => Ok(CompressionCodec::Gzip),
            "zstd" | "zst" => Ok(CompressionCodec::Zstd),
            other => Err(CompressionError::UnknownCodecName(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum CompressionError {
    #[error("unsupported compression codec: 0x{codec_id:04x}")]
    UnsupportedCodec { codec_id: u16 },

    #[error("unknown compression codec name: {0}")]
    UnknownCodecName(String),

    #[error("codec {codec} does not accept level {level}")]
    InvalidLevel { codec: &'static str, level: i32 },

    #[error("codec {codec} init failed: {msg}")]
    CodecInitFailed { codec: &'static str, msg: String },

    #[error("codec {codec} process failed: {msg}")]
    CodecProcessFailed { codec: &'static str, msg: String },

    #[error("compression state error: {0}")]
    StateError(String),
}

/// Streaming compressor. State (window, dictionary) lives inside the
/// implementation and carries across chunks.
// Require Send so trait objects can cross thread boundaries.
pub trait Compressor: Send {
    /// Feed one chunk, appending whatever compressed bytes are ready to `out`.
    /// May append nothing while the encoder buffers.
    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError>;

    /// Flush pending state and write the stream trailer. Called once.
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CompressionError>;
}

pub trait Decompressor: Send {
    /// Feed one chunk of compressed bytes, appending decoded bytes to `out`.
    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError>;

    /// Flush remaining output and verify the stream ended cleanly. Called once.
    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CompressionError>;
}
