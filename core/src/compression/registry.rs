//! compression/registry.rs
//! Codec registry and factory functions.

use crate::compression::codecs::{GzipCompressor, GzipDecompressor, ZstdCompressor, ZstdDecompressor};
use crate::compression::constants::{DEFAULT_LEVEL_GZIP, DEFAULT_LEVEL_ZSTD, GZIP_LEVELS, ZSTD_LEVELS};
use crate::compression::types::{CompressionCodec, CompressionError, Compressor, Decompressor};

pub struct CodecInfo {
    pub name: &'static str,
    pub default_level: Option<i32>,
}

pub fn resolve(codec_id: u16) -> Result<CodecInfo, CompressionError> {
    let codec = CompressionCodec::verify(codec_id)?;
    let default_level = match codec {
        CompressionCodec::None => None,
        CompressionCodec::Gzip => Some(DEFAULT_LEVEL_GZIP),
        CompressionCodec::Zstd => Some(DEFAULT_LEVEL_ZSTD),
    };
    Ok(CodecInfo { name: codec.name(), default_level })
}

/// Check `level` against the codec's accepted range. `None` always passes.
pub fn validate_level(codec: CompressionCodec, level: Option<i32>) -> Result<(), CompressionError> {
    let Some(level) = level else { return Ok(()) };
    let ok = match codec {
        CompressionCodec::None => false,
        CompressionCodec::Gzip => GZIP_LEVELS.contains(&level),
        CompressionCodec::Zstd => ZSTD_LEVELS.contains(&level),
    };
    if !ok {
        return Err(CompressionError::InvalidLevel { codec: codec.name(), level });
    }
    Ok(())
}

pub fn create_compressor(codec: CompressionCodec, level: Option<i32>)
    -> Result<Box<dyn Compressor>, CompressionError>
{
    match codec {
        CompressionCodec::Gzip => GzipCompressor::new(level),
        CompressionCodec::Zstd => ZstdCompressor::new(level),
        CompressionCodec::None => Err(CompressionError::UnsupportedCodec { codec_id: codec.id() }),
    }
}

pub fn create_decompressor(codec: CompressionCodec)
    -> Result<Box<dyn Decompressor>, CompressionError>
{
    match codec {
        CompressionCodec::Gzip => GzipDecompressor::new(),
        CompressionCodec::Zstd => ZstdDecompressor::new(),
        CompressionCodec::None => Err(CompressionError::UnsupportedCodec { codec_id: codec.id() }),
    }
}
