//! Gzip via flate2 write-side encoder/decoder.
//!
//! Both sides write into an internal Vec that is drained after every chunk,
//! so memory stays bounded by the codec window plus one chunk.

use std::io::Write;

use flate2::write::{GzDecoder, GzEncoder};
use flate2::Compression;

use crate::compression::constants::{DEFAULT_LEVEL_GZIP, GZIP_LEVELS};
use crate::compression::types::{CompressionError, Compressor, Decompressor};

const CODEC: &str = "gzip";

fn process_failed(e: std::io::Error) -> CompressionError {
    CompressionError::CodecProcessFailed { codec: CODEC, msg: e.to_string() }
}

pub struct GzipCompressor {
    encoder: Option<GzEncoder<Vec<u8>>>,
}

impl GzipCompressor {
    pub fn new(level: Option<i32>) -> Result<Box<dyn Compressor>, CompressionError> {
        let level = level.unwrap_or(DEFAULT_LEVEL_GZIP);
        if !GZIP_LEVELS.contains(&level) {
            return Err(CompressionError::InvalidLevel { codec: CODEC, level });
        }
        let encoder = GzEncoder::new(Vec::new(), Compression::new(level as u32));
        Ok(Box::new(Self { encoder: Some(encoder) }))
    }
}

impl Compressor for GzipCompressor {
    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let enc = self
            .encoder
            .as_mut()
            .ok_or_else(|| CompressionError::StateError("gzip encoder already finished".into()))?;
        enc.write_all(input).map_err(process_failed)?;
        out.append(enc.get_mut());
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let enc = self
            .encoder
            .take()
            .ok_or_else(|| CompressionError::StateError("gzip encoder already finished".into()))?;
        let mut rest = enc.finish().map_err(process_failed)?;
        out.append(&mut rest);
        Ok(())
    }
}

pub struct GzipDecompressor {
    decoder: Option<GzDecoder<Vec<u8>>>,
}

impl GzipDecompressor {
    pub fn new() -> Result<Box<dyn Decompressor>, CompressionError> {
        Ok(Box::new(Self { decoder: Some(GzDecoder::new(Vec::new())) }))
    }
}

impl Decompressor for GzipDecompressor {
    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let dec = self
            .decoder
            .as_mut()
            .ok_or_else(|| CompressionError::StateError("gzip decoder already finished".into()))?;
        dec.write_all(input).map_err(process_failed)?;
        out.append(dec.get_mut());
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let mut dec = self
            .decoder
            .take()
            .ok_or_else(|| CompressionError::StateError("gzip decoder already finished".into()))?;
        dec.try_finish().map_err(process_failed)?;
        let mut rest = dec.finish().map_err(process_failed)?;
        out.append(&mut rest);
        Ok(())
    }
}
