//! src/compression/codecs/zstd.rs
//!
//! Zstd streaming compressor/decompressor.
//!
//! Design notes:
//! - Wraps the zstd write-side encoder/decoder; a single frame spans the
//!   whole stream, so the window carries across chunks.
//! - Errors are mapped into `CompressionError` variants with codec context.
//! - `finish` consumes the encoder and writes the frame epilogue; on the
//!   decode side it rejects a stream cut off before the frame ended.

use std::io::Write;

use zstd::stream::raw::{self, InBuffer, Operation, OutBuffer};

use crate::compression::constants::{DEFAULT_LEVEL_ZSTD, ZSTD_LEVELS};
use crate::compression::types::{CompressionError, Compressor, Decompressor};

const CODEC: &str = "zstd";

fn process_failed(e: std::io::Error) -> CompressionError {
    CompressionError::CodecProcessFailed { codec: CODEC, msg: e.to_string() }
}

/// Zstd streaming compressor.
/// - Holds an encoder writing into an internal Vec drained per chunk.
pub struct ZstdCompressor {
    encoder: Option<zstd::stream::write::Encoder<'static, Vec<u8>>>, // Option to allow finish()
}

impl ZstdCompressor {
    /// Create a new Zstd compressor with the given level.
    ///
    /// # Errors
    /// - `CompressionError::InvalidLevel` for levels outside 1..=22.
    /// - `CompressionError::CodecInitFailed` if encoder initialization fails.
    pub fn new(level: Option<i32>) -> Result<Box<dyn Compressor>, CompressionError> {
        let level = level.unwrap_or(DEFAULT_LEVEL_ZSTD);
        if !ZSTD_LEVELS.contains(&level) {
            return Err(CompressionError::InvalidLevel { codec: CODEC, level });
        }
        let encoder = zstd::stream::write::Encoder::new(Vec::new(), level)
            .map_err(|e| CompressionError::CodecInitFailed { codec: CODEC, msg: e.to_string() })?;
        Ok(Box::new(Self { encoder: Some(encoder) }))
    }
}

impl Compressor for ZstdCompressor {
    fn compress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let enc = self
            .encoder
            .as_mut()
            .ok_or_else(|| CompressionError::StateError("zstd encoder already finished".into()))?;
        enc.write_all(input).map_err(process_failed)?;
        out.append(enc.get_mut());
        Ok(())
    }

    fn finish(&mut self, out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let enc = self
            .encoder
            .take()
            .ok_or_else(|| CompressionError::StateError("zstd encoder already finished".into()))?;
        let mut rest = enc.finish().map_err(process_failed)?;
        out.append(&mut rest);
        Ok(())
    }
}

/// Zstd streaming decompressor.
/// - Drives the raw decoder so the frame size hint stays visible; a hint of
///   zero after the last decoded input means the frame ended.
pub struct ZstdDecompressor {
    decoder: Option<raw::Decoder<'static>>,
    scratch: Vec<u8>,
    frame_complete: bool,
}

impl ZstdDecompressor {
    pub fn new() -> Result<Box<dyn Decompressor>, CompressionError> {
        let decoder = raw::Decoder::new()
            .map_err(|e| CompressionError::CodecInitFailed { codec: CODEC, msg: e.to_string() })?;
        Ok(Box::new(Self {
            decoder: Some(decoder),
            scratch: vec![0u8; zstd::zstd_safe::DCtx::out_size()],
            frame_complete: false,
        }))
    }
}

impl Decompressor for ZstdDecompressor {
    fn decompress_chunk(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        let dec = self
            .decoder
            .as_mut()
            .ok_or_else(|| CompressionError::StateError("zstd decoder already finished".into()))?;
        let mut src = InBuffer::around(input);
        loop {
            let before = src.pos();
            let mut dst = OutBuffer::around(self.scratch.as_mut_slice());
            let hint = dec.run(&mut src, &mut dst).map_err(process_failed)?;
            let written = dst.pos();
            out.extend_from_slice(&self.scratch[..written]);

            // Calls that move no bytes report the next frame's header hint.
            if src.pos() > before || written > 0 {
                self.frame_complete = hint == 0;
            }
            // Output not filled means the decoder has nothing left buffered.
            if src.pos() == input.len() && written < self.scratch.len() {
                return Ok(());
            }
        }
    }

    fn finish(&mut self, _out: &mut Vec<u8>) -> Result<(), CompressionError> {
        self.decoder
            .take()
            .ok_or_else(|| CompressionError::StateError("zstd decoder already finished".into()))?;
        if !self.frame_complete {
            return Err(CompressionError::CodecProcessFailed {
                codec: CODEC,
                msg: "zstd stream ended inside a frame".into(),
            });
        }
        Ok(())
    }
}
