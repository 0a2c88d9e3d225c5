//! compression/stream.rs
//! Compression and decompression as pipeline stages.

use tracing::debug;

use crate::compression::registry::{create_compressor, create_decompressor};
use crate::compression::types::{CompressionCodec, Compressor, Decompressor};
use crate::stream::chunk::{Chunk, ChunkSequencer};
use crate::stream::stage::{StageLifecycle, TransformStage};
use crate::types::StageError;

/// Stage feeding every chunk through a streaming compressor.
///
/// Emits one chunk per input when the encoder produced output, nothing while
/// it buffers, and the stream trailer at finalize.
pub struct CompressionTransform {
    name: String,
    compressor: Option<Box<dyn Compressor>>,
    seq: ChunkSequencer,
    lifecycle: StageLifecycle,
}

impl CompressionTransform {
    pub fn new(codec: CompressionCodec, level: Option<i32>) -> Result<Self, StageError> {
        let compressor = create_compressor(codec, level)?;
        Ok(Self::with_compressor(codec, compressor))
    }

    pub fn with_compressor(codec: CompressionCodec, compressor: Box<dyn Compressor>) -> Self {
        Self {
            name: format!("compress:{codec}"),
            compressor: Some(compressor),
            seq: ChunkSequencer::new(),
            lifecycle: StageLifecycle::default(),
        }
    }

    fn emit(&mut self, out: Vec<u8>) -> Vec<Chunk> {
        if out.is_empty() {
            return Vec::new();
        }
        vec![self.seq.emit(out)]
    }
}

impl TransformStage for CompressionTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, chunk: Chunk) -> Result<Vec<Chunk>, StageError> {
        self.lifecycle.ensure_active()?;
        let compressor = self.compressor.as_mut().ok_or(StageError::AlreadyFinalized)?;

        let mut out = Vec::new();
        compressor.compress_chunk(chunk.data(), &mut out)?;
        Ok(self.emit(out))
    }

    fn finalize(&mut self) -> Result<Vec<Chunk>, StageError> {
        self.lifecycle.finalize()?;
        let mut compressor = self.compressor.take().ok_or(StageError::AlreadyFinalized)?;

        let mut out = Vec::new();
        compressor.finish(&mut out)?;
        debug!(stage = %self.name, trailer = out.len(), "compressor flushed");
        Ok(self.emit(out))
    }
}

/// Inverse of `CompressionTransform` for the reverse pipeline.
pub struct DecompressionTransform {
    name: String,
    decompressor: Option<Box<dyn Decompressor>>,
    seq: ChunkSequencer,
    lifecycle: StageLifecycle,
}

impl DecompressionTransform {
    pub fn new(codec: CompressionCodec) -> Result<Self, StageError> {
        let decompressor = create_decompressor(codec)?;
        Ok(Self::with_decompressor(codec, decompressor))
    }

    pub fn with_decompressor(codec: CompressionCodec, decompressor: Box<dyn Decompressor>) -> Self {
        Self {
            name: format!("decompress:{codec}"),
            decompressor: Some(decompressor),
            seq: ChunkSequencer::new(),
            lifecycle: StageLifecycle::default(),
        }
    }

    fn emit(&mut self, out: Vec<u8>) -> Vec<Chunk> {
        if out.is_empty() {
            return Vec::new();
        }
        vec![self.seq.emit(out)]
    }
}

impl TransformStage for DecompressionTransform {
    fn name(&self) -> &str {
        &self.name
    }

    fn process(&mut self, chunk: Chunk) -> Result<Vec<Chunk>, StageError> {
        self.lifecycle.ensure_active()?;
        let decompressor = self.decompressor.as_mut().ok_or(StageError::AlreadyFinalized)?;

        let mut out = Vec::new();
        decompressor.decompress_chunk(chunk.data(), &mut out)?;
        Ok(self.emit(out))
    }

    fn finalize(&mut self) -> Result<Vec<Chunk>, StageError> {
        self.lifecycle.finalize()?;
        let mut decompressor = self.decompressor.take().ok_or(StageError::AlreadyFinalized)?;

        let mut out = Vec::new();
        decompressor.finish(&mut out)?;
        Ok(self.emit(out))
    }
}
