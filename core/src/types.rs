use std::io;
use thiserror::Error;

use crate::{
    compression::CompressionError,
    crypto::CryptoError,
    stream::pipeline::PipelineState,
};

/// Failure of the underlying resource behind a `ChunkSource`.
/// Never retried internally; the controller aborts the run.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source read failed: {0}")]
    Io(#[from] io::Error),

    #[error("source already closed")]
    Closed,
}

/// Failure to accept, commit or release output at a `ChunkSink`.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink write failed: {0}")]
    Io(#[from] io::Error),

    #[error("sink already closed")]
    Closed,

    /// The writer thread behind a threaded sink went away before acknowledging.
    #[error("sink writer disconnected")]
    Disconnected,

    #[error("sink rejected chunk {seq}: {reason}")]
    Rejected { seq: u64, reason: String },
}

/// Transform-internal failure, including contract misuse.
#[derive(Debug, Error)]
pub enum StageError {
    /// `process` or `finalize` called after the stage was finalized.
    #[error("already finalized")]
    AlreadyFinalized,

    /// Trailing block did not carry valid PKCS#7 padding.
    #[error("invalid padding")]
    InvalidPadding,

    #[error("ciphertext length {len} is not a positive multiple of {block}")]
    InvalidCiphertextLength { len: u64, block: usize },

    #[error("compression error: {0}")]
    Compression(#[from] CompressionError),

    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
}

/// Unified terminal error of one pipeline run.
/// - `From<T>` impls keep `?` ergonomic at the source/sink boundary.
/// - Stage failures carry the index and name of the failing stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("stage {index} ({name}) failed: {source}")]
    Stage {
        index: usize,
        name: String,
        #[source]
        source: StageError,
    },

    #[error("sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("pipeline cancelled")]
    Cancelled,

    /// Pipelines run exactly once.
    #[error("pipeline cannot run from state {0}")]
    InvalidState(PipelineState),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl PipelineError {
    pub fn stage(index: usize, name: &str, source: StageError) -> Self {
        PipelineError::Stage { index, name: name.to_string(), source }
    }

    /// Name of the failing stage, when a transform stage failed.
    pub fn stage_name(&self) -> Option<&str> {
        match self {
            PipelineError::Stage { name, .. } => Some(name),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}

impl From<CryptoError> for PipelineError {
    fn from(e: CryptoError) -> Self {
        PipelineError::Config(e.to_string())
    }
}

impl From<CompressionError> for PipelineError {
    fn from(e: CompressionError) -> Self {
        PipelineError::Config(e.to_string())
    }
}
