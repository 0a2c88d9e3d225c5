//! stream — chunked, backpressure-aware transform pipeline.
//!
//! Layering: `chunk` and `stage` define the data unit and the transform
//! contract; `source` / `sink` are the only I/O boundary; `pipeline` is the
//! controller; `core` assembles compress-then-encrypt runs for callers.

pub mod chunk;
pub mod stage;
pub mod source;
pub mod sink;
pub mod cancel;
pub mod config;
pub mod pipeline;
pub mod io;
pub mod core;

pub use chunk::{Chunk, ChunkSequencer};
pub use stage::{PassthroughStage, StageLifecycle, TransformStage};
pub use source::{ChunkSource, FileSource, MemorySource, ReaderSource};
pub use sink::{ChunkSink, FileSink, MemorySink, SharedBuffer, SinkState, ThreadedSink, WriterSink};
pub use cancel::CancelToken;
pub use config::PipelineConfig;
pub use pipeline::{Pipeline, PipelineBuilder, PipelineState};

pub use io::{
    InputSource,
    OutputSink,
};

pub use self::core::{
    encrypt_stream,
    decrypt_stream,
    EncryptOutcome,
};
