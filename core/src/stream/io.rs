//! stream/io.rs
//! Normalized input and output endpoints for the public API.

use std::io::{Read, Write};
use std::path::PathBuf;

use bytes::Bytes;

use crate::stream::sink::{ChunkSink, FileSink, MemorySink, ThreadedSink, WriterSink};
use crate::stream::source::{ChunkSource, FileSource, MemorySource, ReaderSource};
use crate::types::PipelineError;

/// Canonical input abstraction
pub enum InputSource {
    Reader(Box<dyn Read + Send>),
    File(PathBuf),
    Memory(Bytes),
    Custom(Box<dyn ChunkSource>),
}

impl From<Vec<u8>> for InputSource {
    fn from(v: Vec<u8>) -> Self {
        InputSource::Memory(Bytes::from(v))
    }
}

impl From<&'static [u8]> for InputSource {
    fn from(v: &'static [u8]) -> Self {
        InputSource::Memory(Bytes::from_static(v))
    }
}

/// Canonical output abstraction
pub enum OutputSink {
    Writer(Box<dyn Write + Send>),
    /// Written as `<path>.partial`, renamed to `<path>` on success.
    File(PathBuf),
    /// Collected in memory; read back through the `SharedBuffer` returned
    /// alongside the sink by `MemorySink::new`.
    Memory(MemorySink),
    Custom(Box<dyn ChunkSink>),
}

/// Normalize input into a chunk source capped at `chunk_size`.
/// `Custom` sources bring their own chunking.
pub fn open_input(src: InputSource, chunk_size: usize) -> Result<Box<dyn ChunkSource>, PipelineError> {
    let source: Box<dyn ChunkSource> = match src {
        InputSource::Reader(r) => Box::new(ReaderSource::new(r, chunk_size)?),
        InputSource::File(p) => Box::new(FileSource::open(p, chunk_size)?),
        InputSource::Memory(b) => Box::new(MemorySource::new(b, chunk_size)?),
        InputSource::Custom(s) => s,
    };
    Ok(source)
}

/// Normalize output into a chunk sink, optionally moved behind a writer
/// thread.
pub fn open_output(sink: OutputSink, threaded: bool) -> Result<Box<dyn ChunkSink>, PipelineError> {
    let inner: Box<dyn ChunkSink> = match sink {
        OutputSink::Writer(w) => Box::new(WriterSink::new(w)),
        OutputSink::File(p) => Box::new(FileSink::create(p)?),
        OutputSink::Memory(m) => Box::new(m),
        OutputSink::Custom(s) => s,
    };

    if threaded {
        return Ok(Box::new(ThreadedSink::spawn(inner)?));
    }
    Ok(inner)
}
