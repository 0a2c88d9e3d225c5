//! stream/source.rs
//! Chunk producers over readers, files and in-memory buffers.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use bytes::Bytes;
use tracing::debug;

use crate::constants::{MAX_CHUNK_SIZE, MIN_CHUNK_SIZE};
use crate::stream::chunk::{Chunk, ChunkSequencer};
use crate::types::{PipelineError, SourceError};

/// Producer of an ordered, finite chunk sequence.
///
/// - Every data chunk is at most the configured cap; the last one is usually
///   shorter.
/// - End of input is signalled by a terminal chunk. Once drained, a source
///   keeps returning terminal chunks.
/// - Errors are surfaced as-is and never retried.
pub trait ChunkSource: Send {
    fn next_chunk(&mut self) -> Result<Chunk, SourceError>;

    /// Release the underlying resource. The controller calls this exactly once
    /// per run, on every exit path.
    fn close(&mut self);
}

impl<T: ChunkSource + ?Sized> ChunkSource for Box<T> {
    fn next_chunk(&mut self) -> Result<Chunk, SourceError> {
        (**self).next_chunk()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Check a chunk cap against the sanity bounds.
pub fn validate_chunk_size(chunk_size: usize) -> Result<(), PipelineError> {
    if !(MIN_CHUNK_SIZE..=MAX_CHUNK_SIZE).contains(&chunk_size) {
        return Err(PipelineError::Config(format!(
            "chunk size {chunk_size} outside {MIN_CHUNK_SIZE}..={MAX_CHUNK_SIZE}"
        )));
    }
    Ok(())
}

/// Reads up to `len` bytes, looping over short reads until the buffer is
/// full or EOF is hit. An empty result means EOF.
pub fn read_exact_or_eof<R: Read>(r: &mut R, len: usize) -> Result<Bytes, SourceError> {
    let mut buf = vec![0u8; len];
    let mut off = 0;

    while off < len {
        match r.read(&mut buf[off..]) {
            Ok(0) => break,
            Ok(n) => off += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(SourceError::Io(e)),
        }
    }

    buf.truncate(off);
    Ok(Bytes::from(buf))
}

/// Source over any `Read` (file, socket, pipe).
pub struct ReaderSource<R: Read + Send> {
    reader: Option<R>,
    chunk_size: usize,
    seq: ChunkSequencer,
    eof: bool,
}

impl<R: Read + Send> ReaderSource<R> {
    pub fn new(reader: R, chunk_size: usize) -> Result<Self, PipelineError> {
        validate_chunk_size(chunk_size)?;
        Ok(Self {
            reader: Some(reader),
            chunk_size,
            seq: ChunkSequencer::new(),
            eof: false,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}

impl<R: Read + Send> ChunkSource for ReaderSource<R> {
    fn next_chunk(&mut self) -> Result<Chunk, SourceError> {
        if self.eof {
            return Ok(self.seq.end_of_stream());
        }
        let reader = self.reader.as_mut().ok_or(SourceError::Closed)?;

        let buf = read_exact_or_eof(reader, self.chunk_size)?;
        if buf.is_empty() {
            debug!(chunks = self.seq.emitted(), "source reached end of input");
            self.eof = true;
            return Ok(self.seq.end_of_stream());
        }
        Ok(self.seq.emit(buf))
    }

    fn close(&mut self) {
        // Dropping the reader closes files and sockets.
        self.reader.take();
    }
}

/// Source opened from a filesystem path.
pub struct FileSource;

impl FileSource {
    pub fn open<P: AsRef<Path>>(path: P, chunk_size: usize) -> Result<ReaderSource<File>, PipelineError> {
        let file = File::open(path.as_ref()).map_err(SourceError::Io)?;
        ReaderSource::new(file, chunk_size)
    }
}

/// Source slicing an in-memory buffer without copying.
#[derive(Debug)]
pub struct MemorySource {
    data: Bytes,
    offset: usize,
    chunk_size: usize,
    seq: ChunkSequencer,
    closed: bool,
}

impl MemorySource {
    pub fn new(data: impl Into<Bytes>, chunk_size: usize) -> Result<Self, PipelineError> {
        validate_chunk_size(chunk_size)?;
        Ok(Self {
            data: data.into(),
            offset: 0,
            chunk_size,
            seq: ChunkSequencer::new(),
            closed: false,
        })
    }
}

impl ChunkSource for MemorySource {
    fn next_chunk(&mut self) -> Result<Chunk, SourceError> {
        if self.closed {
            return Err(SourceError::Closed);
        }
        if self.offset >= self.data.len() {
            return Ok(self.seq.end_of_stream());
        }
        let end = (self.offset + self.chunk_size).min(self.data.len());
        let slice = self.data.slice(self.offset..end);
        self.offset = end;
        Ok(self.seq.emit(slice))
    }

    fn close(&mut self) {
        self.closed = true;
        self.data = Bytes::new();
    }
}
