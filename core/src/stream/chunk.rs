//! stream/chunk.rs
//! The unit of data moving through a pipeline.

use bytes::Bytes;

/// Immutable, ordered run of bytes tagged with its position in the emitting
/// stage's output.
///
/// - `seq` is strictly increasing per emitter (source or stage).
/// - `terminal` is set only on the end-of-stream marker, which never carries
///   bytes.
/// - Stages consume chunks by value and emit new ones; a chunk is never
///   mutated in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    seq: u64,
    data: Bytes,
    terminal: bool,
}

impl Chunk {
    pub fn new(seq: u64, data: impl Into<Bytes>) -> Self {
        Self { seq, data: data.into(), terminal: false }
    }

    /// End-of-stream marker.
    pub fn end_of_stream(seq: u64) -> Self {
        Self { seq, data: Bytes::new(), terminal: true }
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    pub fn data(&self) -> &Bytes {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_terminal(&self) -> bool {
        self.terminal
    }
}

impl AsRef<[u8]> for Chunk {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

/// Hands out strictly increasing sequence numbers for one emitter.
#[derive(Debug, Default, Clone)]
pub struct ChunkSequencer {
    next: u64,
}

impl ChunkSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap `data` in a chunk carrying the next sequence number.
    pub fn emit(&mut self, data: impl Into<Bytes>) -> Chunk {
        let chunk = Chunk::new(self.next, data);
        self.next += 1;
        chunk
    }

    /// Build the end-of-stream marker. Repeated calls reuse the same index so
    /// a drained source keeps answering with an identical marker.
    pub fn end_of_stream(&self) -> Chunk {
        Chunk::end_of_stream(self.next)
    }

    /// Number of data chunks emitted so far.
    pub fn emitted(&self) -> u64 {
        self.next
    }
}

/// Helper to flatten chunks into a single contiguous blob.
pub fn concat_chunks(chunks: &[Chunk]) -> Vec<u8> {
    let total = chunks.iter().map(Chunk::len).sum();
    let mut out = Vec::with_capacity(total);
    for c in chunks {
        out.extend_from_slice(c.data());
    }
    out
}
