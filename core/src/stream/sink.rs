//! stream/sink.rs
//! Chunk consumers: writers, files, shared memory buffers and a threaded
//! hand-off sink with explicit acknowledgment.

use std::ffi::OsString;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::constants::{PARTIAL_SUFFIX, THREADED_SINK_QUEUE_CAP};
use crate::stream::chunk::Chunk;
use crate::types::SinkError;

/// Observable completion state of a sink's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    /// Still accepting chunks.
    Open,
    /// Finished after a successful run; output is whole.
    Complete,
    /// Aborted; whatever was written is a truncated prefix.
    Incomplete,
}

impl fmt::Display for SinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SinkState::Open => "open",
            SinkState::Complete => "complete",
            SinkState::Incomplete => "incomplete",
        };
        f.write_str(name)
    }
}

/// Consumer of the final chunk sequence.
///
/// - `accept` returns only once the chunk is accepted (written through to the
///   underlying resource); this is the pipeline's backpressure point.
/// - Exactly one of `finish` / `abort` is called per run, and it releases the
///   resource. A failed `finish` leaves the output incomplete.
pub trait ChunkSink: Send {
    fn accept(&mut self, chunk: Chunk) -> Result<(), SinkError>;

    fn finish(&mut self) -> Result<(), SinkError>;

    /// Mark output incomplete and release. Never fails.
    fn abort(&mut self);
}

impl<T: ChunkSink + ?Sized> ChunkSink for Box<T> {
    fn accept(&mut self, chunk: Chunk) -> Result<(), SinkError> {
        (**self).accept(chunk)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }

    fn abort(&mut self) {
        (**self).abort()
    }
}

// ================= Writer =================

/// Sink over any `Write`. Each chunk is written and flushed before `accept`
/// returns.
pub struct WriterSink<W: Write + Send> {
    writer: Option<W>,
    state: SinkState,
}

impl<W: Write + Send> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer: Some(writer), state: SinkState::Open }
    }

    pub fn state(&self) -> SinkState {
        self.state
    }
}

impl<W: Write + Send> ChunkSink for WriterSink<W> {
    fn accept(&mut self, chunk: Chunk) -> Result<(), SinkError> {
        let w = self.writer.as_mut().ok_or(SinkError::Closed)?;
        w.write_all(chunk.data())?;
        w.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        let mut w = self.writer.take().ok_or(SinkError::Closed)?;
        if let Err(e) = w.flush() {
            self.state = SinkState::Incomplete;
            return Err(SinkError::Io(e));
        }
        self.state = SinkState::Complete;
        Ok(())
    }

    fn abort(&mut self) {
        if self.writer.take().is_some() {
            warn!("writer sink aborted; output is incomplete");
        }
        self.state = SinkState::Incomplete;
    }
}

// ================= File =================

/// `<path>.partial`
pub fn partial_path(path: &Path) -> PathBuf {
    let mut s: OsString = path.as_os_str().to_owned();
    s.push(".");
    s.push(PARTIAL_SUFFIX);
    PathBuf::from(s)
}

/// Sink writing to `<path>.partial` and renaming to `<path>` on finish.
/// An aborted run leaves the `.partial` file behind, so incomplete output is
/// never presented under the final name.
pub struct FileSink {
    path: PathBuf,
    partial: PathBuf,
    file: Option<File>,
    state: SinkState,
}

impl FileSink {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, SinkError> {
        let path = path.as_ref().to_path_buf();
        let partial = partial_path(&path);
        let file = File::create(&partial)?;
        Ok(Self { path, partial, file: Some(file), state: SinkState::Open })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn partial_path(&self) -> &Path {
        &self.partial
    }

    pub fn state(&self) -> SinkState {
        self.state
    }
}

impl ChunkSink for FileSink {
    fn accept(&mut self, chunk: Chunk) -> Result<(), SinkError> {
        let f = self.file.as_mut().ok_or(SinkError::Closed)?;
        f.write_all(chunk.data())?;
        f.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        let f = self.file.take().ok_or(SinkError::Closed)?;
        self.state = SinkState::Incomplete;
        f.sync_all()?;
        drop(f);
        fs::rename(&self.partial, &self.path)?;
        self.state = SinkState::Complete;
        debug!(path = %self.path.display(), "file sink committed");
        Ok(())
    }

    fn abort(&mut self) {
        if self.file.take().is_some() {
            warn!(partial = %self.partial.display(), "file sink aborted; partial output left in place");
        }
        self.state = SinkState::Incomplete;
    }
}

// ================= Memory =================

#[derive(Debug)]
struct MemoryOutput {
    bytes: Vec<u8>,
    chunks: u64,
    state: SinkState,
}

/// Cloneable handle onto a `MemorySink`'s output, readable after the sink
/// has been moved into a pipeline.
#[derive(Debug, Clone)]
pub struct SharedBuffer {
    inner: Arc<Mutex<MemoryOutput>>,
}

impl SharedBuffer {
    fn lock(&self) -> MutexGuard<'_, MemoryOutput> {
        // A poisoned buffer still holds valid bytes.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.lock().bytes.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of chunks accepted so far.
    pub fn chunks(&self) -> u64 {
        self.lock().chunks
    }

    pub fn state(&self) -> SinkState {
        self.lock().state
    }
}

/// Sink collecting output into a shared in-memory buffer.
#[derive(Debug)]
pub struct MemorySink {
    buf: SharedBuffer,
}

impl MemorySink {
    pub fn new() -> (Self, SharedBuffer) {
        let buf = SharedBuffer {
            inner: Arc::new(Mutex::new(MemoryOutput {
                bytes: Vec::new(),
                chunks: 0,
                state: SinkState::Open,
            })),
        };
        (Self { buf: buf.clone() }, buf)
    }
}

impl ChunkSink for MemorySink {
    fn accept(&mut self, chunk: Chunk) -> Result<(), SinkError> {
        let mut out = self.buf.lock();
        if out.state != SinkState::Open {
            return Err(SinkError::Closed);
        }
        out.bytes.extend_from_slice(chunk.data());
        out.chunks += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        let mut out = self.buf.lock();
        if out.state != SinkState::Open {
            return Err(SinkError::Closed);
        }
        out.state = SinkState::Complete;
        Ok(())
    }

    fn abort(&mut self) {
        self.buf.lock().state = SinkState::Incomplete;
    }
}

// ================= Threaded =================

enum SinkCommand {
    Accept(Chunk),
    Finish,
    Abort,
}

/// Sink handing every chunk to a dedicated writer thread and blocking until
/// that thread acknowledges it. The hand-off channel has a single slot and
/// every send waits for its ack, so at most one write is ever outstanding.
pub struct ThreadedSink {
    tx: Option<Sender<SinkCommand>>,
    ack_rx: Receiver<Result<(), SinkError>>,
    handle: Option<JoinHandle<()>>,
}

impl ThreadedSink {
    pub fn spawn<S: ChunkSink + 'static>(mut inner: S) -> Result<Self, SinkError> {
        let (tx, rx) = bounded::<SinkCommand>(THREADED_SINK_QUEUE_CAP);
        let (ack_tx, ack_rx) = bounded::<Result<(), SinkError>>(THREADED_SINK_QUEUE_CAP);

        let handle = thread::Builder::new()
            .name("streamseal-sink".into())
            .spawn(move || {
                for cmd in rx.iter() {
                    let (res, last) = match cmd {
                        SinkCommand::Accept(chunk) => (inner.accept(chunk), false),
                        SinkCommand::Finish => (inner.finish(), true),
                        SinkCommand::Abort => {
                            inner.abort();
                            (Ok(()), true)
                        }
                    };
                    if last {
                        let _ = ack_tx.send(res);
                        return;
                    }
                    if ack_tx.send(res).is_err() {
                        break;
                    }
                }
                // Controller vanished without finish/abort.
                inner.abort();
            })?;

        Ok(Self { tx: Some(tx), ack_rx, handle: Some(handle) })
    }

    fn round_trip(&mut self, cmd: SinkCommand) -> Result<(), SinkError> {
        let tx = self.tx.as_ref().ok_or(SinkError::Closed)?;
        tx.send(cmd).map_err(|_| SinkError::Disconnected)?;
        self.ack_rx.recv().map_err(|_| SinkError::Disconnected)?
    }

    fn shutdown(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("threaded sink writer panicked");
            }
        }
    }
}

impl ChunkSink for ThreadedSink {
    fn accept(&mut self, chunk: Chunk) -> Result<(), SinkError> {
        self.round_trip(SinkCommand::Accept(chunk))
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        let res = self.round_trip(SinkCommand::Finish);
        self.shutdown();
        res
    }

    fn abort(&mut self) {
        if self.tx.is_some() {
            let _ = self.round_trip(SinkCommand::Abort);
        }
        self.shutdown();
    }
}

impl Drop for ThreadedSink {
    fn drop(&mut self) {
        // Closing the channel makes the writer abort its inner sink.
        self.shutdown();
    }
}
