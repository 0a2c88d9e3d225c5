//! stream/stage.rs
//! Transform stage capability shared by compression and cipher steps.

use crate::stream::chunk::Chunk;
use crate::types::StageError;

/// One processing step of a pipeline.
///
/// Contract:
/// - `process` consumes one input chunk and returns zero or more output
///   chunks in emission order. Internal buffering is allowed but must stay
///   bounded by the stage's own unit of work (one block, one encoder window).
/// - `finalize` runs exactly once after the last `process`, flushing whatever
///   state is left. Any later call to `process` or `finalize` fails with
///   `StageError::AlreadyFinalized`.
/// - A stage never keeps a reference to an input chunk once its replacement
///   output has been returned.
///
/// `Send` so a whole pipeline can be moved onto a worker thread.
pub trait TransformStage: Send {
    /// Stable identity used in logs and error reports.
    fn name(&self) -> &str;

    fn process(&mut self, chunk: Chunk) -> Result<Vec<Chunk>, StageError>;

    fn finalize(&mut self) -> Result<Vec<Chunk>, StageError>;
}

impl<T: TransformStage + ?Sized> TransformStage for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn process(&mut self, chunk: Chunk) -> Result<Vec<Chunk>, StageError> {
        (**self).process(chunk)
    }

    fn finalize(&mut self) -> Result<Vec<Chunk>, StageError> {
        (**self).finalize()
    }
}

/// Tracks the once-only finalize transition of a stage.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StageLifecycle {
    finalized: bool,
}

impl StageLifecycle {
    /// Fails if the stage has already been finalized.
    pub fn ensure_active(&self) -> Result<(), StageError> {
        if self.finalized {
            return Err(StageError::AlreadyFinalized);
        }
        Ok(())
    }

    /// Flip to the terminal state; fails on the second call.
    pub fn finalize(&mut self) -> Result<(), StageError> {
        self.ensure_active()?;
        self.finalized = true;
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }
}

/// Stage that forwards chunks untouched. Used when no compression is
/// configured and in tests as a neutral link in the chain.
#[derive(Debug, Default)]
pub struct PassthroughStage {
    lifecycle: StageLifecycle,
}

impl PassthroughStage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransformStage for PassthroughStage {
    fn name(&self) -> &str {
        "passthrough"
    }

    fn process(&mut self, chunk: Chunk) -> Result<Vec<Chunk>, StageError> {
        self.lifecycle.ensure_active()?;
        Ok(vec![chunk])
    }

    fn finalize(&mut self) -> Result<Vec<Chunk>, StageError> {
        self.lifecycle.finalize()?;
        Ok(Vec::new())
    }
}
