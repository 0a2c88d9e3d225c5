//! stream/pipeline.rs
//! Pull-based controller driving source -> stages -> sink.
//!
//! Loop:
//! 1. pull one chunk from the source;
//! 2. push it through every stage in order, the outputs of stage i feeding
//!    stage i+1 one at a time;
//! 3. hand each resulting chunk to the sink and wait for `accept` to return
//!    before doing anything else.
//!
//! The source is never pulled while a sink write is outstanding, so in-flight
//! memory is bounded by stage count times chunk size.

use std::fmt;
use std::time::Instant;

use tracing::{debug, info, trace, warn};

use crate::stream::cancel::CancelToken;
use crate::stream::chunk::Chunk;
use crate::stream::sink::ChunkSink;
use crate::stream::source::ChunkSource;
use crate::stream::stage::TransformStage;
use crate::telemetry::{Phase, TelemetryCounters, TelemetrySnapshot, TelemetryTimer};
use crate::types::PipelineError;

/// Run lifecycle. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::Running => "running",
            PipelineState::Completed => "completed",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

pub struct PipelineBuilder {
    source: Box<dyn ChunkSource>,
    sink: Box<dyn ChunkSink>,
    stages: Vec<Box<dyn TransformStage>>,
    cancel: CancelToken,
}

impl PipelineBuilder {
    pub fn new(source: impl ChunkSource + 'static, sink: impl ChunkSink + 'static) -> Self {
        Self::from_boxed(Box::new(source), Box::new(sink))
    }

    pub fn from_boxed(source: Box<dyn ChunkSource>, sink: Box<dyn ChunkSink>) -> Self {
        Self { source, sink, stages: Vec::new(), cancel: CancelToken::new() }
    }

    /// Append a stage; stages run in insertion order.
    pub fn stage(mut self, stage: impl TransformStage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn boxed_stage(mut self, stage: Box<dyn TransformStage>) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn build(self) -> Pipeline {
        let counters = TelemetryCounters::with_stages(self.stages.iter().map(|s| s.name()));
        Pipeline {
            source: self.source,
            sink: self.sink,
            stages: self.stages,
            cancel: self.cancel,
            state: PipelineState::Idle,
            source_open: true,
            sink_open: true,
            counters,
            timer: TelemetryTimer::new(),
        }
    }
}

/// One source, an ordered list of stages and one sink, run exactly once.
pub struct Pipeline {
    source: Box<dyn ChunkSource>,
    sink: Box<dyn ChunkSink>,
    stages: Vec<Box<dyn TransformStage>>,
    cancel: CancelToken,
    state: PipelineState,
    source_open: bool,
    sink_open: bool,
    counters: TelemetryCounters,
    timer: TelemetryTimer,
}

impl Pipeline {
    pub fn builder(source: impl ChunkSource + 'static, sink: impl ChunkSink + 'static) -> PipelineBuilder {
        PipelineBuilder::new(source, sink)
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Clone of the token this run observes.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Drive the run to a terminal state.
    ///
    /// On success the sink has been finished (output complete). On failure the
    /// sink has been aborted (output marked incomplete) and the error names
    /// the failing component. Source and sink are released exactly once either
    /// way.
    pub fn run(&mut self) -> Result<TelemetrySnapshot, PipelineError> {
        if self.state != PipelineState::Idle {
            return Err(PipelineError::InvalidState(self.state));
        }
        self.state = PipelineState::Running;
        self.timer = TelemetryTimer::new();
        info!(stages = ?self.stage_names(), "pipeline started");

        let result = self.drive();
        self.release();
        self.timer.finish();

        match result {
            Ok(()) => {
                self.state = PipelineState::Completed;
                let snapshot = TelemetrySnapshot::from(&self.counters, &self.timer);
                info!(summary = %snapshot.summary(), "pipeline completed");
                Ok(snapshot)
            }
            Err(e) => {
                self.state = PipelineState::Failed;
                if e.is_cancelled() {
                    warn!(delivered = self.counters.chunks_delivered, "pipeline cancelled");
                } else {
                    warn!(error = %e, delivered = self.counters.chunks_delivered, "pipeline failed");
                }
                Err(e)
            }
        }
    }

    fn drive(&mut self) -> Result<(), PipelineError> {
        loop {
            self.check_cancelled()?;

            let t = Instant::now();
            let chunk = self.source.next_chunk()?;
            self.timer.add_phase_time(Phase::Read, t.elapsed());

            if chunk.is_terminal() {
                debug!(chunks = self.counters.chunks_pulled, "end of stream; finalizing stages");
                break;
            }
            self.counters.add_pulled(chunk.len());
            trace!(seq = chunk.seq(), len = chunk.len(), "pulled chunk");

            self.push(0, chunk)?;
        }

        self.finalize_stages()?;
        self.check_cancelled()?;

        // Whatever `finish` returns, the sink is released by it.
        self.sink_open = false;
        self.sink.finish()?;
        Ok(())
    }

    /// Feed `chunk` into stage `index`, recursing downstream per output.
    fn push(&mut self, index: usize, chunk: Chunk) -> Result<(), PipelineError> {
        if chunk.is_empty() {
            return Ok(());
        }
        if index == self.stages.len() {
            return self.deliver(chunk);
        }

        let len = chunk.len();
        let t = Instant::now();
        let stage = &mut self.stages[index];
        let outputs = stage
            .process(chunk)
            .map_err(|e| PipelineError::stage(index, stage.name(), e))?;
        self.timer.add_phase_time(Phase::Process, t.elapsed());
        self.record_stage(index, Some(len), &outputs);

        for out in outputs {
            self.check_cancelled()?;
            self.push(index + 1, out)?;
        }
        Ok(())
    }

    /// Finalize stages in order; finalize output of stage i is processed by
    /// stages i+1.. before stage i+1 itself is finalized.
    fn finalize_stages(&mut self) -> Result<(), PipelineError> {
        for index in 0..self.stages.len() {
            self.check_cancelled()?;

            let t = Instant::now();
            let stage = &mut self.stages[index];
            let outputs = stage
                .finalize()
                .map_err(|e| PipelineError::stage(index, stage.name(), e))?;
            self.timer.add_phase_time(Phase::Finalize, t.elapsed());
            debug!(stage = index, outputs = outputs.len(), "stage finalized");
            self.record_stage(index, None, &outputs);

            for out in outputs {
                self.check_cancelled()?;
                self.push(index + 1, out)?;
            }
        }
        Ok(())
    }

    /// Backpressure point: returns only after the sink accepted the chunk.
    fn deliver(&mut self, chunk: Chunk) -> Result<(), PipelineError> {
        let len = chunk.len();
        let seq = chunk.seq();

        let t = Instant::now();
        self.sink.accept(chunk)?;
        self.timer.add_phase_time(Phase::Write, t.elapsed());

        self.counters.add_delivered(len);
        trace!(seq, len, "sink accepted chunk");
        Ok(())
    }

    fn record_stage(&mut self, index: usize, input: Option<usize>, outputs: &[Chunk]) {
        if let Some(c) = self.counters.stage_mut(index) {
            if let Some(len) = input {
                c.record_in(len);
            }
            for out in outputs {
                c.record_out(out.len());
            }
        }
    }

    fn check_cancelled(&self) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }

    /// Close the source and abort the sink if still open. Each resource is
    /// released at most once.
    fn release(&mut self) {
        if self.sink_open {
            self.sink_open = false;
            self.sink.abort();
        }
        if self.source_open {
            self.source_open = false;
            self.source.close();
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        // A pipeline dropped before running still owns open resources.
        self.release();
    }
}
