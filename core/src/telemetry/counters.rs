//! telemetry/counters.rs
//! Mutable counters used during a pipeline run.
//!
//! Converted into an immutable `TelemetrySnapshot` when the run completes.
use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

/// Per transform stage chunk and byte flow.
#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageCounters {
    pub name: String,
    pub chunks_in: u64,
    pub chunks_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
}

impl StageCounters {
    pub fn named(name: &str) -> Self {
        Self { name: name.to_string(), ..Self::default() }
    }

    pub fn record_in(&mut self, len: usize) {
        self.chunks_in += 1;
        self.bytes_in += len as u64;
    }

    pub fn record_out(&mut self, len: usize) {
        self.chunks_out += 1;
        self.bytes_out += len as u64;
    }
}

/// Deterministic counters collected during one run.
#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    /// Data chunks pulled from the source (terminal marker excluded).
    pub chunks_pulled: u64,
    /// Chunks accepted by the sink.
    pub chunks_delivered: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub stages: Vec<StageCounters>,
}

impl TelemetryCounters {
    pub fn with_stages<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            stages: names.into_iter().map(StageCounters::named).collect(),
            ..Self::default()
        }
    }

    pub fn add_pulled(&mut self, len: usize) {
        self.chunks_pulled += 1;
        self.bytes_in += len as u64;
    }

    pub fn add_delivered(&mut self, len: usize) {
        self.chunks_delivered += 1;
        self.bytes_out += len as u64;
    }

    pub fn stage_mut(&mut self, index: usize) -> Option<&mut StageCounters> {
        self.stages.get_mut(index)
    }

    /// Merge another run's counters; stages are matched by position.
    pub fn merge(&mut self, other: &TelemetryCounters) {
        self.chunks_pulled += other.chunks_pulled;
        self.chunks_delivered += other.chunks_delivered;
        self.bytes_in += other.bytes_in;
        self.bytes_out += other.bytes_out;

        for (i, theirs) in other.stages.iter().enumerate() {
            match self.stages.get_mut(i) {
                Some(ours) => {
                    ours.chunks_in += theirs.chunks_in;
                    ours.chunks_out += theirs.chunks_out;
                    ours.bytes_in += theirs.bytes_in;
                    ours.bytes_out += theirs.bytes_out;
                }
                None => self.stages.push(theirs.clone()),
            }
        }
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.merge(&rhs);
    }
}
