//! telemetry/snapshot.rs
//! Immutable summary of a completed run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::telemetry::counters::{StageCounters, TelemetryCounters};
use crate::telemetry::timers::{Phase, PhaseTimes, TelemetryTimer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub chunks_pulled: u64,
    pub chunks_delivered: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    /// `bytes_out / bytes_in`; above 1.0 when padding outweighs compression.
    pub size_ratio: f64,
    pub throughput_bytes_per_sec: f64,
    pub elapsed: Duration,
    pub phase_times: PhaseTimes,
    pub stages: Vec<StageCounters>,
}

impl TelemetrySnapshot {
    pub fn from(counters: &TelemetryCounters, timer: &TelemetryTimer) -> Self {
        let elapsed = timer.elapsed();

        let size_ratio = if counters.bytes_in > 0 {
            counters.bytes_out as f64 / counters.bytes_in as f64
        } else {
            0.0
        };

        let throughput = if elapsed.as_secs_f64() > 0.0 {
            counters.bytes_in as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        Self {
            chunks_pulled: counters.chunks_pulled,
            chunks_delivered: counters.chunks_delivered,
            bytes_in: counters.bytes_in,
            bytes_out: counters.bytes_out,
            size_ratio,
            throughput_bytes_per_sec: throughput,
            elapsed,
            phase_times: timer.phase_times.clone(),
            stages: counters.stages.clone(),
        }
    }

    pub fn total_phase_time(&self) -> Duration {
        self.phase_times.total()
    }

    pub fn has_all_phases(&self, expected: &[Phase]) -> bool {
        expected.iter().all(|p| self.phase_times.get(*p) > Duration::ZERO)
    }

    pub fn stage(&self, name: &str) -> Option<&StageCounters> {
        self.stages.iter().find(|s| s.name == name)
    }

    /// Internal invariants: phases never exceed wall time, and every stage's
    /// output feeds the next stage's input.
    pub fn sanity_check(&self) -> bool {
        let chained = self
            .stages
            .windows(2)
            .all(|w| w[0].bytes_out == w[1].bytes_in);
        chained && self.total_phase_time() <= self.elapsed
    }

    /// One-line human summary for CLI output and logs.
    pub fn summary(&self) -> String {
        format!(
            "in={}B out={}B ratio={:.3} chunks={}/{} elapsed={:.2}ms",
            self.bytes_in,
            self.bytes_out,
            self.size_ratio,
            self.chunks_pulled,
            self.chunks_delivered,
            self.elapsed.as_secs_f64() * 1_000.0,
        )
    }
}
