//! telemetry/timers.rs
//! Phase timers for a pipeline run.

use std::collections::{hash_map, HashMap};
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Controller phases that are timed separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Read,
    Process,
    Finalize,
    Write,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Read     => "read",
            Phase::Process  => "process",
            Phase::Finalize => "finalize",
            Phase::Write    => "write",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTimes {
    times: HashMap<Phase, Duration>,
}

impl PhaseTimes {
    /// Add duration to a phase (accumulates if already present).
    pub fn add(&mut self, phase: Phase, dur: Duration) {
        *self.times.entry(phase).or_insert(Duration::ZERO) += dur;
    }

    pub fn get(&self, phase: Phase) -> Duration {
        self.times.get(&phase).copied().unwrap_or(Duration::ZERO)
    }

    pub fn get_ms(&self, phase: Phase) -> f64 {
        self.get(phase).as_secs_f64() * 1_000.0
    }

    pub fn total(&self) -> Duration {
        self.times.values().copied().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Phase, &Duration)> {
        self.times.iter()
    }
}

impl<'a> IntoIterator for &'a PhaseTimes {
    type Item = (&'a Phase, &'a Duration);
    type IntoIter = hash_map::Iter<'a, Phase, Duration>;

    fn into_iter(self) -> Self::IntoIter {
        self.times.iter()
    }
}

#[derive(Clone, Debug)]
pub struct TelemetryTimer {
    pub start_time: Instant,
    pub end_time: Option<Instant>,
    pub phase_times: PhaseTimes,
}

impl Default for TelemetryTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryTimer {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            phase_times: PhaseTimes::default(),
        }
    }

    pub fn finish(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Run `f` and charge its wall time to `phase`.
    pub fn time<T>(&mut self, phase: Phase, f: impl FnOnce() -> T) -> T {
        let t = Instant::now();
        let out = f();
        self.phase_times.add(phase, t.elapsed());
        out
    }

    pub fn add_phase_time(&mut self, phase: Phase, dur: Duration) {
        self.phase_times.add(phase, dur);
    }

    pub fn elapsed(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => Instant::now().duration_since(self.start_time),
        }
    }
}
