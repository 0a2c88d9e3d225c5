//! telemetry/mod.rs
//! Counters, phase timers and immutable snapshots for one pipeline run.
//!
//! - Counters are mutated only by the controller's single flow of control.
//! - A snapshot is produced once, when the run completes.

pub mod counters;
pub mod timers;
pub mod snapshot;

pub use counters::*;
pub use timers::*;
pub use snapshot::*;
