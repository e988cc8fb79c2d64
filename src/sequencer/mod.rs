//! Test execution sequencer
//!
//! Turns a [`RunConfig`](crate::profile::RunConfig) into an ordered run of
//! simulated test steps: a connect phase, one step at a time with randomized
//! timing, aggregate stats after every step and a terminal summary.
//!
//! - `machine` holds the state machine and emits sink notifications
//! - `driver` owns a machine on a tokio task and supplies the timer
//! - `state` and `timing` hold the run data and timing parameters

pub mod driver;
mod machine;
mod state;
mod timing;

pub use driver::{spawn, RunSnapshot, SequencerHandle, StartOutcome};
pub use machine::{
    Sequencer, STATUS_ABORTED, STATUS_ALL_PASSED, STATUS_RUNNING, STATUS_SOME_FAILED,
    WARN_ALREADY_RUNNING,
};
pub use state::{AggregateStats, Phase, RunState, TestResult};
pub use timing::{format_elapsed, format_test_duration, Timing};
