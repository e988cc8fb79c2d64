//! Run state owned by the sequencer

use std::time::Duration;

use tokio::time::Instant;

use crate::catalog::TestCaseDescriptor;
use crate::profile::RunConfig;
use crate::sink::TestStatus;

/// Observable phase of the sequencer
///
/// Finishing runs synchronously at the end of the last step, so it is never
/// observed between suspension points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No run in flight
    Idle,
    /// Waiting out the simulated connection delay
    Connecting,
    /// Executing tests one at a time
    Stepping,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Stepping => write!(f, "stepping"),
        }
    }
}

/// Continuation to run when the pending delay elapses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Wake {
    /// Connection delay over, begin the first step
    Connected,
    /// Step delay over, record the current test's outcome
    StepDone,
    /// Inter-step gap over, begin the next step
    NextStep,
}

/// Outcome of one completed test
#[derive(Debug, Clone, PartialEq)]
pub struct TestResult {
    pub name: String,
    pub status: TestStatus,
    /// Cosmetic duration shown to the operator
    pub duration: Duration,
}

/// Counters projected from the results so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregateStats {
    pub total_run: usize,
    pub passed: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl AggregateStats {
    pub fn from_results(results: &[TestResult], elapsed: Duration) -> Self {
        let passed = results
            .iter()
            .filter(|r| r.status == TestStatus::Passed)
            .count();
        Self {
            total_run: results.len(),
            passed,
            failed: results.len() - passed,
            elapsed,
        }
    }
}

/// State of a single run, created fresh on every start
#[derive(Debug, Clone)]
pub struct RunState {
    pub(crate) config: RunConfig,
    pub(crate) suite: Vec<TestCaseDescriptor>,
    pub(crate) current_index: usize,
    /// Creation time, reset when the connect phase ends
    pub(crate) start_time: Instant,
    pub(crate) results: Vec<TestResult>,
    pub(crate) is_running: bool,
    pub(crate) wake: Wake,
}

impl RunState {
    pub(crate) fn new(config: RunConfig, suite: Vec<TestCaseDescriptor>, now: Instant) -> Self {
        Self {
            config,
            suite,
            current_index: 0,
            start_time: now,
            results: Vec::new(),
            is_running: true,
            wake: Wake::Connected,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn suite(&self) -> &[TestCaseDescriptor] {
        &self.suite
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn results(&self) -> &[TestResult] {
        &self.results
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn phase(&self) -> Phase {
        match (self.is_running, self.wake) {
            (false, _) => Phase::Idle,
            (true, Wake::Connected) => Phase::Connecting,
            (true, _) => Phase::Stepping,
        }
    }

    /// Stats for the results so far, with elapsed time since connecting ended
    pub fn stats(&self, now: Instant) -> AggregateStats {
        AggregateStats::from_results(&self.results, now.saturating_duration_since(self.start_time))
    }
}
