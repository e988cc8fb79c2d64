//! Result sink interface
//!
//! The sequencer reports everything through these one-way notifications.
//! A sink only observes the values handed to it; it never reaches back
//! into sequencer state.

mod recording;

use serde::{Deserialize, Serialize};

use crate::catalog::ExpectedOutcome;

pub use recording::{RecordingSink, SinkEvent};

/// Recorded status of a completed test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    Passed,
    Failed,
}

impl From<ExpectedOutcome> for TestStatus {
    fn from(outcome: ExpectedOutcome) -> Self {
        match outcome {
            ExpectedOutcome::Pass => Self::Passed,
            ExpectedOutcome::Fail => Self::Failed,
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Passed => write!(f, "PASSED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Receiver of sequencer notifications
///
/// All calls are fire-and-forget. `update_stats` calls replace one another
/// (last write wins); `append_log` is append-only.
pub trait ResultSink {
    /// Replace the current status text
    fn notify_status(&mut self, text: &str);

    /// Append one line to the run log
    fn append_log(&mut self, line: &str);

    /// Add one row to the results table
    fn record_test_result(&mut self, name: &str, status: TestStatus, duration: &str);

    /// Replace the aggregate counters
    fn update_stats(&mut self, total: usize, passed: usize, failed: usize, elapsed: &str);

    /// Reset results ahead of a new run
    fn clear(&mut self);
}

impl<S: ResultSink + ?Sized> ResultSink for Box<S> {
    fn notify_status(&mut self, text: &str) {
        (**self).notify_status(text)
    }

    fn append_log(&mut self, line: &str) {
        (**self).append_log(line)
    }

    fn record_test_result(&mut self, name: &str, status: TestStatus, duration: &str) {
        (**self).record_test_result(name, status, duration)
    }

    fn update_stats(&mut self, total: usize, passed: usize, failed: usize, elapsed: &str) {
        (**self).update_stats(total, passed, failed, elapsed)
    }

    fn clear(&mut self) {
        (**self).clear()
    }
}
