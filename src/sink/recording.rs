//! In-memory sink that records every notification in order
//!
//! Clones share the same event list, so a host can hand one clone to the
//! sequencer and inspect another.

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use super::{ResultSink, TestStatus};

/// One notification as received by a sink
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SinkEvent {
    Status {
        text: String,
    },
    Log {
        line: String,
    },
    TestResult {
        name: String,
        status: TestStatus,
        duration: String,
    },
    Stats {
        total: usize,
        passed: usize,
        failed: usize,
        elapsed: String,
    },
    Clear,
}

/// Sink that keeps an ordered record of notifications
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<SinkEvent>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SinkEvent>> {
        // A panic while pushing cannot leave the Vec inconsistent
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, event: SinkEvent) {
        self.lock().push(event);
    }

    /// Snapshot of all events so far
    pub fn events(&self) -> Vec<SinkEvent> {
        self.lock().clone()
    }

    /// All log lines in order
    pub fn log_lines(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Log { line } => Some(line.clone()),
                _ => None,
            })
            .collect()
    }

    /// All recorded test rows in order
    pub fn test_results(&self) -> Vec<(String, TestStatus, String)> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::TestResult {
                    name,
                    status,
                    duration,
                } => Some((name.clone(), *status, duration.clone())),
                _ => None,
            })
            .collect()
    }

    /// Every stats update in order
    pub fn stats_updates(&self) -> Vec<(usize, usize, usize, String)> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Stats {
                    total,
                    passed,
                    failed,
                    elapsed,
                } => Some((*total, *passed, *failed, elapsed.clone())),
                _ => None,
            })
            .collect()
    }

    /// The most recent status text
    pub fn last_status(&self) -> Option<String> {
        self.lock().iter().rev().find_map(|e| match e {
            SinkEvent::Status { text } => Some(text.clone()),
            _ => None,
        })
    }

    /// Number of `clear()` calls received
    pub fn clear_count(&self) -> usize {
        self.lock()
            .iter()
            .filter(|e| matches!(e, SinkEvent::Clear))
            .count()
    }
}

impl ResultSink for RecordingSink {
    fn notify_status(&mut self, text: &str) {
        self.push(SinkEvent::Status {
            text: text.to_string(),
        });
    }

    fn append_log(&mut self, line: &str) {
        self.push(SinkEvent::Log {
            line: line.to_string(),
        });
    }

    fn record_test_result(&mut self, name: &str, status: TestStatus, duration: &str) {
        self.push(SinkEvent::TestResult {
            name: name.to_string(),
            status,
            duration: duration.to_string(),
        });
    }

    fn update_stats(&mut self, total: usize, passed: usize, failed: usize, elapsed: &str) {
        self.push(SinkEvent::Stats {
            total,
            passed,
            failed,
            elapsed: elapsed.to_string(),
        });
    }

    fn clear(&mut self) {
        self.push(SinkEvent::Clear);
    }
}
