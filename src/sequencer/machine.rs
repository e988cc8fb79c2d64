//! Execution sequencer state machine
//!
//! The machine never sleeps. [`Sequencer::start`] and [`Sequencer::resume`]
//! run synchronously up to the next suspension point and return the delay
//! after which `resume` must be called, or `None` once the run is back in
//! Idle. The suspension points are the end of the connect phase, the end of
//! each step delay, and the gap between steps. A driver (see
//! [`super::driver`]) owns the machine and supplies the timer.

use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::time::Instant;

use crate::catalog::Catalog;
use crate::common::{Error, Result};
use crate::profile::RunConfig;
use crate::sink::{ResultSink, TestStatus};

use super::state::{Phase, RunState, TestResult, Wake};
use super::timing::{format_elapsed, format_test_duration, Timing};

/// Status text shown while a run is in flight
pub const STATUS_RUNNING: &str = "Running...";
/// Final status when at least one test failed
pub const STATUS_SOME_FAILED: &str = "Complete - Some tests failed";
/// Final status when every test passed
pub const STATUS_ALL_PASSED: &str = "Complete - All tests passed";
/// Final status after an internal fault
pub const STATUS_ABORTED: &str = "Aborted - internal error";
/// Log line emitted when a start is rejected
pub const WARN_ALREADY_RUNNING: &str = "[WARNING] Tests already running!";

/// Single-flight test execution sequencer
pub struct Sequencer<S> {
    catalog: Arc<Catalog>,
    sink: S,
    timing: Timing,
    rng: StdRng,
    run: Option<RunState>,
}

impl<S: std::fmt::Debug> std::fmt::Debug for Sequencer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("sink", &self.sink)
            .field("timing", &self.timing)
            .field("run", &self.run)
            .finish_non_exhaustive()
    }
}

impl<S: ResultSink> Sequencer<S> {
    /// Create an idle sequencer with an entropy-seeded random source
    pub fn new(catalog: Arc<Catalog>, sink: S, timing: Timing) -> Self {
        Self {
            catalog,
            sink,
            timing,
            rng: StdRng::from_entropy(),
            run: None,
        }
    }

    /// Use a fixed seed so delays and displayed durations are reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn is_running(&self) -> bool {
        self.run.as_ref().is_some_and(|run| run.is_running)
    }

    pub fn phase(&self) -> Phase {
        self.run.as_ref().map_or(Phase::Idle, RunState::phase)
    }

    /// State of the current or most recent run
    pub fn run_state(&self) -> Option<&RunState> {
        self.run.as_ref()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Begin a run
    ///
    /// While a run is in flight this only logs a warning and returns `None`;
    /// the in-flight run and its pending timer are untouched.
    pub fn start(&mut self, config: RunConfig, now: Instant) -> Option<Duration> {
        if self.is_running() {
            tracing::warn!(suite = %config.suite_id, "Rejected start while a run is in flight");
            self.sink.append_log(WARN_ALREADY_RUNNING);
            return None;
        }

        self.sink.clear();
        let suite = self.catalog.resolve(&config.suite_id).to_vec();
        tracing::info!(
            suite = %config.suite_id,
            tests = suite.len(),
            device = %config.device_address,
            port = %config.port,
            "Starting run"
        );

        self.sink.notify_status(STATUS_RUNNING);
        self.sink
            .append_log(&format!("[INFO] Starting test suite: {}", config.suite_id));
        self.sink.append_log(&format!(
            "[INFO] Target device: {}:{}",
            config.device_address, config.port
        ));
        self.sink
            .append_log(&format!("[INFO] Timeout: {}s", config.timeout_seconds));
        if config.verbose {
            self.sink.append_log(&format!(
                "[DEBUG] Resolved {} tests, stop on first failure: {}",
                suite.len(),
                config.stop_on_first_failure
            ));
        }
        self.sink.append_log("[INFO] Connecting to device...");

        self.run = Some(RunState::new(config, suite, now));
        Some(self.timing.connect_delay)
    }

    /// Run the pending continuation
    ///
    /// Returns the delay until the next continuation, or `None` when the run
    /// has returned to Idle. Calling this while idle does nothing.
    pub fn resume(&mut self, now: Instant) -> Option<Duration> {
        let mut run = match self.run.take() {
            Some(run) if run.is_running => run,
            other => {
                self.run = other;
                return None;
            }
        };

        let next = match run.wake {
            Wake::Connected => {
                self.on_connected(&mut run, now);
                self.begin_step(&mut run, now)
            }
            Wake::StepDone => match self.complete_step(&mut run, now) {
                Ok(next) => next,
                Err(e) => {
                    self.abort(&mut run, &e);
                    None
                }
            },
            Wake::NextStep => self.begin_step(&mut run, now),
        };

        self.run = Some(run);
        next
    }

    fn on_connected(&mut self, run: &mut RunState, now: Instant) {
        self.sink.append_log("[INFO] Connection established!");
        self.sink
            .append_log(&format!("[INFO] Running {} tests...", run.suite.len()));
        // Elapsed time is measured from here
        run.start_time = now;
        tracing::debug!("Connected, stepping through suite");
    }

    fn begin_step(&mut self, run: &mut RunState, now: Instant) -> Option<Duration> {
        let Some(test) = run.suite.get(run.current_index) else {
            // Only reachable with an empty suite
            self.finish(run, now);
            return None;
        };

        self.sink
            .append_log(&format!("[INFO] Running {}...", test.name));
        let delay = self.timing.sample_step_delay(&mut self.rng);
        if run.config.verbose {
            self.sink.append_log(&format!(
                "[DEBUG] {} scheduled to complete in {}ms",
                test.name,
                delay.as_millis()
            ));
        }
        tracing::debug!(index = run.current_index, test = %test.name, ?delay, "Step started");

        run.wake = Wake::StepDone;
        Some(delay)
    }

    fn complete_step(&mut self, run: &mut RunState, now: Instant) -> Result<Option<Duration>> {
        let test = run.suite.get(run.current_index).cloned().ok_or_else(|| {
            Error::Internal(format!(
                "step index {} out of bounds for suite of {} tests",
                run.current_index,
                run.suite.len()
            ))
        })?;
        if run.results.len() != run.current_index {
            return Err(Error::Internal(format!(
                "{} results recorded at step index {}",
                run.results.len(),
                run.current_index
            )));
        }

        let status = TestStatus::from(test.expected_outcome);
        let display_secs = self.timing.sample_display_duration(&mut self.rng);
        let duration = format_test_duration(display_secs);

        match status {
            TestStatus::Passed => {
                self.sink
                    .append_log(&format!("[PASS] {} ({})", test.name, duration));
            }
            TestStatus::Failed => {
                self.sink
                    .append_log(&format!("[FAIL] {} ({})", test.name, duration));
                self.sink
                    .append_log(&format!("[ERROR] {}", test.failure_message));
            }
        }
        self.sink.record_test_result(&test.name, status, &duration);

        run.results.push(TestResult {
            name: test.name.clone(),
            status,
            duration: Duration::from_secs_f64(display_secs),
        });
        let stats = run.stats(now);
        self.sink.update_stats(
            stats.total_run,
            stats.passed,
            stats.failed,
            &format_elapsed(stats.elapsed),
        );
        run.current_index += 1;
        tracing::debug!(index = run.current_index, test = %test.name, %status, "Step completed");

        let remaining = run.suite.len() - run.current_index;
        if remaining == 0 {
            self.finish(run, now);
            return Ok(None);
        }
        if status == TestStatus::Failed && run.config.stop_on_first_failure {
            self.sink.append_log(&format!(
                "[WARNING] Stopping on first failure: {} tests skipped",
                remaining
            ));
            self.finish(run, now);
            return Ok(None);
        }

        run.wake = Wake::NextStep;
        Ok(Some(self.timing.inter_step_delay))
    }

    fn finish(&mut self, run: &mut RunState, now: Instant) {
        let stats = run.stats(now);
        let total = run.suite.len();
        let skipped = total - stats.total_run;
        let elapsed = format_elapsed(stats.elapsed);

        self.sink.append_log("[INFO] Test execution complete!");
        if skipped > 0 {
            self.sink.append_log(&format!(
                "[INFO] Results: {} passed, {} failed, {} skipped, {} total",
                stats.passed, stats.failed, skipped, total
            ));
        } else {
            self.sink.append_log(&format!(
                "[INFO] Results: {} passed, {} failed, {} total",
                stats.passed, stats.failed, total
            ));
        }
        self.sink.append_log(&format!("[INFO] Duration: {}", elapsed));
        self.sink
            .update_stats(stats.total_run, stats.passed, stats.failed, &elapsed);

        if stats.failed > 0 {
            self.sink.notify_status(STATUS_SOME_FAILED);
        } else {
            self.sink.notify_status(STATUS_ALL_PASSED);
        }

        run.is_running = false;
        tracing::info!(
            passed = stats.passed,
            failed = stats.failed,
            skipped,
            elapsed = %elapsed,
            "Run complete"
        );
    }

    fn abort(&mut self, run: &mut RunState, error: &Error) {
        tracing::error!(%error, "Run aborted");
        self.sink.append_log(&format!("[ERROR] Run aborted: {}", error));
        self.sink.notify_status(STATUS_ABORTED);
        run.is_running = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ExpectedOutcome, DEFAULT_SUITE};
    use crate::sink::{RecordingSink, SinkEvent};

    fn config(suite: &str) -> RunConfig {
        RunConfig {
            suite_id: suite.to_string(),
            ..RunConfig::default()
        }
    }

    fn sequencer() -> (Sequencer<RecordingSink>, RecordingSink) {
        let sink = RecordingSink::new();
        let seq = Sequencer::new(Arc::new(Catalog::builtin()), sink.clone(), Timing::default())
            .with_seed(42);
        (seq, sink)
    }

    /// Drive a run to completion on a virtual clock, checking invariants at
    /// every suspension point after connecting.
    fn drive(seq: &mut Sequencer<RecordingSink>, start: Instant, first: Duration) -> Instant {
        let mut now = start;
        let mut next = Some(first);
        let mut last_index = 0;
        while let Some(delay) = next {
            now += delay;
            next = seq.resume(now);
            let run = seq.run_state().unwrap();
            assert_eq!(run.results().len(), run.current_index());
            assert!(run.current_index() == last_index || run.current_index() == last_index + 1);
            last_index = run.current_index();
            let stats = run.stats(now);
            assert_eq!(stats.passed + stats.failed, stats.total_run);
        }
        now
    }

    #[test]
    fn test_gpio_scenario() {
        let (mut seq, sink) = sequencer();
        let start = Instant::now();
        let first = seq.start(config("GPIO Functionality Tests"), start).unwrap();
        assert_eq!(first, Duration::from_millis(500));
        assert_eq!(seq.phase(), Phase::Connecting);

        drive(&mut seq, start, first);
        assert_eq!(seq.phase(), Phase::Idle);

        let names: Vec<_> = sink.test_results().into_iter().map(|(n, _, _)| n).collect();
        assert_eq!(
            names,
            vec!["test_gpio_read", "test_gpio_write", "test_gpio_toggle", "test_gpio_interrupt"]
        );
        let (total, passed, failed, _) = sink.stats_updates().last().cloned().unwrap();
        assert_eq!((total, passed, failed), (4, 3, 1));
        assert_eq!(sink.last_status().as_deref(), Some(STATUS_SOME_FAILED));
        assert!(sink
            .log_lines()
            .iter()
            .any(|l| l == "[ERROR] Interrupt not triggered"));
    }

    #[test]
    fn test_power_scenario_all_pass() {
        let (mut seq, sink) = sequencer();
        let start = Instant::now();
        let first = seq.start(config("Power Management Tests"), start).unwrap();
        drive(&mut seq, start, first);

        let (total, passed, failed, _) = sink.stats_updates().last().cloned().unwrap();
        assert_eq!((total, passed, failed), (4, 4, 0));
        assert_eq!(sink.last_status().as_deref(), Some(STATUS_ALL_PASSED));
        assert!(sink
            .test_results()
            .iter()
            .all(|(_, status, _)| *status == TestStatus::Passed));
    }

    #[test]
    fn test_log_sequence_for_run() {
        let (mut seq, sink) = sequencer();
        let start = Instant::now();
        let first = seq.start(config("Power Management Tests"), start).unwrap();
        drive(&mut seq, start, first);

        let lines = sink.log_lines();
        assert_eq!(
            &lines[..6],
            &[
                "[INFO] Starting test suite: Power Management Tests",
                "[INFO] Target device: 192.168.1.100:8080",
                "[INFO] Timeout: 30s",
                "[INFO] Connecting to device...",
                "[INFO] Connection established!",
                "[INFO] Running 4 tests...",
            ]
        );
        assert_eq!(lines[6], "[INFO] Running test_power_on_sequence...");
        assert!(lines[7].starts_with("[PASS] test_power_on_sequence ("));
        assert!(lines[7].ends_with("s)"));

        let tail = &lines[lines.len() - 3..];
        assert_eq!(tail[0], "[INFO] Test execution complete!");
        assert_eq!(tail[1], "[INFO] Results: 4 passed, 0 failed, 4 total");
        assert!(tail[2].starts_with("[INFO] Duration: 0:0"));
    }

    #[test]
    fn test_clear_precedes_first_notification() {
        let (mut seq, sink) = sequencer();
        seq.start(config(DEFAULT_SUITE), Instant::now()).unwrap();
        let events = sink.events();
        assert_eq!(events[0], SinkEvent::Clear);
        assert_eq!(
            events[1],
            SinkEvent::Status {
                text: STATUS_RUNNING.to_string()
            }
        );
    }

    #[test]
    fn test_stats_track_descriptor_outcomes_per_step() {
        let (mut seq, sink) = sequencer();
        let start = Instant::now();
        let first = seq.start(config("Sensor Integration Tests"), start).unwrap();
        drive(&mut seq, start, first);

        let suite = Catalog::builtin().resolve("Sensor Integration Tests").to_vec();
        let updates = sink.stats_updates();
        // One update per completed step plus the final one
        assert_eq!(updates.len(), suite.len() + 1);
        for (i, (total, passed, failed, _)) in updates[..suite.len()].iter().enumerate() {
            let prefix = &suite[..=i];
            let want_pass = prefix
                .iter()
                .filter(|t| t.expected_outcome == ExpectedOutcome::Pass)
                .count();
            assert_eq!(*total, i + 1);
            assert_eq!(*passed, want_pass);
            assert_eq!(*failed, i + 1 - want_pass);
        }
    }

    #[test]
    fn test_outcome_independent_of_seed() {
        for seed in [0, 1, 2, 99, 12345] {
            let sink = RecordingSink::new();
            let mut seq =
                Sequencer::new(Arc::new(Catalog::builtin()), sink.clone(), Timing::default())
                    .with_seed(seed);
            let start = Instant::now();
            let first = seq.start(config(DEFAULT_SUITE), start).unwrap();
            drive(&mut seq, start, first);

            let statuses: Vec<_> = sink.test_results().into_iter().map(|(_, s, _)| s).collect();
            let expected: Vec<_> = Catalog::builtin()
                .resolve(DEFAULT_SUITE)
                .iter()
                .map(|t| TestStatus::from(t.expected_outcome))
                .collect();
            assert_eq!(statuses, expected, "seed {}", seed);
        }
    }

    #[test]
    fn test_single_flight_rejects_second_start() {
        let (mut seq, sink) = sequencer();
        let start = Instant::now();
        let first = seq.start(config("GPIO Functionality Tests"), start).unwrap();
        let next = seq.resume(start + first).unwrap();
        let index_before = seq.run_state().unwrap().current_index();
        let events_before = sink.events().len();

        assert!(seq
            .start(config("Power Management Tests"), start + first)
            .is_none());

        let events = sink.events();
        assert_eq!(events.len(), events_before + 1);
        assert_eq!(
            events.last(),
            Some(&SinkEvent::Log {
                line: WARN_ALREADY_RUNNING.to_string()
            })
        );
        assert_eq!(sink.clear_count(), 1);
        let run = seq.run_state().unwrap();
        assert_eq!(run.current_index(), index_before);
        assert_eq!(run.config().suite_id, "GPIO Functionality Tests");

        drive(&mut seq, start + first, next);
        assert_eq!(sink.test_results().len(), 4);
    }

    #[test]
    fn test_new_run_replaces_previous_state() {
        let (mut seq, sink) = sequencer();
        let start = Instant::now();
        let first = seq.start(config("GPIO Functionality Tests"), start).unwrap();
        let end = drive(&mut seq, start, first);
        assert_eq!(seq.run_state().unwrap().results().len(), 4);

        let first = seq.start(config(DEFAULT_SUITE), end).unwrap();
        let run = seq.run_state().unwrap();
        assert!(run.results().is_empty());
        assert_eq!(run.current_index(), 0);
        assert_eq!(sink.clear_count(), 2);

        drive(&mut seq, end, first);
        assert_eq!(seq.run_state().unwrap().results().len(), 5);
    }

    #[test]
    fn test_unknown_suite_runs_default() {
        let (mut seq, sink) = sequencer();
        let start = Instant::now();
        let first = seq.start(config("Nonexistent Suite"), start).unwrap();
        drive(&mut seq, start, first);

        assert_eq!(
            sink.log_lines()[0],
            "[INFO] Starting test suite: Nonexistent Suite"
        );
        let names: Vec<_> = sink.test_results().into_iter().map(|(n, _, _)| n).collect();
        let defaults: Vec<_> = Catalog::builtin()
            .resolve(DEFAULT_SUITE)
            .iter()
            .map(|t| t.name.clone())
            .collect();
        assert_eq!(names, defaults);
    }

    #[test]
    fn test_stop_on_first_failure_skips_remaining() {
        let (mut seq, sink) = sequencer();
        let start = Instant::now();
        let cfg = RunConfig {
            stop_on_first_failure: true,
            ..config(DEFAULT_SUITE)
        };
        let first = seq.start(cfg, start).unwrap();
        drive(&mut seq, start, first);

        // test_can_receive is the third test and fails
        let results = sink.test_results();
        assert_eq!(results.len(), 3);
        assert_eq!(results[2].0, "test_can_receive");
        let lines = sink.log_lines();
        assert!(lines.contains(&"[WARNING] Stopping on first failure: 2 tests skipped".to_string()));
        assert!(lines.contains(&"[INFO] Results: 2 passed, 1 failed, 2 skipped, 5 total".to_string()));
        let (total, passed, failed, _) = sink.stats_updates().last().cloned().unwrap();
        assert_eq!((total, passed, failed), (3, 2, 1));
        assert_eq!(sink.last_status().as_deref(), Some(STATUS_SOME_FAILED));
        assert_eq!(seq.phase(), Phase::Idle);
    }

    #[test]
    fn test_stop_on_first_failure_when_last_test_fails() {
        let (mut seq, sink) = sequencer();
        let start = Instant::now();
        let cfg = RunConfig {
            stop_on_first_failure: true,
            ..config("GPIO Functionality Tests")
        };
        let first = seq.start(cfg, start).unwrap();
        drive(&mut seq, start, first);

        assert_eq!(sink.test_results().len(), 4);
        assert!(!sink
            .log_lines()
            .iter()
            .any(|l| l.starts_with("[WARNING] Stopping")));
    }

    #[test]
    fn test_verbose_adds_debug_lines() {
        let (mut seq, sink) = sequencer();
        let start = Instant::now();
        let cfg = RunConfig {
            verbose: true,
            ..config("Power Management Tests")
        };
        let first = seq.start(cfg, start).unwrap();
        drive(&mut seq, start, first);

        let debug = sink
            .log_lines()
            .into_iter()
            .filter(|l| l.starts_with("[DEBUG]"))
            .count();
        // One at start plus one per step
        assert_eq!(debug, 5);
    }

    #[test]
    fn test_step_delays_within_bounds() {
        let (mut seq, _sink) = sequencer();
        let start = Instant::now();
        let mut now = start + seq.start(config(DEFAULT_SUITE), start).unwrap();
        let mut next = seq.resume(now);
        while let Some(delay) = next {
            match seq.run_state().unwrap().wake {
                Wake::StepDone => {
                    assert!(delay >= Duration::from_millis(300) && delay <= Duration::from_millis(800))
                }
                Wake::NextStep => assert_eq!(delay, Duration::from_millis(200)),
                Wake::Connected => unreachable!("connect happens once"),
            }
            now += delay;
            next = seq.resume(now);
        }
    }

    #[test]
    fn test_elapsed_measured_from_connection() {
        let sink = RecordingSink::new();
        let timing = Timing {
            connect_delay: Duration::from_secs(90),
            step_delay_min: Duration::from_secs(20),
            step_delay_max: Duration::from_secs(20),
            inter_step_delay: Duration::from_secs(10),
            ..Timing::default()
        };
        let mut seq = Sequencer::new(Arc::new(Catalog::builtin()), sink.clone(), timing);
        let start = Instant::now();
        let first = seq.start(config("Power Management Tests"), start).unwrap();
        drive(&mut seq, start, first);

        // 4 steps of 20s plus 3 gaps of 10s; the 90s connect is excluded
        let elapsed: Vec<_> = sink.stats_updates().into_iter().map(|(_, _, _, e)| e).collect();
        assert_eq!(elapsed, vec!["0:20", "0:50", "1:20", "1:50", "1:50"]);
        assert!(sink.log_lines().contains(&"[INFO] Duration: 1:50".to_string()));
    }

    #[test]
    fn test_resume_while_idle_is_noop() {
        let (mut seq, sink) = sequencer();
        assert!(seq.resume(Instant::now()).is_none());
        assert!(sink.events().is_empty());
        assert_eq!(seq.phase(), Phase::Idle);
    }

    #[test]
    fn test_out_of_bounds_index_aborts_to_idle() {
        let (mut seq, sink) = sequencer();
        let start = Instant::now();
        let first = seq.start(config("GPIO Functionality Tests"), start).unwrap();
        let step = seq.resume(start + first).unwrap();

        let run = seq.run.as_mut().unwrap();
        run.current_index = 17;
        assert!(seq.resume(start + first + step).is_none());

        assert_eq!(seq.phase(), Phase::Idle);
        assert!(sink
            .log_lines()
            .last()
            .unwrap()
            .starts_with("[ERROR] Run aborted: Internal error: step index 17 out of bounds"));
        assert_eq!(sink.last_status().as_deref(), Some(STATUS_ABORTED));
        assert!(sink.test_results().is_empty());

        // The sequencer accepts a new run afterwards
        assert!(seq.start(config(DEFAULT_SUITE), start).is_some());
    }

    #[test]
    fn test_empty_suite_finishes_immediately() {
        let sink = RecordingSink::new();
        let mut seq = Sequencer::new(Arc::new(Catalog::builtin()), sink.clone(), Timing::default());
        let start = Instant::now();
        let first = seq.start(config(DEFAULT_SUITE), start).unwrap();
        seq.run.as_mut().unwrap().suite.clear();

        assert!(seq.resume(start + first).is_none());
        assert_eq!(seq.phase(), Phase::Idle);
        assert!(sink
            .log_lines()
            .contains(&"[INFO] Results: 0 passed, 0 failed, 0 total".to_string()));
        assert_eq!(sink.last_status().as_deref(), Some(STATUS_ALL_PASSED));
    }
}
