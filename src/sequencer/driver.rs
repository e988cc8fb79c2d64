//! Timer-driven driver for the sequencer
//!
//! The driver task is the single owner of the [`Sequencer`]. It selects
//! between inbound requests and the pending deadline, so exactly one
//! continuation is in flight and all state changes happen on one task.
//! Hosts talk to it through a cloneable [`SequencerHandle`].

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::common::{Error, Result};
use crate::profile::RunConfig;
use crate::sink::ResultSink;

use super::machine::Sequencer;
use super::state::Phase;

/// Request from a handle to the driver task
#[derive(Debug)]
enum Request {
    Start {
        config: RunConfig,
        reply: oneshot::Sender<StartOutcome>,
    },
}

/// Answer to a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new run began with this id
    Started { run_id: u64 },
    /// A run was already in flight; nothing changed
    Rejected,
}

/// Point-in-time view of the sequencer, published after every transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSnapshot {
    /// Id of the current or most recent run, 0 before the first run
    pub run_id: u64,
    pub phase: Phase,
    pub current_index: usize,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

impl RunSnapshot {
    fn capture<S: ResultSink>(sequencer: &Sequencer<S>, run_id: u64) -> Self {
        match sequencer.run_state() {
            Some(run) => {
                let stats = run.stats(Instant::now());
                Self {
                    run_id,
                    phase: run.phase(),
                    current_index: run.current_index(),
                    total: run.suite().len(),
                    passed: stats.passed,
                    failed: stats.failed,
                }
            }
            None => Self {
                run_id,
                phase: Phase::Idle,
                current_index: 0,
                total: 0,
                passed: 0,
                failed: 0,
            },
        }
    }
}

/// Cloneable handle to a running driver task
#[derive(Debug, Clone)]
pub struct SequencerHandle {
    requests: mpsc::UnboundedSender<Request>,
    snapshots: watch::Receiver<RunSnapshot>,
}

impl SequencerHandle {
    /// Ask the sequencer to start a run
    pub async fn start(&self, config: RunConfig) -> Result<StartOutcome> {
        let (reply, rx) = oneshot::channel();
        self.requests
            .send(Request::Start { config, reply })
            .map_err(|_| Error::SequencerStopped)?;
        rx.await.map_err(|_| Error::SequencerStopped)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> RunSnapshot {
        *self.snapshots.borrow()
    }

    /// Wait until the given run has returned to Idle
    pub async fn wait_finished(&mut self, run_id: u64) -> Result<RunSnapshot> {
        let snapshot = self
            .snapshots
            .wait_for(|s| s.run_id > run_id || (s.run_id == run_id && s.phase == Phase::Idle))
            .await
            .map_err(|_| Error::SequencerStopped)?;
        Ok(*snapshot)
    }
}

/// Spawn the driver task on the current tokio runtime
///
/// The task ends once every handle is dropped and no run is in flight,
/// returning the sequencer so the host can recover its sink.
pub fn spawn<S>(sequencer: Sequencer<S>) -> (SequencerHandle, JoinHandle<Sequencer<S>>)
where
    S: ResultSink + Send + 'static,
{
    let (requests, rx) = mpsc::unbounded_channel();
    let (snapshot_tx, snapshots) = watch::channel(RunSnapshot::capture(&sequencer, 0));
    let task = tokio::spawn(run_loop(sequencer, rx, snapshot_tx));
    (SequencerHandle { requests, snapshots }, task)
}

#[tracing::instrument(skip_all)]
async fn run_loop<S: ResultSink>(
    mut sequencer: Sequencer<S>,
    mut requests: mpsc::UnboundedReceiver<Request>,
    snapshots: watch::Sender<RunSnapshot>,
) -> Sequencer<S> {
    let mut deadline: Option<Instant> = None;
    let mut run_id = 0u64;
    let mut accepting = true;

    loop {
        if !accepting && deadline.is_none() {
            tracing::debug!("All handles dropped and no run in flight, stopping driver");
            break;
        }

        tokio::select! {
            request = requests.recv(), if accepting => match request {
                Some(Request::Start { config, reply }) => {
                    let now = Instant::now();
                    let outcome = match sequencer.start(config, now) {
                        Some(delay) => {
                            run_id += 1;
                            deadline = Some(now + delay);
                            StartOutcome::Started { run_id }
                        }
                        None => StartOutcome::Rejected,
                    };
                    tracing::debug!(?outcome, "Handled start request");
                    // The requester may have given up waiting
                    let _ = reply.send(outcome);
                }
                None => accepting = false,
            },
            _ = sleep_until(deadline) => {
                let now = Instant::now();
                deadline = sequencer.resume(now).map(|delay: Duration| now + delay);
            }
        }

        snapshots.send_replace(RunSnapshot::capture(&sequencer, run_id));
    }

    sequencer
}

/// Sleep until the deadline, or forever when nothing is scheduled
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
