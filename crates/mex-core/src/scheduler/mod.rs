//! Bounded worker pool driving jobs to terminal outcomes: shared queue →
//! dedup gate → executor → outcome channel → collector, with batch-boundary
//! callbacks and cooperative cancellation.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use crate::control::CancelFlag;
use crate::dedup::DedupTracker;
use crate::executor::DownloadExecutor;
use crate::job::{DownloadJob, JobOutcome, JobStatus};
use crate::progress::{ProgressReporter, ProgressSnapshot};
use crate::retry::RetryPolicy;
use crate::storage;

mod queue;

use queue::{JobQueue, Popped};

/// How long an idle worker waits before re-polling the queue.
const QUEUE_POLL: Duration = Duration::from_millis(50);
/// Collector wakeup interval for cancellation and drain checks.
const COLLECT_TICK: Duration = Duration::from_millis(100);
/// Default time in-flight jobs get to finish after a stop request.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(15);

/// Pool sizing, immutable for the run. Values below 1 are bumped to 1 at
/// construction.
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    worker_count: usize,
    batch_size: usize,
}

impl BatchConfig {
    pub fn new(worker_count: usize, batch_size: usize) -> Self {
        Self {
            worker_count: worker_count.max(1),
            batch_size: batch_size.max(1),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self::new(2, 100)
    }
}

/// Handed to the batch-boundary callback after every full batch of terminal
/// outcomes, and once more at drain when a partial tail remains.
#[derive(Debug, Clone, Copy)]
pub struct BatchCheckpoint {
    /// 1-based batch number.
    pub index: usize,
    /// Terminal outcomes seen so far.
    pub terminal: usize,
    pub snapshot: ProgressSnapshot,
}

/// Everything a finished run reports back.
#[derive(Debug)]
pub struct RunReport {
    pub snapshot: ProgressSnapshot,
    pub outcomes: Vec<JobOutcome>,
    pub batch_events: usize,
    pub stopped: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RunState {
    Idle,
    Running,
    Draining,
    Cancelling,
    Finished,
}

impl RunState {
    fn as_str(self) -> &'static str {
        match self {
            RunState::Idle => "idle",
            RunState::Running => "running",
            RunState::Draining => "draining",
            RunState::Cancelling => "cancelling",
            RunState::Finished => "finished",
        }
    }
}

type ProgressCallback = Box<dyn FnMut(&ProgressSnapshot) + Send>;
type BoundaryCallback = Box<dyn FnMut(&BatchCheckpoint) + Send>;

/// One run of the download engine. Consumed by `run`; a scheduler value
/// cannot be restarted.
pub struct Scheduler {
    out_dir: PathBuf,
    batch: BatchConfig,
    retry: RetryPolicy,
    cancel: CancelFlag,
    paused: bool,
    grace: Duration,
    on_progress: Option<ProgressCallback>,
    on_batch_boundary: Option<BoundaryCallback>,
}

impl Scheduler {
    pub fn new(
        out_dir: impl Into<PathBuf>,
        batch: BatchConfig,
        retry: RetryPolicy,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            out_dir: out_dir.into(),
            batch,
            retry,
            cancel,
            paused: false,
            grace: DEFAULT_GRACE,
            on_progress: None,
            on_batch_boundary: None,
        }
    }

    /// Hold each next batch slice back until the boundary callback returns.
    pub fn pause_between_batches(mut self, paused: bool) -> Self {
        self.paused = paused;
        self
    }

    /// Override how long in-flight jobs may keep running after a stop.
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Called on the collector thread after every outcome.
    pub fn on_progress(mut self, f: impl FnMut(&ProgressSnapshot) + Send + 'static) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Called on the collector thread at batch boundaries. In paused mode the
    /// next slice is not released until this returns, so the callback may
    /// block on user confirmation.
    pub fn on_batch_boundary(mut self, f: impl FnMut(&BatchCheckpoint) + Send + 'static) -> Self {
        self.on_batch_boundary = Some(Box::new(f));
        self
    }

    /// Run every job to a terminal outcome and return the report. Blocks the
    /// calling thread; the only error is failing to set up the output
    /// directory.
    pub fn run(mut self, jobs: Vec<DownloadJob>) -> Result<RunReport> {
        std::fs::create_dir_all(&self.out_dir)
            .with_context(|| format!("create output directory: {}", self.out_dir.display()))?;

        let mut state = RunState::Idle;
        let submitted = jobs.len();
        let reporter = Arc::new(ProgressReporter::new());
        reporter.set_submitted(submitted);

        let queue = Arc::new(JobQueue::new(jobs));
        let released = if self.paused {
            queue.release(self.batch.batch_size())
        } else {
            queue.release_all()
        };
        tracing::debug!(submitted, released, paused = self.paused, "queue seeded");

        let dedup = Arc::new(DedupTracker::new());
        let executor = Arc::new(DownloadExecutor::new(
            self.out_dir.clone(),
            self.retry,
            self.cancel.clone(),
        ));

        let (tx, rx) = mpsc::channel();
        let num_workers = self.batch.worker_count().min(submitted);
        let mut handles = Vec::with_capacity(num_workers);
        transition(&mut state, RunState::Running);
        for _ in 0..num_workers {
            let queue = Arc::clone(&queue);
            let dedup = Arc::clone(&dedup);
            let executor = Arc::clone(&executor);
            let reporter = Arc::clone(&reporter);
            let cancel = self.cancel.clone();
            let tx = tx.clone();
            handles.push(std::thread::spawn(move || {
                worker_loop(&queue, &dedup, &executor, &reporter, &cancel, &tx);
            }));
        }
        drop(tx);

        let mut outcomes: Vec<JobOutcome> = Vec::with_capacity(submitted);
        let mut terminals = 0usize;
        let mut batch_events = 0usize;
        let mut grace_deadline: Option<Instant> = None;
        let mut stragglers = false;

        loop {
            if self.cancel.is_stopped() && state != RunState::Cancelling {
                transition(&mut state, RunState::Cancelling);
                let dropped = queue.cancel();
                if dropped > 0 {
                    tracing::info!(dropped, "stop requested, dropped queued jobs");
                }
                grace_deadline = Some(Instant::now() + self.grace);
            } else if state == RunState::Running && queue.is_drained() {
                transition(&mut state, RunState::Draining);
            }

            match rx.recv_timeout(COLLECT_TICK) {
                Ok(outcome) => {
                    log_outcome(&outcome);
                    outcomes.push(outcome);
                    terminals += 1;
                    if let Some(cb) = self.on_progress.as_mut() {
                        cb(&reporter.snapshot());
                    }
                    if !self.cancel.is_stopped() && terminals % self.batch.batch_size() == 0 {
                        batch_events += 1;
                        fire_boundary(
                            &mut self.on_batch_boundary,
                            batch_events,
                            terminals,
                            &reporter,
                        );
                        if self.paused && !self.cancel.is_stopped() {
                            let n = queue.release(self.batch.batch_size());
                            if n > 0 {
                                tracing::debug!(released = n, "released next batch slice");
                            }
                        }
                    }
                }
                Err(mpsc::RecvTimeoutError::Timeout) => {}
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }

            if let Some(deadline) = grace_deadline {
                if Instant::now() >= deadline {
                    stragglers = true;
                    break;
                }
            }
        }

        // Pick up anything sent during the last tick before the break.
        while let Ok(outcome) = rx.try_recv() {
            log_outcome(&outcome);
            outcomes.push(outcome);
            terminals += 1;
        }

        if stragglers {
            // Workers still in flight past the grace period are left behind;
            // their temp files are swept now and again on the next run.
            let removed = storage::remove_stale_parts(&self.out_dir);
            tracing::warn!(
                removed,
                grace_secs = self.grace.as_secs(),
                "grace period expired with workers still in flight"
            );
        } else {
            for h in handles {
                if h.join().is_err() {
                    tracing::warn!("worker thread panicked");
                }
            }
        }

        if !self.cancel.is_stopped() && terminals > 0 && terminals % self.batch.batch_size() != 0 {
            batch_events += 1;
            fire_boundary(&mut self.on_batch_boundary, batch_events, terminals, &reporter);
        }
        // Read after the tail event: a stop requested inside its callback
        // still counts for this run.
        let stopped = self.cancel.is_stopped();

        if state == RunState::Running {
            transition(&mut state, RunState::Draining);
        }
        transition(&mut state, RunState::Finished);

        let snapshot = reporter.snapshot();
        tracing::info!(
            submitted,
            succeeded = snapshot.completed,
            failed = snapshot.failed,
            skipped = snapshot.skipped,
            cancelled = snapshot.cancelled,
            bytes = snapshot.bytes_written,
            batch_events,
            stopped,
            "run finished"
        );
        Ok(RunReport {
            snapshot,
            outcomes,
            batch_events,
            stopped,
        })
    }
}

fn worker_loop(
    queue: &JobQueue,
    dedup: &DedupTracker,
    executor: &DownloadExecutor,
    reporter: &ProgressReporter,
    cancel: &CancelFlag,
    tx: &mpsc::Sender<JobOutcome>,
) {
    loop {
        if cancel.is_stopped() {
            break;
        }
        let job = match queue.pop() {
            Popped::Job(job) => job,
            Popped::Pending => {
                std::thread::sleep(QUEUE_POLL);
                continue;
            }
            Popped::Exhausted => break,
        };
        reporter.job_started();
        let outcome = if dedup.try_admit(&job.id) {
            executor.execute(&job)
        } else {
            JobOutcome::skipped(&job)
        };
        reporter.record(&outcome);
        let _ = tx.send(outcome);
    }
}

fn fire_boundary(
    callback: &mut Option<BoundaryCallback>,
    index: usize,
    terminal: usize,
    reporter: &ProgressReporter,
) {
    tracing::info!(batch = index, terminal, "batch boundary");
    if let Some(cb) = callback.as_mut() {
        cb(&BatchCheckpoint {
            index,
            terminal,
            snapshot: reporter.snapshot(),
        });
    }
}

fn log_outcome(outcome: &JobOutcome) {
    match outcome.status {
        JobStatus::Failed => tracing::warn!(
            job_id = %outcome.job_id,
            attempts = outcome.attempts,
            error = outcome.error.as_deref().unwrap_or("unknown"),
            "job failed"
        ),
        _ => tracing::debug!(
            job_id = %outcome.job_id,
            status = outcome.status.as_str(),
            attempts = outcome.attempts,
            bytes = outcome.bytes_written,
            "job finished"
        ),
    }
}

fn transition(state: &mut RunState, next: RunState) {
    tracing::info!(from = state.as_str(), to = next.as_str(), "run state");
    *state = next;
}
