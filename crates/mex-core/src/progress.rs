//! Aggregate run progress shared by all workers.
//!
//! Counters live behind one mutex so a snapshot is a single consistent read.
//! Consumers poll or subscribe through the scheduler's callbacks; the
//! reporter never blocks a producer on a consumer.

use std::sync::Mutex;

use crate::job::{JobOutcome, JobStatus};

/// Point-in-time view of the run counters. All fields are monotonic except
/// `in_flight`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    /// Jobs handed to the run at start.
    pub submitted: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub cancelled: usize,
    /// Jobs pulled by a worker but not yet terminal.
    pub in_flight: usize,
    /// Total bytes written by successful downloads.
    pub bytes_written: u64,
}

impl ProgressSnapshot {
    /// Jobs that reached a terminal outcome.
    pub fn terminal(&self) -> usize {
        self.completed + self.failed + self.skipped + self.cancelled
    }

    /// Fraction of submitted jobs that are terminal, in [0.0, 1.0].
    pub fn fraction(&self) -> f64 {
        if self.submitted == 0 {
            return 1.0;
        }
        (self.terminal() as f64 / self.submitted as f64).min(1.0)
    }
}

/// Thread-safe counters for one run. Owned by the run, not a process global.
#[derive(Debug, Default)]
pub struct ProgressReporter {
    inner: Mutex<ProgressSnapshot>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the size of the submitted job list. Called once, at run start.
    pub fn set_submitted(&self, n: usize) {
        self.inner.lock().unwrap().submitted = n;
    }

    /// A worker pulled a job off the queue.
    pub fn job_started(&self) {
        self.inner.lock().unwrap().in_flight += 1;
    }

    /// Record a terminal outcome. Every `job_started` pairs with exactly one
    /// `record`, so `in_flight` counts pulled-but-not-terminal jobs.
    pub fn record(&self, outcome: &JobOutcome) {
        let mut s = self.inner.lock().unwrap();
        s.in_flight = s.in_flight.saturating_sub(1);
        match outcome.status {
            JobStatus::Succeeded => s.completed += 1,
            JobStatus::Failed => s.failed += 1,
            JobStatus::SkippedDuplicate => s.skipped += 1,
            JobStatus::Cancelled => s.cancelled += 1,
        }
        s.bytes_written += outcome.bytes_written;
    }

    /// Consistent point-in-time copy of the counters.
    pub fn snapshot(&self) -> ProgressSnapshot {
        *self.inner.lock().unwrap()
    }
}
