//! Shared job queue with slice-based admission for paused batch mode.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::job::DownloadJob;

/// What a worker gets back from a pop.
#[derive(Debug)]
pub enum Popped {
    Job(DownloadJob),
    /// Nothing released right now; more may come. Poll again.
    Pending,
    /// Closed and empty; the worker can exit.
    Exhausted,
}

struct QueueState {
    pending: VecDeque<DownloadJob>,
    ready: VecDeque<DownloadJob>,
    closed: bool,
}

/// FIFO queue split in two: `ready` jobs workers may take now, `pending` jobs
/// held back until released. Continuous mode releases everything up front;
/// paused mode releases one batch slice at a time.
pub struct JobQueue {
    state: Mutex<QueueState>,
}

impl JobQueue {
    pub fn new(jobs: Vec<DownloadJob>) -> Self {
        Self {
            state: Mutex::new(QueueState {
                pending: jobs.into(),
                ready: VecDeque::new(),
                closed: false,
            }),
        }
    }

    /// Move up to `n` pending jobs into the ready set; returns how many
    /// moved. Once the last pending job is released the queue closes, so
    /// workers can tell "wait for more" from "done".
    pub fn release(&self, n: usize) -> usize {
        let mut s = self.state.lock().unwrap();
        let take = n.min(s.pending.len());
        for _ in 0..take {
            if let Some(job) = s.pending.pop_front() {
                s.ready.push_back(job);
            }
        }
        if s.pending.is_empty() {
            s.closed = true;
        }
        take
    }

    /// Release everything at once (continuous mode).
    pub fn release_all(&self) -> usize {
        self.release(usize::MAX)
    }

    pub fn pop(&self) -> Popped {
        let mut s = self.state.lock().unwrap();
        if let Some(job) = s.ready.pop_front() {
            return Popped::Job(job);
        }
        if s.closed {
            Popped::Exhausted
        } else {
            Popped::Pending
        }
    }

    /// Drop everything not yet taken and close. Jobs discarded here never
    /// produce an outcome.
    pub fn cancel(&self) -> usize {
        let mut s = self.state.lock().unwrap();
        let dropped = s.pending.len() + s.ready.len();
        s.pending.clear();
        s.ready.clear();
        s.closed = true;
        dropped
    }

    /// True once the queue is closed and every released job has been taken.
    pub fn is_drained(&self) -> bool {
        let s = self.state.lock().unwrap();
        s.closed && s.pending.is_empty() && s.ready.is_empty()
    }
}
