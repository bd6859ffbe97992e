//! In-run deduplication of job identifiers.

use std::collections::HashSet;
use std::sync::Mutex;

/// Shared set of identifiers already admitted this run. The membership check
/// and the insert happen under one lock acquisition, so two workers pulling
/// jobs with the same id can never both admit.
#[derive(Debug, Default)]
pub struct DedupTracker {
    seen: Mutex<HashSet<String>>,
}

impl DedupTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically check-and-insert `id`. Returns `false` when the id was
    /// already admitted; the caller then reports the job skipped-duplicate
    /// without executing it.
    pub fn try_admit(&self, id: &str) -> bool {
        self.seen.lock().unwrap().insert(id.to_string())
    }
}
