//! Cooperative cancellation: one shared stop flag per run.
//!
//! The scheduler checks it before admitting jobs, executors check it between
//! attempts and inside the transfer write callback, and the batch gate checks
//! it before pausing. A stop is never reset; setting it twice is a no-op.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Slice length for cancellable sleeps; bounds how long a backoff can outlive
/// a stop request.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Shared stop token for one run. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Idempotent.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// True once a stop has been requested.
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Sleep for `dur`, waking early on a stop request. Returns `true` when
    /// the full duration elapsed without a stop.
    pub fn sleep_unless_stopped(&self, dur: Duration) -> bool {
        let deadline = Instant::now() + dur;
        loop {
            if self.is_stopped() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(SLEEP_SLICE.min(deadline - now));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_is_idempotent() {
        let flag = CancelFlag::new();
        assert!(!flag.is_stopped());
        flag.request_stop();
        assert!(flag.is_stopped());
        flag.request_stop();
        assert!(flag.is_stopped());
    }

    #[test]
    fn clones_share_the_flag() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        other.request_stop();
        assert!(flag.is_stopped());
    }

    #[test]
    fn sleep_completes_when_not_stopped() {
        let flag = CancelFlag::new();
        assert!(flag.sleep_unless_stopped(Duration::from_millis(10)));
    }

    #[test]
    fn sleep_returns_early_when_already_stopped() {
        let flag = CancelFlag::new();
        flag.request_stop();
        let start = Instant::now();
        assert!(!flag.sleep_unless_stopped(Duration::from_secs(5)));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
