#![allow(dead_code)]

pub mod media_server;

use std::time::Duration;

use mex_core::retry::RetryPolicy;

/// Millisecond-scale retry policy so failing tests don't sit in backoff.
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(5),
        max_delay: Duration::from_millis(10),
    }
}
