//! Retry loop: run a fetch closure until success, exhaustion, or stop.

use crate::control::CancelFlag;
use crate::fetch::FetchError;

use super::classify;
use super::policy::{RetryDecision, RetryPolicy};

/// What the attempt loop did: how many attempts ran and what the last one
/// produced. `attempts` counts the failed final attempt too, so a job that
/// exhausts a 3-attempt policy reports 3.
#[derive(Debug)]
pub struct RetryRun<T> {
    pub attempts: u32,
    pub result: Result<T, FetchError>,
}

/// Runs `f` until it succeeds, the policy says stop, or a stop is requested.
/// The backoff sleep between attempts is cancellable; a stop during the sleep
/// surfaces as `FetchError::Cancelled` rather than another attempt.
pub fn run_with_retry<T, F>(policy: &RetryPolicy, cancel: &CancelFlag, mut f: F) -> RetryRun<T>
where
    F: FnMut() -> Result<T, FetchError>,
{
    let mut attempt = 1u32;
    loop {
        match f() {
            Ok(v) => {
                return RetryRun {
                    attempts: attempt,
                    result: Ok(v),
                }
            }
            Err(FetchError::Cancelled) => {
                return RetryRun {
                    attempts: attempt,
                    result: Err(FetchError::Cancelled),
                }
            }
            Err(e) => {
                let kind = classify::classify(&e);
                match policy.decide(attempt, kind) {
                    RetryDecision::NoRetry => {
                        return RetryRun {
                            attempts: attempt,
                            result: Err(e),
                        }
                    }
                    RetryDecision::RetryAfter(d) => {
                        if !cancel.sleep_unless_stopped(d) {
                            return RetryRun {
                                attempts: attempt,
                                result: Err(FetchError::Cancelled),
                            };
                        }
                        attempt += 1;
                    }
                }
            }
        }
    }
}
