//! Per-job execution: temp-file download with retries, media-type sniffing,
//! and atomic publication into the output directory.

use std::path::{Path, PathBuf};

use crate::control::CancelFlag;
use crate::fetch::{self, FetchError};
use crate::job::{DownloadJob, JobOutcome};
use crate::retry::{run_with_retry, RetryPolicy};
use crate::sniff::{self, UNKNOWN_EXTENSION};
use crate::storage::{self, PartFile};

/// Drives single jobs to a terminal outcome. Shared read-only across worker
/// threads; all mutable state lives in the job's own temp file.
pub struct DownloadExecutor {
    out_dir: PathBuf,
    retry: RetryPolicy,
    cancel: CancelFlag,
}

impl DownloadExecutor {
    pub fn new(out_dir: impl Into<PathBuf>, retry: RetryPolicy, cancel: CancelFlag) -> Self {
        Self {
            out_dir: out_dir.into(),
            retry,
            cancel,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Run one job start to finish. Every exit path returns an outcome; a
    /// failed job never takes the run down with it.
    pub fn execute(&self, job: &DownloadJob) -> JobOutcome {
        if self.cancel.is_stopped() {
            return JobOutcome::cancelled(job, 0);
        }

        let stem = job.file_stem();
        if let Some(existing) = storage::existing_output(&self.out_dir, &stem) {
            tracing::debug!(
                job_id = %job.id,
                path = %existing.display(),
                "output already on disk, skipping"
            );
            return JobOutcome::skipped_existing(job, existing);
        }

        // The extension is unknown until the body is sniffed, so the temp
        // name is just the stem plus the temp suffix.
        let temp = storage::temp_path(&self.out_dir.join(&stem));
        let part = match PartFile::create(&temp) {
            Ok(part) => part,
            Err(err) => return JobOutcome::failed(job, 0, format!("{:#}", err)),
        };

        let run = run_with_retry(&self.retry, &self.cancel, || {
            // Every attempt starts from an empty file.
            part.truncate().map_err(FetchError::Storage)?;
            fetch::fetch_to_part(&job.url, &part, &self.cancel)
        });

        let fetched = match run.result {
            Ok(fetched) => fetched,
            Err(FetchError::Cancelled) => {
                discard_quietly(part);
                return JobOutcome::cancelled(job, run.attempts);
            }
            Err(err) => {
                tracing::debug!(
                    job_id = %job.id,
                    attempts = run.attempts,
                    error = %err,
                    "job failed"
                );
                discard_quietly(part);
                return JobOutcome::failed(job, run.attempts, err.to_string());
            }
        };

        // A stop landing between the last write and publication still wins:
        // the temp file goes away and nothing becomes visible.
        if self.cancel.is_stopped() {
            discard_quietly(part);
            return JobOutcome::cancelled(job, run.attempts);
        }

        let picked =
            sniff::pick_extension(fetched.content_type.as_deref(), &fetched.prefix, &job.url);
        let needs_review = picked.is_none();
        let ext = picked.unwrap_or(UNKNOWN_EXTENSION);
        if needs_review {
            tracing::warn!(
                job_id = %job.id,
                url = %job.url,
                "could not identify media type, keeping as .bin"
            );
        }

        if let Err(err) = part.sync() {
            discard_quietly(part);
            return JobOutcome::failed(job, run.attempts, format!("{:#}", err));
        }

        let final_path = self.out_dir.join(format!("{}.{}", stem, ext));
        if final_path.exists() {
            // Someone published this job since the pre-flight check.
            discard_quietly(part);
            return JobOutcome::skipped_existing(job, final_path);
        }
        if let Err(err) = part.finalize(&final_path) {
            let _ = std::fs::remove_file(&temp);
            return JobOutcome::failed(job, run.attempts, format!("{:#}", err));
        }

        tracing::debug!(
            job_id = %job.id,
            bytes = fetched.bytes_written,
            path = %final_path.display(),
            "job complete"
        );
        JobOutcome::succeeded(job, run.attempts, fetched.bytes_written, final_path, needs_review)
    }
}

fn discard_quietly(part: PartFile) {
    if let Err(err) = part.discard() {
        tracing::debug!(error = %err, "failed to remove temp file");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{JobKind, JobStatus};

    fn job(url: &str) -> DownloadJob {
        DownloadJob::new(url, JobKind::Personal, "2024-01-01", "posted")
    }

    #[test]
    fn existing_output_short_circuits_without_network() {
        let dir = tempfile::tempdir().unwrap();
        let job = job("https://unreachable.invalid/clip.mp4");
        let existing = dir.path().join(format!("{}.mp4", job.file_stem()));
        std::fs::write(&existing, b"already here").unwrap();

        let exec = DownloadExecutor::new(dir.path(), RetryPolicy::default(), CancelFlag::new());
        let outcome = exec.execute(&job);

        assert_eq!(outcome.status, JobStatus::SkippedDuplicate);
        assert_eq!(outcome.attempts, 0);
        assert_eq!(outcome.file.as_deref(), Some(existing.as_path()));
    }

    #[test]
    fn stopped_flag_cancels_before_any_work() {
        let dir = tempfile::tempdir().unwrap();
        let cancel = CancelFlag::new();
        cancel.request_stop();

        let exec = DownloadExecutor::new(dir.path(), RetryPolicy::default(), cancel);
        let outcome = exec.execute(&job("https://unreachable.invalid/clip.mp4"));

        assert_eq!(outcome.status, JobStatus::Cancelled);
        assert_eq!(outcome.attempts, 0);
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn permanent_fetch_error_fails_once_and_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        let exec = DownloadExecutor::new(dir.path(), RetryPolicy::default(), CancelFlag::new());

        // Unsupported scheme: curl rejects it before touching the network.
        let outcome = exec.execute(&job("zzz://nowhere/clip.mp4"));

        assert_eq!(outcome.status, JobStatus::Failed);
        assert_eq!(outcome.attempts, 1);
        assert!(outcome.error.is_some());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
