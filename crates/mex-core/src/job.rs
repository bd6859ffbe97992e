//! Download jobs and their terminal outcomes.

use sha2::{Digest, Sha256};
use std::path::PathBuf;

/// Hex characters kept from the URL digest for the job id.
const ID_LEN: usize = 8;

/// Derive the stable job id for a URL: the first 8 hex characters of
/// SHA-256(url). Identical URLs always map to the same id, which is the key
/// both in-run and cross-run dedup rely on.
pub fn job_id_for_url(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut id = hex::encode(digest);
    id.truncate(ID_LEN);
    id
}

/// Whether a media item is from the user's own posts or from activity around
/// other people's content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Personal,
    Other,
}

impl JobKind {
    pub fn as_str(self) -> &'static str {
        match self {
            JobKind::Personal => "personal",
            JobKind::Other => "other",
        }
    }
}

/// One unit of work: download a single media item. Immutable once created.
#[derive(Debug, Clone)]
pub struct DownloadJob {
    pub id: String,
    pub url: String,
    pub kind: JobKind,
    /// Day part of the entry date, or `unknown_date`.
    pub date: String,
    /// Source category within the export (posted / favorite / browsed).
    pub category: String,
}

impl DownloadJob {
    pub fn new(
        url: impl Into<String>,
        kind: JobKind,
        date: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        let url = url.into();
        let id = job_id_for_url(&url);
        Self {
            id,
            url,
            kind,
            date: date.into(),
            category: category.into(),
        }
    }

    /// Extension-less output filename: `[kind]_[date]_[category]_[id]`.
    /// The executor appends the extension once the content type is known.
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.kind.as_str(),
            self.date,
            self.category,
            self.id
        )
    }
}

/// Terminal status of a job. Outcomes never change after emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    SkippedDuplicate,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            JobStatus::Succeeded => "succeeded",
            JobStatus::SkippedDuplicate => "skipped-duplicate",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }
}

/// Result of one job, produced exactly once per admitted job.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub job_id: String,
    pub status: JobStatus,
    /// Fetch attempts made (0 when the job never reached the network).
    pub attempts: u32,
    pub bytes_written: u64,
    /// Final path on disk, for succeeded and cross-run-skipped jobs.
    pub file: Option<PathBuf>,
    /// Set when the content type could not be identified; the file is kept
    /// with a `.bin` extension for manual review.
    pub needs_review: bool,
    pub error: Option<String>,
}

impl JobOutcome {
    pub fn succeeded(
        job: &DownloadJob,
        attempts: u32,
        bytes_written: u64,
        file: PathBuf,
        needs_review: bool,
    ) -> Self {
        Self {
            job_id: job.id.clone(),
            status: JobStatus::Succeeded,
            attempts,
            bytes_written,
            file: Some(file),
            needs_review,
            error: None,
        }
    }

    /// A duplicate identifier caught by in-run dedup; never reached the executor.
    pub fn skipped(job: &DownloadJob) -> Self {
        Self {
            job_id: job.id.clone(),
            status: JobStatus::SkippedDuplicate,
            attempts: 0,
            bytes_written: 0,
            file: None,
            needs_review: false,
            error: None,
        }
    }

    /// A file for this job already exists on disk from a prior run.
    pub fn skipped_existing(job: &DownloadJob, file: PathBuf) -> Self {
        Self {
            file: Some(file),
            ..Self::skipped(job)
        }
    }

    pub fn failed(job: &DownloadJob, attempts: u32, error: String) -> Self {
        Self {
            job_id: job.id.clone(),
            status: JobStatus::Failed,
            attempts,
            bytes_written: 0,
            file: None,
            needs_review: false,
            error: Some(error),
        }
    }

    pub fn cancelled(job: &DownloadJob, attempts: u32) -> Self {
        Self {
            job_id: job.id.clone(),
            status: JobStatus::Cancelled,
            attempts,
            bytes_written: 0,
            file: None,
            needs_review: false,
            error: None,
        }
    }
}
