//! Job source: turn a personal-data export JSON into an ordered job list.
//!
//! The `Video` → `Videos` section (the account's own posts) must exist or the
//! export is rejected outright; the favorites and browsing-history sections
//! are optional. One entry may carry several newline-separated URLs in its
//! `Link` field, and each URL becomes its own job. Duplicate URLs are kept:
//! admission-time dedup in the scheduler is the single dedup point.

mod parse;

pub use parse::Export;

use std::path::Path;

use thiserror::Error;

use crate::job::{DownloadJob, JobKind};

/// Stands in for the date portion of the file stem when an entry has none.
const UNKNOWN_DATE: &str = "unknown_date";

/// Problems with the export itself. All of these are fatal and abort the run
/// before any download starts.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read export file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("export is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("export has no Video.Videos section")]
    MissingVideos,
}

/// Jobs extracted from an export, plus how many URLs were dropped as
/// malformed. Entries without a link at all are skipped silently; exports
/// routinely contain those for since-deleted media.
#[derive(Debug)]
pub struct ExtractedJobs {
    pub jobs: Vec<DownloadJob>,
    pub warnings: usize,
}

/// Read and parse an export file.
pub fn load_export(path: &Path) -> Result<Export, SourceError> {
    let data = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let export: Export = serde_json::from_str(&data)?;
    // The posts section is the one piece every real export has; its absence
    // means we were pointed at some other JSON file.
    if export.video.as_ref().and_then(|v| v.videos.as_ref()).is_none() {
        return Err(SourceError::MissingVideos);
    }
    Ok(export)
}

/// Flatten an export into jobs: own posts, then favorites, then browsing
/// history, sorted newest-first by date. Malformed URLs are dropped and
/// counted; duplicates stay in for the scheduler to skip.
pub fn extract_jobs(export: &Export) -> ExtractedJobs {
    let mut jobs = Vec::new();
    let mut warnings = 0usize;

    if let Some(videos) = export.video.as_ref().and_then(|v| v.videos.as_ref()) {
        collect(&videos.entries, JobKind::Personal, "posted", &mut jobs, &mut warnings);
    }
    if let Some(activity) = export.activity.as_ref() {
        if let Some(favorites) = activity.favorites.as_ref() {
            collect(&favorites.entries, JobKind::Other, "favorite", &mut jobs, &mut warnings);
        }
        if let Some(browsing) = activity.browsing.as_ref() {
            collect(&browsing.entries, JobKind::Other, "browsed", &mut jobs, &mut warnings);
        }
    }

    // Newest first. The dates are ISO day strings, so lexicographic order is
    // chronological order, and the stable sort keeps same-day entries in
    // section order.
    jobs.sort_by(|a, b| b.date.cmp(&a.date));
    ExtractedJobs { jobs, warnings }
}

fn collect(
    entries: &[parse::MediaEntry],
    kind: JobKind,
    category: &str,
    jobs: &mut Vec<DownloadJob>,
    warnings: &mut usize,
) {
    for entry in entries {
        let link = match entry.link.as_deref() {
            Some(link) if !link.trim().is_empty() => link,
            _ => continue,
        };
        // Keep only the day part of "2023-10-01 12:33:07"-style timestamps.
        let date = entry
            .date
            .as_deref()
            .and_then(|d| d.split_whitespace().next())
            .filter(|d| !d.is_empty())
            .unwrap_or(UNKNOWN_DATE)
            .to_string();
        for url in link.split('\n').map(str::trim).filter(|u| !u.is_empty()) {
            if !is_fetchable_url(url) {
                tracing::warn!(url, category, "dropping malformed media url");
                *warnings += 1;
                continue;
            }
            jobs.push(DownloadJob::new(url, kind, date.clone(), category));
        }
    }
}

/// A job URL must parse and be plain HTTP(S); anything else is unusable.
fn is_fetchable_url(raw: &str) -> bool {
    match url::Url::parse(raw) {
        Ok(url) => matches!(url.scheme(), "http" | "https"),
        Err(_) => false,
    }
}
