//! `mex scan` – list the jobs an export would produce, without downloading.

use anyhow::Result;
use mex_core::export;
use mex_core::job::DownloadJob;
use std::path::Path;

pub fn run_scan(export_path: &Path) -> Result<()> {
    let export = export::load_export(export_path)?;
    let extracted = export::extract_jobs(&export);

    if !extracted.jobs.is_empty() {
        println!(
            "{:<8} {:<8} {:<12} {:<8} {}",
            "ID", "KIND", "DATE", "CATEGORY", "URL"
        );
        for job in &extracted.jobs {
            println!("{}", job_row(job));
        }
    }
    println!(
        "{} job(s), {} malformed link(s) skipped.",
        extracted.jobs.len(),
        extracted.warnings
    );
    Ok(())
}

/// One listing row; the URL sits last so it never pads.
fn job_row(job: &DownloadJob) -> String {
    format!(
        "{:<8} {:<8} {:<12} {:<8} {}",
        job.id,
        job.kind.as_str(),
        job.date,
        job.category,
        job.url
    )
}
