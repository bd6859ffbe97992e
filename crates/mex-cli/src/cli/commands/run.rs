//! `mex run` – download everything an export references, then archive it.

use anyhow::{Context, Result};
use mex_core::archive;
use mex_core::config::MexConfig;
use mex_core::control::CancelFlag;
use mex_core::export;
use mex_core::progress::ProgressSnapshot;
use mex_core::scheduler::{BatchCheckpoint, BatchConfig, RunReport, Scheduler};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub struct RunOptions {
    pub export: PathBuf,
    pub out_dir: PathBuf,
    pub archive: Option<PathBuf>,
    pub workers: Option<usize>,
    pub batch_size: Option<usize>,
    pub confirm_batches: bool,
    pub no_archive: bool,
}

pub async fn run_download(cfg: &MexConfig, opts: RunOptions) -> Result<()> {
    let export = export::load_export(&opts.export)?;
    let extracted = export::extract_jobs(&export);
    if extracted.warnings > 0 {
        println!("{} link(s) skipped as malformed.", extracted.warnings);
    }
    if extracted.jobs.is_empty() {
        println!("No media links in export.");
        return Ok(());
    }
    println!("{} job(s) queued from export.", extracted.jobs.len());

    let cancel = CancelFlag::new();
    let ctrl_c_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nstopping after in-flight downloads...");
            ctrl_c_flag.request_stop();
        }
    });

    let batch = BatchConfig::new(
        opts.workers.unwrap_or(cfg.workers),
        opts.batch_size.unwrap_or(cfg.batch_size),
    );

    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::channel::<ProgressSnapshot>(16);
    const PROGRESS_INTERVAL_MS: u64 = 500;
    let progress_handle = tokio::spawn(async move {
        let mut last_print = Instant::now();
        while let Some(snap) = progress_rx.recv().await {
            let now = Instant::now();
            if now.duration_since(last_print).as_millis() as u64 >= PROGRESS_INTERVAL_MS
                || snap.terminal() == snap.submitted
            {
                let mib = snap.bytes_written as f64 / 1_048_576.0;
                println!(
                    "\r  {} / {} done ({:.0}%)  ok {}  failed {}  skipped {}  {:.1} MiB  ",
                    snap.terminal(),
                    snap.submitted,
                    snap.fraction() * 100.0,
                    snap.completed,
                    snap.failed,
                    snap.skipped,
                    mib
                );
                last_print = now;
            }
        }
        println!();
    });

    let mut scheduler = Scheduler::new(
        opts.out_dir.clone(),
        batch,
        cfg.retry_policy(),
        cancel.clone(),
    )
    .on_progress(move |snap| {
        let _ = progress_tx.try_send(*snap);
    });
    if opts.confirm_batches {
        let gate = cancel.clone();
        scheduler = scheduler
            .pause_between_batches(true)
            .on_batch_boundary(move |cp| {
                if next_batch_pending(cp) && !gate.is_stopped() && !confirm_next_batch(cp) {
                    gate.request_stop();
                }
            });
    }

    let jobs = extracted.jobs;
    let report = tokio::task::spawn_blocking(move || scheduler.run(jobs))
        .await
        .context("engine task panicked")??;
    let _ = progress_handle.await;

    print_summary(&report);

    if !opts.no_archive {
        let archive_path = opts
            .archive
            .unwrap_or_else(|| default_archive_path(&opts.out_dir));
        let summary = archive::archive_output_dir(&opts.out_dir, &archive_path)?;
        println!(
            "archived {} file(s) ({:.1} MiB) to {}",
            summary.files,
            summary.bytes as f64 / 1_048_576.0,
            archive_path.display()
        );
    }
    Ok(())
}

/// True while submitted jobs are still outstanding at this checkpoint. The
/// boundary event at drain has no next batch, so there is nothing to confirm.
fn next_batch_pending(cp: &BatchCheckpoint) -> bool {
    cp.terminal < cp.snapshot.submitted
}

/// Between-batch gate: keep going only on an explicit yes.
fn confirm_next_batch(cp: &BatchCheckpoint) -> bool {
    print!(
        "batch {} done ({} of {} jobs). continue? [y/N] ",
        cp.index, cp.terminal, cp.snapshot.submitted
    );
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    answer.trim().eq_ignore_ascii_case("y")
}

fn print_summary(report: &RunReport) {
    let snap = &report.snapshot;
    println!(
        "done: {} ok, {} failed, {} skipped, {} cancelled ({:.1} MiB)",
        snap.completed,
        snap.failed,
        snap.skipped,
        snap.cancelled,
        snap.bytes_written as f64 / 1_048_576.0
    );
    if report.stopped {
        println!("run was stopped before the queue drained.");
    }
    let review: Vec<&Path> = report
        .outcomes
        .iter()
        .filter(|o| o.needs_review)
        .filter_map(|o| o.file.as_deref())
        .collect();
    if !review.is_empty() {
        println!("{} file(s) kept as .bin for review:", review.len());
        for path in review {
            println!("  {}", path.display());
        }
    }
}

/// `downloads` → `downloads.zip`, next to the output directory.
fn default_archive_path(out_dir: &Path) -> PathBuf {
    let mut name = out_dir.as_os_str().to_owned();
    name.push(".zip");
    PathBuf::from(name)
}
