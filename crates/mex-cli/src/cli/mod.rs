//! CLI for the mex media export downloader.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use mex_core::config;
use std::path::PathBuf;

use commands::{run_download, run_scan, RunOptions};

/// Top-level CLI for the mex media export downloader.
#[derive(Debug, Parser)]
#[command(name = "mex")]
#[command(about = "mex: concurrent media downloader for personal data exports", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: MexCommand,
}

#[derive(Debug, Subcommand)]
pub enum MexCommand {
    /// Download every media item referenced by an export file, then archive.
    Run {
        /// Path to the export JSON file.
        export: PathBuf,

        /// Directory downloaded files land in.
        #[arg(long, default_value = "downloads", value_name = "DIR")]
        out_dir: PathBuf,

        /// Zip archive path (default: <out-dir>.zip).
        #[arg(long, value_name = "FILE")]
        archive: Option<PathBuf>,

        /// Concurrent download workers (default from config).
        #[arg(long, value_name = "N")]
        workers: Option<usize>,

        /// Terminal outcomes per batch checkpoint (default from config).
        #[arg(long, value_name = "N")]
        batch_size: Option<usize>,

        /// Ask between batches; anything but "y" stops the run.
        #[arg(long)]
        confirm_batches: bool,

        /// Skip writing the zip archive after the run.
        #[arg(long)]
        no_archive: bool,
    },

    /// List the jobs an export would produce, without downloading.
    Scan {
        /// Path to the export JSON file.
        export: PathBuf,
    },
}

impl MexCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            MexCommand::Run {
                export,
                out_dir,
                archive,
                workers,
                batch_size,
                confirm_batches,
                no_archive,
            } => {
                let opts = RunOptions {
                    export,
                    out_dir,
                    archive,
                    workers,
                    batch_size,
                    confirm_batches,
                    no_archive,
                };
                run_download(&cfg, opts).await?;
            }
            MexCommand::Scan { export } => run_scan(&export)?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
