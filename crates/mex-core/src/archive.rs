//! Zip archiving of the output directory after a run.

use anyhow::{Context, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::storage::{self, TEMP_SUFFIX};

/// Files and uncompressed bytes that went into an archive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveSummary {
    pub files: usize,
    pub bytes: u64,
}

/// Bundle every file in `out_dir` into a zip at `archive_path`. Entries are
/// added in name order; `.part` leftovers and subdirectories are skipped. The
/// archive is written to a temp path, synced, and renamed into place, the same
/// visibility discipline the downloads themselves get.
pub fn archive_output_dir(out_dir: &Path, archive_path: &Path) -> Result<ArchiveSummary> {
    let entries = std::fs::read_dir(out_dir)
        .with_context(|| format!("read output directory: {}", out_dir.display()))?;
    let mut names: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if !path.is_file() || path.to_string_lossy().ends_with(TEMP_SUFFIX) {
            continue;
        }
        names.push(path);
    }
    names.sort();

    let temp = storage::temp_path(archive_path);
    let file = File::create(&temp)
        .with_context(|| format!("create archive temp file: {}", temp.display()))?;
    let mut zip = zip::ZipWriter::new(file);
    let options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    let mut summary = ArchiveSummary::default();
    for path in &names {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name,
            None => continue,
        };
        zip.start_file(name, options)
            .with_context(|| format!("add archive entry: {}", name))?;
        let mut reader =
            File::open(path).with_context(|| format!("open {}", path.display()))?;
        let copied =
            io::copy(&mut reader, &mut zip).with_context(|| format!("compress {}", path.display()))?;
        summary.files += 1;
        summary.bytes += copied;
    }
    let file = zip.finish().context("finish archive")?;
    file.sync_all().context("archive sync failed")?;

    std::fs::rename(&temp, archive_path)
        .with_context(|| format!("rename {} to {}", temp.display(), archive_path.display()))?;
    tracing::info!(
        files = summary.files,
        bytes = summary.bytes,
        path = %archive_path.display(),
        "archive written"
    );
    Ok(summary)
}
