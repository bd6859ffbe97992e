//! Disk I/O and file lifecycle for downloads.
//!
//! Media bodies stream into `.part` temp files (pwrite-style offset writes)
//! and are atomically renamed to their final name, so an observer of the
//! output directory never sees a partial file under a final name.

use anyhow::{Context, Result};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(unix)]
use std::os::unix::fs::FileExt;

use crate::sniff;

/// Temporary file suffix used before atomic rename.
pub const TEMP_SUFFIX: &str = ".part";

/// Path for the temp file: appends `.part` (e.g. `x.mp4` → `x.mp4.part`).
pub fn temp_path(final_path: &Path) -> PathBuf {
    let mut o = final_path.as_os_str().to_owned();
    o.push(TEMP_SUFFIX);
    PathBuf::from(o)
}

/// Writer for a temp download file. Safe to clone into the transfer write
/// callback; each `write_at` is independent and no cursor is shared.
#[derive(Clone)]
pub struct PartFile {
    file: Arc<File>,
    path: PathBuf,
}

impl PartFile {
    /// Create the temp file at `path`, truncating any earlier attempt's data.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::options()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("failed to create temp file: {}", path.display()))?;
        Ok(Self {
            file: Arc::new(file),
            path: path.to_path_buf(),
        })
    }

    /// Write `data` at `offset`. Does not move a shared cursor.
    #[cfg(unix)]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        self.file.write_all_at(data, offset)
    }

    /// Fallback for non-Unix: seek + write on a cloned handle.
    #[cfg(not(unix))]
    pub fn write_at(&self, offset: u64, data: &[u8]) -> io::Result<()> {
        use std::io::{Seek, SeekFrom, Write};
        let mut f = (*self.file).try_clone()?;
        f.seek(SeekFrom::Start(offset))?;
        f.write_all(data)
    }

    /// Reset the file to empty. Stale bytes from an earlier fetch attempt
    /// must not survive into the next one.
    pub fn truncate(&self) -> io::Result<()> {
        self.file.set_len(0)
    }

    /// Sync file contents to disk. Call before `finalize` for durability.
    pub fn sync(&self) -> Result<()> {
        self.file.sync_all().context("part file sync failed")?;
        Ok(())
    }

    /// Path of the temp file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Atomically rename the temp file to `final_path`. Consumes the writer
    /// and closes the handle.
    pub fn finalize(self, final_path: &Path) -> Result<()> {
        let path = self.path.clone();
        drop(self.file);

        std::fs::rename(&path, final_path).with_context(|| {
            format!(
                "failed to rename {} to {}",
                path.display(),
                final_path.display()
            )
        })?;
        Ok(())
    }

    /// Remove the temp file (failure and cancel paths). Consumes the writer.
    pub fn discard(self) -> Result<()> {
        let path = self.path.clone();
        drop(self.file);

        std::fs::remove_file(&path)
            .with_context(|| format!("failed to remove temp file: {}", path.display()))?;
        Ok(())
    }
}

/// Find an existing output for `stem` from a prior run, trying every known
/// media extension plus the unknown-type fallback. Cross-run dedup is purely
/// this filesystem check; there is no persisted index.
pub fn existing_output(dir: &Path, stem: &str) -> Option<PathBuf> {
    for ext in sniff::KNOWN_EXTENSIONS
        .iter()
        .chain(std::iter::once(&sniff::UNKNOWN_EXTENSION))
    {
        let candidate = dir.join(format!("{}.{}", stem, ext));
        if candidate.exists() {
            return Some(candidate);
        }
    }
    None
}

/// Remove leftover `.part` files from `dir`, e.g. after a cancelled run whose
/// grace period expired before a worker could clean up. Returns the number of
/// files removed.
pub fn remove_stale_parts(dir: &Path) -> usize {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(_) => return 0,
    };
    let mut removed = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        let is_part = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.ends_with(TEMP_SUFFIX))
            .unwrap_or(false);
        if is_part && path.is_file() && std::fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    removed
}
