//! Advisory per-role queue lock
//!
//! The queue protocol is only correct with one downloader and one importer.
//! Each process may take an exclusive `flock` on `.{role}.lock` inside the
//! queue directory so that a second instance of the same role fails at
//! start-up instead of racing on the oldest entry. The kernel drops the lock
//! when the holder dies.

use fs2::FileExt;
use osmsync_common::{Result, SyncError};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Held for as long as the process runs; unlocks on drop
#[derive(Debug)]
pub struct QueueLock {
    _file: File,
    path: PathBuf,
}

impl QueueLock {
    /// Take the lock for `role` ("importer", "downloader") or fail immediately
    pub fn acquire(queue_dir: &Path, role: &str) -> Result<Self> {
        let path = queue_dir.join(format!(".{}.lock", role));
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&path)
            .map_err(|e| SyncError::path(&path, e))?;

        match file.try_lock_exclusive() {
            Ok(()) => {},
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => {
                return Err(SyncError::Locked {
                    role: role.to_string(),
                    path,
                });
            },
            Err(e) => return Err(SyncError::path(&path, e)),
        }

        // Holder's pid, for whoever inspects the directory
        file.set_len(0).map_err(|e| SyncError::path(&path, e))?;
        writeln!(file, "{}", std::process::id()).map_err(|e| SyncError::path(&path, e))?;
        debug!(lock = %path.display(), "Queue lock acquired");

        Ok(Self { _file: file, path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
