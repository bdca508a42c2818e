//! The directory-pair work queue shared by the downloader and the importer
//!
//! `IMPORT_QUEUE/` holds pending entries, `IMPORT_DONE/` holds applied ones.
//! The only state transition is a `rename(2)` from one directory to the other,
//! so a reader listing either directory never sees a half-moved entry.
//!
//! The queue assumes exactly one producer and one consumer. Nothing here
//! prevents two importers from picking the same oldest entry; see
//! [`crate::lock::QueueLock`] for the optional fail-fast guard.

use osmsync_common::{Result, SyncError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::entry::{QueueEntry, ENTRY_SUFFIX};
use crate::timestamp::ReplicationTimestamp;

/// Suffix of a changeset that is still being written
pub const STAGING_SUFFIX: &str = ".partial";

/// The pending and done directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueDirs {
    queue: PathBuf,
    done: PathBuf,
}

impl QueueDirs {
    pub fn new(queue: impl Into<PathBuf>, done: impl Into<PathBuf>) -> Self {
        Self {
            queue: queue.into(),
            done: done.into(),
        }
    }

    pub fn queue_dir(&self) -> &Path {
        &self.queue
    }

    pub fn done_dir(&self) -> &Path {
        &self.done
    }

    /// Pending entries, oldest first
    pub fn pending(&self) -> Result<Vec<QueueEntry>> {
        list_entries(&self.queue)
    }

    /// Applied entries, oldest first
    pub fn done(&self) -> Result<Vec<QueueEntry>> {
        list_entries(&self.done)
    }

    /// The lexicographically first pending entry
    pub fn oldest_pending(&self) -> Result<Option<QueueEntry>> {
        Ok(self.pending()?.into_iter().next())
    }

    /// Move an applied entry into the done directory
    pub fn mark_done(&self, entry: &QueueEntry) -> Result<QueueEntry> {
        let target = entry.relocated(&self.done);
        if target.payload_path().exists() {
            return Err(SyncError::EntryExists(target.payload_path().to_path_buf()));
        }

        fs::rename(entry.payload_path(), target.payload_path())
            .map_err(|e| SyncError::path(entry.payload_path(), e))?;
        debug!(entry = %target.name(), "Moved entry to done directory");

        Ok(target)
    }

    /// Where a producer should write the changeset ending at `range_end`
    /// before it is published.
    ///
    /// The staging file lives in the queue directory itself so publishing is a
    /// same-filesystem rename; its leading dot keeps it out of [`Self::pending`].
    pub fn staging_path(&self, range_end: &ReplicationTimestamp) -> PathBuf {
        self.queue
            .join(format!(".{}{}{}", range_end, ENTRY_SUFFIX, STAGING_SUFFIX))
    }

    /// Atomically turn a staged file into the pending entry `[start, end)`
    pub fn publish(
        &self,
        staged: &Path,
        range_start: ReplicationTimestamp,
        range_end: ReplicationTimestamp,
    ) -> Result<QueueEntry> {
        let entry = QueueEntry::new(&self.queue, range_start, range_end);
        if entry.payload_path().exists() {
            return Err(SyncError::EntryExists(entry.payload_path().to_path_buf()));
        }

        fs::rename(staged, entry.payload_path()).map_err(|e| SyncError::path(staged, e))?;
        Ok(entry)
    }
}

fn list_entries(dir: &Path) -> Result<Vec<QueueEntry>> {
    let mut names = Vec::new();

    for item in fs::read_dir(dir).map_err(|e| SyncError::path(dir, e))? {
        let item = item.map_err(|e| SyncError::path(dir, e))?;
        let Ok(name) = item.file_name().into_string() else {
            warn!(dir = %dir.display(), "Ignoring file with a non UTF-8 name");
            continue;
        };

        // Lock files and in-flight downloads
        if name.starts_with('.') {
            continue;
        }

        if !item.file_type().map_err(|e| SyncError::path(dir, e))?.is_file() {
            continue;
        }

        names.push(name);
    }

    names.sort();

    let mut entries = Vec::with_capacity(names.len());
    for name in names {
        match QueueEntry::from_path(&dir.join(&name)) {
            Ok(entry) => entries.push(entry),
            Err(_) => warn!(file = %name, dir = %dir.display(), "Ignoring file that is not a queue entry"),
        }
    }

    Ok(entries)
}
