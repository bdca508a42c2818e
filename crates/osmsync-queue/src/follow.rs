//! Following the done directory
//!
//! A downstream consumer (post-processing of applied changesets, for example)
//! reads `IMPORT_DONE/` oldest first and keeps its own cursor: the name of the
//! last entry it handled, stored in a one-line file. Entry names sort in time
//! order, so everything named after the cursor is new.
//!
//! The follower never moves or deletes entries; the done directory is owned
//! by the importer.

use osmsync_common::{Result, SyncError};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::entry::QueueEntry;
use crate::queue::QueueDirs;

/// Reads applied entries past a persisted cursor
#[derive(Debug, Clone)]
pub struct DoneFollower {
    dirs: QueueDirs,
    cursor_path: PathBuf,
}

impl DoneFollower {
    pub fn new(dirs: QueueDirs, cursor_path: impl Into<PathBuf>) -> Self {
        Self {
            dirs,
            cursor_path: cursor_path.into(),
        }
    }

    pub fn cursor_path(&self) -> &Path {
        &self.cursor_path
    }

    /// Name of the last handled entry, `None` before the first one
    pub fn last_processed(&self) -> Result<Option<String>> {
        let content = match fs::read_to_string(&self.cursor_path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SyncError::path(&self.cursor_path, e)),
        };

        let name = content.trim();
        if name.is_empty() {
            return Ok(None);
        }
        QueueEntry::parse_file_name(name)?;
        Ok(Some(name.to_string()))
    }

    /// Done entries named after the cursor, oldest first.
    ///
    /// Empty while the done directory does not exist yet.
    pub fn unprocessed(&self) -> Result<Vec<QueueEntry>> {
        if !self.dirs.done_dir().is_dir() {
            info!(dir = %self.dirs.done_dir().display(), "Done folder is not ready yet");
            return Ok(Vec::new());
        }

        let last = self.last_processed()?;
        Ok(self
            .dirs
            .done()?
            .into_iter()
            .filter(|entry| last.as_deref().map_or(true, |last| entry.name().as_str() > last))
            .collect())
    }

    /// Move the cursor to `entry`. Never moves it backwards.
    pub fn advance(&self, entry: &QueueEntry) -> Result<()> {
        let name = entry.name();
        if self.last_processed()?.is_some_and(|last| last >= name) {
            debug!(entry = %name, "Cursor already past entry");
            return Ok(());
        }

        let tmp = self.cursor_path.with_extension("tmp");
        let mut file = fs::File::create(&tmp).map_err(|e| SyncError::path(&tmp, e))?;
        writeln!(file, "{}", name).map_err(|e| SyncError::path(&tmp, e))?;
        file.sync_all().map_err(|e| SyncError::path(&tmp, e))?;
        fs::rename(&tmp, &self.cursor_path).map_err(|e| SyncError::path(&self.cursor_path, e))?;
        Ok(())
    }

    /// Hand every unprocessed entry to `handle`, advancing after each.
    ///
    /// Stops at the first failing entry and leaves the cursor before it, so
    /// the next call retries it. Returns the number handled.
    pub fn follow<F>(&self, mut handle: F) -> Result<usize>
    where
        F: FnMut(&QueueEntry) -> Result<()>,
    {
        let mut handled = 0;
        for entry in self.unprocessed()? {
            debug!(entry = %entry.name(), "Processing done entry");
            handle(&entry)?;
            self.advance(&entry)?;
            handled += 1;
        }
        Ok(handled)
    }
}
