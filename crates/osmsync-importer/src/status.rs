//! `osmsync-importer status`
//!
//! Reads the queue directories and the checkpoint file. Never touches the
//! database or runs a tool.

use osmsync_queue::{CheckpointValue, ReplicationCursor};
use serde::Serialize;
use std::fmt::Write;
use tracing::warn;

use crate::config::Directories;
use crate::error::ImportResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    /// `None` while both directories are empty
    pub cursor: Option<ReplicationCursor>,
    pub pending: usize,
    pub done: usize,
    pub oldest_pending: Option<String>,
    pub checkpoint: Option<CheckpointValue>,
    /// Set when `timestamp.txt` exists but cannot be read or parsed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkpoint_error: Option<String>,
}

impl StatusReport {
    pub fn collect(dirs: &Directories) -> ImportResult<Self> {
        let queue = dirs.queue_dirs();
        let pending = queue.pending()?;
        let done = queue.done()?;

        let checkpoint_file = dirs.checkpoint();
        let (checkpoint, checkpoint_error) = match checkpoint_file.read() {
            Ok(value) => (value, None),
            Err(e) => {
                warn!(path = %checkpoint_file.path().display(), error = %e, "Checkpoint is unreadable");
                (None, Some(e.to_string()))
            },
        };

        Ok(Self {
            cursor: ReplicationCursor::from_queue(&queue)?,
            pending: pending.len(),
            done: done.len(),
            oldest_pending: pending.first().map(|entry| entry.name()),
            checkpoint,
            checkpoint_error,
        })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Replication status:");
        match &self.cursor {
            Some(cursor) => {
                let _ = writeln!(out, "  Cursor:     {} (from {})", cursor.timestamp, cursor.source);
            },
            None => {
                let _ = writeln!(out, "  Cursor:     unknown (queue and done are empty)");
            },
        }
        let _ = writeln!(out, "  Pending:    {}", self.pending);
        if let Some(name) = &self.oldest_pending {
            let _ = writeln!(out, "  Next:       {}", name);
        }
        let _ = writeln!(out, "  Imported:   {}", self.done);
        match (&self.checkpoint, &self.checkpoint_error) {
            (_, Some(e)) => {
                let _ = writeln!(out, "  Checkpoint: unreadable ({})", e);
            },
            (Some(value), None) => {
                let _ = writeln!(out, "  Checkpoint: {}", value);
            },
            (None, None) => {
                let _ = writeln!(out, "  Checkpoint: not written yet");
            },
        }
        out
    }
}

/// Collect the status and render it as text or JSON
pub fn report(dirs: &Directories, json: bool) -> ImportResult<String> {
    let status = StatusReport::collect(dirs)?;
    if json {
        Ok(serde_json::to_string_pretty(&status)?)
    } else {
        Ok(status.render())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use osmsync_queue::CursorSource;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn dirs(root: &Path) -> Directories {
        let dirs = Directories {
            settings: root.join("settings"),
            cache: root.join("cache"),
            queue: root.join("import_queue"),
            done: root.join("import_done"),
        };
        for dir in [&dirs.settings, &dirs.cache, &dirs.queue, &dirs.done] {
            fs::create_dir(dir).unwrap();
        }
        dirs
    }

    #[test]
    fn test_empty_status() {
        let tmp = TempDir::new().unwrap();
        let dirs = dirs(tmp.path());

        let status = StatusReport::collect(&dirs).unwrap();
        assert_eq!(status.cursor, None);
        assert_eq!(status.pending, 0);
        assert_eq!(status.checkpoint, None);
        assert!(status.render().contains("unknown"));
    }

    #[test]
    fn test_status_json() {
        let tmp = TempDir::new().unwrap();
        let dirs = dirs(tmp.path());
        fs::write(
            dirs.done.join("2023-01-01T00:00:00Z->-2023-01-02T00:00:00Z.osc.gz"),
            b"x",
        )
        .unwrap();
        fs::write(
            dirs.queue.join("2023-01-02T00:00:00Z->-2023-01-03T00:00:00Z.osc.gz"),
            b"x",
        )
        .unwrap();
        dirs.checkpoint()
            .record("2023-01-02T00:00:00Z".parse().unwrap())
            .unwrap();

        let status = StatusReport::collect(&dirs).unwrap();
        assert_eq!(status.cursor.unwrap().source, CursorSource::Pending);

        let json: serde_json::Value = serde_json::from_str(&report(&dirs, true).unwrap()).unwrap();
        assert_eq!(json["pending"], 1);
        assert_eq!(json["done"], 1);
        assert_eq!(json["cursor"]["timestamp"], "2023-01-03T00:00:00Z");
        assert_eq!(json["cursor"]["source"], "pending");
        assert_eq!(json["checkpoint"], "2023-01-02T00:00:00Z");
        assert!(json.get("checkpoint_error").is_none());
    }

    #[test]
    fn test_corrupt_checkpoint_still_reports_queue() {
        let tmp = TempDir::new().unwrap();
        let dirs = dirs(tmp.path());
        fs::write(
            dirs.queue.join("2023-01-02T00:00:00Z->-2023-01-03T00:00:00Z.osc.gz"),
            b"x",
        )
        .unwrap();
        fs::write(dirs.settings.join("timestamp.txt"), "garbage\n").unwrap();

        let status = StatusReport::collect(&dirs).unwrap();
        assert_eq!(status.pending, 1);
        assert_eq!(status.checkpoint, None);
        assert!(status.checkpoint_error.is_some());
        assert_eq!(
            status.cursor.unwrap().timestamp.to_string(),
            "2023-01-03T00:00:00Z"
        );

        let text = report(&dirs, false).unwrap();
        assert!(text.contains("Checkpoint: unreadable"), "{}", text);
        assert!(text.contains("Pending:    1"), "{}", text);

        let json: serde_json::Value = serde_json::from_str(&report(&dirs, true).unwrap()).unwrap();
        assert!(json["checkpoint"].is_null());
        assert!(json["checkpoint_error"].is_string());
    }
}
