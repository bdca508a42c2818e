//! Queue entries
//!
//! A queue entry is one compressed changeset covering `[range_start, range_end)`.
//! The range lives only in the file name, `{range_start}->-{range_end}.osc.gz`;
//! files are never rewritten, only renamed between directories.

use osmsync_common::{Result, SyncError};
use std::path::{Path, PathBuf};

use crate::timestamp::ReplicationTimestamp;

/// Separator between the two timestamps of an entry name
pub const RANGE_SEPARATOR: &str = "->-";

/// Suffix shared by every entry
pub const ENTRY_SUFFIX: &str = ".osc.gz";

/// One pending or applied changeset file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    range_start: ReplicationTimestamp,
    range_end: ReplicationTimestamp,
    payload_path: PathBuf,
}

impl QueueEntry {
    /// Describe the entry for `[start, end)` located in `dir`
    pub fn new(dir: &Path, range_start: ReplicationTimestamp, range_end: ReplicationTimestamp) -> Self {
        let payload_path = dir.join(Self::file_name(&range_start, &range_end));
        Self {
            range_start,
            range_end,
            payload_path,
        }
    }

    pub fn file_name(range_start: &ReplicationTimestamp, range_end: &ReplicationTimestamp) -> String {
        format!("{}{}{}{}", range_start, RANGE_SEPARATOR, range_end, ENTRY_SUFFIX)
    }

    /// Recover `(range_start, range_end)` from an entry file name
    pub fn parse_file_name(name: &str) -> Result<(ReplicationTimestamp, ReplicationTimestamp)> {
        let invalid = || SyncError::InvalidEntryName(name.to_string());

        let stem = name.strip_suffix(ENTRY_SUFFIX).ok_or_else(invalid)?;
        let (start, end) = stem.split_once(RANGE_SEPARATOR).ok_or_else(invalid)?;

        let start = ReplicationTimestamp::parse(start).map_err(|_| invalid())?;
        let end = ReplicationTimestamp::parse(end).map_err(|_| invalid())?;

        // Only canonical spellings keep filename order equal to time order
        if Self::file_name(&start, &end) != name || end < start {
            return Err(invalid());
        }

        Ok((start, end))
    }

    /// Build an entry from an existing file
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| SyncError::InvalidEntryName(path.display().to_string()))?;
        let (range_start, range_end) = Self::parse_file_name(name)?;

        Ok(Self {
            range_start,
            range_end,
            payload_path: path.to_path_buf(),
        })
    }

    pub fn range_start(&self) -> ReplicationTimestamp {
        self.range_start
    }

    pub fn range_end(&self) -> ReplicationTimestamp {
        self.range_end
    }

    pub fn payload_path(&self) -> &Path {
        &self.payload_path
    }

    pub fn name(&self) -> String {
        Self::file_name(&self.range_start, &self.range_end)
    }

    /// The same entry relocated into `dir`
    pub fn relocated(&self, dir: &Path) -> Self {
        Self::new(dir, self.range_start, self.range_end)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> ReplicationTimestamp {
        ReplicationTimestamp::parse(raw).unwrap()
    }

    #[test]
    fn test_name_layout() {
        let entry = QueueEntry::new(
            Path::new("/data/import_queue"),
            ts("2023-01-01T00:00:00Z"),
            ts("2023-01-02T00:00:00Z"),
        );
        assert_eq!(entry.name(), "2023-01-01T00:00:00Z->-2023-01-02T00:00:00Z.osc.gz");
        assert_eq!(
            entry.payload_path(),
            Path::new("/data/import_queue/2023-01-01T00:00:00Z->-2023-01-02T00:00:00Z.osc.gz")
        );
    }

    #[test]
    fn test_round_trip_across_boundaries() {
        let pairs = [
            ("2023-01-31T23:59:59Z", "2023-02-01T00:00:00Z"),
            ("2023-12-31T23:00:00Z", "2024-01-01T01:00:00Z"),
            ("2024-02-28T12:00:00Z", "2024-02-29T12:00:00Z"),
            ("1999-12-31T23:59:59Z", "2000-01-01T00:00:00Z"),
        ];
        for (start, end) in pairs {
            let name = QueueEntry::file_name(&ts(start), &ts(end));
            let (s, e) = QueueEntry::parse_file_name(&name).unwrap();
            assert_eq!((s.to_string(), e.to_string()), (start.to_string(), end.to_string()));
        }
    }

    #[test]
    fn test_rejects_foreign_names() {
        for name in [
            "2023-01-02T00:00:00Z.osc.gz",
            "2023-01-01T00:00:00Z->-2023-01-02T00:00:00Z.osc",
            "2023-01-01T00:00:00Z->-garbage.osc.gz",
            ".2023-01-02T00:00:00Z.osc.gz.partial",
            "2023-01-02T00:00:00Z->-2023-01-01T00:00:00Z.osc.gz",
            "2023-01-01T00\\:00\\:00Z->-2023-01-02T00:00:00Z.osc.gz",
        ] {
            assert!(QueueEntry::parse_file_name(name).is_err(), "{name} should be rejected");
        }
    }

    #[test]
    fn test_from_path() {
        let path = Path::new("/q/2023-01-01T00:00:00Z->-2023-01-02T00:00:00Z.osc.gz");
        let entry = QueueEntry::from_path(path).unwrap();
        assert_eq!(entry.range_end().to_string(), "2023-01-02T00:00:00Z");
        assert_eq!(entry.relocated(Path::new("/d")).payload_path().parent(), Some(Path::new("/d")));
    }
}
