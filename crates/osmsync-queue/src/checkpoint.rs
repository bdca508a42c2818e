//! The `timestamp.txt` side-car
//!
//! One line: `UNDEFINED` right after the bulk load, then the `range_end` of
//! the last applied diff. It exists for humans and the status report; the
//! importer never reads it back to decide what to apply.

use osmsync_common::{Result, SyncError};
use serde::{Serialize, Serializer};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::timestamp::ReplicationTimestamp;

/// File name of the checkpoint inside the settings directory
pub const CHECKPOINT_FILE: &str = "timestamp.txt";

const UNDEFINED: &str = "UNDEFINED";

/// Parsed contents of the checkpoint file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckpointValue {
    Undefined,
    At(ReplicationTimestamp),
}

impl Serialize for CheckpointValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl fmt::Display for CheckpointValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointValue::Undefined => f.write_str(UNDEFINED),
            CheckpointValue::At(ts) => write!(f, "{}", ts),
        }
    }
}

/// Handle on `SETTINGS/timestamp.txt`
#[derive(Debug, Clone)]
pub struct ImportCheckpoint {
    path: PathBuf,
}

impl ImportCheckpoint {
    pub fn in_settings(settings_dir: &Path) -> Self {
        Self {
            path: settings_dir.join(CHECKPOINT_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Written once after a successful bulk load
    pub fn initialize(&self) -> Result<()> {
        self.write(CheckpointValue::Undefined)
    }

    /// Written after every successfully applied diff
    pub fn record(&self, range_end: ReplicationTimestamp) -> Result<()> {
        self.write(CheckpointValue::At(range_end))
    }

    /// `None` when the file does not exist yet
    pub fn read(&self) -> Result<Option<CheckpointValue>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SyncError::path(&self.path, e)),
        };

        let line = content.lines().next().unwrap_or("").trim();
        if line == UNDEFINED {
            Ok(Some(CheckpointValue::Undefined))
        } else {
            Ok(Some(CheckpointValue::At(ReplicationTimestamp::parse(line)?)))
        }
    }

    fn write(&self, value: CheckpointValue) -> Result<()> {
        let tmp = self.path.with_extension("txt.tmp");
        let mut file = fs::File::create(&tmp).map_err(|e| SyncError::path(&tmp, e))?;
        writeln!(file, "{}", value).map_err(|e| SyncError::path(&tmp, e))?;
        file.sync_all().map_err(|e| SyncError::path(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| SyncError::path(&self.path, e))?;
        Ok(())
    }
}
