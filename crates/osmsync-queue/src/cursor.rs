//! Replication cursor derivation
//!
//! The cursor ("how current is the database") is never stored. It is derived
//! from the directories, most trusted source first:
//!
//! 1. `range_end` of the last pending entry
//! 2. `range_end` of the last done entry
//! 3. a baseline timestamp from the bulk-load source, supplied by the caller
//!
//! The checkpoint file is deliberately not one of the sources.

use osmsync_common::Result;
use serde::Serialize;
use std::fmt;

use crate::queue::QueueDirs;
use crate::timestamp::ReplicationTimestamp;

/// Where a cursor value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CursorSource {
    Pending,
    Done,
    Baseline,
}

impl fmt::Display for CursorSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CursorSource::Pending => write!(f, "latest pending diff"),
            CursorSource::Done => write!(f, "latest imported diff"),
            CursorSource::Baseline => write!(f, "bulk-load source"),
        }
    }
}

/// The derived replication position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplicationCursor {
    pub timestamp: ReplicationTimestamp,
    pub source: CursorSource,
}

impl ReplicationCursor {
    /// Derive the cursor from the queue alone (tiers 1 and 2)
    pub fn from_queue(dirs: &QueueDirs) -> Result<Option<Self>> {
        if let Some(last) = dirs.pending()?.last() {
            return Ok(Some(Self {
                timestamp: last.range_end(),
                source: CursorSource::Pending,
            }));
        }

        if let Some(last) = dirs.done()?.last() {
            return Ok(Some(Self {
                timestamp: last.range_end(),
                source: CursorSource::Done,
            }));
        }

        Ok(None)
    }

    pub fn baseline(timestamp: ReplicationTimestamp) -> Self {
        Self {
            timestamp,
            source: CursorSource::Baseline,
        }
    }

    /// Derive the cursor, falling back to `baseline` only when both
    /// directories are empty
    pub async fn resolve<F, Fut>(dirs: &QueueDirs, baseline: F) -> Result<Self>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<ReplicationTimestamp>>,
    {
        match Self::from_queue(dirs)? {
            Some(cursor) => Ok(cursor),
            None => Ok(Self::baseline(baseline().await?)),
        }
    }
}
