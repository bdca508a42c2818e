//! Importer error types

use osmsync_common::{ConfigErrors, SyncError};
use std::path::PathBuf;
use thiserror::Error;

pub type ImportResult<T> = Result<T, ImportError>;

/// Errors that stop the importer
#[derive(Error, Debug)]
pub enum ImportError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Config(#[from] ConfigErrors),

    /// Connection or probe query failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Cannot serialize the status report: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database not reachable after {attempts} attempt(s): {source}")]
    Unreachable {
        attempts: u32,
        #[source]
        source: sqlx::Error,
    },

    #[error("Bulk import of {} failed: {source}", .path.display())]
    BulkImport {
        path: PathBuf,
        #[source]
        source: SyncError,
    },

    /// The entry stays in the queue and is retried on the next start
    #[error("Applying diff {entry} failed: {source}")]
    DiffApply {
        entry: String,
        #[source]
        source: SyncError,
    },
}
