//! Error types shared by the queue protocol and both processes

use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigErrors;

/// Result type alias for osmsync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Main error type for osmsync
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error on {path}: {source}")]
    Path {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid replication timestamp: '{0}'. Expected YYYY-MM-DDTHH:MM:SSZ")]
    InvalidTimestamp(String),

    #[error("Invalid queue entry name: '{0}'. Expected '<start>->-<end>.osc.gz'")]
    InvalidEntryName(String),

    #[error("Queue entry {0} already exists in the destination directory")]
    EntryExists(PathBuf),

    #[error("Failed to start {program}: {source}")]
    ToolSpawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {}: {stderr}", exit_label(.code))]
    ToolFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Another {role} already holds the queue lock at {path}")]
    Locked { role: String, path: PathBuf },

    #[error(transparent)]
    Config(#[from] ConfigErrors),

    #[error("No baseline timestamp available: {0}")]
    NoBaseline(String),

    #[error("Fetching changes failed: {0}")]
    FetchFailed(String),
}

impl SyncError {
    /// Attach the offending path to an IO error
    pub fn path(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Path {
            path: path.into(),
            source,
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "a signal".to_string(),
    }
}
