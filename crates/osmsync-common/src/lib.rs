//! osmsync Common Library
//!
//! Shared plumbing for the osmsync importer and downloader processes.
//!
//! # Overview
//!
//! - **Error Handling**: the [`SyncError`] type shared by the queue and both binaries
//! - **Logging**: `tracing` subscriber setup driven by `LOG_*` environment variables
//! - **External Tools**: the [`ToolRunner`] seam every subprocess call goes through
//! - **Configuration**: structured validation errors collected before any loop starts
//! - **Signals**: Ctrl+C / SIGTERM handling for the polling loops
//!
//! # Example
//!
//! ```no_run
//! use osmsync_common::process::{SystemToolRunner, ToolInvocation, ToolRunner};
//!
//! # async fn demo() -> osmsync_common::Result<()> {
//! let runner = SystemToolRunner;
//! let output = runner.run(&ToolInvocation::new("psql").arg("--version")).await?;
//! assert!(output.success());
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod error;
pub mod logging;
pub mod process;
pub mod signal;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export commonly used types
pub use config::{ConfigErrors, ConfigIssue};
pub use error::{Result, SyncError};
pub use process::{ToolInvocation, ToolOutput, ToolRunner};
