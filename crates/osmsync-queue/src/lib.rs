//! osmsync queue protocol
//!
//! The downloader and the importer never talk to each other directly. They
//! share two directories and a naming convention:
//!
//! - `IMPORT_QUEUE/{start}->-{end}.osc.gz`: changesets waiting to be applied
//! - `IMPORT_DONE/{start}->-{end}.osc.gz`: changesets already applied
//!
//! Timestamps are fixed-width UTC (`2023-01-02T00:00:00Z`), so sorting file
//! names sorts entries by time. The replication cursor is derived from these
//! directories on demand; see [`cursor`].
//!
//! # Example
//!
//! ```no_run
//! use osmsync_queue::{QueueDirs, ReplicationCursor};
//!
//! # fn demo() -> osmsync_common::Result<()> {
//! let dirs = QueueDirs::new("/home/import_queue", "/home/import_done");
//! if let Some(entry) = dirs.oldest_pending()? {
//!     println!("next: {}", entry.name());
//! }
//! if let Some(cursor) = ReplicationCursor::from_queue(&dirs)? {
//!     println!("cursor: {} ({})", cursor.timestamp, cursor.source);
//! }
//! # Ok(())
//! # }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod checkpoint;
pub mod cursor;
pub mod entry;
pub mod follow;
pub mod lock;
pub mod queue;
pub mod timestamp;

pub use checkpoint::{CheckpointValue, ImportCheckpoint};
pub use cursor::{CursorSource, ReplicationCursor};
pub use entry::QueueEntry;
pub use follow::DoneFollower;
pub use lock::QueueLock;
pub use queue::QueueDirs;
pub use timestamp::ReplicationTimestamp;
