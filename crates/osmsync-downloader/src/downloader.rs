//! Producer loop
//!
//! Each tick derives `range_start` from the queue, captures the wall clock
//! as `range_end`, asks osmupdate for everything in between and publishes
//! the result as one queue entry. osmupdate writes to a hidden staging file
//! in the queue directory, so the importer only ever sees complete files.

use flate2::read::GzDecoder;
use osmsync_common::{Result, SyncError, ToolRunner};
use osmsync_queue::{QueueDirs, QueueEntry, QueueLock, ReplicationCursor, ReplicationTimestamp};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::baseline::BaselineResolver;
use crate::config::DownloaderConfig;
use crate::osmupdate;

/// Lock role name, also the lock file stem
pub const LOCK_ROLE: &str = "downloader";

/// What a single tick achieved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// A new entry was published
    Queued(QueueEntry),
    /// osmupdate succeeded without producing a changeset
    NothingNew,
    /// osmupdate failed or produced an unusable file; retry soon
    FetchFailed(String),
    /// The clock is not past the cursor; the tool was not run
    ClockSkew,
}

impl TickOutcome {
    fn delay(&self, config: &DownloaderConfig) -> std::time::Duration {
        match self {
            TickOutcome::FetchFailed(_) => config.retry_delay,
            _ => config.poll_interval,
        }
    }
}

pub struct Downloader {
    config: DownloaderConfig,
    runner: Arc<dyn ToolRunner>,
    dirs: QueueDirs,
}

impl Downloader {
    pub fn new(config: DownloaderConfig, runner: Arc<dyn ToolRunner>) -> Self {
        let dirs = config.queue_dirs();
        Self {
            config,
            runner,
            dirs,
        }
    }

    pub fn config(&self) -> &DownloaderConfig {
        &self.config
    }

    /// Fetch once.
    ///
    /// `Err` is reserved for problems a retry cannot fix (no baseline, the
    /// queue directory became unreadable). Tool failures are reported as
    /// [`TickOutcome::FetchFailed`].
    pub async fn tick(&self) -> Result<TickOutcome> {
        let baseline = BaselineResolver::new(&self.config, self.runner.as_ref());
        let cursor = ReplicationCursor::resolve(&self.dirs, || baseline.resolve()).await?;
        let range_start = cursor.timestamp;
        let range_end = ReplicationTimestamp::now();

        info!(
            range_start = %range_start,
            source = %cursor.source,
            range_end = %range_end,
            "Fetching changes"
        );

        if range_end <= range_start {
            warn!(
                range_start = %range_start,
                range_end = %range_end,
                "Clock is not past the replication cursor, skipping"
            );
            return Ok(TickOutcome::ClockSkew);
        }

        let staging = self.dirs.staging_path(&range_end);
        let invocation = osmupdate::fetch_command(&self.config, &range_start, &staging);
        debug!(command = %invocation, "Running osmupdate");

        let fetched = self
            .runner
            .run(&invocation)
            .await
            .and_then(|output| output.into_result(invocation.program()));
        if let Err(e) = fetched {
            warn!(error = %e, "osmupdate failed, retrying in {}s", self.config.retry_delay.as_secs());
            discard(&staging);
            return Ok(TickOutcome::FetchFailed(e.to_string()));
        }

        match check_staged(&staging) {
            Staged::Valid => {},
            Staged::Missing => {
                info!("No new changes available");
                return Ok(TickOutcome::NothingNew);
            },
            Staged::Empty => {
                info!("osmupdate produced an empty file, no new changes");
                discard(&staging);
                return Ok(TickOutcome::NothingNew);
            },
            Staged::Corrupt(e) => {
                warn!(file = %staging.display(), error = %e, "osmupdate output is not valid gzip, discarding");
                discard(&staging);
                return Ok(TickOutcome::FetchFailed(format!("invalid gzip output: {}", e)));
            },
        }

        let entry = self.dirs.publish(&staging, range_start, range_end)?;
        info!(entry = %entry.name(), "Diff queued");
        Ok(TickOutcome::Queued(entry))
    }

    /// Tick forever, sleeping the poll interval after a tick and the retry
    /// delay after a failed fetch. With a zero interval, tick once; a failed
    /// fetch is then an error.
    pub async fn run(&self) -> Result<()> {
        let _lock = if self.config.queue_lock {
            Some(QueueLock::acquire(&self.config.queue, LOCK_ROLE)?)
        } else {
            None
        };

        info!(
            queue = %self.config.queue.display(),
            done = %self.config.done.display(),
            granularity = %self.config.update.granularity,
            base_url = %self.config.update.base_url,
            poll_interval_secs = self.config.poll_interval.as_secs(),
            "Downloader started"
        );

        loop {
            let outcome = self.tick().await?;

            if self.config.is_one_shot() {
                return match outcome {
                    TickOutcome::FetchFailed(reason) => Err(SyncError::FetchFailed(reason)),
                    _ => Ok(()),
                };
            }

            let delay = outcome.delay(&self.config);
            debug!(seconds = delay.as_secs(), "Sleeping");
            tokio::time::sleep(delay).await;
        }
    }
}

enum Staged {
    Valid,
    Missing,
    Empty,
    Corrupt(io::Error),
}

/// Fully decode the staged file so a truncated download is caught here,
/// not by imposm
fn check_staged(path: &Path) -> Staged {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Staged::Missing,
        Err(e) => return Staged::Corrupt(e),
    };

    match file.metadata() {
        Ok(meta) if meta.len() == 0 => return Staged::Empty,
        Ok(_) => {},
        Err(e) => return Staged::Corrupt(e),
    }

    let mut decoder = GzDecoder::new(file);
    match io::copy(&mut decoder, &mut io::sink()) {
        Ok(_) => Staged::Valid,
        Err(e) => Staged::Corrupt(e),
    }
}

fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => debug!(file = %path.display(), "Removed staging file"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {},
        Err(e) => warn!(file = %path.display(), error = %e, "Could not remove staging file"),
    }
}
