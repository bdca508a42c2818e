//! Diff consumption loop
//!
//! Entries are applied strictly one at a time, oldest `range_end` first. A
//! failed apply stops the loop and leaves the entry in the queue, so the
//! operator can fix the cause and restart without losing a changeset.

use osmsync_common::ToolRunner;
use osmsync_queue::{QueueDirs, QueueEntry};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::commands;
use crate::config::ImporterConfig;
use crate::error::{ImportError, ImportResult};
use crate::postgis::SchemaProbe;
use crate::postprocess::PostProcessor;

pub struct DiffConsumer<'a> {
    config: &'a ImporterConfig,
    runner: &'a dyn ToolRunner,
    probe: &'a dyn SchemaProbe,
    dirs: QueueDirs,
}

impl<'a> DiffConsumer<'a> {
    pub fn new(config: &'a ImporterConfig, runner: &'a dyn ToolRunner, probe: &'a dyn SchemaProbe) -> Self {
        Self {
            config,
            runner,
            probe,
            dirs: config.dirs.queue_dirs(),
        }
    }

    /// Apply one entry, then move it to the done directory.
    ///
    /// Returns the entry at its new location.
    pub async fn apply_entry(&self, entry: &QueueEntry) -> ImportResult<QueueEntry> {
        let invocation = commands::imposm_diff(self.config, entry);
        info!(entry = %entry.name(), "Importing diff");
        debug!(command = %invocation, "Running diff apply");

        let started = Instant::now();
        self.runner
            .run(&invocation)
            .await
            .and_then(|output| output.into_result(invocation.program()))
            .map_err(|source| ImportError::DiffApply {
                entry: entry.name(),
                source,
            })?;

        let done = self.dirs.mark_done(entry)?;
        info!(
            entry = %done.name(),
            range_end = %done.range_end(),
            duration_secs = started.elapsed().as_secs(),
            "Diff applied"
        );

        let checkpoint = self.config.dirs.checkpoint();
        if let Err(e) = checkpoint.record(done.range_end()) {
            warn!(path = %checkpoint.path().display(), error = %e, "Could not update the checkpoint");
        }

        PostProcessor::new(self.config, self.runner, self.probe)
            .clip()
            .await;

        Ok(done)
    }

    /// Apply pending entries until the queue is empty.
    ///
    /// The queue is re-listed after every entry so diffs published while
    /// draining are picked up in order. Returns the number applied.
    pub async fn drain(&self) -> ImportResult<usize> {
        let mut applied = 0;
        while let Some(entry) = self.dirs.oldest_pending()? {
            self.apply_entry(&entry).await?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Drain, sleep, repeat. With a zero interval, drain once and return.
    pub async fn run(&self) -> ImportResult<()> {
        loop {
            let applied = self.drain().await?;
            if applied > 0 {
                info!(applied, "Queue drained");
            }

            if self.config.is_one_shot() {
                info!("TIME is 0, catch-up finished");
                return Ok(());
            }

            debug!(
                seconds = self.config.poll_interval.as_secs(),
                "No more diff to import, sleeping"
            );
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}
