//! Importer state machine
//!
//! ```text
//! Uninitialized --bootstrap--> BulkLoading --ok--> Ready (drain / sleep)
//!                                          --err--> exit
//! ```
//!
//! The state is read from the database on every start: imposm tables in the
//! production schema mean the bulk load already happened.

use osmsync_common::ToolRunner;
use osmsync_queue::QueueLock;
use std::fmt;
use std::sync::Arc;
use tracing::info;

use crate::bootstrap::Bootstrapper;
use crate::config::ImporterConfig;
use crate::consumer::DiffConsumer;
use crate::error::ImportResult;
use crate::postgis::{self, SchemaProbe};

/// Lock role name, also the lock file stem
pub const LOCK_ROLE: &str = "importer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImporterState {
    /// No imposm tables in the production schema
    Uninitialized,
    BulkLoading,
    /// Consuming diffs
    Ready,
}

impl fmt::Display for ImporterState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImporterState::Uninitialized => write!(f, "uninitialized"),
            ImporterState::BulkLoading => write!(f, "bulk loading"),
            ImporterState::Ready => write!(f, "ready"),
        }
    }
}

pub struct Importer {
    config: ImporterConfig,
    runner: Arc<dyn ToolRunner>,
    probe: Arc<dyn SchemaProbe>,
}

impl Importer {
    pub fn new(config: ImporterConfig, runner: Arc<dyn ToolRunner>, probe: Arc<dyn SchemaProbe>) -> Self {
        Self {
            config,
            runner,
            probe,
        }
    }

    pub fn config(&self) -> &ImporterConfig {
        &self.config
    }

    /// `Ready` when the production schema already holds imposm tables
    pub async fn detect_state(&self) -> ImportResult<ImporterState> {
        if postgis::has_osm_tables(self.probe.as_ref(), &self.config.schemas.production).await? {
            Ok(ImporterState::Ready)
        } else {
            Ok(ImporterState::Uninitialized)
        }
    }

    /// Bootstrap if needed, then consume diffs until stopped (or once, when
    /// the poll interval is zero)
    pub async fn run(&self) -> ImportResult<()> {
        self.log_settings();

        let _lock = if self.config.queue_lock {
            Some(QueueLock::acquire(&self.config.dirs.queue, LOCK_ROLE)?)
        } else {
            None
        };

        let mut state = self.detect_state().await?;
        info!(%state, schema = %self.config.schemas.production, "Detected database state");

        if state == ImporterState::Uninitialized {
            state = ImporterState::BulkLoading;
            info!(%state, "No tables found in the production schema, starting the bulk load");
            Bootstrapper::new(&self.config, self.runner.as_ref(), self.probe.as_ref())
                .bootstrap()
                .await?;
            state = ImporterState::Ready;
        } else {
            info!(
                "{} tables found in {}, skipping the bulk load",
                postgis::OSM_TABLE_PATTERN.replace('\\', ""),
                self.config.schemas.production
            );
        }

        info!(%state, queue = %self.config.dirs.queue.display(), "Consuming diffs");
        DiffConsumer::new(&self.config, self.runner.as_ref(), self.probe.as_ref())
            .run()
            .await
    }

    fn log_settings(&self) {
        let c = &self.config;
        info!(
            srid = %c.srid,
            poll_interval_secs = c.poll_interval.as_secs(),
            settings = %c.dirs.settings.display(),
            cache = %c.dirs.cache.display(),
            queue = %c.dirs.queue.display(),
            done = %c.dirs.done.display(),
            osm_file = %c.settings.osm_file.display(),
            mapping = %c.settings.mapping_file.display(),
            clip = c.settings.clip.is_some(),
            qgis_style = c.settings.qgis_style_sql.is_some(),
            "Importer settings"
        );
    }
}
