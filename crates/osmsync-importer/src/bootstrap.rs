//! One-time bulk load of an empty database

use osmsync_common::ToolRunner;
use std::time::Instant;
use tracing::{info, warn};

use crate::commands;
use crate::config::ImporterConfig;
use crate::error::{ImportError, ImportResult};
use crate::postgis::SchemaProbe;
use crate::postprocess::PostProcessor;

pub struct Bootstrapper<'a> {
    config: &'a ImporterConfig,
    runner: &'a dyn ToolRunner,
    probe: &'a dyn SchemaProbe,
}

impl<'a> Bootstrapper<'a> {
    pub fn new(config: &'a ImporterConfig, runner: &'a dyn ToolRunner, probe: &'a dyn SchemaProbe) -> Self {
        Self {
            config,
            runner,
            probe,
        }
    }

    /// Import the settings PBF, then run the auxiliary SQL steps.
    ///
    /// A failed import is fatal. The checkpoint is set to `UNDEFINED` only
    /// once the import has succeeded.
    pub async fn bootstrap(&self) -> ImportResult<()> {
        let osm_file = &self.config.settings.osm_file;
        let invocation = commands::imposm_import(self.config);
        info!(file = %osm_file.display(), "Importing into the database");
        info!(command = %invocation, "Running bulk import");

        let started = Instant::now();
        self.runner
            .run(&invocation)
            .await
            .and_then(|output| output.into_result(invocation.program()))
            .map_err(|source| ImportError::BulkImport {
                path: osm_file.clone(),
                source,
            })?;
        info!(
            duration_secs = started.elapsed().as_secs(),
            "Bulk import finished"
        );

        let post = PostProcessor::new(self.config, self.runner, self.probe);

        if let Some(sql) = &self.config.settings.post_import_sql {
            post.run_sql_file("post import SQL", sql).await;
        }

        if self.config.settings.clip.is_some() && post.install_clip_function().await {
            post.clip().await;
        }

        if let Some(style) = &self.config.settings.qgis_style_sql {
            post.run_sql_file("QGIS styles", style).await;
        }

        let checkpoint = self.config.dirs.checkpoint();
        if let Err(e) = checkpoint.initialize() {
            warn!(path = %checkpoint.path().display(), error = %e, "Could not write the checkpoint");
        }

        Ok(())
    }
}
