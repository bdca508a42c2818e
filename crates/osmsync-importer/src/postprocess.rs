//! Best-effort SQL steps around the import
//!
//! Post-import SQL, QGIS styles and clipping are auxiliary. A failing step is
//! logged and the caller carries on.

use osmsync_common::{ToolInvocation, ToolRunner};
use std::path::Path;
use tracing::{info, warn};

use crate::commands;
use crate::config::ImporterConfig;
use crate::postgis::{self, SchemaProbe};

/// Statement defined by `clip.sql`
pub const CLEAN_TABLES_SQL: &str = "SELECT clean_tables();";

pub struct PostProcessor<'a> {
    config: &'a ImporterConfig,
    runner: &'a dyn ToolRunner,
    probe: &'a dyn SchemaProbe,
}

impl<'a> PostProcessor<'a> {
    pub fn new(config: &'a ImporterConfig, runner: &'a dyn ToolRunner, probe: &'a dyn SchemaProbe) -> Self {
        Self {
            config,
            runner,
            probe,
        }
    }

    /// Run `path` through psql; returns whether it succeeded
    pub async fn run_sql_file(&self, label: &str, path: &Path) -> bool {
        info!(file = %path.display(), "Running {}", label);
        self.run(commands::psql_file(self.config, path), label).await
    }

    /// Install `clean_tables()` from `clip.sql`
    pub async fn install_clip_function(&self) -> bool {
        match &self.config.settings.clip {
            Some(clip) => self.run_sql_file("clip function", &clip.function_sql).await,
            None => false,
        }
    }

    /// Call `clean_tables()` when clipping is configured and a clip table exists
    pub async fn clip(&self) {
        if self.config.settings.clip.is_none() {
            return;
        }

        match postgis::has_clip_table(self.probe).await {
            Ok(true) => {
                info!("Clipping");
                self.run(commands::psql_command(self.config, CLEAN_TABLES_SQL), "clip")
                    .await;
            },
            Ok(false) => info!("No clip table in the database, skipping clip"),
            Err(e) => warn!(error = %e, "Could not look up the clip table, skipping clip"),
        }
    }

    async fn run(&self, invocation: ToolInvocation, label: &str) -> bool {
        let program = invocation.program().to_string();
        let outcome = self
            .runner
            .run(&invocation)
            .await
            .and_then(|output| output.into_result(&program));

        match outcome {
            Ok(_) => true,
            Err(e) => {
                warn!(step = label, error = %e, "Auxiliary SQL step failed, continuing");
                false
            },
        }
    }
}
