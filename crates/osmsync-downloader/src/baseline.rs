//! Baseline timestamp for an empty queue
//!
//! When neither queue directory holds an entry, the cursor falls back to the
//! age of the bulk-load source: the `timestamp=` line of `last.state.txt`
//! if imposm wrote one, otherwise the header timestamp osmconvert reads from
//! the PBF.

use osmsync_common::{Result, SyncError, ToolInvocation, ToolRunner};
use osmsync_queue::ReplicationTimestamp;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::config::DownloaderConfig;

pub struct BaselineResolver<'a> {
    config: &'a DownloaderConfig,
    runner: &'a dyn ToolRunner,
}

impl<'a> BaselineResolver<'a> {
    pub fn new(config: &'a DownloaderConfig, runner: &'a dyn ToolRunner) -> Self {
        Self { config, runner }
    }

    pub async fn resolve(&self) -> Result<ReplicationTimestamp> {
        if let Some(state_file) = &self.config.settings.state_file {
            match read_state_file(state_file) {
                Ok(Some(ts)) => {
                    info!(timestamp = %ts, file = %state_file.display(), "Baseline from the state file");
                    return Ok(ts);
                },
                Ok(None) => warn!(file = %state_file.display(), "State file has no timestamp line"),
                Err(e) => warn!(file = %state_file.display(), error = %e, "Cannot use the state file"),
            }
        }

        let osm_file = &self.config.settings.osm_file;
        let invocation = ToolInvocation::new(&self.config.tools.osmconvert)
            .path_arg(osm_file)
            .arg("--out-timestamp");
        let output = self
            .runner
            .run(&invocation)
            .await?
            .into_result(invocation.program())?;

        let ts = ReplicationTimestamp::parse(output.stdout.trim()).map_err(|_| {
            SyncError::NoBaseline(format!(
                "{} has no usable timestamp (osmconvert printed '{}')",
                osm_file.display(),
                output.stdout.trim()
            ))
        })?;
        info!(timestamp = %ts, file = %osm_file.display(), "Baseline from the PBF header");
        Ok(ts)
    }
}

/// `Ok(None)` when the file has no `timestamp=` line
fn read_state_file(path: &Path) -> Result<Option<ReplicationTimestamp>> {
    let content = fs::read_to_string(path).map_err(|e| SyncError::path(path, e))?;
    parse_state(&content)
}

/// Parse osmosis-style `key=value` state content
pub fn parse_state(content: &str) -> Result<Option<ReplicationTimestamp>> {
    content
        .lines()
        .filter_map(|line| line.split_once('='))
        .find(|(key, _)| key.trim() == "timestamp")
        .map(|(_, value)| ReplicationTimestamp::parse(value))
        .transpose()
}
