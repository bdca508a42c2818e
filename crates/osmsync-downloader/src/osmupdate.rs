//! osmupdate command line

use osmsync_common::ToolInvocation;
use osmsync_queue::ReplicationTimestamp;
use std::path::Path;

use crate::config::DownloaderConfig;

/// Fetch everything newer than `since` into `output`
pub fn fetch_command(config: &DownloaderConfig, since: &ReplicationTimestamp, output: &Path) -> ToolInvocation {
    let update = &config.update;
    let mut invocation = ToolInvocation::new(&config.tools.osmupdate).arg("-v");
    if let Some(poly) = &config.settings.poly_file {
        invocation = invocation.arg(format!("-B={}", poly.display()));
    }

    invocation
        .arg(format!("--max-days={}", update.max_days))
        .arg(update.granularity.flag())
        .arg(format!("--max-merge={}", update.max_merge))
        .arg(format!("--compression-level={}", update.compression_level))
        .arg(format!("--base-url={}", update.base_url))
        .arg(since.to_string())
        .path_arg(output)
}
