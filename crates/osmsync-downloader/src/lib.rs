//! osmsync downloader
//!
//! Produces the diff queue the importer consumes. Every tick fetches the
//! changes between the replication cursor and now with osmupdate and
//! publishes them as `IMPORT_QUEUE/{start}->-{end}.osc.gz`.

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod baseline;
pub mod config;
pub mod downloader;
pub mod osmupdate;
pub mod settings;

pub use baseline::BaselineResolver;
pub use config::{DownloaderArgs, DownloaderConfig, Granularity};
pub use downloader::{Downloader, TickOutcome};

use clap::Parser;
use osmsync_common::process::SystemToolRunner;
use std::sync::Arc;

/// Fetches OSM replication diffs into the import queue with osmupdate
#[derive(Parser, Debug)]
#[command(name = "osmsync-downloader")]
#[command(author, version, about, long_about = None)]
#[command(args_override_self = true)]
pub struct Cli {
    #[command(flatten)]
    pub args: DownloaderArgs,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Validate the configuration and run the producer loop
pub async fn execute(cli: &Cli) -> osmsync_common::Result<()> {
    let config = cli.args.validate()?;
    Downloader::new(config, Arc::new(SystemToolRunner)).run().await
}
