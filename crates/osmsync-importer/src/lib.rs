//! osmsync importer
//!
//! Keeps a PostGIS database in step with the diff queue:
//!
//! - **Bootstrap**: bulk-load the settings PBF with imposm when the production
//!   schema is empty ([`bootstrap`])
//! - **Consume**: apply queued diffs oldest first, moving each to the done
//!   directory once applied ([`consumer`])
//! - **Status**: report the derived replication cursor without touching the
//!   database ([`status`])

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod bootstrap;
pub mod commands;
pub mod config;
pub mod consumer;
pub mod error;
pub mod importer;
pub mod postgis;
pub mod postprocess;
pub mod settings;
pub mod status;

pub use bootstrap::Bootstrapper;
pub use config::{ImporterArgs, ImporterConfig};
pub use consumer::DiffConsumer;
pub use error::{ImportError, ImportResult};
pub use importer::{Importer, ImporterState};
pub use postgis::{PgSchemaProbe, SchemaProbe};

use clap::{Parser, Subcommand};
use osmsync_common::process::SystemToolRunner;
use std::sync::Arc;

/// Applies queued OSM diffs to PostGIS with imposm
#[derive(Parser, Debug)]
#[command(name = "osmsync-importer")]
#[command(author, version, about, long_about = None)]
#[command(args_override_self = true)]
pub struct Cli {
    /// Defaults to `run`
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub args: ImporterArgs,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Bootstrap if needed, then apply diffs as they arrive
    Run,

    /// Show the replication cursor and queue counts
    Status {
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

/// Execute the parsed command line
pub async fn execute(cli: &Cli) -> ImportResult<()> {
    match cli.command.clone().unwrap_or(Command::Run) {
        Command::Run => {
            let config = cli.args.validate()?;
            let probe = PgSchemaProbe::connect(&config.database).await?;
            Importer::new(config, Arc::new(SystemToolRunner), Arc::new(probe))
                .run()
                .await
        },
        Command::Status { json } => {
            let dirs = cli.args.validate_directories()?;
            println!("{}", status::report(&dirs, json)?);
            Ok(())
        },
    }
}
