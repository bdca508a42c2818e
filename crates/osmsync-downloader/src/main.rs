//! osmsync downloader - main entry point

use clap::Parser;
use osmsync_common::logging::{init_logging, LogConfig, LogLevel};
use osmsync_common::signal::shutdown_signal;
use osmsync_common::SyncError;
use osmsync_downloader::{execute, Cli};
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("osmsync-downloader")
        .build();

    // Environment variables take precedence
    let log_config = match log_config.clone().merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Ignoring invalid LOG_* settings: {}", e);
            log_config
        },
    };

    if let Err(e) = init_logging(&log_config) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    let result = tokio::select! {
        result = execute(&cli) => result,
        _ = shutdown_signal() => {
            info!("Downloader stopped");
            Ok(())
        },
    };

    match result {
        Ok(()) => {},
        Err(SyncError::Config(errors)) => {
            for issue in errors.issues() {
                error!(key = %issue.key, "{}", issue.message);
            }
            process::exit(1);
        },
        Err(e) => {
            error!(error = %e, "Downloader failed");
            process::exit(1);
        },
    }
}
