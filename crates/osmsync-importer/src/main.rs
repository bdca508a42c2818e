//! osmsync importer - main entry point

use clap::Parser;
use osmsync_common::logging::{init_logging, LogConfig, LogLevel};
use osmsync_common::signal::shutdown_signal;
use osmsync_importer::{execute, Cli, ImportError};
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // Optional .env next to the binary's working directory
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let log_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Info
    };

    let log_config = LogConfig::builder()
        .level(log_level)
        .log_file_prefix("osmsync-importer")
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
            info!("Importer stopped");
            Ok(())
        },
    };

    if let Err(e) = result {
        report(&e);
        process::exit(1);
    }
}

fn report(e: &ImportError) {
    match e {
        ImportError::Config(errors) | ImportError::Sync(osmsync_common::SyncError::Config(errors)) => {
            for issue in errors.issues() {
                error!(key = %issue.key, "{}", issue.message);
            }
        },
        other => error!(error = %other, "Importer failed"),
    }
}
