//! imposm and psql command lines

use osmsync_common::process::REDACTED;
use osmsync_common::ToolInvocation;
use osmsync_queue::QueueEntry;
use std::path::Path;
use url::Url;

use crate::config::ImporterConfig;

/// Full bulk load of the settings PBF, deployed straight to production
pub fn imposm_import(config: &ImporterConfig) -> ToolInvocation {
    let invocation = ToolInvocation::new(&config.tools.imposm)
        .args(["import", "-diff", "-deployproduction", "-overwritecache"])
        .arg("-cachedir")
        .path_arg(&config.dirs.cache)
        .arg("-srid")
        .arg(config.srid.to_string())
        .args(schema_flags(config))
        .arg("-diffdir")
        .path_arg(&config.dirs.settings)
        .arg("-mapping")
        .path_arg(&config.settings.mapping_file)
        .arg("-read")
        .path_arg(&config.settings.osm_file)
        .arg("-write")
        .arg("-connection");

    limit_to(connection(invocation, config), config)
}

/// Apply one queued changeset
pub fn imposm_diff(config: &ImporterConfig, entry: &QueueEntry) -> ToolInvocation {
    let invocation = ToolInvocation::new(&config.tools.imposm)
        .arg("diff")
        .arg("-cachedir")
        .path_arg(&config.dirs.cache)
        .args(schema_flags(config))
        .arg("-srid")
        .arg(config.srid.to_string())
        .arg("-diffdir")
        .path_arg(&config.dirs.settings)
        .arg("-mapping")
        .path_arg(&config.settings.mapping_file)
        .arg("-connection");

    limit_to(connection(invocation, config), config).path_arg(entry.payload_path())
}

/// Run an SQL file with `ON_ERROR_STOP`
pub fn psql_file(config: &ImporterConfig, file: &Path) -> ToolInvocation {
    psql(config).arg("-f").path_arg(file)
}

/// Run a single SQL statement
pub fn psql_command(config: &ImporterConfig, sql: &str) -> ToolInvocation {
    psql(config).arg("-c").arg(sql)
}

fn psql(config: &ImporterConfig) -> ToolInvocation {
    let db = &config.database;
    ToolInvocation::new(&config.tools.psql)
        .arg("-h")
        .arg(&db.host)
        .arg("-p")
        .arg(db.port.to_string())
        .arg("-U")
        .arg(&db.user)
        .arg("-d")
        .arg(&db.name)
        .args(["-v", "ON_ERROR_STOP=1"])
        .env("PGPASSWORD", &db.password)
}

fn connection(invocation: ToolInvocation, config: &ImporterConfig) -> ToolInvocation {
    invocation.masked_arg(&config.postgis_uri, mask_password(&config.postgis_uri))
}

/// The URI with its userinfo password replaced by `***`
fn mask_password(uri: &str) -> String {
    match Url::parse(uri) {
        Ok(mut url) if url.password().is_some() => match url.set_password(Some(REDACTED)) {
            Ok(()) => url.to_string(),
            Err(()) => REDACTED.to_string(),
        },
        Ok(_) => uri.to_string(),
        Err(_) => REDACTED.to_string(),
    }
}

fn schema_flags(config: &ImporterConfig) -> [String; 6] {
    [
        "-dbschema-production".to_string(),
        config.schemas.production.clone(),
        "-dbschema-import".to_string(),
        config.schemas.import.clone(),
        "-dbschema-backup".to_string(),
        config.schemas.backup.clone(),
    ]
}

fn limit_to(invocation: ToolInvocation, config: &ImporterConfig) -> ToolInvocation {
    match config
        .settings
        .clip
        .as_ref()
        .and_then(|clip| clip.boundary.limit_to())
    {
        Some(boundary) => invocation.arg("-limitto").path_arg(boundary),
        None => invocation,
    }
}
