//! PostGIS schema probe
//!
//! The importer asks the database exactly two questions: does the production
//! schema already hold imposm tables, and does a `clip` table exist. Both
//! are `information_schema.tables` counts.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::error::{ImportError, ImportResult};

/// Tables created by imposm (`LIKE` pattern, `_` escaped)
pub const OSM_TABLE_PATTERN: &str = "osm\\_%";

/// Table whose presence enables clipping
pub const CLIP_TABLE: &str = "clip";

/// Read-only view of the target database's catalog
#[async_trait]
pub trait SchemaProbe: Send + Sync {
    /// Count tables whose name matches the `LIKE` pattern, in `schema` or in
    /// any schema when `None`
    async fn count_tables(&self, schema: Option<&str>, pattern: &str) -> ImportResult<i64>;
}

/// [`SchemaProbe`] backed by a single pooled connection
#[derive(Clone)]
pub struct PgSchemaProbe {
    pool: PgPool,
}

impl PgSchemaProbe {
    /// Connect, retrying while the database container is still starting
    pub async fn connect(config: &DatabaseConfig) -> ImportResult<Self> {
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .username(&config.user)
            .password(&config.password)
            .database(&config.name);

        let mut attempt = 1;
        loop {
            match PgPoolOptions::new()
                .max_connections(1)
                .connect_with(options.clone())
                .await
            {
                Ok(pool) => {
                    info!(
                        host = %config.host,
                        port = config.port,
                        database = %config.name,
                        "Connected to PostGIS"
                    );
                    return Ok(Self { pool });
                },
                Err(e) if attempt < config.connect_retries => {
                    warn!(
                        attempt,
                        retries = config.connect_retries,
                        error = %e,
                        "Database not ready, retrying in {}s",
                        config.retry_interval.as_secs()
                    );
                    tokio::time::sleep(config.retry_interval).await;
                    attempt += 1;
                },
                Err(source) => {
                    return Err(ImportError::Unreachable {
                        attempts: attempt,
                        source,
                    })
                },
            }
        }
    }
}

#[async_trait]
impl SchemaProbe for PgSchemaProbe {
    async fn count_tables(&self, schema: Option<&str>, pattern: &str) -> ImportResult<i64> {
        let count = match schema {
            Some(schema) => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT count(*) FROM information_schema.tables \
                     WHERE table_schema = $1 AND table_name LIKE $2",
                )
                .bind(schema)
                .bind(pattern)
                .fetch_one(&self.pool)
                .await?
            },
            None => {
                sqlx::query_scalar::<_, i64>(
                    "SELECT count(*) FROM information_schema.tables WHERE table_name LIKE $1",
                )
                .bind(pattern)
                .fetch_one(&self.pool)
                .await?
            },
        };
        Ok(count)
    }
}

/// Whether the production schema already holds imposm tables
pub async fn has_osm_tables(probe: &dyn SchemaProbe, production_schema: &str) -> ImportResult<bool> {
    Ok(probe
        .count_tables(Some(production_schema), OSM_TABLE_PATTERN)
        .await?
        > 0)
}

/// Whether a `clip` table exists in any schema
pub async fn has_clip_table(probe: &dyn SchemaProbe) -> ImportResult<bool> {
    Ok(probe.count_tables(None, CLIP_TABLE).await? > 0)
}
