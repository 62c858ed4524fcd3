//! Core Gazer functionality
//!
//! This module contains the `Gazer` session: one connection pool, the schema
//! inspector bound to it, and the glue that feeds cached foreign keys into
//! query builders and runs what they build.

use config::ConnectionConfig;
use query_engine::{ForeignKeyEdge, QueryBuilder};
use schema_cache::SchemaCache;
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::time::Duration;

use crate::errors::GazerError;
use crate::executor::{self, ParamMode, QueryResult};
use crate::schema::{SchemaInspector, SchemaSource};

/// Connection options for `config` with `password`; empty fields are left to
/// libpq-style environment defaults.
pub fn connect_options(config: &ConnectionConfig, password: &str) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database);
    if !config.username.is_empty() {
        options = options.username(&config.username);
    }
    if !password.is_empty() {
        options = options.password(password);
    }
    options
}

/// Foreign keys for `host`/`database`, from `cache` unless `refresh` is set
/// or the cache misses; fresh results are written back.
pub async fn cached_foreign_keys<S>(
    source: &S,
    cache: &SchemaCache,
    host: &str,
    database: &str,
    refresh: bool,
) -> Result<Vec<ForeignKeyEdge>, GazerError>
where
    S: SchemaSource + ?Sized,
{
    if !refresh {
        if let Some(snapshot) = cache.load(host, database) {
            crate::debug_log!(
                edges = snapshot.foreign_keys.len(),
                cached_at = %snapshot.timestamp,
                "using cached foreign keys"
            );
            return Ok(snapshot.foreign_keys);
        }
    }

    let edges = source.foreign_keys().await?;
    cache.save(host, database, &edges)?;
    Ok(edges)
}

/// One database session
pub struct Gazer {
    pool: PgPool,
    connection: ConnectionConfig,
    inspector: SchemaInspector,
}

impl Gazer {
    /// Open a pool against `config`
    pub async fn connect(config: &ConnectionConfig, password: &str) -> Result<Self, GazerError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .connect_with(connect_options(config, password))
            .await?;

        tracing::info!(target_db = %config.target(), schema = %config.schema, "connected");
        Ok(Self::from_pool(pool, config.clone()))
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool, connection: ConnectionConfig) -> Self {
        let inspector = SchemaInspector::new(pool.clone(), connection.schema.clone());
        Self {
            pool,
            connection,
            inspector,
        }
    }

    /// Get database pool reference
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    pub fn inspector(&self) -> &SchemaInspector {
        &self.inspector
    }

    /// Check database connection health
    pub async fn health_check(&self) -> Result<(), GazerError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    /// Foreign keys of the configured schema, cache first
    pub async fn load_foreign_keys(
        &self,
        cache: &SchemaCache,
        refresh: bool,
    ) -> Result<Vec<ForeignKeyEdge>, GazerError> {
        cached_foreign_keys(
            &self.inspector,
            cache,
            &self.connection.host,
            &self.connection.database,
            refresh,
        )
        .await
    }

    /// A fresh builder with foreign keys loaded
    pub async fn prepare_builder(&self, cache: &SchemaCache) -> Result<QueryBuilder, GazerError> {
        let edges = self.load_foreign_keys(cache, false).await?;
        let mut builder = QueryBuilder::new();
        builder.set_foreign_keys(&edges);
        Ok(builder)
    }

    pub async fn execute(&self, builder: &QueryBuilder) -> Result<QueryResult, GazerError> {
        self.execute_with(builder, ParamMode::default()).await
    }

    /// Build and run `builder`
    pub async fn execute_with(
        &self,
        builder: &QueryBuilder,
        mode: ParamMode,
    ) -> Result<QueryResult, GazerError> {
        let fragment = builder.build()?;
        let mut result = executor::execute(&self.pool, &fragment, mode).await?;
        if result.columns.is_empty() {
            result.columns = column_labels(builder.columns());
        }
        Ok(result)
    }
}

/// Output labels PostgreSQL gives selected columns: the part after the last dot
pub fn column_labels(columns: &[String]) -> Vec<String> {
    columns
        .iter()
        .map(|c| match c.rsplit_once('.') {
            Some((_, name)) => name.to_string(),
            None => c.clone(),
        })
        .collect()
}
