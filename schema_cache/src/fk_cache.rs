//! Foreign-key snapshot cache
//!
//! Reading foreign keys from `information_schema` is slow on large databases,
//! so the last result is kept on disk keyed by host and database name.

use crate::errors::CacheError;
use chrono::{DateTime, Duration, Utc};
use config::PathsConfig;
use query_engine::ForeignKeyEdge;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Contents of the cache file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedSchema {
    pub host: String,
    pub database: String,
    pub timestamp: DateTime<Utc>,
    pub foreign_keys: Vec<ForeignKeyEdge>,
}

impl CachedSchema {
    pub fn is_older_than(&self, max_age: Duration) -> bool {
        Utc::now() - self.timestamp > max_age
    }
}

#[derive(Debug, Clone)]
pub struct SchemaCache {
    path: PathBuf,
}

impl SchemaCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache file inside the configured data directory
    pub fn default_location(paths: &PathsConfig) -> Result<Self, CacheError> {
        Ok(Self::new(paths.schema_cache_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the cache with `edges` for `host`/`database`.
    pub fn save(
        &self,
        host: &str,
        database: &str,
        edges: &[ForeignKeyEdge],
    ) -> Result<CachedSchema, CacheError> {
        let snapshot = CachedSchema {
            host: host.to_string(),
            database: database.to_string(),
            timestamp: Utc::now(),
            foreign_keys: edges.to_vec(),
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(&snapshot)?)?;

        tracing::debug!(
            path = %self.path.display(),
            edges = edges.len(),
            "saved schema cache for {}/{}", host, database
        );
        Ok(snapshot)
    }

    /// Cached snapshot for `host`/`database`.
    ///
    /// A missing or corrupt file, or one written for another database, is a
    /// miss rather than an error.
    pub fn load(&self, host: &str, database: &str) -> Option<CachedSchema> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => return None,
        };

        let snapshot: CachedSchema = match serde_json::from_str(&content) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring corrupt schema cache");
                return None;
            }
        };

        if snapshot.host == host && snapshot.database == database {
            Some(snapshot)
        } else {
            None
        }
    }

    /// Remove the cache file; a missing file is fine.
    pub fn clear(&self) -> Result<(), CacheError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
