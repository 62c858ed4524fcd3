//! Error types for the Gazer crate
//!
//! This module contains all error types that can be returned by Gazer operations.

use config::ConfigError;
use query_engine::QueryError;
use schema_cache::CacheError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GazerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Query error: {0}")]
    Query(#[from] QueryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("Failed to fetch columns for '{table}': {source}")]
    Introspection {
        table: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Failed to decode column '{column}': {message}")]
    Decode { column: String, message: String },
}
