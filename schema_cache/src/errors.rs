//! Error types for cache and preset files

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Cache location unavailable: {0}")]
    Config(#[from] config::ConfigError),
}
