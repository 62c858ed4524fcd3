//! # Configuration Management for Gazer
//!
//! Connection settings and on-disk locations shared by the Gazer crates.
//!
//! ## TOML File Configuration
//! ```toml
//! [connection]
//! host = "localhost"
//! port = 5432
//! database = "postgres"
//! username = "analyst"
//! schema = "public"
//! max_connections = 5
//! connection_timeout_seconds = 30
//!
//! [paths]
//! export_path = "/home/analyst/exports"
//! # data_dir = "/home/analyst/.gazer"
//! ```
//!
//! Load configuration:
//! ```rust,no_run
//! use config::AppConfig;
//!
//! // GAZER_CONFIG (from the environment or .env), else ~/.gazer/config.toml
//! let config = AppConfig::load()?;
//!
//! // Or load from custom path
//! let config = AppConfig::from_file("config/lab.toml")?;
//! # Ok::<(), config::ConfigError>(())
//! ```
//!
//! Passwords are never part of the configuration; callers prompt for them.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "GAZER_CONFIG";
const DATA_DIR_NAME: &str = ".gazer";
const CONFIG_FILE_NAME: &str = "config.toml";
const SCHEMA_CACHE_FILE_NAME: &str = "schema_cache.json";
const PRESETS_FILE_NAME: &str = "presets.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("Environment variable error: {0}")]
    Env(#[from] env::VarError),
    #[error("Dotenvy error: {0}")]
    Dotenvy(#[from] dotenvy::Error),
    #[error("Home directory could not be determined")]
    NoHomeDir,
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub connection: ConnectionConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    /// File this configuration was loaded from; setters write back to it
    #[serde(skip)]
    source: Option<PathBuf>,
}

/// Database connection settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    #[serde(default)]
    pub username: String,
    /// Schema that introspection reads tables and foreign keys from
    #[serde(default = "default_schema")]
    pub schema: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
}

/// On-disk locations
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Last directory results were exported to
    #[serde(default)]
    pub export_path: String,
    /// Directory for the schema cache and presets; `~/.gazer` when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

fn default_schema() -> String {
    "public".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_connection_timeout() -> u64 {
    30
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "postgres".to_string(),
            username: String::new(),
            schema: default_schema(),
            max_connections: default_max_connections(),
            connection_timeout_seconds: default_connection_timeout(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            paths: PathsConfig::default(),
            source: None,
        }
    }
}

impl AppConfig {
    /// Load configuration named by `GAZER_CONFIG` (environment or `.env`),
    /// else from the default location, creating it with defaults if needed.
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                return Err(e.into());
            }
        }

        match env::var(CONFIG_ENV_VAR) {
            Ok(config_path) => Self::from_file(config_path),
            Err(env::VarError::NotPresent) => {
                let path = PathsConfig::default().data_dir()?.join(CONFIG_FILE_NAME);
                Self::load_or_default(path)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let mut config: Self = toml::from_str(&content)?;
        config.validate()?;
        config.source = Some(path.as_ref().to_path_buf());
        Ok(config)
    }

    /// Load from `path`; a missing, unparsable or invalid file is replaced
    /// with defaults that are written back.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            match Self::from_file(path) {
                Ok(config) => return Ok(config),
                Err(ConfigError::Io(e)) => return Err(ConfigError::Io(e)),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
                }
            }
        }

        let mut config = Self::default();
        config.save_to(path)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Write configuration as TOML, creating parent directories
    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Path the configuration was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    fn persist(&self) -> Result<(), ConfigError> {
        match &self.source {
            Some(path) => self.save_to(path),
            None => Ok(()),
        }
    }

    pub fn set_username(&mut self, username: impl Into<String>) -> Result<(), ConfigError> {
        self.connection.username = username.into();
        self.persist()
    }

    pub fn set_export_path(&mut self, path: impl Into<String>) -> Result<(), ConfigError> {
        self.paths.export_path = path.into();
        self.persist()
    }

    /// Update connection settings
    pub fn update_connection_settings(
        &mut self,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
    ) -> Result<(), ConfigError> {
        self.connection.host = host.into();
        self.connection.port = port;
        self.connection.database = database.into();
        self.validate()?;
        self.persist()
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection.host.is_empty() {
            return Err(ConfigError::Invalid(
                "Database host cannot be empty".to_string(),
            ));
        }
        if self.connection.port == 0 {
            return Err(ConfigError::Invalid(
                "Database port cannot be zero".to_string(),
            ));
        }
        if self.connection.database.is_empty() {
            return Err(ConfigError::Invalid(
                "Database name cannot be empty".to_string(),
            ));
        }
        if self.connection.schema.is_empty() {
            return Err(ConfigError::Invalid(
                "Schema name cannot be empty".to_string(),
            ));
        }
        if self.connection.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "Database max_connections must be greater than 0".to_string(),
            ));
        }
        if self.connection.connection_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "Database connection_timeout_seconds must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

impl ConnectionConfig {
    /// `user@host:port/database`, for logs and prompts
    pub fn target(&self) -> String {
        if self.username.is_empty() {
            format!("{}:{}/{}", self.host, self.port, self.database)
        } else {
            format!("{}@{}:{}/{}", self.username, self.host, self.port, self.database)
        }
    }
}

impl PathsConfig {
    /// Directory holding Gazer's files
    pub fn data_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::home_dir()
                .map(|home| home.join(DATA_DIR_NAME))
                .ok_or(ConfigError::NoHomeDir),
        }
    }

    pub fn schema_cache_file(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join(SCHEMA_CACHE_FILE_NAME))
    }

    pub fn presets_file(&self) -> Result<PathBuf, ConfigError> {
        Ok(self.data_dir()?.join(PRESETS_FILE_NAME))
    }
}
