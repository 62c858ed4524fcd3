//! Convenience re-exports for common Gazer usage
//!
//! # Example
//!
//! ```rust
//! use gazer::prelude::*;
//!
//! let mut qb = QueryBuilder::new();
//! qb.set_table("wells").add_column("well_id", None);
//! ```

// Core Gazer components
pub use crate::core::Gazer;
pub use crate::errors::GazerError;
pub use crate::executor::{ParamMode, QueryResult};
pub use crate::schema::{RefreshScope, SchemaInspector, SchemaSource, TableColumn};

// Re-export centralized config
pub use config::{AppConfig, ConnectionConfig, PathsConfig};

// Query construction
pub use query_engine::prelude::*;

// On-disk state
pub use schema_cache::prelude::*;

// Common external dependencies
pub use async_trait;
pub use sqlx;
pub use tokio;

// Commonly used sqlx types
pub use sqlx::{PgPool, Row};
