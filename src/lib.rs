//! # Gazer
//!
//! Interactive SELECT construction for PostgreSQL: pick a table, columns and
//! filters, and let foreign-key metadata fill in the joins.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gazer::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let gazer = Gazer::connect(&config.connection, "password").await?;
//!
//!     let cache = SchemaCache::default_location(&config.paths)?;
//!     let mut qb = gazer.prepare_builder(&cache).await?;
//!
//!     qb.set_table("wells")
//!         .add_column("well_id", Some("wells"))
//!         .add_column("barcode", Some("plates"));
//!     qb.add_filter("treatment_type", "IN", json!(["drug", "vehicle"]), Some("treatments"))?;
//!
//!     println!("{}", qb);
//!
//!     let result = gazer.execute(&qb).await?;
//!     println!("{} rows", result.row_count());
//!
//!     Ok(())
//! }
//! ```

/// Conditional debug logging macros
/// These macros only compile in code when the `debug-logging` feature is enabled
#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        tracing::debug!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {};
}

#[cfg(feature = "debug-logging")]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {
        tracing::trace!($($arg)*)
    };
}

#[cfg(not(feature = "debug-logging"))]
#[macro_export]
macro_rules! trace_log {
    ($($arg:tt)*) => {};
}

pub mod core;
pub mod errors;
pub mod executor;
pub mod prelude;
pub mod schema;

// Re-export the main public types for convenience
pub use core::Gazer;
pub use errors::GazerError;
pub use executor::{ParamMode, QueryResult};
pub use schema::{RefreshScope, SchemaInspector, SchemaSource, TableColumn};

// Re-export centralized config
pub use config::{AppConfig, ConnectionConfig, PathsConfig};

// Re-export internal crates used in the public API
pub use query_engine;
pub use schema_cache;

// Re-export external dependencies used in public API
pub use async_trait;
pub use sqlx;
