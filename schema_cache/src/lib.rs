//! On-disk state for Gazer
//!
//! Two small JSON files live in the data directory: the foreign-key snapshot
//! of the last database inspected, and named column presets.

pub mod errors;
pub mod fk_cache;
pub mod prelude;
pub mod presets;

pub use errors::CacheError;
pub use fk_cache::{CachedSchema, SchemaCache};
pub use presets::{PresetMap, PresetStore};
