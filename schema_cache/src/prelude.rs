//! Convenience re-exports for cache and preset files

pub use crate::errors::CacheError;
pub use crate::fk_cache::{CachedSchema, SchemaCache};
pub use crate::presets::{PresetMap, PresetStore};
