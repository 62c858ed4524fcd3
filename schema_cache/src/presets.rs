//! Named column presets
//!
//! A preset is a saved list of qualified columns (`table.column`) that can be
//! dropped into a query in one step. The file holds `{"presets": {...}}`.

use crate::errors::CacheError;
use config::PathsConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub type PresetMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Default, Serialize, Deserialize)]
struct PresetFile {
    #[serde(default)]
    presets: PresetMap,
}

#[derive(Debug, Clone)]
pub struct PresetStore {
    path: PathBuf,
}

impl PresetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location(paths: &PathsConfig) -> Result<Self, CacheError> {
        Ok(Self::new(paths.presets_file()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// All presets by name; empty when the file is missing or corrupt.
    pub fn load_all(&self) -> PresetMap {
        let Ok(content) = fs::read_to_string(&self.path) else {
            return PresetMap::new();
        };
        match serde_json::from_str::<PresetFile>(&content) {
            Ok(file) => file.presets,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring corrupt presets file");
                PresetMap::new()
            }
        }
    }

    pub fn save_all(&self, presets: &PresetMap) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = PresetFile {
            presets: presets.clone(),
        };
        fs::write(&self.path, serde_json::to_string_pretty(&file)?)?;
        Ok(())
    }

    /// Save or overwrite one preset
    pub fn save_preset<S: AsRef<str>>(&self, name: &str, columns: &[S]) -> Result<(), CacheError> {
        let mut presets = self.load_all();
        presets.insert(
            name.to_string(),
            columns.iter().map(|c| c.as_ref().to_string()).collect(),
        );
        self.save_all(&presets)
    }

    /// Delete a preset; unknown names are ignored.
    pub fn delete_preset(&self, name: &str) -> Result<(), CacheError> {
        let mut presets = self.load_all();
        presets.remove(name);
        self.save_all(&presets)
    }

    pub fn get(&self, name: &str) -> Option<Vec<String>> {
        self.load_all().remove(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_engine::QueryBuilder;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> PresetStore {
        PresetStore::new(dir.path().join("presets.json"))
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        assert!(store(&dir).load_all().is_empty());
        assert_eq!(store(&dir).get("anything"), None);
    }

    #[test]
    fn test_corrupt_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let presets = store(&dir);
        fs::write(presets.path(), "[1, 2").unwrap();
        assert!(presets.load_all().is_empty());
    }

    #[test]
    fn test_save_overwrite_and_delete() {
        let dir = TempDir::new().unwrap();
        let presets = store(&dir);

        presets.save_preset("plate view", &["plates.barcode", "wells.row"]).unwrap();
        presets.save_preset("basic", &["wells.well_id"]).unwrap();
        presets.save_preset("plate view", &["plates.barcode"]).unwrap();

        let all = presets.load_all();
        assert_eq!(all.keys().collect::<Vec<_>>(), vec!["basic", "plate view"]);
        assert_eq!(presets.get("plate view"), Some(vec!["plates.barcode".to_string()]));

        presets.delete_preset("basic").unwrap();
        presets.delete_preset("never existed").unwrap();
        assert_eq!(presets.load_all().len(), 1);
    }

    #[test]
    fn test_file_layout() {
        let dir = TempDir::new().unwrap();
        let presets = store(&dir);
        presets.save_preset("p", &["a.b"]).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(presets.path()).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"presets": {"p": ["a.b"]}}));
    }

    #[test]
    fn test_preset_feeds_builder_without_duplicates() {
        let dir = TempDir::new().unwrap();
        let presets = store(&dir);
        presets
            .save_preset("plate view", &["plates.barcode", "wells.well_id"])
            .unwrap();

        let mut qb = QueryBuilder::new();
        qb.set_table("wells").add_column("well_id", Some("wells"));
        let columns = presets.get("plate view").unwrap();
        qb.apply_preset(columns.as_slice());

        assert_eq!(qb.columns(), ["wells.well_id", "plates.barcode"]);
    }
}
