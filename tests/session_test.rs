//! Integration tests for the offline session pieces
//!
//! Foreign keys flow from a schema source through the on-disk cache into a
//! query builder; presets add columns. No database is needed.

use gazer::core::{cached_foreign_keys, column_labels};
use gazer::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Schema source that counts how often foreign keys are fetched
struct CountingSource {
    edges: Vec<ForeignKeyEdge>,
    fetches: AtomicUsize,
}

impl CountingSource {
    fn new() -> Self {
        Self {
            edges: vec![
                ForeignKeyEdge::new("wells", "plate_id", "plates", "plate_id"),
                ForeignKeyEdge::new("wells", "treatment_id", "treatments", "treatment_id"),
                ForeignKeyEdge::new("plates", "experiment_id", "experiments", "experiment_id"),
            ],
            fetches: AtomicUsize::new(0),
        }
    }

    fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SchemaSource for CountingSource {
    async fn tables(&self) -> Result<Vec<String>, GazerError> {
        Ok(vec![
            "experiments".to_string(),
            "plates".to_string(),
            "treatments".to_string(),
            "wells".to_string(),
        ])
    }

    async fn columns(&self, _table: &str) -> Result<Vec<TableColumn>, GazerError> {
        Ok(Vec::new())
    }

    async fn enum_values(&self, _type_name: &str) -> Result<Vec<String>, GazerError> {
        Ok(Vec::new())
    }

    async fn foreign_keys(&self) -> Result<Vec<ForeignKeyEdge>, GazerError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.edges.clone())
    }
}

fn cache_in(dir: &TempDir) -> SchemaCache {
    SchemaCache::new(dir.path().join("schema_cache.json"))
}

#[tokio::test]
async fn test_foreign_keys_cached_after_first_fetch() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    let source = CountingSource::new();

    let first = cached_foreign_keys(&source, &cache, "db.lab", "screening", false)
        .await
        .unwrap();
    let second = cached_foreign_keys(&source, &cache, "db.lab", "screening", false)
        .await
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(source.fetches(), 1);
}

#[tokio::test]
async fn test_refresh_bypasses_cache() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    let source = CountingSource::new();

    cached_foreign_keys(&source, &cache, "db.lab", "screening", false)
        .await
        .unwrap();
    cached_foreign_keys(&source, &cache, "db.lab", "screening", true)
        .await
        .unwrap();

    assert_eq!(source.fetches(), 2);
}

#[tokio::test]
async fn test_cache_is_per_database() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    let source = CountingSource::new();

    cached_foreign_keys(&source, &cache, "db.lab", "screening", false)
        .await
        .unwrap();
    cached_foreign_keys(&source, &cache, "db.lab", "clinical", false)
        .await
        .unwrap();

    assert_eq!(source.fetches(), 2);
    assert!(cache.load("db.lab", "clinical").is_some());
    assert!(cache.load("db.lab", "screening").is_none());
}

#[tokio::test]
async fn test_cached_edges_drive_auto_joins() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    let source = CountingSource::new();
    let edges = cached_foreign_keys(&source, &cache, "db.lab", "screening", false)
        .await
        .unwrap();

    let presets = PresetStore::new(dir.path().join("presets.json"));
    presets
        .save_preset("plate context", &["plates.barcode", "experiments.name"])
        .unwrap();

    let mut qb = QueryBuilder::new();
    qb.set_foreign_keys(&edges);
    qb.set_table("wells").add_column("well_id", Some("wells"));
    let preset = presets.get("plate context").unwrap();
    qb.apply_preset(preset.as_slice());
    qb.add_filter("treatment_type", "=", json!("drug"), Some("treatments"))
        .unwrap();

    let (sql, params) = qb.build().unwrap();
    assert_eq!(
        sql,
        "SELECT\n  wells.well_id,\n  plates.barcode,\n  experiments.name\n\
         FROM wells\n\
         LEFT JOIN plates ON wells.plate_id = plates.plate_id\n\
         LEFT JOIN experiments ON plates.experiment_id = experiments.experiment_id\n\
         LEFT JOIN treatments ON wells.treatment_id = treatments.treatment_id\n\
         WHERE treatments.treatment_type = %s;"
    );
    assert_eq!(params, vec![json!("drug")]);

    assert_eq!(
        query_engine::placeholders::inline(&sql, &params).unwrap(),
        sql.replace("%s", "'drug'")
    );
    assert_eq!(
        column_labels(qb.columns()),
        vec!["well_id", "barcode", "name"]
    );
}

#[tokio::test]
async fn test_corrupt_cache_file_is_replaced() {
    let dir = TempDir::new().unwrap();
    let cache = cache_in(&dir);
    std::fs::write(cache.path(), "not json at all").unwrap();

    let source = CountingSource::new();
    let edges = cached_foreign_keys(&source, &cache, "h", "d", false)
        .await
        .unwrap();

    assert_eq!(edges.len(), 3);
    assert_eq!(cache.load("h", "d").unwrap().foreign_keys, edges);
}
