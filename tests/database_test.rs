//! Integration tests against a live PostgreSQL
//!
//! Run with `DATABASE_URL` set and `--ignored`. Each test works inside its own
//! schema and drops it afterwards.

use gazer::prelude::*;
use tempfile::TempDir;

async fn setup_pool() -> PgPool {
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for integration tests");

    PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to database")
}

async fn create_schema(pool: &PgPool, schema: &str) {
    drop_schema(pool, schema).await;
    let statements = [
        format!("CREATE SCHEMA {schema}"),
        format!("CREATE TYPE {schema}.treatment_kind AS ENUM ('drug', 'vehicle', 'control')"),
        format!(
            "CREATE TABLE {schema}.plates (plate_id SERIAL PRIMARY KEY, barcode TEXT NOT NULL, \
             seeded_on DATE, density NUMERIC(8, 3))"
        ),
        format!(
            "CREATE TABLE {schema}.treatments (treatment_id SERIAL PRIMARY KEY, \
             treatment_type {schema}.treatment_kind NOT NULL, dose DOUBLE PRECISION)"
        ),
        format!(
            "CREATE TABLE {schema}.wells (well_id SERIAL PRIMARY KEY, \
             plate_id INTEGER REFERENCES {schema}.plates(plate_id), \
             treatment_id INTEGER REFERENCES {schema}.treatments(treatment_id), \
             label TEXT, meta JSONB)"
        ),
        format!(
            "INSERT INTO {schema}.plates (barcode, seeded_on, density) VALUES \
             ('P-001', '2024-03-01', 12.5), ('P-002', '2024-03-02', NULL)"
        ),
        format!(
            "INSERT INTO {schema}.treatments (treatment_type, dose) VALUES \
             ('drug', 0.5), ('vehicle', 0)"
        ),
        format!(
            "INSERT INTO {schema}.wells (plate_id, treatment_id, label, meta) VALUES \
             (1, 1, 'A1', '{{\"edge\": true}}'), (1, 2, 'A2', NULL), (2, 1, 'it''s B1', NULL)"
        ),
    ];
    for statement in statements {
        sqlx::raw_sql(&statement)
            .execute(pool)
            .await
            .expect("Failed to create fixture");
    }
}

async fn drop_schema(pool: &PgPool, schema: &str) {
    let _ = sqlx::raw_sql(&format!("DROP SCHEMA IF EXISTS {schema} CASCADE"))
        .execute(pool)
        .await;
}

fn session(pool: PgPool, schema: &str) -> Gazer {
    let connection = ConnectionConfig {
        schema: schema.to_string(),
        ..ConnectionConfig::default()
    };
    Gazer::from_pool(pool, connection)
}

#[tokio::test]
#[ignore]
async fn test_inspector_reads_schema() {
    let pool = setup_pool().await;
    let schema = "gazer_it_inspect";
    create_schema(&pool, schema).await;
    let gazer = session(pool.clone(), schema);
    gazer.health_check().await.unwrap();

    let inspector = gazer.inspector();
    assert_eq!(
        inspector.tables().await.unwrap(),
        vec!["plates", "treatments", "wells"]
    );

    let columns = inspector.columns("wells").await.unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["well_id", "plate_id", "treatment_id", "label", "meta"]);
    assert!(columns[0].is_primary_key);
    assert_eq!(columns[1].fk_table.as_deref(), Some("plates"));
    assert_eq!(columns[1].fk_column.as_deref(), Some("plate_id"));

    let enums = inspector.table_enums("treatments").await.unwrap();
    assert_eq!(enums["treatment_type"], vec!["drug", "vehicle", "control"]);

    let edges = inspector.foreign_keys().await.unwrap();
    assert_eq!(
        edges,
        vec![
            ForeignKeyEdge::new("wells", "plate_id", "plates", "plate_id"),
            ForeignKeyEdge::new("wells", "treatment_id", "treatments", "treatment_id"),
        ]
    );

    inspector.refresh_cache(RefreshScope::All).await;
    assert_eq!(inspector.tables().await.unwrap().len(), 3);

    drop_schema(&pool, schema).await;
}

async fn search_path_pool(schema: &'static str) -> PgPool {
    let database_url = std::env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set for integration tests");

    sqlx::postgres::PgPoolOptions::new()
        .max_connections(2)
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                let sql = format!("SET search_path TO {schema}");
                sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(&sql)).await?;
                Ok(())
            })
        })
        .connect(&database_url)
        .await
        .expect("Failed to connect to database")
}

fn labels(result: &QueryResult) -> Vec<String> {
    let mut labels: Vec<String> = result
        .column("label")
        .into_iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    labels.sort();
    labels
}

#[tokio::test]
#[ignore]
async fn test_execute_with_auto_joins() {
    let schema = "gazer_it_execute";
    let setup = setup_pool().await;
    create_schema(&setup, schema).await;

    let gazer = session(search_path_pool(schema).await, schema);
    let dir = TempDir::new().unwrap();
    let cache = SchemaCache::new(dir.path().join("schema_cache.json"));

    let mut qb = gazer.prepare_builder(&cache).await.unwrap();
    qb.set_table("wells")
        .add_column("label", Some("wells"))
        .add_column("barcode", Some("plates"))
        .add_column("seeded_on", Some("plates"))
        .add_column("density", Some("plates"))
        .add_column("meta", Some("wells"));
    qb.add_filter("treatment_type", "=", json!("drug"), Some("treatments"))
        .unwrap();

    let result = gazer.execute(&qb).await.unwrap();
    assert_eq!(result.columns, vec!["label", "barcode", "seeded_on", "density", "meta"]);
    assert_eq!(result.row_count(), 2);
    assert_eq!(labels(&result), vec!["A1", "it's B1"]);

    let a1 = result
        .rows
        .iter()
        .find(|row| row["label"] == json!("A1"))
        .unwrap();
    assert_eq!(a1["barcode"], json!("P-001"));
    assert_eq!(a1["seeded_on"], json!("2024-03-01"));
    assert_eq!(a1["density"], json!("12.500"));
    assert_eq!(a1["meta"], json!({"edge": true}));

    // a typed text parameter has no equality operator against the enum column
    assert!(matches!(
        gazer.execute_with(&qb, ParamMode::Bound).await,
        Err(GazerError::Database(_))
    ));

    assert!(cache.load("localhost", "postgres").is_some());
    drop_schema(&setup, schema).await;
}

#[tokio::test]
#[ignore]
async fn test_execute_bound_and_empty_results() {
    let schema = "gazer_it_bound";
    let setup = setup_pool().await;
    create_schema(&setup, schema).await;
    let gazer = session(search_path_pool(schema).await, schema);

    let mut qb = QueryBuilder::new();
    qb.set_table("wells")
        .add_column("well_id", None)
        .add_column("label", None);
    qb.add_filter("well_id", ">=", json!(2), None).unwrap();

    let bound = gazer.execute_with(&qb, ParamMode::Bound).await.unwrap();
    let mut ids: Vec<i64> = bound
        .column("well_id")
        .into_iter()
        .filter_map(Value::as_i64)
        .collect();
    ids.sort();
    assert_eq!(ids, vec![2, 3]);

    qb.clear_filters();
    qb.add_filter("well_id", ">", json!(100), None).unwrap();
    let empty = gazer.execute(&qb).await.unwrap();
    assert!(empty.is_empty());
    assert_eq!(empty.columns, vec!["well_id", "label"]);

    drop_schema(&setup, schema).await;
}
