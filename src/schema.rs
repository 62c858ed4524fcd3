//! Schema introspection
//!
//! Tables, columns, enum labels and foreign keys of one PostgreSQL schema.
//! Foreign keys are read from `pg_catalog` rather than `information_schema`,
//! whose constraint views hide rows the current role does not own.

use async_trait::async_trait;
use query_engine::ForeignKeyEdge;
use sqlx::{FromRow, PgPool};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use crate::errors::GazerError;

const TABLES_SQL: &str = r#"
    SELECT table_name::text
    FROM information_schema.tables
    WHERE table_schema = $1
    ORDER BY table_name
"#;

const COLUMNS_SQL: &str = r#"
    SELECT
        c.column_name::text AS name,
        c.data_type::text AS data_type,
        (c.is_nullable = 'YES') AS nullable,
        c.column_default::text AS "default",
        c.udt_name::text AS udt_name,
        (pk.column_name IS NOT NULL) AS is_primary_key,
        (fk.column_name IS NOT NULL) AS is_foreign_key,
        fk.foreign_table_name AS fk_table,
        fk.foreign_column_name AS fk_column
    FROM information_schema.columns c
    LEFT JOIN (
        SELECT ku.table_name, ku.column_name
        FROM information_schema.table_constraints tc
        JOIN information_schema.key_column_usage ku
            ON tc.constraint_name = ku.constraint_name
            AND tc.table_schema = ku.table_schema
        WHERE tc.constraint_type = 'PRIMARY KEY'
            AND tc.table_schema = $1
    ) pk ON c.table_name = pk.table_name AND c.column_name = pk.column_name
    LEFT JOIN (
        SELECT
            cl.relname::text AS table_name,
            att.attname::text AS column_name,
            cl_foreign.relname::text AS foreign_table_name,
            att_foreign.attname::text AS foreign_column_name
        FROM pg_constraint con
        JOIN pg_class cl ON con.conrelid = cl.oid
        JOIN pg_namespace ns ON cl.relnamespace = ns.oid
        JOIN pg_attribute att ON att.attrelid = con.conrelid
            AND att.attnum = ANY(con.conkey)
        JOIN pg_class cl_foreign ON con.confrelid = cl_foreign.oid
        JOIN pg_attribute att_foreign ON att_foreign.attrelid = con.confrelid
            AND att_foreign.attnum = ANY(con.confkey)
        WHERE con.contype = 'f'
            AND ns.nspname = $1
    ) fk ON c.table_name = fk.table_name AND c.column_name = fk.column_name
    WHERE c.table_schema = $1 AND c.table_name = $2
    ORDER BY c.ordinal_position
"#;

const ENUM_VALUES_SQL: &str = r#"
    SELECT e.enumlabel::text
    FROM pg_type t
    JOIN pg_enum e ON t.oid = e.enumtypid
    WHERE t.typname = $1
    ORDER BY e.enumsortorder
"#;

const FOREIGN_KEYS_SQL: &str = r#"
    SELECT
        cl.relname::text AS from_table,
        att.attname::text AS from_column,
        cl_foreign.relname::text AS to_table,
        att_foreign.attname::text AS to_column
    FROM pg_constraint con
    JOIN pg_class cl ON con.conrelid = cl.oid
    JOIN pg_namespace ns ON cl.relnamespace = ns.oid
    JOIN pg_attribute att ON att.attrelid = con.conrelid
        AND att.attnum = ANY(con.conkey)
    JOIN pg_class cl_foreign ON con.confrelid = cl_foreign.oid
    JOIN pg_attribute att_foreign ON att_foreign.attrelid = con.confrelid
        AND att_foreign.attnum = ANY(con.confkey)
    WHERE con.contype = 'f'
        AND ns.nspname = $1
    ORDER BY cl.relname, att.attname
"#;

/// Column metadata for one table
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct TableColumn {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub default: Option<String>,
    /// Underlying type name; the enum type for `USER-DEFINED` columns
    pub udt_name: String,
    pub is_primary_key: bool,
    pub is_foreign_key: bool,
    pub fk_table: Option<String>,
    pub fk_column: Option<String>,
}

impl TableColumn {
    pub fn is_enum(&self) -> bool {
        self.data_type == "USER-DEFINED"
    }
}

#[derive(FromRow)]
struct ForeignKeyRow {
    from_table: String,
    from_column: String,
    to_table: String,
    to_column: String,
}

impl From<ForeignKeyRow> for ForeignKeyEdge {
    fn from(row: ForeignKeyRow) -> Self {
        ForeignKeyEdge::new(row.from_table, row.from_column, row.to_table, row.to_column)
    }
}

/// Which memoized results `refresh_cache` drops
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshScope {
    All,
    Tables,
    Columns,
    Enums,
}

/// Source of schema metadata
#[async_trait]
pub trait SchemaSource: Send + Sync {
    /// Table names, sorted
    async fn tables(&self) -> Result<Vec<String>, GazerError>;

    /// Columns of `table` in ordinal order
    async fn columns(&self, table: &str) -> Result<Vec<TableColumn>, GazerError>;

    /// Labels of an enum type in declaration order
    async fn enum_values(&self, type_name: &str) -> Result<Vec<String>, GazerError>;

    /// Every foreign-key column pair in the schema
    async fn foreign_keys(&self) -> Result<Vec<ForeignKeyEdge>, GazerError>;

    /// Enum columns of `table` mapped to their labels.
    ///
    /// Columns whose enum type has no labels are left out.
    async fn table_enums(&self, table: &str) -> Result<BTreeMap<String, Vec<String>>, GazerError> {
        let mut enums = BTreeMap::new();
        for column in self.columns(table).await? {
            if !column.is_enum() {
                continue;
            }
            let labels = self.enum_values(&column.udt_name).await?;
            if !labels.is_empty() {
                enums.insert(column.name, labels);
            }
        }
        Ok(enums)
    }
}

#[derive(Debug, Default)]
struct Memo {
    tables: Option<Vec<String>>,
    columns: HashMap<String, Vec<TableColumn>>,
    enums: HashMap<String, Vec<String>>,
}

/// Introspects one schema through a connection pool, memoizing answers
#[derive(Debug)]
pub struct SchemaInspector {
    pool: PgPool,
    schema: String,
    memo: RwLock<Memo>,
}

impl SchemaInspector {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
            memo: RwLock::new(Memo::default()),
        }
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Forget memoized results so the next call hits the database.
    pub async fn refresh_cache(&self, scope: RefreshScope) {
        let mut memo = self.memo.write().await;
        match scope {
            RefreshScope::All => *memo = Memo::default(),
            RefreshScope::Tables => memo.tables = None,
            RefreshScope::Columns => memo.columns.clear(),
            RefreshScope::Enums => memo.enums.clear(),
        }
        crate::debug_log!(?scope, schema = %self.schema, "schema memo refreshed");
    }
}

#[async_trait]
impl SchemaSource for SchemaInspector {
    async fn tables(&self) -> Result<Vec<String>, GazerError> {
        if let Some(tables) = &self.memo.read().await.tables {
            return Ok(tables.clone());
        }

        let tables: Vec<String> = sqlx::query_scalar(TABLES_SQL)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;

        self.memo.write().await.tables = Some(tables.clone());
        Ok(tables)
    }

    async fn columns(&self, table: &str) -> Result<Vec<TableColumn>, GazerError> {
        if let Some(columns) = self.memo.read().await.columns.get(table) {
            return Ok(columns.clone());
        }
        crate::trace_log!(table, schema = %self.schema, "fetching columns");

        let columns: Vec<TableColumn> = sqlx::query_as(COLUMNS_SQL)
            .bind(&self.schema)
            .bind(table)
            .fetch_all(&self.pool)
            .await
            .map_err(|source| GazerError::Introspection {
                table: table.to_string(),
                source,
            })?;

        self.memo
            .write()
            .await
            .columns
            .insert(table.to_string(), columns.clone());
        Ok(columns)
    }

    async fn enum_values(&self, type_name: &str) -> Result<Vec<String>, GazerError> {
        if let Some(labels) = self.memo.read().await.enums.get(type_name) {
            return Ok(labels.clone());
        }

        let labels: Vec<String> = sqlx::query_scalar(ENUM_VALUES_SQL)
            .bind(type_name)
            .fetch_all(&self.pool)
            .await?;

        self.memo
            .write()
            .await
            .enums
            .insert(type_name.to_string(), labels.clone());
        Ok(labels)
    }

    async fn foreign_keys(&self) -> Result<Vec<ForeignKeyEdge>, GazerError> {
        let rows: Vec<ForeignKeyRow> = sqlx::query_as(FOREIGN_KEYS_SQL)
            .bind(&self.schema)
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!(schema = %self.schema, count = rows.len(), "fetched foreign keys");
        Ok(rows.into_iter().map(ForeignKeyEdge::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory schema with one enum column and one enum type without labels
    struct FixedSchema;

    fn column(name: &str, data_type: &str, udt_name: &str) -> TableColumn {
        TableColumn {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: true,
            default: None,
            udt_name: udt_name.to_string(),
            is_primary_key: false,
            is_foreign_key: false,
            fk_table: None,
            fk_column: None,
        }
    }

    #[async_trait]
    impl SchemaSource for FixedSchema {
        async fn tables(&self) -> Result<Vec<String>, GazerError> {
            Ok(vec!["biopsies".to_string()])
        }

        async fn columns(&self, _table: &str) -> Result<Vec<TableColumn>, GazerError> {
            Ok(vec![
                column("biopsy_id", "integer", "int4"),
                column("patient_type", "USER-DEFINED", "patient_kind"),
                column("legacy_flag", "USER-DEFINED", "retired_kind"),
            ])
        }

        async fn enum_values(&self, type_name: &str) -> Result<Vec<String>, GazerError> {
            Ok(match type_name {
                "patient_kind" => vec!["human".to_string(), "mouse".to_string()],
                _ => Vec::new(),
            })
        }

        async fn foreign_keys(&self) -> Result<Vec<ForeignKeyEdge>, GazerError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_table_enums_skips_empty_types() {
        let enums = FixedSchema.table_enums("biopsies").await.unwrap();
        assert_eq!(enums.len(), 1);
        assert_eq!(enums["patient_type"], vec!["human", "mouse"]);
    }

    #[test]
    fn test_is_enum() {
        assert!(column("c", "USER-DEFINED", "kind").is_enum());
        assert!(!column("c", "text", "text").is_enum());
    }
}
