//! Interactive SELECT builder
//!
//! Holds the in-progress query (base table, columns, explicit joins, filter
//! tree) and turns it into SQL text plus bind parameters. Tables that columns
//! or filters mention but no explicit join covers are joined automatically by
//! walking the foreign-key graph.

use crate::errors::{QueryError, QueryResult};
use crate::placeholders;
use crate::query_builder::filter::{table_qualifier, Filter, FilterGroup, FilterNode};
use crate::query_builder::fk_graph::{ForeignKeyEdge, ForeignKeyGraph};
use crate::query_builder::join::{JoinClause, JoinType};
use crate::query_builder::sql_generation::{Fragment, SqlGenerator};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;

/// Query builder for a single SELECT statement
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    pub(crate) table: Option<String>,
    pub(crate) columns: Vec<String>,
    pub(crate) joins: Vec<JoinClause>,
    pub(crate) root_group: FilterGroup,
    pub(crate) fk_graph: Option<ForeignKeyGraph>,
}

/// Read-only view of the builder for display
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<'a> {
    pub table: Option<String>,
    pub columns: Vec<String>,
    pub joins: Vec<JoinClause>,
    pub root_group: &'a FilterGroup,
}

fn qualify(column: &str, table: Option<&str>) -> String {
    match table {
        Some(table) if !table.is_empty() => format!("{}.{}", table, column),
        _ => column.to_string(),
    }
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything, including foreign-key data.
    pub fn reset(&mut self) -> &mut Self {
        *self = Self::default();
        self
    }

    pub fn set_table(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = Some(table.into());
        self
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// The FROM target; an empty name counts as unset.
    fn base_table(&self) -> QueryResult<&str> {
        self.table
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(QueryError::MissingTable)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn joins(&self) -> &[JoinClause] {
        &self.joins
    }

    pub fn root_group(&self) -> &FilterGroup {
        &self.root_group
    }

    pub fn foreign_keys(&self) -> Option<&ForeignKeyGraph> {
        self.fk_graph.as_ref()
    }

    // ========================================
    // Columns
    // ========================================

    /// Add a column, qualified with `table` when given. Duplicates are ignored.
    pub fn add_column(&mut self, column: &str, table: Option<&str>) -> &mut Self {
        let full_column = qualify(column, table);
        if !self.columns.contains(&full_column) {
            self.columns.push(full_column);
        }
        self
    }

    /// Add several `(column, table)` pairs
    pub fn add_columns<'a, I>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        for (column, table) in columns {
            self.add_column(column, table);
        }
        self
    }

    /// Add the already-qualified columns of a saved preset, in order
    pub fn apply_preset<S: AsRef<str>>(&mut self, columns: &[S]) -> &mut Self {
        for column in columns {
            self.add_column(column.as_ref(), None);
        }
        self
    }

    pub fn remove_column(&mut self, column: &str) -> &mut Self {
        self.columns.retain(|c| c != column);
        self
    }

    // ========================================
    // Joins
    // ========================================

    pub fn add_join(&mut self, table: &str, on_clause: &str, join_type: &str) -> QueryResult<&mut Self> {
        let join_type = join_type.parse::<JoinType>()?;
        self.joins.push(JoinClause::new(join_type, table, on_clause));
        Ok(self)
    }

    /// Explicit join with the ON clause spelled out from a column pair
    pub fn add_auto_join(
        &mut self,
        from_table: &str,
        from_column: &str,
        to_table: &str,
        to_column: &str,
        join_type: &str,
    ) -> QueryResult<&mut Self> {
        let join_type = join_type.parse::<JoinType>()?;
        self.joins.push(JoinClause::on_columns(
            join_type,
            from_table,
            from_column,
            to_table,
            to_column,
        ));
        Ok(self)
    }

    pub fn remove_join(&mut self, index: usize) -> &mut Self {
        if index < self.joins.len() {
            self.joins.remove(index);
        }
        self
    }

    pub fn clear_joins(&mut self) -> &mut Self {
        self.joins.clear();
        self
    }

    // ========================================
    // Filters
    // ========================================

    pub fn add_filter(
        &mut self,
        column: &str,
        operator: &str,
        value: Value,
        table: Option<&str>,
    ) -> QueryResult<&mut Self> {
        let filter = Filter::new(qualify(column, table), operator, value)?;
        self.root_group.add(filter);
        Ok(self)
    }

    pub fn add_filter_group(&mut self, group: FilterGroup) -> &mut Self {
        self.root_group.add(group);
        self
    }

    /// Remove a top-level filter or group by position
    pub fn remove_filter(&mut self, index: usize) -> &mut Self {
        self.root_group.remove_at(index);
        self
    }

    pub fn clear_filters(&mut self) -> &mut Self {
        self.root_group = FilterGroup::and();
        self
    }

    // ========================================
    // Foreign keys
    // ========================================

    pub fn set_foreign_keys(&mut self, edges: &[ForeignKeyEdge]) -> &mut Self {
        self.fk_graph = Some(ForeignKeyGraph::new(edges));
        self
    }

    /// Tables named by column or filter qualifiers, in discovery order,
    /// excluding the base table.
    pub fn referenced_tables(&self) -> Vec<String> {
        let base = self.table.as_deref();
        let mut tables: Vec<String> = Vec::new();

        let column_tables = self.columns.iter().filter_map(|c| table_qualifier(c));
        let filter_tables = self.root_group.filters().into_iter().filter_map(Filter::table);

        for table in column_tables.chain(filter_tables) {
            if Some(table) != base && !tables.iter().any(|t| t == table) {
                tables.push(table.to_string());
            }
        }
        tables
    }

    /// Explicit joins followed by the joins resolved from foreign keys
    pub fn resolve_joins(&self) -> QueryResult<Vec<JoinClause>> {
        let base = self.base_table()?;

        let manually_joined: HashSet<&str> = self.joins.iter().map(|j| j.table.as_str()).collect();
        let needed_tables: Vec<String> = self
            .referenced_tables()
            .into_iter()
            .filter(|t| !manually_joined.contains(t.as_str()))
            .collect();

        let mut all_joins = self.joins.clone();
        if needed_tables.is_empty() {
            return Ok(all_joins);
        }

        let graph = match &self.fk_graph {
            Some(graph) if !graph.is_empty() => graph,
            _ => {
                return Err(QueryError::MissingForeignKeyData {
                    tables: needed_tables,
                })
            }
        };

        let mut already_joined: HashSet<String> = manually_joined.iter().map(|t| t.to_string()).collect();
        already_joined.insert(base.to_string());

        for table in &needed_tables {
            let path = graph.find_unique_path(base, table)?;
            tracing::debug!(target_table = %table, hops = path.len(), "resolved join path");

            for step in path {
                if already_joined.insert(step.to_table.clone()) {
                    all_joins.push(JoinClause::new(JoinType::Left, step.to_table.clone(), step.on_clause()));
                }
            }
        }

        Ok(all_joins)
    }

    /// Build WHERE clause
    pub fn build_where_clause(&self) -> Fragment {
        SqlGenerator::build_where_clause(&self.root_group)
    }

    /// Build the full statement: SQL with `%s` placeholders and its parameters
    pub fn build(&self) -> QueryResult<Fragment> {
        let table = self.base_table()?;
        if self.columns.is_empty() {
            return Err(QueryError::MissingColumns);
        }

        let mut sql = format!(
            "{}\nFROM {}",
            SqlGenerator::build_select_clause(&self.columns),
            placeholders::escape(table)
        );

        let joins = self.resolve_joins()?;
        if !joins.is_empty() {
            sql.push('\n');
            sql.push_str(&SqlGenerator::build_join_clause(&joins));
        }

        let (where_clause, params) = self.build_where_clause();
        if !where_clause.is_empty() {
            sql.push('\n');
            sql.push_str(&where_clause);
        }

        sql.push(';');
        tracing::debug!(
            table,
            joins = joins.len(),
            params = params.len(),
            "built query"
        );
        Ok((sql, params))
    }

    pub fn state(&self) -> QueryState<'_> {
        QueryState {
            table: self.table.clone(),
            columns: self.columns.clone(),
            joins: self.joins.clone(),
            root_group: &self.root_group,
        }
    }

    /// Top-level filter tree entries, for listing in an editor
    pub fn filter_entries(&self) -> &[FilterNode] {
        self.root_group.children()
    }
}

impl fmt::Display for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.build() {
            Ok((sql, params)) => write!(f, "{}  -- params: {}", sql, Value::Array(params)),
            Err(e) => write!(f, "<QueryBuilder (incomplete): {}>", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_add_column_qualifies_and_dedupes() {
        let mut qb = QueryBuilder::new();
        qb.add_column("well_id", Some("wells"))
            .add_column("well_id", Some("wells"))
            .add_column("well_id", None)
            .add_column("row", Some(""));

        assert_eq!(qb.columns(), ["wells.well_id", "well_id", "row"]);
    }

    #[test]
    fn test_remove_column_unknown_is_noop() {
        let mut qb = QueryBuilder::new();
        qb.add_columns([("a", None), ("b", Some("t"))]);
        qb.remove_column("missing").remove_column("t.b");
        assert_eq!(qb.columns(), ["a"]);
    }

    #[test]
    fn test_add_join_validates_type() {
        let mut qb = QueryBuilder::new();
        assert!(qb.add_join("plates", "wells.plate_id = plates.plate_id", "left").is_ok());
        assert!(matches!(
            qb.add_join("plates", "x = y", "natural"),
            Err(QueryError::InvalidJoinType { .. })
        ));
        assert_eq!(qb.joins().len(), 1);
        assert_eq!(qb.joins()[0].join_type, JoinType::Left);
    }

    #[test]
    fn test_remove_join_out_of_range_is_noop() {
        let mut qb = QueryBuilder::new();
        qb.add_auto_join("wells", "plate_id", "plates", "plate_id", "INNER").unwrap();
        qb.remove_join(5);
        assert_eq!(qb.joins().len(), 1);
        qb.remove_join(0);
        assert!(qb.joins().is_empty());
    }

    #[test]
    fn test_remove_filter_by_index() {
        let mut qb = QueryBuilder::new();
        qb.add_filter("a", "=", json!(1), None).unwrap();
        qb.add_filter("b", "=", json!(2), None).unwrap();
        qb.remove_filter(9).remove_filter(0);

        assert_eq!(qb.filter_entries().len(), 1);
        assert_eq!(qb.filter_entries()[0].to_string(), "b = 2");
    }

    #[test]
    fn test_add_filter_rejects_bad_operator_without_side_effects() {
        let mut qb = QueryBuilder::new();
        assert!(qb.add_filter("a", "===", json!(1), None).is_err());
        assert!(qb.root_group().is_empty());
    }

    #[test]
    fn test_referenced_tables_in_discovery_order() {
        let mut qb = QueryBuilder::new();
        qb.set_table("wells")
            .add_column("well_id", Some("wells"))
            .add_column("barcode", Some("plates"))
            .add_column("name", Some("treatments"))
            .add_column("unqualified", None);
        qb.add_filter_group(
            FilterGroup::or()
                .with(Filter::eq("researchers.name", json!("x")))
                .with(Filter::eq("plates.kind", json!("y"))),
        );

        assert_eq!(qb.referenced_tables(), vec!["plates", "treatments", "researchers"]);
    }

    #[test]
    fn test_state_snapshot_is_detached() {
        let mut qb = QueryBuilder::new();
        qb.set_table("t").add_column("a", None);

        let mut state = qb.state();
        state.columns.push("b".to_string());
        state.table = Some("other".to_string());

        assert_eq!(qb.columns(), ["a"]);
        assert_eq!(qb.table(), Some("t"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut qb = QueryBuilder::new();
        qb.set_table("t")
            .add_column("a", None)
            .set_foreign_keys(&[ForeignKeyEdge::new("t", "u_id", "u", "id")]);
        qb.add_filter("a", "=", json!(1), None).unwrap();
        qb.reset();

        assert_eq!(qb.table(), None);
        assert!(qb.columns().is_empty());
        assert!(qb.root_group().is_empty());
        assert!(qb.foreign_keys().is_none());
    }

    #[test]
    fn test_display_reports_incomplete() {
        let qb = QueryBuilder::new();
        assert_eq!(
            qb.to_string(),
            "<QueryBuilder (incomplete): Table must be set before building query>"
        );

        let mut qb = QueryBuilder::new();
        qb.set_table("t").add_column("a", None);
        qb.add_filter("a", "=", json!(1), None).unwrap();
        assert_eq!(qb.to_string(), "SELECT\n  a\nFROM t\nWHERE a = %s;  -- params: [1]");
    }
}
