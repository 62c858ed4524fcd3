//! Foreign-key graph and join-path search
//!
//! Every foreign key becomes two adjacency entries so a path can be walked
//! from either side of the relationship. Path search is a depth-first walk
//! that never revisits a table already on the current path, so cycles in the
//! schema are harmless.

use crate::errors::{QueryError, QueryResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One foreign-key column pair as reported by schema introspection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ForeignKeyEdge {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

impl ForeignKeyEdge {
    pub fn new(
        from_table: impl Into<String>,
        from_column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        Self {
            from_table: from_table.into(),
            from_column: from_column.into(),
            to_table: to_table.into(),
            to_column: to_column.into(),
        }
    }
}

/// Adjacency entry: a neighbor table and the column pair linking to it
#[derive(Debug, Clone, PartialEq, Eq)]
struct Adjacent {
    table: String,
    local_column: String,
    neighbor_column: String,
}

/// A single hop of a join path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JoinStep {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

impl JoinStep {
    /// `from_table.from_column = to_table.to_column`
    pub fn on_clause(&self) -> String {
        format!(
            "{}.{} = {}.{}",
            self.from_table, self.from_column, self.to_table, self.to_column
        )
    }
}

pub type JoinPath = Vec<JoinStep>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForeignKeyGraph {
    adjacency: HashMap<String, Vec<Adjacent>>,
    edge_count: usize,
}

impl ForeignKeyGraph {
    pub fn new(edges: &[ForeignKeyEdge]) -> Self {
        let mut graph = Self::default();
        graph.set_edges(edges);
        graph
    }

    /// Replace the whole graph with `edges`.
    pub fn set_edges(&mut self, edges: &[ForeignKeyEdge]) {
        self.adjacency.clear();
        for fk in edges {
            self.adjacency
                .entry(fk.from_table.clone())
                .or_default()
                .push(Adjacent {
                    table: fk.to_table.clone(),
                    local_column: fk.from_column.clone(),
                    neighbor_column: fk.to_column.clone(),
                });
            self.adjacency
                .entry(fk.to_table.clone())
                .or_default()
                .push(Adjacent {
                    table: fk.from_table.clone(),
                    local_column: fk.to_column.clone(),
                    neighbor_column: fk.from_column.clone(),
                });
        }
        self.edge_count = edges.len();
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Number of foreign keys the graph was built from
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn contains_table(&self, table: &str) -> bool {
        self.adjacency.contains_key(table)
    }

    /// Tables directly linked to `table`, in edge order
    pub fn neighbors(&self, table: &str) -> Vec<&str> {
        self.adjacency
            .get(table)
            .map(|adj| adj.iter().map(|a| a.table.as_str()).collect())
            .unwrap_or_default()
    }

    /// Every simple path from `start` to `target`.
    ///
    /// `start == target` yields a single empty path.
    pub fn find_paths(&self, start: &str, target: &str) -> Vec<JoinPath> {
        let mut paths = Vec::new();
        let mut on_path: HashSet<&str> = HashSet::new();
        let mut current: JoinPath = Vec::new();
        self.walk(start, target, &mut on_path, &mut current, &mut paths);
        paths
    }

    fn walk<'a>(
        &'a self,
        table: &'a str,
        target: &str,
        on_path: &mut HashSet<&'a str>,
        current: &mut JoinPath,
        paths: &mut Vec<JoinPath>,
    ) {
        if table == target {
            paths.push(current.clone());
            return;
        }

        on_path.insert(table);
        for edge in self.adjacency.get(table).into_iter().flatten() {
            if on_path.contains(edge.table.as_str()) {
                continue;
            }
            current.push(JoinStep {
                from_table: table.to_string(),
                from_column: edge.local_column.clone(),
                to_table: edge.table.clone(),
                to_column: edge.neighbor_column.clone(),
            });
            self.walk(&edge.table, target, on_path, current, paths);
            current.pop();
        }
        on_path.remove(table);
    }

    /// The only path from `start` to `target`; zero or several is an error.
    pub fn find_unique_path(&self, start: &str, target: &str) -> QueryResult<JoinPath> {
        let mut paths = self.find_paths(start, target);
        match paths.len() {
            0 => Err(QueryError::NoPath {
                from: start.to_string(),
                to: target.to_string(),
            }),
            1 => Ok(paths.remove(0)),
            count => Err(QueryError::AmbiguousPath {
                from: start.to_string(),
                to: target.to_string(),
                count,
            }),
        }
    }
}
