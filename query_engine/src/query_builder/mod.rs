//! Query builder
//!
//! SELECT construction: filter trees, joins, foreign-key join resolution and
//! SQL generation.

pub mod builder;
pub mod filter;
pub mod fk_graph;
pub mod join;
pub mod sql_generation;



pub use builder::{QueryBuilder, QueryState};
pub use filter::{Filter, FilterGroup, FilterNode, FilterOperator, LogicalOperator};
pub use fk_graph::{ForeignKeyEdge, ForeignKeyGraph, JoinPath, JoinStep};
pub use join::{JoinClause, JoinType};
pub use sql_generation::{Fragment, SqlGenerator};
