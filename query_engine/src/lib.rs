//! Query Engine - SELECT construction for Gazer
//!
//! This crate turns an interactively edited query (table, columns, filter
//! tree, joins) into parameterized PostgreSQL text, resolving missing joins
//! from foreign-key metadata.

pub mod errors;
pub mod placeholders;
pub mod prelude;
pub mod query_builder;

pub use errors::{QueryError, QueryResult};
pub use query_builder::{
    Filter, FilterGroup, FilterNode, FilterOperator, ForeignKeyEdge, ForeignKeyGraph, Fragment,
    JoinClause, JoinPath, JoinStep, JoinType, LogicalOperator, QueryBuilder, QueryState,
};
