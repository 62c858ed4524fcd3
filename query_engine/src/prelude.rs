//! Convenience re-exports for common query-engine usage

// Errors
pub use crate::errors::{QueryError, QueryResult};

// Query building
pub use crate::query_builder::{
    Filter, FilterGroup, FilterNode, FilterOperator, ForeignKeyEdge, JoinType, LogicalOperator,
    QueryBuilder,
};

// Values are bound as JSON scalars and arrays
pub use serde_json::{json, Value};
