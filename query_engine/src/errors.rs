//! Error types for query construction
//!
//! Every error is structural: it comes from a malformed call or from schema
//! metadata that cannot answer the question asked, so nothing here is retried.

use thiserror::Error;

pub type QueryResult<T> = Result<T, QueryError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid operator '{operator}'. Allowed: {allowed}")]
    InvalidOperator { operator: String, allowed: String },

    #[error("Invalid operand for {operator}: {reason}")]
    InvalidOperand { operator: String, reason: String },

    #[error("Logic must be 'AND' or 'OR', got '{0}'")]
    InvalidLogic(String),

    #[error("Invalid join type '{join_type}'. Allowed: {allowed}")]
    InvalidJoinType { join_type: String, allowed: String },

    #[error("Table must be set before building query")]
    MissingTable,

    #[error("At least one column must be selected")]
    MissingColumns,

    #[error("Columns reference other tables {} but no FK data is available", .tables.join(", "))]
    MissingForeignKeyData { tables: Vec<String> },

    #[error("No FK path from '{from}' to '{to}'")]
    NoPath { from: String, to: String },

    #[error("Ambiguous FK path from '{from}' to '{to}': found {count} paths")]
    AmbiguousPath {
        from: String,
        to: String,
        count: usize,
    },

    #[error("Query has {expected} placeholders but {actual} params were supplied")]
    ParamCountMismatch { expected: usize, actual: usize },
}

impl QueryError {
    pub fn invalid_operand(operator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidOperand {
            operator: operator.into(),
            reason: reason.into(),
        }
    }

    /// True for the two graph-resolution failures, which a caller usually
    /// answers by adding an explicit join.
    pub fn is_join_resolution(&self) -> bool {
        matches!(self, Self::NoPath { .. } | Self::AmbiguousPath { .. })
    }
}
