//! Filter predicates and boolean filter groups
//!
//! A WHERE clause is a tree: leaves are [`Filter`] predicates, inner nodes are
//! [`FilterGroup`]s joined with AND or OR. [`FilterNode`] is the closed union
//! of the two.

use crate::errors::{QueryError, QueryResult};
use crate::query_builder::sql_generation::{Fragment, SqlGenerator};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Comparison operators accepted in a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Eq,        // =
    Ne,        // !=
    NeAnsi,    // <>
    Lt,        // <
    Gt,        // >
    Lte,       // <=
    Gte,       // >=
    Like,      // LIKE
    ILike,     // ILIKE (case insensitive)
    NotLike,   // NOT LIKE
    NotILike,  // NOT ILIKE
    In,        // IN
    NotIn,     // NOT IN
    IsNull,    // IS NULL
    IsNotNull, // IS NOT NULL
    Between,   // BETWEEN
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 16] = [
        FilterOperator::Eq,
        FilterOperator::Ne,
        FilterOperator::NeAnsi,
        FilterOperator::Lt,
        FilterOperator::Gt,
        FilterOperator::Lte,
        FilterOperator::Gte,
        FilterOperator::Like,
        FilterOperator::ILike,
        FilterOperator::NotLike,
        FilterOperator::NotILike,
        FilterOperator::In,
        FilterOperator::NotIn,
        FilterOperator::IsNull,
        FilterOperator::IsNotNull,
        FilterOperator::Between,
    ];

    pub fn to_sql(&self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Ne => "!=",
            FilterOperator::NeAnsi => "<>",
            FilterOperator::Lt => "<",
            FilterOperator::Gt => ">",
            FilterOperator::Lte => "<=",
            FilterOperator::Gte => ">=",
            FilterOperator::Like => "LIKE",
            FilterOperator::ILike => "ILIKE",
            FilterOperator::NotLike => "NOT LIKE",
            FilterOperator::NotILike => "NOT ILIKE",
            FilterOperator::In => "IN",
            FilterOperator::NotIn => "NOT IN",
            FilterOperator::IsNull => "IS NULL",
            FilterOperator::IsNotNull => "IS NOT NULL",
            FilterOperator::Between => "BETWEEN",
        }
    }

    /// Operators that take no value at all
    pub fn is_null_check(&self) -> bool {
        matches!(self, FilterOperator::IsNull | FilterOperator::IsNotNull)
    }

    /// Operators whose value is a list of alternatives
    pub fn is_list(&self) -> bool {
        matches!(self, FilterOperator::In | FilterOperator::NotIn)
    }

    /// Allowed operators, sorted, for error messages
    pub fn allowed_list() -> String {
        let mut names: Vec<&str> = Self::ALL.iter().map(|op| op.to_sql()).collect();
        names.sort_unstable();
        names.join(", ")
    }
}

impl FromStr for FilterOperator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|op| op.to_sql() == normalized)
            .ok_or_else(|| QueryError::InvalidOperator {
                operator: normalized,
                allowed: Self::allowed_list(),
            })
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_sql())
    }
}

/// Single predicate in a WHERE clause
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    column: String,
    operator: FilterOperator,
    value: Value, // Null for IS NULL / IS NOT NULL
}

impl Filter {
    /// Parse the operator and check the operand shape it needs.
    pub fn new(column: impl Into<String>, operator: &str, value: Value) -> QueryResult<Self> {
        let operator = operator.parse::<FilterOperator>()?;
        Self::with_operator(column, operator, value)
    }

    pub fn with_operator(
        column: impl Into<String>,
        operator: FilterOperator,
        value: Value,
    ) -> QueryResult<Self> {
        match operator {
            FilterOperator::Between => match &value {
                Value::Array(bounds) if bounds.len() == 2 => {}
                other => {
                    return Err(QueryError::invalid_operand(
                        operator.to_sql(),
                        format!("BETWEEN requires a 2-element list, got: {}", other),
                    ))
                }
            },
            FilterOperator::In | FilterOperator::NotIn => {
                if matches!(&value, Value::Array(items) if items.is_empty()) {
                    return Err(QueryError::invalid_operand(
                        operator.to_sql(),
                        "value list cannot be empty",
                    ));
                }
            }
            _ => {}
        }

        Ok(Self {
            column: column.into(),
            operator,
            value,
        })
    }

    /// Equal condition
    pub fn eq(column: impl Into<String>, value: Value) -> Self {
        Self {
            column: column.into(),
            operator: FilterOperator::Eq,
            value,
        }
    }

    /// IS NULL condition
    pub fn is_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator: FilterOperator::IsNull,
            value: Value::Null,
        }
    }

    /// IS NOT NULL condition
    pub fn is_not_null(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator: FilterOperator::IsNotNull,
            value: Value::Null,
        }
    }

    /// BETWEEN condition; bounds are kept in the order given
    pub fn between(column: impl Into<String>, low: Value, high: Value) -> Self {
        Self {
            column: column.into(),
            operator: FilterOperator::Between,
            value: Value::Array(vec![low, high]),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn operator(&self) -> FilterOperator {
        self.operator
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Table qualifier of the column, if it has one
    pub fn table(&self) -> Option<&str> {
        table_qualifier(&self.column)
    }

    /// Values an IN / NOT IN filter binds; a bare scalar counts as one element.
    pub fn list_values(&self) -> Vec<Value> {
        match &self.value {
            Value::Array(items) => items.clone(),
            other => vec![other.clone()],
        }
    }

    /// SQL fragment with `%s` placeholders and the values to bind
    pub fn build(&self) -> Fragment {
        SqlGenerator::build_filter(self)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = self.operator;
        match op {
            FilterOperator::IsNull | FilterOperator::IsNotNull => write!(f, "{} {}", self.column, op),
            FilterOperator::In | FilterOperator::NotIn => {
                let shown: Vec<String> = self.list_values().iter().map(display_value).collect();
                write!(f, "{} {} ({})", self.column, op, shown.join(", "))
            }
            FilterOperator::Between => {
                let bounds = self.list_values();
                let low = bounds.first().map(display_value).unwrap_or_default();
                let high = bounds.get(1).map(display_value).unwrap_or_default();
                write!(f, "{} BETWEEN {} AND {}", self.column, low, high)
            }
            _ => write!(f, "{} {} {}", self.column, op, display_value(&self.value)),
        }
    }
}

/// Debug rendering of a value; strings are single-quoted
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s),
        Value::Null => "NULL".to_string(),
        other => other.to_string(),
    }
}

/// `"wells.well_id"` -> `Some("wells")`, `"well_id"` -> `None`
pub fn table_qualifier(column: &str) -> Option<&str> {
    column.rsplit_once('.').map(|(table, _)| table)
}

/// Logical operators for combining filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl LogicalOperator {
    pub fn to_sql(&self) -> &'static str {
        match self {
            LogicalOperator::And => "AND",
            LogicalOperator::Or => "OR",
        }
    }
}

impl FromStr for LogicalOperator {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "AND" => Ok(LogicalOperator::And),
            "OR" => Ok(LogicalOperator::Or),
            other => Err(QueryError::InvalidLogic(other.to_string())),
        }
    }
}

/// A node of the filter tree
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Condition(Filter),
    Group(FilterGroup),
}

impl FilterNode {
    pub fn build(&self) -> Fragment {
        match self {
            FilterNode::Condition(filter) => filter.build(),
            FilterNode::Group(group) => group.build(),
        }
    }
}

impl From<Filter> for FilterNode {
    fn from(filter: Filter) -> Self {
        FilterNode::Condition(filter)
    }
}

impl From<FilterGroup> for FilterNode {
    fn from(group: FilterGroup) -> Self {
        FilterNode::Group(group)
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterNode::Condition(filter) => fmt::Display::fmt(filter, f),
            FilterNode::Group(group) => fmt::Display::fmt(group, f),
        }
    }
}

/// AND / OR group of filters and nested groups
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterGroup {
    logic: LogicalOperator,
    children: Vec<FilterNode>,
}

impl FilterGroup {
    pub fn new(logic: &str) -> QueryResult<Self> {
        Ok(Self::with_logic(logic.parse()?))
    }

    pub fn with_logic(logic: LogicalOperator) -> Self {
        Self {
            logic,
            children: Vec::new(),
        }
    }

    /// Create an AND group
    pub fn and() -> Self {
        Self::with_logic(LogicalOperator::And)
    }

    /// Create an OR group
    pub fn or() -> Self {
        Self::with_logic(LogicalOperator::Or)
    }

    pub fn logic(&self) -> LogicalOperator {
        self.logic
    }

    pub fn children(&self) -> &[FilterNode] {
        &self.children
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn add(&mut self, child: impl Into<FilterNode>) -> &mut Self {
        self.children.push(child.into());
        self
    }

    /// Chaining form of [`FilterGroup::add`]
    pub fn with(mut self, child: impl Into<FilterNode>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Detach the first child equal to `child`.
    pub fn remove(&mut self, child: &FilterNode) -> Option<FilterNode> {
        let index = self.children.iter().position(|c| c == child)?;
        Some(self.children.remove(index))
    }

    /// Detach the child at `index`; out-of-range is a no-op.
    pub fn remove_at(&mut self, index: usize) -> Option<FilterNode> {
        (index < self.children.len()).then(|| self.children.remove(index))
    }

    /// Every leaf filter, depth first, in child order
    pub fn filters(&self) -> Vec<&Filter> {
        let mut out = Vec::new();
        self.collect_filters(&mut out);
        out
    }

    fn collect_filters<'a>(&'a self, out: &mut Vec<&'a Filter>) {
        for child in &self.children {
            match child {
                FilterNode::Condition(filter) => out.push(filter),
                FilterNode::Group(group) => group.collect_filters(out),
            }
        }
    }

    pub fn build(&self) -> Fragment {
        SqlGenerator::build_group(self)
    }
}

impl fmt::Display for FilterGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .children
            .iter()
            .map(|c| c.to_string())
            .filter(|s| !s.is_empty())
            .collect();
        match parts.len() {
            0 => Ok(()),
            1 => f.write_str(&parts[0]),
            _ => {
                let joiner = format!(" {} ", self.logic.to_sql());
                write!(f, "({})", parts.join(joiner.as_str()))
            }
        }
    }
}
