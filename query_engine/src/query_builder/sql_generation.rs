//! SQL text generation
//!
//! All values travel as bind parameters. Fragments use `%s` positional
//! placeholders and the parameter list is always in placeholder order.

use crate::placeholders;
use crate::query_builder::filter::{Filter, FilterGroup, FilterOperator};
use crate::query_builder::join::JoinClause;
use serde_json::Value;

/// SQL text plus the values bound to its placeholders, left to right
pub type Fragment = (String, Vec<Value>);

pub const PLACEHOLDER: &str = "%s";

pub struct SqlGenerator;

impl SqlGenerator {
    pub fn build_filter(filter: &Filter) -> Fragment {
        let column = placeholders::escape(filter.column());
        let op = filter.operator();

        match op {
            FilterOperator::IsNull | FilterOperator::IsNotNull => {
                (format!("{} {}", column, op.to_sql()), Vec::new())
            }
            FilterOperator::In | FilterOperator::NotIn => {
                let values = filter.list_values();
                let placeholders = vec![PLACEHOLDER; values.len()].join(", ");
                (
                    format!("{} {} ({})", column, op.to_sql(), placeholders),
                    values,
                )
            }
            FilterOperator::Between => (
                format!("{} BETWEEN {} AND {}", column, PLACEHOLDER, PLACEHOLDER),
                filter.list_values(),
            ),
            _ => (
                format!("{} {} {}", column, op.to_sql(), PLACEHOLDER),
                vec![filter.value().clone()],
            ),
        }
    }

    /// Build a group recursively.
    ///
    /// Empty children are dropped; a single remaining child is returned as is,
    /// several are joined with the group's logic inside one pair of parentheses.
    pub fn build_group(group: &FilterGroup) -> Fragment {
        let mut parts: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        for child in group.children() {
            let (sql, child_params) = child.build();
            if !sql.is_empty() {
                parts.push(sql);
                params.extend(child_params);
            }
        }

        match parts.len() {
            0 => (String::new(), Vec::new()),
            1 => (parts.remove(0), params),
            _ => {
                let joiner = format!(" {} ", group.logic().to_sql());
                (format!("({})", parts.join(joiner.as_str())), params)
            }
        }
    }

    /// Build WHERE clause from the root group
    pub fn build_where_clause(root: &FilterGroup) -> Fragment {
        if root.is_empty() {
            return (String::new(), Vec::new());
        }

        let (conditions_sql, values) = Self::build_group(root);
        if conditions_sql.is_empty() {
            (String::new(), values)
        } else {
            (format!("WHERE {}", conditions_sql), values)
        }
    }

    /// Build SELECT clause, one column per line
    pub fn build_select_clause(columns: &[String]) -> String {
        let columns: Vec<String> = columns.iter().map(|c| placeholders::escape(c)).collect();
        format!("SELECT\n  {}", columns.join(",\n  "))
    }

    /// Build JOIN clauses, one per line
    pub fn build_join_clause(joins: &[JoinClause]) -> String {
        joins
            .iter()
            .map(JoinClause::to_sql)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn placeholder_count(sql: &str) -> usize {
        placeholders::count(sql)
    }
}
