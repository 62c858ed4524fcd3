use crate::errors::QueryError;
use crate::placeholders;
use std::fmt;
use std::str::FromStr;

/// Represents the type of SQL JOIN operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JoinType {
    /// INNER JOIN - returns records that have matching values in both tables
    #[default]
    Inner,
    /// LEFT JOIN - returns all records from the left table and matched records from the right table
    Left,
    /// RIGHT JOIN - returns all records from the right table and matched records from the left table
    Right,
    /// FULL JOIN - returns all records when there is a match in either left or right table
    Full,
}

impl JoinType {
    pub const ALL: [JoinType; 4] = [JoinType::Inner, JoinType::Left, JoinType::Right, JoinType::Full];

    /// Keyword as accepted on input
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER",
            JoinType::Left => "LEFT",
            JoinType::Right => "RIGHT",
            JoinType::Full => "FULL",
        }
    }

    /// Convert JoinType to SQL string
    pub fn to_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
            JoinType::Full => "FULL JOIN",
        }
    }
}

impl FromStr for JoinType {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.to_uppercase();
        Self::ALL
            .iter()
            .copied()
            .find(|jt| jt.as_str() == normalized)
            .ok_or_else(|| {
                let mut allowed: Vec<&str> = Self::ALL.iter().map(|jt| jt.as_str()).collect();
                allowed.sort_unstable();
                QueryError::InvalidJoinType {
                    join_type: normalized,
                    allowed: allowed.join(", "),
                }
            })
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a complete JOIN clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    /// Type of join (INNER, LEFT, etc.)
    pub join_type: JoinType,
    /// Table to join with
    pub table: String,
    /// Raw ON condition, e.g. `wells.treatment_id = treatments.treatment_id`
    pub on_clause: String,
}

impl JoinClause {
    pub fn new(join_type: JoinType, table: impl Into<String>, on_clause: impl Into<String>) -> Self {
        Self {
            join_type,
            table: table.into(),
            on_clause: on_clause.into(),
        }
    }

    /// Join `to_table` on `from_table.from_column = to_table.to_column`
    pub fn on_columns(
        join_type: JoinType,
        from_table: &str,
        from_column: &str,
        to_table: &str,
        to_column: &str,
    ) -> Self {
        Self::new(
            join_type,
            to_table,
            format!("{}.{} = {}.{}", from_table, from_column, to_table, to_column),
        )
    }

    pub fn to_sql(&self) -> String {
        format!(
            "{} {} ON {}",
            self.join_type.to_sql(),
            placeholders::escape(&self.table),
            placeholders::escape(&self.on_clause)
        )
    }
}
