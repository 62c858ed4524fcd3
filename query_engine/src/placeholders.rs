//! Placeholder rewriting
//!
//! Built queries use `%s` markers. PostgreSQL's extended protocol wants `$n`,
//! so executors run the text through [`to_numbered`] first. `%%` is the escape
//! for a literal percent sign, the same convention DB-API drivers use.
//!
//! [`inline`] instead substitutes escaped literals, leaving PostgreSQL to infer
//! each value's type from the column it is compared with.

use crate::errors::{QueryError, QueryResult};
use serde_json::Value;

/// Rewrite `%s` markers to `$1, $2, ...` left to right and `%%` to `%`.
pub fn to_numbered(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len() + 8);
    let mut counter = 0usize;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('s') => {
                chars.next();
                counter += 1;
                out.push('$');
                out.push_str(&counter.to_string());
            }
            Some('%') => {
                chars.next();
                out.push('%');
            }
            _ => out.push('%'),
        }
    }

    out
}

/// Double every `%` so caller-supplied SQL text never reads as a marker.
pub fn escape(text: &str) -> String {
    text.replace('%', "%%")
}

/// Number of `%s` markers, skipping `%%` escapes
pub fn count(sql: &str) -> usize {
    let mut total = 0;
    let mut chars = sql.chars();
    while let Some(c) = chars.next() {
        if c == '%' {
            match chars.next() {
                Some('s') => total += 1,
                _ => continue,
            }
        }
    }
    total
}

/// Substitute `params` for the `%s` markers as SQL literals.
pub fn inline(sql: &str, params: &[Value]) -> QueryResult<String> {
    let expected = count(sql);
    if expected != params.len() {
        return Err(QueryError::ParamCountMismatch {
            expected,
            actual: params.len(),
        });
    }

    let mut out = String::with_capacity(sql.len() + params.len() * 8);
    let mut params = params.iter();
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('s') => {
                chars.next();
                if let Some(value) = params.next() {
                    out.push_str(&literal(value));
                }
            }
            Some('%') => {
                chars.next();
                out.push('%');
            }
            _ => out.push('%'),
        }
    }

    Ok(out)
}

/// SQL literal for one value.
///
/// Strings are single-quoted with quotes doubled; a string holding a
/// backslash uses the `E'...'` form with backslashes doubled too. Arrays and
/// objects become quoted JSON text.
pub fn literal(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Bool(true) => "TRUE".to_string(),
        Value::Bool(false) => "FALSE".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => quote(s),
        Value::Array(_) | Value::Object(_) => quote(&value.to_string()),
    }
}

fn quote(text: &str) -> String {
    let escaped = text.replace('\'', "''");
    if escaped.contains('\\') {
        format!("E'{}'", escaped.replace('\\', "\\\\"))
    } else {
        format!("'{}'", escaped)
    }
}
