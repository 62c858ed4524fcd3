//! Query execution and row decoding
//!
//! Built fragments carry `%s` markers and JSON params. By default the params
//! are inlined as escaped literals and the text goes over the simple query
//! protocol, where every value arrives as an untyped literal and PostgreSQL
//! picks its type from the comparison (a string against an enum or date
//! column works). `ParamMode::Bound` sends typed parameters instead.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use query_engine::{placeholders, Fragment};
use serde::Serialize;
use serde_json::{Map, Number, Value};
use sqlx::postgres::{PgArguments, PgRow, PgValueFormat};
use sqlx::query::Query;
use sqlx::{Column, Decode, PgPool, Postgres, Row, Type, TypeInfo, ValueRef};
use uuid::Uuid;

use crate::errors::GazerError;

/// How params reach the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ParamMode {
    /// Escaped literals in the query text
    #[default]
    Inline,
    /// `$n` placeholders with typed binds
    Bound,
}

/// Rows returned by a query, each keyed by column label
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Map<String, Value>>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Every value of one column, top to bottom
    pub fn column(&self, name: &str) -> Vec<&Value> {
        self.rows.iter().filter_map(|row| row.get(name)).collect()
    }
}

/// Run a built fragment and decode every row.
pub async fn execute(
    pool: &PgPool,
    fragment: &Fragment,
    mode: ParamMode,
) -> Result<QueryResult, GazerError> {
    let (sql, params) = fragment;

    let rows = match mode {
        ParamMode::Inline => {
            let text = placeholders::inline(sql, params)?;
            sqlx::raw_sql(&text).fetch_all(pool).await?
        }
        ParamMode::Bound => {
            let numbered = placeholders::to_numbered(sql);
            let mut query = sqlx::query(&numbered);
            for value in params {
                query = bind_value(query, value);
            }
            query.fetch_all(pool).await?
        }
    };

    let columns = rows
        .first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default();
    let rows = rows.iter().map(decode_row).collect::<Result<Vec<_>, _>>()?;

    tracing::debug!(rows = rows.len(), ?mode, "query executed");
    Ok(QueryResult { columns, rows })
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    value: &Value,
) -> Query<'q, Postgres, PgArguments> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => query.bind(i),
            None => query.bind(n.as_f64()),
        },
        Value::String(s) => query.bind(s.clone()),
        Value::Array(_) | Value::Object(_) => query.bind(sqlx::types::Json(value.clone())),
    }
}

/// Decode one row into a JSON object keyed by column label.
pub fn decode_row(row: &PgRow) -> Result<Map<String, Value>, GazerError> {
    let mut out = Map::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        let value = decode_column(row, idx, column.type_info().name())?;
        out.insert(column.name().to_string(), value);
    }
    Ok(out)
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str) -> Result<Value, GazerError> {
    let value = match type_name {
        "BOOL" => get::<bool>(row, idx)?.map(Value::Bool),
        "INT2" => get::<i16>(row, idx)?.map(Value::from),
        "INT4" => get::<i32>(row, idx)?.map(Value::from),
        "INT8" => get::<i64>(row, idx)?.map(Value::from),
        "FLOAT4" => get::<f32>(row, idx)?.map(|v| float(f64::from(v))),
        "FLOAT8" => get::<f64>(row, idx)?.map(float),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" | "CITEXT" => {
            get::<String>(row, idx)?.map(Value::String)
        }
        "UUID" => get::<Uuid>(row, idx)?.map(|v| Value::String(v.to_string())),
        "DATE" => get::<NaiveDate>(row, idx)?.map(|v| Value::String(v.to_string())),
        "TIME" => get::<NaiveTime>(row, idx)?.map(|v| Value::String(v.to_string())),
        "TIMESTAMP" => get::<NaiveDateTime>(row, idx)?
            .map(|v| Value::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "TIMESTAMPTZ" => get::<DateTime<Utc>>(row, idx)?.map(|v| Value::String(v.to_rfc3339())),
        "JSON" | "JSONB" => get::<Value>(row, idx)?,
        "NUMERIC" => numeric(row, idx)?.map(Value::String),
        "TEXT[]" | "VARCHAR[]" => get::<Vec<String>>(row, idx)?.map(Value::from),
        "INT4[]" => get::<Vec<i32>>(row, idx)?.map(Value::from),
        "INT8[]" => get::<Vec<i64>>(row, idx)?.map(Value::from),
        "FLOAT8[]" => get::<Vec<f64>>(row, idx)?.map(|v| Value::Array(v.into_iter().map(float).collect())),
        "BOOL[]" => get::<Vec<bool>>(row, idx)?.map(Value::from),
        // enums and everything else: the text form
        _ => text(row, idx)?.map(Value::String),
    };
    Ok(value.unwrap_or(Value::Null))
}

fn get<'r, T>(row: &'r PgRow, idx: usize) -> Result<Option<T>, GazerError>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get::<Option<T>, _>(idx)
        .map_err(|e| decode_error(row, idx, e.to_string()))
}

fn text(row: &PgRow, idx: usize) -> Result<Option<String>, GazerError> {
    row.try_get_unchecked::<Option<String>, _>(idx)
        .map_err(|e| decode_error(row, idx, e.to_string()))
}

/// NUMERIC as a decimal string, without going through a float
fn numeric(row: &PgRow, idx: usize) -> Result<Option<String>, GazerError> {
    let raw = row
        .try_get_raw(idx)
        .map_err(|e| decode_error(row, idx, e.to_string()))?;
    if raw.is_null() {
        return Ok(None);
    }
    match raw.format() {
        PgValueFormat::Text => raw
            .as_str()
            .map(|s| Some(s.to_string()))
            .map_err(|e| decode_error(row, idx, e.to_string())),
        PgValueFormat::Binary => {
            let bytes = raw
                .as_bytes()
                .map_err(|e| decode_error(row, idx, e.to_string()))?;
            numeric_to_string(bytes)
                .map(Some)
                .ok_or_else(|| decode_error(row, idx, "malformed NUMERIC value".to_string()))
        }
    }
}

/// Render PostgreSQL's binary NUMERIC: a header of digit count, weight, sign
/// and display scale, followed by base-10000 digits.
fn numeric_to_string(bytes: &[u8]) -> Option<String> {
    let word = |i: usize| -> Option<u16> {
        let pair = bytes.get(i..i + 2)?;
        Some(u16::from_be_bytes([pair[0], pair[1]]))
    };

    let ndigits = usize::from(word(0)?);
    let weight = i32::from(word(2)? as i16);
    let sign = word(4)?;
    let dscale = usize::from(word(6)?);

    match sign {
        0xC000 => return Some("NaN".to_string()),
        0xD000 => return Some("Infinity".to_string()),
        0xF000 => return Some("-Infinity".to_string()),
        _ => {}
    }

    let digits = (0..ndigits)
        .map(|i| word(8 + i * 2))
        .collect::<Option<Vec<u16>>>()?;
    let digit = |index: i32| -> u16 {
        usize::try_from(index)
            .ok()
            .and_then(|i| digits.get(i).copied())
            .unwrap_or(0)
    };

    let mut out = String::new();
    if sign == 0x4000 {
        out.push('-');
    }

    if weight < 0 {
        out.push('0');
    } else {
        out.push_str(&digit(0).to_string());
        for index in 1..=weight {
            out.push_str(&format!("{:04}", digit(index)));
        }
    }

    if dscale > 0 {
        let mut fraction = String::with_capacity(dscale + 4);
        let mut index = weight + 1;
        while fraction.len() < dscale {
            fraction.push_str(&format!("{:04}", digit(index)));
            index += 1;
        }
        fraction.truncate(dscale);
        out.push('.');
        out.push_str(&fraction);
    }

    Some(out)
}

fn float(v: f64) -> Value {
    Number::from_f64(v).map(Value::Number).unwrap_or(Value::Null)
}

fn decode_error(row: &PgRow, idx: usize, message: String) -> GazerError {
    let column = row
        .columns()
        .get(idx)
        .map(|c| c.name().to_string())
        .unwrap_or_else(|| idx.to_string());
    GazerError::Decode { column, message }
}
