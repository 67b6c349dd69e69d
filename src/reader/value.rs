//! Scalar values pulled out of query results
//!
//! Charts and commands work on rows of [`Value`]s rather than on typed
//! Polars columns, since most of them only need "is this a number" and
//! "how does this print".

use crate::format::format_general;
use crate::{DataFrame, Result, TabplotError};
use polars::prelude::AnyValue;
use std::cmp::Ordering;
use std::fmt;

/// A single result cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Boolean(bool),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// True for engine-typed numbers; numeric-looking text does not count
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Real(_))
    }

    /// Numeric view of the value, parsing text when it looks like a number
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Real(f) => Some(*f),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Null => None,
        }
    }

    /// Render for CSV output: reals keep a decimal point, NULL is empty
    pub fn to_csv_field(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) => format!("{:?}", f),
            Value::Boolean(b) => b.to_string(),
            Value::Text(s) => s.clone(),
        }
    }

    /// Identity form for grouping keys and labels
    ///
    /// Unlike `Display`, integers are never rounded, so distinct ids such as
    /// `20240101` and `20240102` stay distinct.
    pub fn to_key(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Integer(i) => i.to_string(),
            Value::Real(f) => f.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Text(s) => s.clone(),
        }
    }

    /// Ordering used when sorting axis categories
    ///
    /// NULL sorts first, then numbers by value, then booleans, then text.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        fn rank(value: &Value) -> u8 {
            match value {
                Value::Null => 0,
                Value::Integer(_) | Value::Real(_) => 1,
                Value::Boolean(_) => 2,
                Value::Text(_) => 3,
            }
        }

        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let (x, y) = (a.as_f64().unwrap_or(0.0), b.as_f64().unwrap_or(0.0));
                x.total_cmp(&y)
            }
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (a, b) => rank(a).cmp(&rank(b)),
        }
    }
}

/// Label form: numbers use six significant digits, NULL is empty
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(i) => write!(f, "{}", format_general(*i as f64)),
            Value::Real(v) => write!(f, "{}", format_general(*v)),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<AnyValue<'_>> for Value {
    fn from(value: AnyValue<'_>) -> Self {
        match value {
            AnyValue::Null => Value::Null,
            AnyValue::Boolean(b) => Value::Boolean(b),
            AnyValue::Int32(i) => Value::Integer(i64::from(i)),
            AnyValue::Int64(i) => Value::Integer(i),
            AnyValue::UInt32(i) => Value::Integer(i64::from(i)),
            AnyValue::UInt64(i) => match i64::try_from(i) {
                Ok(i) => Value::Integer(i),
                Err(_) => Value::Real(i as f64),
            },
            AnyValue::Float32(f) => Value::Real(f64::from(f)),
            AnyValue::Float64(f) => Value::Real(f),
            AnyValue::String(s) => Value::Text(s.to_string()),
            AnyValue::StringOwned(s) => Value::Text(s.to_string()),
            other => Value::Text(other.to_string()),
        }
    }
}

/// Names of the DataFrame's columns in order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect()
}

/// Materialize a DataFrame as rows of values
pub fn dataframe_rows(df: &DataFrame) -> Result<Vec<Vec<Value>>> {
    let columns = df.get_columns();
    let mut rows = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let mut row = Vec::with_capacity(columns.len());
        for series in columns {
            let value = series.get(row_idx).map_err(|e| {
                TabplotError::InternalError(format!("Failed to read result row: {}", e))
            })?;
            row.push(Value::from(value));
        }
        rows.push(row);
    }
    Ok(rows)
}
