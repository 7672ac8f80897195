//! Driver contracts
//!
//! The table layer talks to the database only through [`SqlDriver`] and
//! persists schema versions through [`OptionStore`].

use std::collections::BTreeMap;

use serde_json::Value;

use super::dialect::Dialect;
use super::schema::TableSchema;
use crate::{Error, Result};

/// A row to write: column name -> value
pub type Row = BTreeMap<String, Value>;

/// Value format tag used to coerce a column value before it reaches SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnFormat {
    Integer,
    Float,
    String,
}

impl ColumnFormat {
    /// printf-style placeholder for this format
    pub fn placeholder(&self) -> &'static str {
        match self {
            ColumnFormat::Integer => "%d",
            ColumnFormat::Float => "%f",
            ColumnFormat::String => "%s",
        }
    }

    /// Coerce a JSON value into a SQL value of this format.
    ///
    /// Numeric strings convert to numbers, booleans to 0/1. Nulls, arrays,
    /// objects and non-numeric strings for numeric formats are rejected.
    pub fn coerce(&self, value: &Value) -> Result<SqlValue> {
        let rejected = || {
            Error::InvalidValue(format!(
                "cannot format {} as {}",
                value,
                self.placeholder()
            ))
        };

        match self {
            ColumnFormat::Integer => match value {
                Value::Number(n) => n
                    .as_i64()
                    .or_else(|| n.as_f64().and_then(truncate_to_i64))
                    .map(SqlValue::Integer)
                    .ok_or_else(rejected),
                Value::Bool(b) => Ok(SqlValue::Integer(i64::from(*b))),
                Value::String(s) => {
                    let s = s.trim();
                    s.parse::<i64>()
                        .ok()
                        .or_else(|| s.parse::<f64>().ok().and_then(truncate_to_i64))
                        .map(SqlValue::Integer)
                        .ok_or_else(rejected)
                }
                _ => Err(rejected()),
            },
            ColumnFormat::Float => match value {
                Value::Number(n) => n.as_f64().map(SqlValue::Float).ok_or_else(rejected),
                Value::Bool(b) => Ok(SqlValue::Float(if *b { 1.0 } else { 0.0 })),
                Value::String(s) => s
                    .trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(SqlValue::Float)
                    .ok_or_else(rejected),
                _ => Err(rejected()),
            },
            ColumnFormat::String => match value {
                Value::String(s) => Ok(SqlValue::Text(s.clone())),
                Value::Number(n) => Ok(SqlValue::Text(n.to_string())),
                Value::Bool(b) => Ok(SqlValue::Text(if *b { "1" } else { "" }.to_string())),
                _ => Err(rejected()),
            },
        }
    }
}

/// Truncate toward zero; values outside the `i64` range are rejected
fn truncate_to_i64(f: f64) -> Option<i64> {
    let f = f.trunc();
    (f.is_finite() && f >= i64::MIN as f64 && f < i64::MAX as f64).then_some(f as i64)
}

/// A coerced value, ready to be bound or rendered as a literal
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Integer(i64),
    Float(f64),
    Text(String),
}

/// Ordered column name -> format mapping
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap(Vec<(String, ColumnFormat)>);

impl ColumnMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a column, keeping its original position on replace
    pub fn insert(&mut self, name: impl Into<String>, format: ColumnFormat) {
        let name = name.into();
        match self.0.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = format,
            None => self.0.push((name, format)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, format: ColumnFormat) -> Self {
        self.insert(name, format);
        self
    }

    pub fn get(&self, name: &str) -> Option<ColumnFormat> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, f)| *f)
    }

    /// Format for a column, defaulting to string for undeclared columns
    pub fn format_of(&self, name: &str) -> ColumnFormat {
        self.get(name).unwrap_or(ColumnFormat::String)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnFormat)> {
        self.0.iter().map(|(n, f)| (n.as_str(), *f))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keep only the columns present as keys in `row`
    pub fn present_in(&self, row: &Row) -> ColumnMap {
        ColumnMap(
            self.0
                .iter()
                .filter(|(n, _)| row.contains_key(n))
                .cloned()
                .collect(),
        )
    }
}

impl<S: Into<String>> FromIterator<(S, ColumnFormat)> for ColumnMap {
    fn from_iter<I: IntoIterator<Item = (S, ColumnFormat)>>(iter: I) -> Self {
        let mut map = ColumnMap::new();
        for (name, format) in iter {
            map.insert(name, format);
        }
        map
    }
}

/// SQL execution driver
pub trait SqlDriver {
    /// Dialect used for quoting and statement rendering
    fn dialect(&self) -> Dialect;

    /// Table name prefix
    fn prefix(&self) -> &str;

    /// Run a raw statement, returning the affected row count
    fn query(&self, sql: &str) -> Result<usize>;

    /// Create the table if missing, then add any missing columns and indexes.
    /// Never drops anything, so it is safe to re-run.
    fn apply_schema(&self, schema: &TableSchema) -> Result<()>;

    /// Insert a row, replacing any row with the same key
    fn replace(&self, table: &str, data: &Row, formats: &ColumnMap) -> Result<usize>;

    /// Delete rows matching every condition
    fn delete(&self, table: &str, conditions: &Row, formats: &ColumnMap) -> Result<usize>;

    /// Run a query whose first column is an integer id
    fn query_ids(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<i64>>;
}

/// Persistent key-value options
pub trait OptionStore {
    fn get_option(&self, name: &str) -> Result<Option<String>>;

    fn update_option(&self, name: &str, value: &str, autoload: bool) -> Result<()>;
}
