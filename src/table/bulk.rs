//! Multi-row upsert statements
//!
//! ```sql
//! INSERT INTO `table` (`id`,`fruit`)
//!     VALUES (1,'apple'),(2,'orange'),(3,'peach')
//!     ON DUPLICATE KEY UPDATE `fruit` = VALUES(`fruit`)
//! ```
//!
//! The written column set is the declared columns present in the *first*
//! row. Keys that only appear in later rows are dropped for the whole batch.

use crate::storage::{ColumnMap, Dialect, Row};
use crate::{Error, Result};

/// Builder for a single multi-row upsert statement
#[derive(Debug, Clone, Copy)]
pub struct BulkUpsert<'a> {
    table: &'a str,
    columns: &'a ColumnMap,
    key_columns: &'a [String],
}

impl<'a> BulkUpsert<'a> {
    pub fn new(table: &'a str, columns: &'a ColumnMap) -> Self {
        Self {
            table,
            columns,
            key_columns: &[],
        }
    }

    /// Columns of the keys that detect collisions; they are left out of the
    /// update list
    pub fn with_key(mut self, key_columns: &'a [String]) -> Self {
        self.key_columns = key_columns;
        self
    }

    /// Render the statement for `dialect`
    pub fn build(&self, dialect: Dialect, rows: &[Row]) -> Result<String> {
        let first = rows
            .first()
            .ok_or_else(|| Error::InvalidBulkWrite("no rows to write".to_string()))?;

        let written = self.columns.present_in(first);
        if written.is_empty() {
            return Err(Error::InvalidBulkWrite(
                "first row has none of the declared columns".to_string(),
            ));
        }

        let mut values = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let mut literals = Vec::with_capacity(written.len());
            for (column, format) in written.iter() {
                let value = row.get(column).ok_or_else(|| {
                    Error::InvalidBulkWrite(format!(
                        "row {index} has no value for column `{column}` (expected {} values)",
                        written.len()
                    ))
                })?;
                let value = format.coerce(value).map_err(|e| {
                    Error::InvalidBulkWrite(format!("row {index}, column `{column}`: {e}"))
                })?;
                literals.push(dialect.literal(&value));
            }

            let ignored = row.keys().filter(|k| written.get(k).is_none()).count();
            if ignored > 0 {
                tracing::debug!(table = self.table, row = index, ignored, "ignoring columns absent from first row");
            }
            values.push(format!("({})", literals.join(",")));
        }

        let column_list: Vec<String> = written.names().map(|c| dialect.quote_ident(c)).collect();

        let mut updates: Vec<&str> = written
            .names()
            .filter(|c| !self.key_columns.iter().any(|k| k == c))
            .collect();
        if updates.is_empty() {
            updates = written.names().collect();
        }

        Ok(format!(
            "INSERT INTO {} ({}) VALUES {} {}",
            dialect.quote_ident(self.table),
            column_list.join(","),
            values.join(","),
            dialect.upsert_tail(&updates)
        ))
    }
}

/// Split a driver-reported affected count into (inserted, updated).
///
/// MySQL reports 1 per inserted and 2 per updated row. SQLite reports one
/// change per row either way, so everything counts as inserted there.
pub fn split_affected(dialect: Dialect, rows: usize, affected: usize) -> (usize, usize) {
    match dialect {
        Dialect::MySql => {
            let updated = affected.saturating_sub(rows).min(rows);
            (affected.saturating_sub(2 * updated), updated)
        }
        Dialect::Sqlite => (affected, 0),
    }
}
