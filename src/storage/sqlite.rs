//! SQLite storage implementation

use std::collections::HashSet;
use std::path::Path;

use rusqlite::types::ToSqlOutput;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, ToSql};

use super::dialect::Dialect;
use super::driver::{ColumnMap, OptionStore, Row, SqlDriver, SqlValue};
use super::schema::{self, TableSchema};
use crate::{Error, Result};

/// Default table prefix
pub const DEFAULT_PREFIX: &str = "wp_";

/// SQLite-backed driver, option store and content table
pub struct SqliteStore {
    pub(super) conn: Connection,
    prefix: String,
}

impl SqliteStore {
    /// Open a database file (creates if doesn't exist)
    pub fn open(path: &Path, prefix: &str) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn,
            prefix: prefix.to_string(),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open an in-memory database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn,
            prefix: DEFAULT_PREFIX.to_string(),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the host tables (options and content items)
    fn initialize_schema(&self) -> Result<()> {
        self.apply_schema(&schema::options_table(&self.prefix))?;
        self.apply_schema(&schema::posts_table(&self.prefix))?;
        Ok(())
    }

    pub(super) fn table(&self, base: &str) -> String {
        format!("{}{}", self.prefix, base)
    }

    /// Column names currently present on a table
    fn table_columns(&self, table: &str) -> Result<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1)")?;
        let columns = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(columns)
    }

    fn where_clause(&self, conditions: &Row, formats: &ColumnMap) -> Result<(String, Vec<SqlValue>)> {
        if conditions.is_empty() {
            return Err(Error::InvalidValue(
                "delete requires at least one condition".to_string(),
            ));
        }

        let dialect = self.dialect();
        let mut clauses = Vec::with_capacity(conditions.len());
        let mut values = Vec::with_capacity(conditions.len());
        for (i, (column, value)) in conditions.iter().enumerate() {
            clauses.push(format!("{} = ?{}", dialect.quote_ident(column), i + 1));
            values.push(formats.format_of(column).coerce(value)?);
        }
        Ok((clauses.join(" AND "), values))
    }
}

impl ToSql for SqlValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            SqlValue::Integer(i) => ToSqlOutput::from(*i),
            SqlValue::Float(f) => ToSqlOutput::from(*f),
            SqlValue::Text(s) => ToSqlOutput::from(s.as_str()),
        })
    }
}

impl SqlDriver for SqliteStore {
    fn dialect(&self) -> Dialect {
        Dialect::Sqlite
    }

    fn prefix(&self) -> &str {
        &self.prefix
    }

    fn query(&self, sql: &str) -> Result<usize> {
        tracing::debug!(%sql, "query");
        Ok(self.conn.execute(sql, [])?)
    }

    fn apply_schema(&self, schema: &TableSchema) -> Result<()> {
        let dialect = self.dialect();
        self.conn.execute(&dialect.create_table(schema), [])?;

        let existing = self.table_columns(&schema.name)?;
        for column in schema.columns.iter().filter(|c| !existing.contains(&c.name)) {
            tracing::info!(table = %schema.name, column = %column.name, "adding missing column");
            self.conn.execute(
                &format!(
                    "ALTER TABLE {} ADD COLUMN {}",
                    dialect.quote_ident(&schema.name),
                    dialect.column_definition(column, true)
                ),
                [],
            )?;
        }

        for stmt in dialect.create_indexes(schema) {
            self.conn.execute(&stmt, [])?;
        }
        Ok(())
    }

    fn replace(&self, table: &str, data: &Row, formats: &ColumnMap) -> Result<usize> {
        if data.is_empty() {
            return Err(Error::InvalidValue("replace requires at least one column".to_string()));
        }

        let dialect = self.dialect();
        let columns: Vec<String> = data.keys().map(|c| dialect.quote_ident(c)).collect();
        let placeholders: Vec<String> = (1..=data.len()).map(|i| format!("?{i}")).collect();
        let values = data
            .iter()
            .map(|(column, value)| formats.format_of(column).coerce(value))
            .collect::<Result<Vec<_>>>()?;

        let sql = format!(
            "{} {} ({}) VALUES ({})",
            dialect.replace_into(),
            dialect.quote_ident(table),
            columns.join(", "),
            placeholders.join(", ")
        );
        Ok(self.conn.execute(&sql, params_from_iter(values.iter()))?)
    }

    fn delete(&self, table: &str, conditions: &Row, formats: &ColumnMap) -> Result<usize> {
        let (clause, values) = self.where_clause(conditions, formats)?;
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            self.dialect().quote_ident(table),
            clause
        );
        tracing::debug!(%sql, "delete");
        Ok(self.conn.execute(&sql, params_from_iter(values.iter()))?)
    }

    fn query_ids(&self, sql: &str, params: &[SqlValue]) -> Result<Vec<i64>> {
        let mut stmt = self.conn.prepare(sql)?;
        let ids = stmt
            .query_map(params_from_iter(params.iter()), |row| row.get::<_, i64>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(ids)
    }
}

impl OptionStore for SqliteStore {
    fn get_option(&self, name: &str) -> Result<Option<String>> {
        let sql = format!(
            "SELECT option_value FROM {} WHERE option_name = ?1",
            self.dialect().quote_ident(&self.table("options"))
        );
        self.conn
            .query_row(&sql, [name], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    fn update_option(&self, name: &str, value: &str, autoload: bool) -> Result<()> {
        let sql = format!(
            r#"
            INSERT INTO {} (option_name, option_value, autoload)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (option_name) DO UPDATE SET
                option_value = excluded.option_value,
                autoload = excluded.autoload
            "#,
            self.dialect().quote_ident(&self.table("options"))
        );
        let autoload = if autoload { "yes" } else { "no" };
        self.conn.execute(&sql, params![name, value, autoload])?;
        Ok(())
    }
}
