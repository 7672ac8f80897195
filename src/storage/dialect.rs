//! SQL dialects
//!
//! Everything that differs between MySQL and SQLite text lives here:
//! identifier quoting, literal escaping, column types, DDL and the upsert tail.

use std::fmt;
use std::str::FromStr;

use super::driver::SqlValue;
use super::schema::{ColumnSpec, ColumnType, TableSchema};
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    MySql,
    Sqlite,
}

impl Dialect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Quote an identifier (table, column or index name)
    pub fn quote_ident(&self, name: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", name.replace('`', "``")),
            Dialect::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Quote and escape a string literal
    pub fn quote_str(&self, value: &str) -> String {
        match self {
            Dialect::MySql => {
                let mut out = String::with_capacity(value.len() + 2);
                out.push('\'');
                for c in value.chars() {
                    match c {
                        '\0' => out.push_str("\\0"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\\' => out.push_str("\\\\"),
                        '\'' => out.push_str("\\'"),
                        '"' => out.push_str("\\\""),
                        '\x1a' => out.push_str("\\Z"),
                        c => out.push(c),
                    }
                }
                out.push('\'');
                out
            }
            Dialect::Sqlite => format!("'{}'", value.replace('\'', "''")),
        }
    }

    /// Render a coerced value as a SQL literal
    pub fn literal(&self, value: &SqlValue) -> String {
        match value {
            SqlValue::Integer(i) => i.to_string(),
            SqlValue::Float(f) => f.to_string(),
            SqlValue::Text(s) => self.quote_str(s),
        }
    }

    pub fn column_type(&self, column_type: ColumnType) -> String {
        match (self, column_type) {
            (Dialect::MySql, ColumnType::BigIntUnsigned) => "bigint(20) unsigned".to_string(),
            (Dialect::MySql, ColumnType::Int) => "int(11)".to_string(),
            (Dialect::MySql, ColumnType::Varchar(n)) => format!("varchar({n})"),
            (Dialect::MySql, ColumnType::Text) => "longtext".to_string(),
            (Dialect::MySql, ColumnType::Double) => "double".to_string(),
            (Dialect::Sqlite, ColumnType::BigIntUnsigned | ColumnType::Int) => "INTEGER".to_string(),
            (Dialect::Sqlite, ColumnType::Varchar(_) | ColumnType::Text) => "TEXT".to_string(),
            (Dialect::Sqlite, ColumnType::Double) => "REAL".to_string(),
        }
    }

    /// Column definition as used inside CREATE TABLE or ALTER TABLE ADD COLUMN.
    ///
    /// SQLite cannot add a NOT NULL column without a default, so the
    /// constraint is dropped for such columns when altering.
    pub fn column_definition(&self, column: &ColumnSpec, for_alter: bool) -> String {
        let mut def = format!(
            "{} {}",
            self.quote_ident(&column.name),
            self.column_type(column.column_type)
        );
        let keep_not_null = !(for_alter && *self == Dialect::Sqlite && column.default.is_none());
        if column.not_null && keep_not_null {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            def.push_str(" DEFAULT ");
            def.push_str(default);
        }
        if column.auto_increment && *self == Dialect::MySql {
            def.push_str(" AUTO_INCREMENT");
        }
        def
    }

    fn ident_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote_ident(c))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// CREATE TABLE IF NOT EXISTS for the schema.
    ///
    /// MySQL carries every key inline; SQLite only the primary key, the rest
    /// comes from [`Dialect::create_indexes`].
    pub fn create_table(&self, schema: &TableSchema) -> String {
        let mut lines: Vec<String> = schema
            .columns
            .iter()
            .map(|c| format!("    {}", self.column_definition(c, false)))
            .collect();

        if let Some(pk) = &schema.primary_key {
            lines.push(format!("    PRIMARY KEY ({})", self.ident_list(&pk.columns)));
        }

        if *self == Dialect::MySql {
            if let Some(unique) = &schema.unique_key {
                lines.push(format!(
                    "    UNIQUE KEY {} ({})",
                    self.quote_ident(&unique.name),
                    self.ident_list(&unique.columns)
                ));
            }
            for index in &schema.indexes {
                lines.push(format!(
                    "    KEY {} ({})",
                    self.quote_ident(&index.name),
                    self.ident_list(&index.columns)
                ));
            }
        }

        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            self.quote_ident(&schema.name),
            lines.join(",\n")
        )
    }

    /// Standalone index statements (SQLite only; index names are schema-global
    /// there, so they are qualified with the table name)
    pub fn create_indexes(&self, schema: &TableSchema) -> Vec<String> {
        if *self == Dialect::MySql {
            return Vec::new();
        }

        let table = self.quote_ident(&schema.name);
        let unique = schema.unique_key.iter().map(|k| (k, "UNIQUE INDEX"));
        let plain = schema.indexes.iter().map(|k| (k, "INDEX"));

        unique
            .chain(plain)
            .map(|(index, kind)| {
                format!(
                    "CREATE {} IF NOT EXISTS {} ON {} ({})",
                    kind,
                    self.quote_ident(&format!("{}_{}", schema.name, index.name)),
                    table,
                    self.ident_list(&index.columns)
                )
            })
            .collect()
    }

    /// Every statement needed to create the table from scratch
    pub fn schema_statements(&self, schema: &TableSchema) -> Vec<String> {
        let mut stmts = vec![self.create_table(schema)];
        stmts.extend(self.create_indexes(schema));
        stmts
    }

    /// Statement prefix for a single-row insert-or-replace
    pub fn replace_into(&self) -> &'static str {
        match self {
            Dialect::MySql => "REPLACE INTO",
            Dialect::Sqlite => "INSERT OR REPLACE INTO",
        }
    }

    /// Tail of a multi-row upsert overwriting `update_columns` on a collision
    /// with any primary or unique key
    pub fn upsert_tail(&self, update_columns: &[&str]) -> String {
        match self {
            Dialect::MySql => {
                let updates: Vec<String> = update_columns
                    .iter()
                    .map(|c| {
                        let c = self.quote_ident(c);
                        format!("{c} = VALUES({c})")
                    })
                    .collect();
                format!("ON DUPLICATE KEY UPDATE {}", updates.join(", "))
            }
            Dialect::Sqlite => {
                let updates: Vec<String> = update_columns
                    .iter()
                    .map(|c| {
                        let c = self.quote_ident(c);
                        format!("{c} = excluded.{c}")
                    })
                    .collect();
                format!("ON CONFLICT DO UPDATE SET {}", updates.join(", "))
            }
        }
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            _ => Err(Error::InvalidValue(format!("Unknown SQL dialect: {}", s))),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
