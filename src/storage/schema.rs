//! Database schema definitions
//!
//! Tables are described structurally and rendered to DDL by a [`Dialect`],
//! so the same description drives MySQL text and the SQLite driver.
//!
//! [`Dialect`]: super::Dialect

use super::driver::{ColumnFormat, ColumnMap};

/// Storage type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Unsigned 64-bit identifier
    BigIntUnsigned,
    /// Signed 32-bit integer
    Int,
    /// Bounded string
    Varchar(u32),
    /// Unbounded text
    Text,
    /// Double precision float
    Double,
}

impl ColumnType {
    /// Value format used when writing this column
    pub fn format(&self) -> ColumnFormat {
        match self {
            ColumnType::BigIntUnsigned | ColumnType::Int => ColumnFormat::Integer,
            ColumnType::Double => ColumnFormat::Float,
            ColumnType::Varchar(_) | ColumnType::Text => ColumnFormat::String,
        }
    }
}

/// A single column definition
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub column_type: ColumnType,
    pub not_null: bool,
    pub auto_increment: bool,
    /// Raw SQL literal used as the column default
    pub default: Option<String>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
            not_null: false,
            auto_increment: false,
            default: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn auto_increment(mut self) -> Self {
        self.auto_increment = true;
        self
    }

    pub fn default_value(mut self, literal: impl Into<String>) -> Self {
        self.default = Some(literal.into());
        self
    }
}

/// A named index over one or more columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub name: String,
    pub columns: Vec<String>,
}

impl IndexSpec {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Structural description of a table
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    /// Full (prefixed) table name
    pub name: String,
    pub columns: Vec<ColumnSpec>,
    pub primary_key: Option<IndexSpec>,
    pub unique_key: Option<IndexSpec>,
    pub indexes: Vec<IndexSpec>,
}

impl TableSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: None,
            unique_key: None,
            indexes: Vec::new(),
        }
    }

    pub fn column(mut self, column: ColumnSpec) -> Self {
        self.columns.push(column);
        self
    }

    pub fn primary_key(mut self, key: IndexSpec) -> Self {
        self.primary_key = Some(key);
        self
    }

    pub fn unique_key(mut self, key: IndexSpec) -> Self {
        self.unique_key = Some(key);
        self
    }

    pub fn index(mut self, index: IndexSpec) -> Self {
        self.indexes.push(index);
        self
    }

    /// Column name -> value format, in declaration order
    pub fn column_formats(&self) -> ColumnMap {
        self.columns
            .iter()
            .map(|c| (c.name.clone(), c.column_type.format()))
            .collect()
    }

    /// Columns of the primary and unique keys, primary first, without repeats
    pub fn key_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = Vec::new();
        for key in self.primary_key.iter().chain(self.unique_key.iter()) {
            for column in &key.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }
        columns
    }
}

/// Key-value option store: `{prefix}options`
pub fn options_table(prefix: &str) -> TableSchema {
    TableSchema::new(format!("{prefix}options"))
        .column(ColumnSpec::new("option_name", ColumnType::Varchar(191)).not_null())
        .column(ColumnSpec::new("option_value", ColumnType::Text).not_null())
        .column(
            ColumnSpec::new("autoload", ColumnType::Varchar(20))
                .not_null()
                .default_value("'yes'"),
        )
        .primary_key(IndexSpec::new("option_name", &["option_name"]))
}

/// Content items: `{prefix}posts`
pub fn posts_table(prefix: &str) -> TableSchema {
    TableSchema::new(format!("{prefix}posts"))
        .column(
            ColumnSpec::new("ID", ColumnType::BigIntUnsigned)
                .not_null()
                .auto_increment(),
        )
        .column(
            ColumnSpec::new("post_type", ColumnType::Varchar(20))
                .not_null()
                .default_value("'post'"),
        )
        .column(ColumnSpec::new("post_title", ColumnType::Text).not_null())
        .column(
            ColumnSpec::new("post_status", ColumnType::Varchar(20))
                .not_null()
                .default_value("'publish'"),
        )
        .primary_key(IndexSpec::new("ID", &["ID"]))
        .index(IndexSpec::new("type_status", &["post_type", "post_status"]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_formats_follow_declaration_order() {
        let formats = posts_table("wp_").column_formats();
        let names: Vec<_> = formats.names().collect();
        assert_eq!(names, vec!["ID", "post_type", "post_title", "post_status"]);
        assert_eq!(formats.get("ID"), Some(ColumnFormat::Integer));
        assert_eq!(formats.get("post_title"), Some(ColumnFormat::String));
    }

    #[test]
    fn test_key_columns_cover_both_keys() {
        let schema = TableSchema::new("t")
            .column(ColumnSpec::new("a", ColumnType::Int))
            .column(ColumnSpec::new("b", ColumnType::Int))
            .column(ColumnSpec::new("c", ColumnType::Int))
            .primary_key(IndexSpec::new("pk", &["c"]))
            .unique_key(IndexSpec::new("ab", &["a", "b", "c"]));
        assert_eq!(schema.key_columns(), ["c".to_string(), "a".to_string(), "b".to_string()]);

        let options = options_table("wp_");
        assert_eq!(options.key_columns(), ["option_name".to_string()]);
    }
}
