//! Relationship junction table (`{prefix}post_to_post`)
//!
//! Each related pair is stored in both directions so every side keeps its
//! own `order`.

use serde_json::json;

use super::{SchemaVersionedTable, TableDefinition};
use crate::storage::{ColumnSpec, ColumnType, IndexSpec, Row, SqlDriver, TableSchema};
use crate::Result;

pub const JUNCTION_BASE_NAME: &str = "post_to_post";
pub const JUNCTION_SCHEMA_VERSION: &str = "0.1.0";

/// Schema of the item-to-item junction table
#[derive(Debug, Clone, Copy, Default)]
pub struct JunctionSchema;

impl TableDefinition for JunctionSchema {
    fn base_name(&self) -> &str {
        JUNCTION_BASE_NAME
    }

    fn schema_version(&self) -> &str {
        JUNCTION_SCHEMA_VERSION
    }

    fn schema(&self, table_name: &str) -> TableSchema {
        TableSchema::new(table_name)
            .column(ColumnSpec::new("id1", ColumnType::BigIntUnsigned).not_null())
            .column(ColumnSpec::new("id2", ColumnType::BigIntUnsigned).not_null())
            .column(ColumnSpec::new("name", ColumnType::Varchar(64)).not_null())
            .column(
                ColumnSpec::new("order", ColumnType::Int)
                    .not_null()
                    .default_value("0"),
            )
            .unique_key(IndexSpec::new("id1_id2_name", &["id1", "id2", "name"]))
            .index(IndexSpec::new("id2", &["id2"]))
            .index(IndexSpec::new("name", &["name"]))
    }
}

pub type JunctionTable = SchemaVersionedTable<JunctionSchema>;

impl JunctionTable {
    pub fn with_prefix(prefix: &str) -> Self {
        Self::new(JunctionSchema, prefix)
    }

    /// Remove every row an item appears in, on either side and under any name
    pub fn delete_item(&self, driver: &dyn SqlDriver, item_id: i64) -> Result<usize> {
        let columns = self.columns();
        let mut removed = 0;
        for side in ["id1", "id2"] {
            let conditions: Row = [(side.to_string(), json!(item_id))].into_iter().collect();
            removed += self.delete(driver, &conditions, &columns)?;
        }
        Ok(removed)
    }
}

/// Build a junction row
pub fn junction_row(id1: i64, id2: i64, name: &str, order: i64) -> Row {
    [
        ("id1".to_string(), json!(id1)),
        ("id2".to_string(), json!(id2)),
        ("name".to_string(), json!(name)),
        ("order".to_string(), json!(order)),
    ]
    .into_iter()
    .collect()
}
