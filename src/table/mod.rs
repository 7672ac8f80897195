//! Schema-versioned tables
//!
//! A table definition supplies its name, schema and a compiled schema
//! version. [`SchemaVersionedTable`] compares that version to the one
//! persisted under `{table}_schema_version` and only re-applies the schema
//! when the compiled version is newer.
//!
//! The check-then-migrate sequence takes no lock. Concurrent processes may
//! both migrate, which is harmless because schema application is additive.

pub mod bulk;
pub mod junction;
pub mod version;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::storage::{ColumnMap, OptionStore, Row, SqlDriver, TableSchema};
use crate::Result;

pub use bulk::{split_affected, BulkUpsert};
pub use junction::{JunctionSchema, JunctionTable};
pub use version::SchemaVersion;

/// Capability interface every managed table implements
pub trait TableDefinition: Send + Sync {
    /// Table name without prefix
    fn base_name(&self) -> &str;

    /// Compiled schema version, e.g. `0.1.0`
    fn schema_version(&self) -> &str;

    /// Full schema for the given (prefixed) table name
    fn schema(&self, table_name: &str) -> TableSchema;
}

/// Lifecycle of a table instance within the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    /// No upgrade check has completed yet
    Uninitialized,
    /// Schema matches the compiled version
    Current,
}

/// A table with versioned migrations and bulk write primitives
#[derive(Debug)]
pub struct SchemaVersionedTable<D> {
    definition: D,
    table_name: String,
    schema: TableSchema,
    current: AtomicBool,
    inserted: AtomicU64,
    updated: AtomicU64,
    deleted: AtomicU64,
}

impl<D: TableDefinition> SchemaVersionedTable<D> {
    pub fn new(definition: D, prefix: &str) -> Self {
        let table_name = format!("{}{}", prefix, definition.base_name());
        let schema = definition.schema(&table_name);
        Self {
            definition,
            table_name,
            schema,
            current: AtomicBool::new(false),
            inserted: AtomicU64::new(0),
            updated: AtomicU64::new(0),
            deleted: AtomicU64::new(0),
        }
    }

    pub fn definition(&self) -> &D {
        &self.definition
    }

    /// Prefixed table name
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    /// Declared column -> format mapping
    pub fn columns(&self) -> ColumnMap {
        self.schema.column_formats()
    }

    pub fn primary_key_name(&self) -> Option<&str> {
        self.schema.primary_key.as_ref().map(|k| k.name.as_str())
    }

    pub fn unique_key_name(&self) -> Option<&str> {
        self.schema.unique_key.as_ref().map(|k| k.name.as_str())
    }

    pub fn schema_version(&self) -> Result<SchemaVersion> {
        SchemaVersion::parse(self.definition.schema_version())
    }

    /// Option key holding the installed version
    pub fn schema_option_name(&self) -> String {
        format!("{}_schema_version", self.table_name)
    }

    pub fn installed_schema_version(&self, options: &dyn OptionStore) -> Result<Option<String>> {
        options.get_option(&self.schema_option_name())
    }

    pub fn should_upgrade(&self, options: &dyn OptionStore) -> Result<bool> {
        let installed = self.installed_schema_version(options)?;
        Ok(self.schema_version()?.is_newer_than(installed.as_deref()))
    }

    /// Apply the schema when the compiled version is newer than the installed
    /// one, or unconditionally with `force`. Returns whether it was applied.
    ///
    /// The installed version is written only after the schema applied
    /// successfully; a failure leaves it untouched. It never moves backwards,
    /// even when `force` re-applies an older schema.
    pub fn upgrade(&self, driver: &dyn SqlDriver, options: &dyn OptionStore, force: bool) -> Result<bool> {
        let version = self.schema_version()?;
        let newer = self.should_upgrade(options)?;
        if !force && !newer {
            self.current.store(true, Ordering::Release);
            tracing::debug!(table = %self.table_name, %version, "schema is current");
            return Ok(false);
        }

        tracing::info!(table = %self.table_name, %version, force, "applying schema");
        driver.apply_schema(&self.schema)?;
        if newer {
            options.update_option(&self.schema_option_name(), version.as_str(), false)?;
        }
        self.current.store(true, Ordering::Release);
        Ok(true)
    }

    pub fn state(&self) -> TableState {
        if self.current.load(Ordering::Acquire) {
            TableState::Current
        } else {
            TableState::Uninitialized
        }
    }

    pub fn is_current(&self) -> bool {
        self.state() == TableState::Current
    }

    /// Insert one row, replacing any row with the same key
    pub fn replace_one(&self, driver: &dyn SqlDriver, row: &Row, formats: &ColumnMap) -> Result<()> {
        let affected = driver.replace(&self.table_name, row, formats)?;
        let (inserted, updated) = split_affected(driver.dialect(), 1, affected);
        self.inserted.fetch_add(inserted as u64, Ordering::Relaxed);
        self.updated.fetch_add(updated as u64, Ordering::Relaxed);
        Ok(())
    }

    /// Upsert many rows in one statement. Returns the driver's affected count.
    pub fn replace_bulk(&self, driver: &dyn SqlDriver, columns: &ColumnMap, rows: &[Row]) -> Result<usize> {
        let dialect = driver.dialect();
        let key_columns = self.schema.key_columns();
        let sql = BulkUpsert::new(&self.table_name, columns)
            .with_key(&key_columns)
            .build(dialect, rows)?;

        let affected = driver.query(&sql)?;
        let (inserted, updated) = split_affected(dialect, rows.len(), affected);
        self.inserted.fetch_add(inserted as u64, Ordering::Relaxed);
        self.updated.fetch_add(updated as u64, Ordering::Relaxed);
        Ok(affected)
    }

    /// Delete rows matching every condition
    pub fn delete(&self, driver: &dyn SqlDriver, conditions: &Row, formats: &ColumnMap) -> Result<usize> {
        let affected = driver.delete(&self.table_name, conditions, formats)?;
        self.deleted.fetch_add(affected as u64, Ordering::Relaxed);
        Ok(affected)
    }

    pub fn inserted(&self) -> u64 {
        self.inserted.load(Ordering::Relaxed)
    }

    pub fn updated(&self) -> u64 {
        self.updated.load(Ordering::Relaxed)
    }

    pub fn deleted(&self) -> u64 {
        self.deleted.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{
        ColumnFormat, ColumnSpec, ColumnType, Dialect, IndexSpec, SqlValue, SqliteStore,
    };
    use crate::Error;
    use serde_json::json;

    struct FruitTable {
        version: &'static str,
    }

    impl FruitTable {
        fn new(version: &'static str) -> Self {
            Self { version }
        }
    }

    impl TableDefinition for FruitTable {
        fn base_name(&self) -> &str {
            "fruit"
        }

        fn schema_version(&self) -> &str {
            self.version
        }

        fn schema(&self, table_name: &str) -> TableSchema {
            TableSchema::new(table_name)
                .column(ColumnSpec::new("id", ColumnType::Int).not_null())
                .column(ColumnSpec::new("fruit", ColumnType::Varchar(32)).not_null())
                .primary_key(IndexSpec::new("PRIMARY", &["id"]))
        }
    }

    struct SluggedTable;

    impl TableDefinition for SluggedTable {
        fn base_name(&self) -> &str {
            "slugged"
        }

        fn schema_version(&self) -> &str {
            "0.1.0"
        }

        fn schema(&self, table_name: &str) -> TableSchema {
            TableSchema::new(table_name)
                .column(ColumnSpec::new("id", ColumnType::Int).not_null())
                .column(ColumnSpec::new("slug", ColumnType::Varchar(32)).not_null())
                .column(ColumnSpec::new("title", ColumnType::Varchar(32)).not_null())
                .primary_key(IndexSpec::new("PRIMARY", &["id"]))
                .unique_key(IndexSpec::new("slug", &["slug"]))
        }
    }

    struct FailingDriver;

    impl SqlDriver for FailingDriver {
        fn dialect(&self) -> Dialect {
            Dialect::Sqlite
        }
        fn prefix(&self) -> &str {
            "wp_"
        }
        fn query(&self, _sql: &str) -> Result<usize> {
            Err(Error::InvalidValue("driver offline".into()))
        }
        fn apply_schema(&self, _schema: &TableSchema) -> Result<()> {
            Err(Error::InvalidValue("driver offline".into()))
        }
        fn replace(&self, _table: &str, _data: &Row, _formats: &ColumnMap) -> Result<usize> {
            Err(Error::InvalidValue("driver offline".into()))
        }
        fn delete(&self, _table: &str, _conditions: &Row, _formats: &ColumnMap) -> Result<usize> {
            Err(Error::InvalidValue("driver offline".into()))
        }
        fn query_ids(&self, _sql: &str, _params: &[SqlValue]) -> Result<Vec<i64>> {
            Err(Error::InvalidValue("driver offline".into()))
        }
    }

    fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_upgrade_gated_by_version() {
        let store = SqliteStore::open_in_memory().unwrap();
        let table = SchemaVersionedTable::new(FruitTable::new("0.1.0"), store.prefix());
        assert_eq!(table.state(), TableState::Uninitialized);
        assert_eq!(table.schema_option_name(), "wp_fruit_schema_version");

        assert!(table.upgrade(&store, &store, false).unwrap());
        assert!(table.is_current());
        assert!(!table.upgrade(&store, &store, false).unwrap());

        // Redeployed with a bumped version
        let table = SchemaVersionedTable::new(FruitTable::new("0.2.0"), store.prefix());
        assert!(table.upgrade(&store, &store, false).unwrap());
        assert!(!table.upgrade(&store, &store, false).unwrap());
        assert_eq!(
            table.installed_schema_version(&store).unwrap().as_deref(),
            Some("0.2.0")
        );
    }

    #[test]
    fn test_installed_version_never_regresses() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.update_option("wp_fruit_schema_version", "0.3.0", false).unwrap();

        let table = SchemaVersionedTable::new(FruitTable::new("0.2.0"), store.prefix());
        assert!(!table.upgrade(&store, &store, false).unwrap());
        assert_eq!(
            table.installed_schema_version(&store).unwrap().as_deref(),
            Some("0.3.0")
        );
    }

    #[test]
    fn test_forced_upgrade_keeps_newer_installed_version() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.update_option("wp_fruit_schema_version", "0.3.0", false).unwrap();

        let table = SchemaVersionedTable::new(FruitTable::new("0.2.0"), store.prefix());
        assert!(table.upgrade(&store, &store, true).unwrap());
        assert!(table.is_current());
        assert_eq!(
            table.installed_schema_version(&store).unwrap().as_deref(),
            Some("0.3.0")
        );
    }

    #[test]
    fn test_force_reapplies() {
        let store = SqliteStore::open_in_memory().unwrap();
        let table = SchemaVersionedTable::new(FruitTable::new("0.1.0"), store.prefix());
        assert!(table.upgrade(&store, &store, false).unwrap());
        assert!(table.upgrade(&store, &store, true).unwrap());
    }

    #[test]
    fn test_failed_migration_keeps_installed_version() {
        let store = SqliteStore::open_in_memory().unwrap();
        let table = SchemaVersionedTable::new(FruitTable::new("0.1.0"), store.prefix());

        assert!(table.upgrade(&FailingDriver, &store, false).is_err());
        assert_eq!(table.installed_schema_version(&store).unwrap(), None);
        assert_eq!(table.state(), TableState::Uninitialized);

        assert!(table.upgrade(&store, &store, false).unwrap());
    }

    #[test]
    fn test_replace_bulk_upserts_and_counts() {
        let store = SqliteStore::open_in_memory().unwrap();
        let table = SchemaVersionedTable::new(FruitTable::new("0.1.0"), store.prefix());
        table.upgrade(&store, &store, false).unwrap();
        assert_eq!(table.primary_key_name(), Some("PRIMARY"));

        let columns = ColumnMap::new()
            .with("id", ColumnFormat::Integer)
            .with("fruit", ColumnFormat::String);
        let rows = vec![
            row(&[("id", json!(1)), ("fruit", json!("apple"))]),
            row(&[("id", json!(2)), ("fruit", json!("orange"))]),
        ];
        assert_eq!(table.replace_bulk(&store, &columns, &rows).unwrap(), 2);

        let rows = vec![row(&[("id", json!(2)), ("fruit", json!("peach"))])];
        table.replace_bulk(&store, &columns, &rows).unwrap();

        let peach = store
            .query_ids("SELECT id FROM wp_fruit WHERE fruit = 'peach'", &[])
            .unwrap();
        assert_eq!(peach, vec![2]);
        let all = store.query_ids("SELECT id FROM wp_fruit ORDER BY id", &[]).unwrap();
        assert_eq!(all, vec![1, 2]);
        assert_eq!(table.inserted(), 3);

        let deleted = table
            .delete(&store, &row(&[("fruit", json!("apple"))]), &columns)
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(table.deleted(), 1);
    }

    #[test]
    fn test_replace_bulk_with_primary_and_unique_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        let table = SchemaVersionedTable::new(SluggedTable, store.prefix());
        table.upgrade(&store, &store, false).unwrap();
        let columns = table.columns();

        let rows = vec![row(&[("id", json!(1)), ("slug", json!("a")), ("title", json!("x"))])];
        table.replace_bulk(&store, &columns, &rows).unwrap();

        // Collides on the primary key only
        let rows = vec![row(&[("id", json!(1)), ("slug", json!("b")), ("title", json!("y"))])];
        table.replace_bulk(&store, &columns, &rows).unwrap();
        let ids = store.query_ids("SELECT id FROM wp_slugged WHERE title = 'y'", &[]).unwrap();
        assert_eq!(ids, vec![1]);

        // Collides on the unique key only
        let rows = vec![row(&[("id", json!(2)), ("slug", json!("a")), ("title", json!("z"))])];
        table.replace_bulk(&store, &columns, &rows).unwrap();
        let ids = store.query_ids("SELECT id FROM wp_slugged WHERE title = 'z'", &[]).unwrap();
        assert_eq!(ids, vec![1]);
        let all = store.query_ids("SELECT id FROM wp_slugged", &[]).unwrap();
        assert_eq!(all, vec![1]);
    }

    #[test]
    fn test_replace_one() {
        let store = SqliteStore::open_in_memory().unwrap();
        let table = SchemaVersionedTable::new(FruitTable::new("0.1.0"), store.prefix());
        table.upgrade(&store, &store, false).unwrap();

        let columns = table.columns();
        table
            .replace_one(&store, &row(&[("id", json!(5)), ("fruit", json!("fig"))]), &columns)
            .unwrap();
        table
            .replace_one(&store, &row(&[("id", json!(5)), ("fruit", json!("lime"))]), &columns)
            .unwrap();

        let ids = store.query_ids("SELECT id FROM wp_fruit WHERE fruit = 'lime'", &[]).unwrap();
        assert_eq!(ids, vec![5]);
        assert_eq!(table.updated(), 0);
    }
}
