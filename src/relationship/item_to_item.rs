//! Item-to-item relationships stored in the junction table

use std::sync::Arc;

use serde_json::json;

use super::{RelationshipDefinition, RelationshipKind, TypeSet};
use crate::storage::{Row, SqlDriver, SqlValue};
use crate::table::junction::junction_row;
use crate::table::JunctionTable;
use crate::{Error, Result};

/// Participants and directionality of an item-to-item relationship
#[derive(Debug, Clone)]
pub struct ItemToItem {
    pub from: TypeSet,
    pub to: TypeSet,
    pub is_bidirectional: bool,
    pub table: Arc<JunctionTable>,
}

impl ItemToItem {
    pub(crate) fn setup(&self) -> Result<()> {
        if !self.table.is_current() {
            return Err(Error::TableNotMigrated(self.table.table_name().to_string()));
        }
        Ok(())
    }
}

impl RelationshipDefinition {
    fn item_to_item(&self) -> &ItemToItem {
        match &self.kind {
            RelationshipKind::ItemToItem(kind) => kind,
        }
    }

    fn conditions(&self, pairs: &[(&str, i64)]) -> Row {
        let mut row: Row = pairs
            .iter()
            .map(|(column, id)| (column.to_string(), json!(id)))
            .collect();
        row.insert("name".to_string(), json!(self.name));
        row
    }

    /// Relate two items, in both directions. Existing sort order is kept.
    pub fn add(&self, driver: &dyn SqlDriver, id1: i64, id2: i64) -> Result<()> {
        let table = &self.item_to_item().table;
        let rows = vec![
            self.conditions(&[("id1", id1), ("id2", id2)]),
            self.conditions(&[("id1", id2), ("id2", id1)]),
        ];
        table.replace_bulk(driver, &table.columns(), &rows)?;
        Ok(())
    }

    /// Remove the relation between two items, in both directions
    pub fn delete(&self, driver: &dyn SqlDriver, id1: i64, id2: i64) -> Result<usize> {
        let table = &self.item_to_item().table;
        let columns = table.columns();
        let forward = table.delete(driver, &self.conditions(&[("id1", id1), ("id2", id2)]), &columns)?;
        let reverse = table.delete(driver, &self.conditions(&[("id1", id2), ("id2", id1)]), &columns)?;
        Ok(forward + reverse)
    }

    /// Ids related to `item_id` under this relationship
    pub fn related_ids(&self, driver: &dyn SqlDriver, item_id: i64, order_by_relationship: bool) -> Result<Vec<i64>> {
        let table = &self.item_to_item().table;
        let d = driver.dialect();
        let order = if order_by_relationship {
            format!("{} ASC, {} ASC", d.quote_ident("order"), d.quote_ident("id2"))
        } else {
            format!("{} ASC", d.quote_ident("id2"))
        };
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = ? AND {} = ? ORDER BY {}",
            d.quote_ident("id2"),
            d.quote_ident(table.table_name()),
            d.quote_ident("id1"),
            d.quote_ident("name"),
            order
        );
        driver.query_ids(&sql, &[SqlValue::Integer(item_id), SqlValue::Text(self.name.clone())])
    }

    /// Make `related_ids` the complete set for `item_id`; its side is
    /// ordered as given
    pub fn replace(&self, driver: &dyn SqlDriver, item_id: i64, related_ids: &[i64]) -> Result<()> {
        let table = &self.item_to_item().table;
        let columns = table.columns();
        table.delete(driver, &self.conditions(&[("id1", item_id)]), &columns)?;
        table.delete(driver, &self.conditions(&[("id2", item_id)]), &columns)?;

        if related_ids.is_empty() {
            return Ok(());
        }

        let forward: Vec<Row> = related_ids
            .iter()
            .enumerate()
            .map(|(i, id)| junction_row(item_id, *id, &self.name, i as i64 + 1))
            .collect();
        let reverse: Vec<Row> = related_ids
            .iter()
            .map(|id| self.conditions(&[("id1", *id), ("id2", item_id)]))
            .collect();
        table.replace_bulk(driver, &columns, &forward)?;
        table.replace_bulk(driver, &columns, &reverse)?;
        Ok(())
    }

    /// Store the sort order of `ordered_ids` as seen from `item_id`
    pub fn save_sort_data(&self, driver: &dyn SqlDriver, item_id: i64, ordered_ids: &[i64]) -> Result<()> {
        if ordered_ids.is_empty() {
            return Ok(());
        }

        let table = &self.item_to_item().table;
        let rows: Vec<Row> = ordered_ids
            .iter()
            .enumerate()
            .map(|(i, id)| junction_row(item_id, *id, &self.name, i as i64 + 1))
            .collect();
        table.replace_bulk(driver, &table.columns(), &rows)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::relationship::{RelationshipOptions, RelationshipRegistry};
    use crate::storage::SqliteStore;
    use crate::table::JunctionTable;
    use std::sync::Arc;

    fn setup() -> (SqliteStore, RelationshipRegistry) {
        let store = SqliteStore::open_in_memory().unwrap();
        let junction = Arc::new(JunctionTable::with_prefix("wp_"));
        junction.upgrade(&store, &store, false).unwrap();
        let mut registry = RelationshipRegistry::new(junction);
        registry
            .define("book", "author", "wrote", RelationshipOptions::default())
            .unwrap();
        (store, registry)
    }

    #[test]
    fn test_add_relates_both_directions() {
        let (store, registry) = setup();
        let wrote = registry.lookup("book", "author", "wrote").unwrap();

        wrote.add(&store, 10, 20).unwrap();
        wrote.add(&store, 10, 21).unwrap();
        wrote.add(&store, 10, 20).unwrap();

        assert_eq!(wrote.related_ids(&store, 10, false).unwrap(), vec![20, 21]);
        assert_eq!(wrote.related_ids(&store, 20, false).unwrap(), vec![10]);

        assert_eq!(wrote.delete(&store, 20, 10).unwrap(), 2);
        assert_eq!(wrote.related_ids(&store, 10, false).unwrap(), vec![21]);
    }

    #[test]
    fn test_sort_data_survives_re_adding() {
        let (store, registry) = setup();
        let wrote = registry.lookup("book", "author", "wrote").unwrap();

        for id in [20, 21, 22] {
            wrote.add(&store, 10, id).unwrap();
        }
        wrote.save_sort_data(&store, 10, &[22, 20, 21]).unwrap();
        wrote.add(&store, 10, 22).unwrap();

        assert_eq!(wrote.related_ids(&store, 10, true).unwrap(), vec![22, 20, 21]);
    }

    #[test]
    fn test_replace_sets_complete_relation() {
        let (store, registry) = setup();
        let wrote = registry.lookup("book", "author", "wrote").unwrap();

        wrote.add(&store, 10, 20).unwrap();
        wrote.add(&store, 30, 10).unwrap();
        wrote.replace(&store, 10, &[41, 40]).unwrap();

        assert_eq!(wrote.related_ids(&store, 10, true).unwrap(), vec![41, 40]);
        assert_eq!(wrote.related_ids(&store, 40, false).unwrap(), vec![10]);
        assert!(wrote.related_ids(&store, 20, false).unwrap().is_empty());
        assert!(wrote.related_ids(&store, 30, false).unwrap().is_empty());

        wrote.replace(&store, 10, &[]).unwrap();
        assert!(wrote.related_ids(&store, 10, false).unwrap().is_empty());
    }
}
